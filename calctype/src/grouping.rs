//! Grouping of equivalent crystal structures.
//!
//! Structures are first bucketed by space-group number, which is cheap, and
//! only structures in the same bucket are handed to a [`StructureMatcher`].
//! Symmetry analysis and matching are capabilities supplied by the caller.

use crate::error::SymmetryError;

/// Space-group number assigned to structures whose symmetry analysis failed.
pub const UNKNOWN_SPACE_GROUP: i64 = -1;

/// A structure whose space group can be determined.
pub trait SpaceGroup {
    /// International space-group number at the given symmetry precision.
    ///
    /// # Errors
    ///
    /// Returns [`SymmetryError`] when the analysis does not converge.
    fn space_group_number(&self, symprec: f64) -> Result<u32, SymmetryError>;
}

/// Tolerances used when grouping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupingTolerances {
    /// Symmetry precision for space-group detection.
    pub symprec: f64,
    /// Fractional length tolerance.
    pub ltol: f64,
    /// Site tolerance.
    pub stol: f64,
    /// Angle tolerance in degrees.
    pub angle_tol: f64,
}

impl Default for GroupingTolerances {
    fn default() -> Self {
        Self {
            symprec: 0.1,
            ltol: 0.2,
            stol: 0.3,
            angle_tol: 5.0,
        }
    }
}

/// How sites are compared by a matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// Sites match when their elements match, ignoring oxidation states.
    Element,
}

/// Structure matcher configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatcherConfig {
    /// Fractional length tolerance.
    pub ltol: f64,
    /// Site tolerance.
    pub stol: f64,
    /// Angle tolerance in degrees.
    pub angle_tol: f64,
    /// Reduce to primitive cells before matching.
    pub primitive_cell: bool,
    /// Scale volumes before matching.
    pub scale: bool,
    /// Try supercells of the smaller structure.
    pub attempt_supercell: bool,
    /// Allow one structure to match a subset of another.
    pub allow_subset: bool,
    /// Site comparison.
    pub comparator: Comparator,
}

impl MatcherConfig {
    /// The grouping configuration for the given tolerances.
    #[must_use]
    pub fn new(tolerances: &GroupingTolerances) -> Self {
        Self {
            ltol: tolerances.ltol,
            stol: tolerances.stol,
            angle_tol: tolerances.angle_tol,
            primitive_cell: true,
            scale: true,
            attempt_supercell: false,
            allow_subset: false,
            comparator: Comparator::Element,
        }
    }
}

/// Partitions structures into groups of equivalent structures.
pub trait StructureMatcher<S> {
    /// Groups `structures`; every input appears in exactly one output group.
    fn group(&self, config: &MatcherConfig, structures: Vec<S>) -> Vec<Vec<S>>;
}

/// Groups structures by space group, then by the matcher.
///
/// Space groups are computed once per structure up front; buckets are sorted
/// by ascending space-group number with input order kept inside a bucket. A
/// bucket is matched only when the returned iterator reaches it.
pub fn group_structures<'m, S, M>(
    structures: impl IntoIterator<Item = S>,
    matcher: &'m M,
    tolerances: &GroupingTolerances,
) -> impl Iterator<Item = Vec<S>> + 'm
where
    S: SpaceGroup + 'm,
    M: StructureMatcher<S> + ?Sized,
{
    let config = MatcherConfig::new(tolerances);
    let mut keyed: Vec<(i64, S)> = structures
        .into_iter()
        .map(|s| (space_group_key(&s, tolerances.symprec), s))
        .collect();
    keyed.sort_by_key(|(sg, _)| *sg);

    let mut buckets: Vec<Vec<S>> = Vec::new();
    let mut current = None;
    for (sg, s) in keyed {
        if current != Some(sg) {
            buckets.push(Vec::new());
            current = Some(sg);
        }
        if let Some(bucket) = buckets.last_mut() {
            bucket.push(s);
        }
    }
    tracing::debug!(
        buckets = buckets.len(),
        "bucketed structures by space group"
    );

    buckets
        .into_iter()
        .flat_map(move |bucket| matcher.group(&config, bucket))
}

fn space_group_key<S: SpaceGroup>(structure: &S, symprec: f64) -> i64 {
    match structure.space_group_number(symprec) {
        Ok(number) => i64::from(number),
        Err(err) => {
            tracing::warn!(%err, "space group detection failed");
            UNKNOWN_SPACE_GROUP
        }
    }
}
