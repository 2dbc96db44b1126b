//! Rule reachability and overlap.
//!
//! A rule is *shadowed* when an earlier rule in evaluation order is implied
//! by it: every parameter map matching the later rule also matches the
//! earlier one, so the later rule can never fire. Shadowing is a failure.
//!
//! Tables evaluated in declaration order get an extra check: two rules in
//! different classes that some parameter map could satisfy at once make the
//! result depend on class order. That is reported as a warning.

use calctype::params::variant_equal;
use calctype::{FunctionalClass, LabelSource, Rule, RuleTable};

use crate::report::{ConformanceReport, TestResult};

const SHADOWING: &str = "rules/shadowing";
const OVERLAP: &str = "rules/overlap";
const DUPLICATES: &str = "rules/duplicate-labels";

/// Runs every rule check against `table`.
#[must_use]
pub fn validate(table: &RuleTable) -> ConformanceReport {
    let mut report = ConformanceReport::new();
    let ordered: Vec<(&FunctionalClass, &Rule)> = table.rules().collect();

    check_shadowing(table, &ordered, &mut report);
    if table.scheme().priority.is_none() {
        check_overlap(table, &ordered, &mut report);
    }
    if table.scheme().label == LabelSource::SpecialType {
        check_duplicate_labels(table, &ordered, &mut report);
    }
    report
}

/// True if every map matching `later` also matches `earlier`.
#[must_use]
pub fn shadows(earlier: &Rule, later: &Rule) -> bool {
    earlier.requires.iter().all(|(key, required)| {
        later
            .requirement(key)
            .is_some_and(|value| variant_equal(value, required))
    })
}

/// True if some map could match both rules: no shared parameter disagrees.
#[must_use]
pub fn overlaps(a: &Rule, b: &Rule) -> bool {
    a.requires.iter().all(|(key, required)| {
        b.requirement(key)
            .map_or(true, |value| variant_equal(value, required))
    })
}

fn qualified(class: &FunctionalClass, rule: &Rule) -> String {
    format!("{}.{}", class.name, rule.name)
}

fn check_shadowing(
    table: &RuleTable,
    ordered: &[(&FunctionalClass, &Rule)],
    report: &mut ConformanceReport,
) {
    let mut details = Vec::new();
    for (i, &(later_class, later)) in ordered.iter().enumerate() {
        if let Some(&(class, rule)) = ordered[..i].iter().find(|(_, r)| shadows(r, later)) {
            details.push(format!(
                "{} is shadowed by {}",
                qualified(later_class, later),
                qualified(class, rule)
            ));
        }
    }

    let origin = table.origin();
    report.push(if details.is_empty() {
        TestResult::pass(
            SHADOWING,
            origin,
            format!("all {} rules reachable", ordered.len()),
        )
    } else {
        TestResult::fail(
            SHADOWING,
            origin,
            format!("{} unreachable rule(s)", details.len()),
        )
        .with_details(details)
    });
}

fn check_overlap(
    table: &RuleTable,
    ordered: &[(&FunctionalClass, &Rule)],
    report: &mut ConformanceReport,
) {
    let mut details = Vec::new();
    for (i, &(class_a, a)) in ordered.iter().enumerate() {
        for &(class_b, b) in &ordered[i + 1..] {
            if class_a.name != class_b.name && overlaps(a, b) && !shadows(a, b) {
                details.push(format!(
                    "{} and {} can both match; declaration order decides",
                    qualified(class_a, a),
                    qualified(class_b, b)
                ));
            }
        }
    }

    let origin = table.origin();
    report.push(if details.is_empty() {
        TestResult::pass(OVERLAP, origin, "classes are mutually exclusive")
    } else {
        TestResult::warn(
            OVERLAP,
            origin,
            format!("{} cross-class overlap(s)", details.len()),
        )
        .with_details(details)
    });
}

fn check_duplicate_labels(
    table: &RuleTable,
    ordered: &[(&FunctionalClass, &Rule)],
    report: &mut ConformanceReport,
) {
    let mut details = Vec::new();
    for (i, &(class_a, a)) in ordered.iter().enumerate() {
        for &(class_b, b) in &ordered[i + 1..] {
            if a.name == b.name {
                details.push(format!(
                    "{} and {} share a label",
                    qualified(class_a, a),
                    qualified(class_b, b)
                ));
            }
        }
    }

    let origin = table.origin();
    report.push(if details.is_empty() {
        TestResult::pass(DUPLICATES, origin, "special type labels are unique")
    } else {
        TestResult::warn(
            DUPLICATES,
            origin,
            format!("{} duplicate label(s)", details.len()),
        )
        .with_details(details)
    });
}
