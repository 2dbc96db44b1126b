//! Classification labels: run types, task types, and calc types.
//!
//! Run types are validated against a [`RuleTable`]; task types are closed
//! enums, one per simulation code; a calc type pairs the two and renders as
//! `"{run type} {task type}"`.

use std::borrow::Cow;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::ClassifyError;
use crate::rules::RuleTable;
use crate::sanitize::ValueEnum;

/// Suffix appended to run types of Hubbard-corrected calculations.
pub const HUBBARD_SUFFIX: &str = "+U";

/// The exchange-correlation family of a calculation, e.g. `PBE` or `HSE06+U`.
///
/// Values only come from a rule table: either produced by a classifier or
/// looked up with [`RuleTable::run_type`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunType(String);

impl RunType {
    pub(crate) fn new(label: String) -> Self {
        Self(label)
    }

    /// Returns the label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for Hubbard-corrected run types.
    #[must_use]
    pub fn is_hubbard(&self) -> bool {
        self.0.ends_with(HUBBARD_SUFFIX)
    }
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for RunType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl ValueEnum for RunType {
    fn value(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.0)
    }
}

/// A closed set of task labels for one simulation code.
pub trait TaskLabel: Copy + Eq + fmt::Debug + 'static {
    /// Every label, in declaration order.
    const ALL: &'static [Self];

    /// Returns the label text. The unrecognized task renders as `""`.
    fn as_str(self) -> &'static str;

    /// Looks a task type up by its exact label.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::UnknownTaskType`] if no label matches.
    fn from_label(label: &str) -> Result<Self, ClassifyError> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == label)
            .ok_or_else(|| ClassifyError::UnknownTaskType(label.to_owned()))
    }
}

/// Declares a task type enum with its labels and the label traits.
macro_rules! task_type_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $crate::labels::TaskLabel for $name {
            const ALL: &'static [Self] = &[$( Self::$variant, )+];

            fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::labels::TaskLabel::as_str(*self))
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::error::ClassifyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <Self as $crate::labels::TaskLabel>::from_label(s)
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str($crate::labels::TaskLabel::as_str(*self))
            }
        }

        impl $crate::sanitize::ValueEnum for $name {
            fn value(&self) -> ::std::borrow::Cow<'_, str> {
                ::std::borrow::Cow::Borrowed($crate::labels::TaskLabel::as_str(*self))
            }
        }
    };
}

pub(crate) use task_type_enum;

/// A run type paired with a task type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CalcType<T> {
    run_type: RunType,
    task_type: T,
}

impl<T: TaskLabel> CalcType<T> {
    /// Pairs a run type with a task type.
    #[must_use]
    pub fn new(run_type: RunType, task_type: T) -> Self {
        Self {
            run_type,
            task_type,
        }
    }

    /// The run type half.
    #[must_use]
    pub fn run_type(&self) -> &RunType {
        &self.run_type
    }

    /// The task type half.
    #[must_use]
    pub fn task_type(&self) -> T {
        self.task_type
    }

    /// Recovers a calc type from its label.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::UnknownCalcType`] when the label is not a run
    /// type of `table` followed by a space and a task label.
    pub fn parse(label: &str, table: &RuleTable) -> Result<Self, ClassifyError> {
        table
            .run_types()
            .iter()
            .filter_map(|rt| {
                let rest = label.strip_prefix(rt.as_str())?.strip_prefix(' ')?;
                let task = T::from_label(rest).ok()?;
                Some(Self::new(rt.clone(), task))
            })
            .next()
            .ok_or_else(|| ClassifyError::UnknownCalcType(label.to_owned()))
    }

    /// Every calc type `table` can produce: each run type with each task type.
    pub fn all(table: &RuleTable) -> impl Iterator<Item = Self> + '_ {
        table
            .run_types()
            .iter()
            .flat_map(|rt| T::ALL.iter().map(move |&tt| Self::new(rt.clone(), tt)))
    }
}

impl<T: TaskLabel> fmt::Display for CalcType<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.run_type, self.task_type.as_str())
    }
}

impl<T: TaskLabel> Serialize for CalcType<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<T: TaskLabel> ValueEnum for CalcType<T> {
    fn value(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }
}
