//! Error types for rule-table loading, classification, sanitization, and
//! settings.

use std::path::PathBuf;

use thiserror::Error;

/// A rule table could not be read or failed validation.
///
/// These are configuration errors: a process that cannot load its rule
/// tables cannot classify anything and should stop.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleTableError {
    /// The rule-table file could not be read.
    #[error("cannot read rule table {}: {message}", path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error message.
        message: String,
    },

    /// The resource is not valid TOML.
    #[error("{origin}: TOML parse error: {message}")]
    Parse {
        /// Name of the resource (file path or bundled table name).
        origin: String,
        /// Parser message.
        message: String,
    },

    /// The resource parsed but does not have the rule-table shape.
    #[error("{origin}: {reason}")]
    Malformed {
        /// Name of the resource.
        origin: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A functional class named in the evaluation priority is absent.
    #[error("{origin}: functional class `{class}` is required but not declared")]
    MissingClass {
        /// Name of the resource.
        origin: String,
        /// The missing class.
        class: String,
    },
}

/// The k-point label list attached to a VASP calculation has an unexpected
/// shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KpointLabelError {
    /// `kpoints` is present but not an object.
    #[error("kpoints must be an object, found {0}")]
    NotAnObject(String),

    /// `kpoints.labels` is present but not a list.
    #[error("kpoints.labels must be a list, found {0}")]
    NotAList(String),
}

/// Classification of a parameter mapping failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifyError {
    /// The number of k-point labels could not be determined.
    #[error("couldn't identify total number of kpt labels: {source}")]
    KpointLabels {
        /// The underlying shape problem.
        #[source]
        source: KpointLabelError,
    },

    /// An input flag has a type the classifier cannot interpret.
    #[error("parameter `{key}` must be {expected}, found {found}")]
    InvalidParameter {
        /// Parameter name.
        key: String,
        /// Expected kind of value.
        expected: &'static str,
        /// JSON rendering of the offending value.
        found: String,
    },

    /// A run type name is not in the rule table's label set.
    #[error("unknown run type `{0}`")]
    UnknownRunType(String),

    /// A task type name is not one of the fixed task labels.
    #[error("unknown task type `{0}`")]
    UnknownTaskType(String),

    /// A calc type label does not decompose into a known run and task type.
    #[error("unknown calc type `{0}`")]
    UnknownCalcType(String),
}

impl From<KpointLabelError> for ClassifyError {
    fn from(source: KpointLabelError) -> Self {
        Self::KpointLabels { source }
    }
}

/// A value could not be sanitized into a JSON-safe tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    /// Strict mode met a value with no structured form.
    #[error("value of type `{type_name}` cannot be converted to a dictionary")]
    NotSerializable {
        /// Rust type name of the offending value.
        type_name: String,
    },

    /// A sequence, mapping, or object was used as a mapping key.
    #[error("unhashable mapping key of kind `{kind}`")]
    UnhashableKey {
        /// Kind of the offending key.
        kind: &'static str,
    },
}

/// Space-group analysis of a structure failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("symmetry analysis failed: {0}")]
pub struct SymmetryError(pub String);

/// Settings could not be loaded.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("cannot read settings {}: {source}", path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid TOML for [`Settings`](crate::Settings).
    #[error("invalid settings {}: {source}", path.display())]
    Parse {
        /// Path that was read.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: toml::de::Error,
    },

    /// An environment override could not be parsed.
    #[error("environment variable {var}={value:?} is not a valid number")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },

    /// An override rule table failed to load.
    #[error(transparent)]
    Rules(#[from] RuleTableError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kpoint_error_carries_cause() {
        let err = ClassifyError::from(KpointLabelError::NotAList("42".into()));
        assert_eq!(
            err.to_string(),
            "couldn't identify total number of kpt labels: kpoints.labels must be a list, found 42"
        );
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(
            source.as_deref(),
            Some("kpoints.labels must be a list, found 42")
        );
    }

    #[test]
    fn missing_class_display() {
        let err = RuleTableError::MissingClass {
            origin: "vasp.toml".into(),
            class: "HF".into(),
        };
        assert_eq!(
            err.to_string(),
            "vasp.toml: functional class `HF` is required but not declared"
        );
    }
}
