//! Tolerances and rule-table locations.
//!
//! Settings come from an optional TOML file and are then overridden by
//! `CALCTYPE_*` environment variables. Unset rule-table paths select the
//! bundled tables.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::grouping::GroupingTolerances;
use crate::rules::{RuleTable, Scheme};

/// Environment variable overriding [`Settings::symprec`].
pub const ENV_SYMPREC: &str = "CALCTYPE_SYMPREC";
/// Environment variable overriding [`Settings::ltol`].
pub const ENV_LTOL: &str = "CALCTYPE_LTOL";
/// Environment variable overriding [`Settings::stol`].
pub const ENV_STOL: &str = "CALCTYPE_STOL";
/// Environment variable overriding [`Settings::angle_tol`].
pub const ENV_ANGLE_TOL: &str = "CALCTYPE_ANGLE_TOL";
/// Environment variable overriding [`Settings::vasp_rules`].
pub const ENV_VASP_RULES: &str = "CALCTYPE_VASP_RULES";
/// Environment variable overriding [`Settings::cp2k_rules`].
pub const ENV_CP2K_RULES: &str = "CALCTYPE_CP2K_RULES";

/// Classifier and grouping settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Symmetry precision for space-group detection.
    pub symprec: f64,
    /// Fractional length tolerance for structure matching.
    pub ltol: f64,
    /// Site tolerance for structure matching.
    pub stol: f64,
    /// Angle tolerance in degrees for structure matching.
    pub angle_tol: f64,
    /// Replacement VASP rule table.
    pub vasp_rules: Option<PathBuf>,
    /// Replacement CP2K rule table.
    pub cp2k_rules: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let tol = GroupingTolerances::default();
        Self {
            symprec: tol.symprec,
            ltol: tol.ltol,
            stol: tol.stol,
            angle_tol: tol.angle_tol,
            vasp_rules: None,
            cp2k_rules: None,
        }
    }
}

/// The rule tables selected by a [`Settings`].
#[derive(Debug, Clone)]
pub struct RuleTables {
    /// VASP rules.
    pub vasp: Cow<'static, RuleTable>,
    /// CP2K rules.
    pub cp2k: Cow<'static, RuleTable>,
}

impl Settings {
    /// Loads settings from an optional file, then applies environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the file cannot be read or parsed, or an
    /// override is not a number.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let settings = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        settings.with_overrides(|var| std::env::var(var).ok())
    }

    /// Reads settings from a TOML file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Io`] or [`SettingsError::Parse`].
    pub fn from_toml_file(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = toml::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Applies `CALCTYPE_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidEnv`] if a tolerance override is not a
    /// number.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for (var, field) in [
            (ENV_SYMPREC, &mut self.symprec),
            (ENV_LTOL, &mut self.ltol),
            (ENV_STOL, &mut self.stol),
            (ENV_ANGLE_TOL, &mut self.angle_tol),
        ] {
            if let Some(value) = lookup(var) {
                *field = value
                    .trim()
                    .parse()
                    .map_err(|_| SettingsError::InvalidEnv { var, value })?;
            }
        }
        if let Some(path) = lookup(ENV_VASP_RULES) {
            self.vasp_rules = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup(ENV_CP2K_RULES) {
            self.cp2k_rules = Some(PathBuf::from(path));
        }
        Ok(self)
    }

    /// The grouping tolerances.
    #[must_use]
    pub fn tolerances(&self) -> GroupingTolerances {
        GroupingTolerances {
            symprec: self.symprec,
            ltol: self.ltol,
            stol: self.stol,
            angle_tol: self.angle_tol,
        }
    }

    /// Loads the configured rule tables, falling back to the bundled ones.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Rules`] if any table fails to load.
    pub fn rule_tables(&self) -> Result<RuleTables, SettingsError> {
        Ok(RuleTables {
            vasp: load_table(self.vasp_rules.as_deref(), Scheme::VASP, RuleTable::vasp)?,
            cp2k: load_table(self.cp2k_rules.as_deref(), Scheme::CP2K, RuleTable::cp2k)?,
        })
    }
}

fn load_table(
    path: Option<&Path>,
    scheme: Scheme,
    bundled: fn() -> Result<&'static RuleTable, crate::error::RuleTableError>,
) -> Result<Cow<'static, RuleTable>, SettingsError> {
    Ok(match path {
        Some(path) => Cow::Owned(RuleTable::from_path(path, scheme)?),
        None => Cow::Borrowed(bundled()?),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(
            (s.symprec, s.ltol, s.stol, s.angle_tol),
            (0.1, 0.2, 0.3, 5.0)
        );
        assert!(s.vasp_rules.is_none() && s.cp2k_rules.is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() -> Result<(), toml::de::Error> {
        let s: Settings = toml::from_str("ltol = 0.5\nvasp_rules = \"custom.toml\"\n")?;
        assert_eq!(s.ltol, 0.5);
        assert_eq!(s.stol, 0.3);
        assert_eq!(s.vasp_rules, Some(PathBuf::from("custom.toml")));
        Ok(())
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Settings>("tolerance = 1\n").is_err());
    }

    #[test]
    fn environment_overrides_file() -> Result<(), SettingsError> {
        let s = Settings::default().with_overrides(env(&[
            (ENV_SYMPREC, "0.01"),
            (ENV_ANGLE_TOL, " 10 "),
            (ENV_CP2K_RULES, "/etc/cp2k.toml"),
        ]))?;
        assert_eq!(s.symprec, 0.01);
        assert_eq!(s.angle_tol, 10.0);
        assert_eq!(s.cp2k_rules, Some(PathBuf::from("/etc/cp2k.toml")));
        assert_eq!(s.tolerances().angle_tol, 10.0);
        Ok(())
    }

    #[test]
    fn bad_override_is_reported() {
        let err = Settings::default().with_overrides(env(&[(ENV_STOL, "wide")]));
        assert!(matches!(
            err,
            Err(SettingsError::InvalidEnv { var: ENV_STOL, ref value }) if value == "wide"
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Settings::from_toml_file(Path::new("/nonexistent/calctype.toml"));
        assert!(matches!(err, Err(SettingsError::Io { .. })));
    }

    #[test]
    fn bundled_tables_by_default() -> Result<(), SettingsError> {
        let tables = Settings::default().rule_tables()?;
        assert!(matches!(tables.vasp, Cow::Borrowed(_)));
        assert_eq!(tables.cp2k.scheme(), Scheme::CP2K);
        Ok(())
    }

    #[test]
    fn missing_override_table_fails() {
        let settings = Settings {
            vasp_rules: Some(PathBuf::from("/nonexistent/vasp.toml")),
            ..Settings::default()
        };
        assert!(matches!(
            settings.rule_tables(),
            Err(SettingsError::Rules(_))
        ));
    }
}
