//! Run-type rule tables.
//!
//! A rule table maps *functional class* → *special type* → required
//! parameter values. It is written in TOML:
//!
//! ```toml
//! [GGA.PBE]
//! GGA = "PE"
//!
//! [HF.HSE06]
//! LHFCALC = true
//! AEXX = 0.25
//! HFSCREEN = 0.2
//! ```
//!
//! Declaration order is part of the contract: special types are tried in the
//! order they appear, and so are classes unless the [`Scheme`] fixes a
//! priority. The bundled tables are parsed once per process and shared.

use std::path::Path;
use std::sync::OnceLock;

use serde_json::Value;

use crate::error::{ClassifyError, RuleTableError};
use crate::labels::{RunType, HUBBARD_SUFFIX};
use crate::params::{unwrap_singleton, variant_equal, Parameters};

const VASP_RULES: &str = include_str!("../rules/vasp.toml");
const CP2K_RULES: &str = include_str!("../rules/cp2k.toml");

/// Which name a matching rule contributes as the run type label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSource {
    /// The special type, e.g. `HSE06`.
    SpecialType,
    /// The functional class, e.g. `HYBRID`.
    FunctionalClass,
}

/// How a rule table is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheme {
    /// Name of the simulation code.
    pub code: &'static str,
    /// Where run type labels come from.
    pub label: LabelSource,
    /// Fixed class evaluation order. `None` means declaration order.
    pub priority: Option<&'static [&'static str]>,
    /// Run type returned when no rule matches.
    pub fallback: Option<&'static str>,
}

impl Scheme {
    /// VASP: special-type labels, `HF > VDW > METAGGA > GGA`, `LDA` fallback.
    pub const VASP: Scheme = Scheme {
        code: "vasp",
        label: LabelSource::SpecialType,
        priority: Some(&["HF", "VDW", "METAGGA", "GGA"]),
        fallback: Some("LDA"),
    };

    /// CP2K: class labels in declaration order, no fallback.
    pub const CP2K: Scheme = Scheme {
        code: "cp2k",
        label: LabelSource::FunctionalClass,
        priority: None,
        fallback: None,
    };
}

/// One special type: every required parameter must match.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// Special type name.
    pub name: String,
    /// Required parameter values, in declaration order.
    pub requires: Vec<(String, Value)>,
}

impl Rule {
    /// Returns true if every required parameter matches `params`.
    ///
    /// Absent parameters compare as null.
    #[must_use]
    pub fn matches(&self, params: &Parameters) -> bool {
        self.requires.iter().all(|(key, required)| {
            variant_equal(params.get(key).unwrap_or(&Value::Null), required)
        })
    }

    /// Returns the required value for `key`, if this rule constrains it.
    #[must_use]
    pub fn requirement(&self, key: &str) -> Option<&Value> {
        self.requires
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }
}

/// A named group of rules, e.g. `GGA` or `HF`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionalClass {
    /// Class name.
    pub name: String,
    /// Special types in declaration order.
    pub rules: Vec<Rule>,
}

/// A validated, immutable rule table.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTable {
    origin: String,
    scheme: Scheme,
    classes: Vec<FunctionalClass>,
    run_types: Vec<RunType>,
}

impl RuleTable {
    /// Returns the bundled VASP table.
    ///
    /// # Errors
    ///
    /// Returns the load error if the bundled table is malformed. The error is
    /// computed once and returned on every call.
    pub fn vasp() -> Result<&'static RuleTable, RuleTableError> {
        static TABLE: OnceLock<Result<RuleTable, RuleTableError>> = OnceLock::new();
        TABLE
            .get_or_init(|| {
                Self::from_toml_str("rules/vasp.toml", VASP_RULES, Scheme::VASP)
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Returns the bundled CP2K table.
    ///
    /// # Errors
    ///
    /// Returns the load error if the bundled table is malformed.
    pub fn cp2k() -> Result<&'static RuleTable, RuleTableError> {
        static TABLE: OnceLock<Result<RuleTable, RuleTableError>> = OnceLock::new();
        TABLE
            .get_or_init(|| {
                Self::from_toml_str("rules/cp2k.toml", CP2K_RULES, Scheme::CP2K)
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Reads and validates a rule table file.
    ///
    /// # Errors
    ///
    /// Returns [`RuleTableError::Io`] if the file cannot be read, otherwise
    /// any error from [`RuleTable::from_toml_str`].
    pub fn from_path(path: &Path, scheme: Scheme) -> Result<Self, RuleTableError> {
        let text = std::fs::read_to_string(path).map_err(|e| RuleTableError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&path.display().to_string(), &text, scheme)
    }

    /// Parses and validates a rule table.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not TOML, is not shaped
    /// class → special type → requirements, uses unsupported value types,
    /// declares an empty class or rule, or lacks a class named in the
    /// scheme's priority.
    pub fn from_toml_str(
        origin: &str,
        text: &str,
        scheme: Scheme,
    ) -> Result<Self, RuleTableError> {
        let doc = text
            .parse::<toml::Table>()
            .map_err(|e| RuleTableError::Parse {
                origin: origin.to_owned(),
                message: e.message().to_owned(),
            })?;

        let malformed = |reason: String| RuleTableError::Malformed {
            origin: origin.to_owned(),
            reason,
        };

        let mut classes = Vec::with_capacity(doc.len());
        for (class_name, class_value) in &doc {
            let toml::Value::Table(special_types) = class_value else {
                return Err(malformed(format!("class `{class_name}` must be a table")));
            };
            if special_types.is_empty() {
                return Err(malformed(format!(
                    "class `{class_name}` declares no special types"
                )));
            }

            let mut rules = Vec::with_capacity(special_types.len());
            for (rule_name, rule_value) in special_types {
                let toml::Value::Table(requirements) = rule_value else {
                    return Err(malformed(format!(
                        "special type `{class_name}.{rule_name}` must be a table"
                    )));
                };
                if requirements.is_empty() {
                    return Err(malformed(format!(
                        "special type `{class_name}.{rule_name}` has no requirements"
                    )));
                }

                let mut requires = Vec::with_capacity(requirements.len());
                for (param, value) in requirements {
                    let value = required_value(value).ok_or_else(|| {
                        malformed(format!(
                            "`{class_name}.{rule_name}.{param}` has unsupported type {}",
                            value.type_str()
                        ))
                    })?;
                    // Inputs are normalized before matching; requirements must be too.
                    requires.push((param.clone(), unwrap_singleton(&value).clone()));
                }
                rules.push(Rule {
                    name: rule_name.clone(),
                    requires,
                });
            }
            classes.push(FunctionalClass {
                name: class_name.clone(),
                rules,
            });
        }

        for &class in scheme.priority.unwrap_or_default() {
            if !classes.iter().any(|c| c.name == class) {
                return Err(RuleTableError::MissingClass {
                    origin: origin.to_owned(),
                    class: class.to_owned(),
                });
            }
        }

        let run_types = collect_run_types(&classes, &scheme);
        tracing::debug!(
            origin,
            code = scheme.code,
            classes = classes.len(),
            rules = classes.iter().map(|c| c.rules.len()).sum::<usize>(),
            run_types = run_types.len(),
            "loaded run type rule table"
        );

        Ok(Self {
            origin: origin.to_owned(),
            scheme,
            classes,
            run_types,
        })
    }

    /// Where the table was loaded from.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The evaluation scheme.
    #[must_use]
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Classes in declaration order.
    #[must_use]
    pub fn classes(&self) -> &[FunctionalClass] {
        &self.classes
    }

    /// Looks a class up by name.
    #[must_use]
    pub fn class(&self, name: &str) -> Option<&FunctionalClass> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Classes in the order rules are evaluated.
    pub fn evaluation_order(&self) -> impl Iterator<Item = &FunctionalClass> + '_ {
        let ordered: Vec<&FunctionalClass> = match self.scheme.priority {
            Some(names) => names.iter().filter_map(|name| self.class(name)).collect(),
            None => self.classes.iter().collect(),
        };
        ordered.into_iter()
    }

    /// Every `(class, rule)` pair in evaluation order.
    pub fn rules(&self) -> impl Iterator<Item = (&FunctionalClass, &Rule)> + '_ {
        self.evaluation_order()
            .flat_map(|class| class.rules.iter().map(move |rule| (class, rule)))
    }

    /// The first rule in evaluation order whose requirements all match.
    #[must_use]
    pub fn first_match(&self, params: &Parameters) -> Option<(&FunctionalClass, &Rule)> {
        self.rules().find(|(_, rule)| rule.matches(params))
    }

    /// The label a matching rule contributes under this table's scheme.
    #[must_use]
    pub fn label<'a>(&self, class: &'a FunctionalClass, rule: &'a Rule) -> &'a str {
        match self.scheme.label {
            LabelSource::SpecialType => &rule.name,
            LabelSource::FunctionalClass => &class.name,
        }
    }

    /// Every run type this table can produce.
    #[must_use]
    pub fn run_types(&self) -> &[RunType] {
        &self.run_types
    }

    /// Looks a run type up by name.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::UnknownRunType`] for names outside
    /// [`RuleTable::run_types`].
    pub fn run_type(&self, name: &str) -> Result<RunType, ClassifyError> {
        self.run_types
            .iter()
            .find(|rt| rt.as_str() == name)
            .cloned()
            .ok_or_else(|| ClassifyError::UnknownRunType(name.to_owned()))
    }

    /// Classifies already-normalized parameters: first match plus the
    /// Hubbard suffix, else the fallback, else `None`.
    pub(crate) fn classify(&self, params: &Parameters, hubbard: bool) -> Option<RunType> {
        let suffix = if hubbard { HUBBARD_SUFFIX } else { "" };
        let label = match self.first_match(params) {
            Some((class, rule)) => {
                tracing::trace!(class = %class.name, rule = %rule.name, "run type rule matched");
                self.label(class, rule)
            }
            None => self.scheme.fallback?,
        };
        Some(RunType::new(format!("{label}{suffix}")))
    }
}

fn required_value(value: &toml::Value) -> Option<Value> {
    match value {
        toml::Value::String(s) => Some(Value::String(s.clone())),
        toml::Value::Integer(i) => Some(Value::from(*i)),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number),
        toml::Value::Boolean(b) => Some(Value::Bool(*b)),
        toml::Value::Array(items) => items
            .iter()
            .map(required_value)
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
        toml::Value::Datetime(_) | toml::Value::Table(_) => None,
    }
}

fn collect_run_types(classes: &[FunctionalClass], scheme: &Scheme) -> Vec<RunType> {
    let mut labels: Vec<&str> = Vec::new();
    for class in classes {
        match scheme.label {
            LabelSource::SpecialType => labels.extend(class.rules.iter().map(|r| r.name.as_str())),
            LabelSource::FunctionalClass => labels.push(&class.name),
        }
    }
    let mut seen = std::collections::HashSet::new();
    labels.retain(|label| seen.insert(*label));

    let plain = labels.iter().map(|l| (*l).to_owned());
    let hubbard = labels.iter().map(|l| format!("{l}{HUBBARD_SUFFIX}"));
    let fallback = scheme
        .fallback
        .into_iter()
        .flat_map(|f| [f.to_owned(), format!("{f}{HUBBARD_SUFFIX}")]);

    plain
        .chain(hubbard)
        .chain(fallback)
        .map(RunType::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn params(value: Value) -> Parameters {
        match value {
            Value::Object(map) => map,
            _ => Parameters::new(),
        }
    }

    const SMALL: &str = r#"
[GGA.PBE]
GGA = "PE"

[HF.PBE0]
LHFCALC = true
AEXX = 0.25

[METAGGA.SCAN]
METAGGA = "SCAN"

[VDW.optB88]
GGA = "BO"
LUSE_VDW = true
"#;

    #[test]
    fn bundled_tables_load() -> Result<(), RuleTableError> {
        let vasp = RuleTable::vasp()?;
        assert_eq!(vasp.scheme(), Scheme::VASP);
        assert!(vasp.class("GGA").is_some());
        let cp2k = RuleTable::cp2k()?;
        assert_eq!(cp2k.scheme(), Scheme::CP2K);
        assert!(std::ptr::eq(vasp, RuleTable::vasp()?));
        Ok(())
    }

    #[test]
    fn declaration_order_is_preserved() -> Result<(), RuleTableError> {
        let table = RuleTable::from_toml_str("small", SMALL, Scheme::CP2K)?;
        let names: Vec<_> = table.classes().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["GGA", "HF", "METAGGA", "VDW"]);
        let order: Vec<_> = table.evaluation_order().map(|c| c.name.as_str()).collect();
        assert_eq!(order, ["GGA", "HF", "METAGGA", "VDW"]);
        Ok(())
    }

    #[test]
    fn priority_overrides_declaration_order() -> Result<(), RuleTableError> {
        let table = RuleTable::from_toml_str("small", SMALL, Scheme::VASP)?;
        let order: Vec<_> = table.evaluation_order().map(|c| c.name.as_str()).collect();
        assert_eq!(order, ["HF", "VDW", "METAGGA", "GGA"]);
        Ok(())
    }

    #[test]
    fn run_type_set_includes_hubbard_and_fallback() -> Result<(), RuleTableError> {
        let table = RuleTable::from_toml_str("small", SMALL, Scheme::VASP)?;
        let names: Vec<_> = table.run_types().iter().map(RunType::as_str).collect();
        assert_eq!(
            names,
            [
                "PBE", "PBE0", "SCAN", "optB88", "PBE+U", "PBE0+U", "SCAN+U", "optB88+U", "LDA",
                "LDA+U",
            ]
        );
        assert_eq!(
            table.run_type("SCAN+U").map(|r| r.to_string()),
            Ok("SCAN+U".into())
        );
        assert_eq!(
            table.run_type("B3LYP"),
            Err(ClassifyError::UnknownRunType("B3LYP".into()))
        );
        Ok(())
    }

    #[test]
    fn class_labels_for_cp2k_scheme() -> Result<(), RuleTableError> {
        let table = RuleTable::from_toml_str("small", SMALL, Scheme::CP2K)?;
        let names: Vec<_> = table.run_types().iter().map(RunType::as_str).collect();
        assert_eq!(
            names,
            [
                "GGA",
                "HF",
                "METAGGA",
                "VDW",
                "GGA+U",
                "HF+U",
                "METAGGA+U",
                "VDW+U",
            ]
        );
        Ok(())
    }

    #[test]
    fn rule_matching_requires_every_parameter() -> Result<(), RuleTableError> {
        let table = RuleTable::from_toml_str("small", SMALL, Scheme::VASP)?;
        let vdw = params(json!({"GGA": "bo", "LUSE_VDW": true}));
        assert_eq!(
            table.classify(&vdw, false).map(|r| r.to_string()),
            Some("optB88".into())
        );
        let partial = params(json!({"GGA": "BO"}));
        assert_eq!(
            table.classify(&partial, true).map(|r| r.to_string()),
            Some("LDA+U".into())
        );
        Ok(())
    }

    #[test]
    fn singleton_requirements_are_unwrapped() -> Result<(), RuleTableError> {
        let text = "[GGA.PBE]\nFUNCTIONAL = [\"PBE\"]\n\n\
                    [HYBRID.B3LYP]\nFUNCTIONAL = [\"B3LYP\", \"HF\"]\n";
        let table = RuleTable::from_toml_str("singleton", text, Scheme::CP2K)?;
        let pbe = table.class("GGA").map(|c| c.rules[0].requires.clone());
        assert_eq!(pbe, Some(vec![("FUNCTIONAL".into(), json!("PBE"))]));
        let b3lyp = table.class("HYBRID").map(|c| c.rules[0].requires.clone());
        assert_eq!(
            b3lyp,
            Some(vec![("FUNCTIONAL".into(), json!(["B3LYP", "HF"]))])
        );
        Ok(())
    }

    #[test]
    fn rejects_bad_toml() {
        let err = RuleTable::from_toml_str("bad", "[GGA.PBE\nGGA=", Scheme::CP2K);
        assert!(matches!(err, Err(RuleTableError::Parse { .. })));
    }

    #[test]
    fn rejects_non_table_class() {
        let err = RuleTable::from_toml_str("bad", "GGA = 3\n", Scheme::CP2K);
        assert!(matches!(err, Err(RuleTableError::Malformed { .. })));
    }

    #[test]
    fn rejects_empty_rule() {
        let err = RuleTable::from_toml_str("bad", "[GGA.PBE]\n", Scheme::CP2K);
        assert!(matches!(
            err,
            Err(RuleTableError::Malformed { ref reason, .. }) if reason.contains("no requirements")
        ));
    }

    #[test]
    fn rejects_datetime_requirement() {
        let err = RuleTable::from_toml_str("bad", "[GGA.PBE]\nDATE = 1979-05-27\n", Scheme::CP2K);
        assert!(matches!(
            err,
            Err(RuleTableError::Malformed { ref reason, .. }) if reason.contains("datetime")
        ));
    }

    #[test]
    fn rejects_missing_priority_class() {
        let err = RuleTable::from_toml_str("bad", "[GGA.PBE]\nGGA = \"PE\"\n", Scheme::VASP);
        assert_eq!(
            err,
            Err(RuleTableError::MissingClass {
                origin: "bad".into(),
                class: "HF".into()
            })
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = RuleTable::from_path(Path::new("/nonexistent/rules.toml"), Scheme::VASP);
        assert!(matches!(err, Err(RuleTableError::Io { .. })));
    }
}
