//! VASP task types.
//!
//! The decision order is the [`TASK_RULES`] list: the first rule whose
//! predicate holds supplies the label, and no later rule is consulted.

use serde_json::Value;

use crate::error::{ClassifyError, KpointLabelError};
use crate::labels::task_type_enum;
use crate::params::{self, truthy, Parameters};

task_type_enum! {
    /// What a VASP calculation computed.
    TaskType {
        /// Non-self-consistent band structure along a labelled k-point path.
        NscfLine => "NSCF Line",
        /// Non-self-consistent run on a uniform k-point mesh.
        NscfUniform => "NSCF Uniform",
        /// Dielectric response without ionic perturbation.
        Dielectric => "Dielectric",
        /// Density functional perturbation theory.
        Dfpt => "DFPT",
        /// Dielectric response computed with DFPT.
        DfptDielectric => "DFPT Dielectric",
        /// NMR chemical shielding.
        NmrNuclearShielding => "NMR Nuclear Shielding",
        /// NMR electric field gradient.
        NmrElectricFieldGradient => "NMR Electric Field Gradient",
        /// Single-point calculation with no ionic steps.
        Static => "Static",
        /// Full relaxation of ions and cell.
        StructureOptimization => "Structure Optimization",
        /// Ionic relaxation at fixed cell shape and volume.
        Deformation => "Deformation",
        /// No task rule applied.
        Unrecognized => "",
    }
}

/// The INCAR and KPOINTS sections of a VASP inputs mapping.
#[derive(Debug, Clone, Copy)]
pub struct VaspInputs<'a> {
    incar: Option<&'a Parameters>,
    kpoints: Option<&'a Value>,
}

impl<'a> VaspInputs<'a> {
    /// Views an inputs mapping with `incar` and `kpoints` entries.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::InvalidParameter`] if `incar` is present but
    /// not an object.
    pub fn new(inputs: &'a Parameters) -> Result<Self, ClassifyError> {
        Ok(Self {
            incar: params::section(inputs, "incar")?,
            kpoints: inputs.get("kpoints"),
        })
    }

    /// Numeric INCAR flag with a default for absent keys.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::InvalidParameter`] for non-numeric values.
    pub fn number(&self, key: &str, default: f64) -> Result<f64, ClassifyError> {
        match self.incar {
            Some(incar) => params::number(incar, key, default),
            None => Ok(default),
        }
    }

    /// Boolean INCAR flag; absent keys are false.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        truthy(self.incar.and_then(|incar| incar.get(key)))
    }

    /// Number of non-null k-point labels.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::KpointLabels`] when `kpoints` is not an object
    /// or its `labels` entry is not a list.
    pub fn kpoint_label_count(&self) -> Result<usize, ClassifyError> {
        Ok(count_kpoint_labels(self.kpoints)?)
    }
}

fn count_kpoint_labels(kpoints: Option<&Value>) -> Result<usize, KpointLabelError> {
    if !truthy(kpoints) {
        return Ok(0);
    }
    let labels = match kpoints {
        Some(Value::Object(kpoints)) => kpoints.get("labels"),
        Some(other) => return Err(KpointLabelError::NotAnObject(other.to_string())),
        None => None,
    };
    if !truthy(labels) {
        return Ok(0);
    }
    match labels {
        Some(Value::Array(labels)) => Ok(labels.iter().filter(|l| !l.is_null()).count()),
        Some(other) => Err(KpointLabelError::NotAList(other.to_string())),
        None => Ok(0),
    }
}

/// One entry of the VASP task decision list.
#[derive(Clone, Copy)]
pub struct TaskRule {
    /// Short rule identifier.
    pub name: &'static str,
    /// Whether the rule applies.
    pub applies: fn(&VaspInputs<'_>) -> Result<bool, ClassifyError>,
    /// Resolves the label, including any secondary split (line vs uniform
    /// mesh, plain vs DFPT dielectric).
    pub label: fn(&VaspInputs<'_>) -> Result<TaskType, ClassifyError>,
}

/// The VASP task decisions, highest priority first.
pub static TASK_RULES: &[TaskRule] = &[
    TaskRule {
        name: "nscf",
        applies: |i| Ok(i.number("ICHARG", 0.0)? > 10.0),
        label: |i| {
            Ok(if i.kpoint_label_count()? > 0 {
                TaskType::NscfLine
            } else {
                TaskType::NscfUniform
            })
        },
    },
    TaskRule {
        name: "dielectric",
        applies: |i| Ok(i.flag("LEPSILON")),
        label: |i| {
            Ok(if i.number("IBRION", 0.0)? > 6.0 {
                TaskType::DfptDielectric
            } else {
                TaskType::Dielectric
            })
        },
    },
    TaskRule {
        name: "dfpt",
        applies: |i| Ok(i.number("IBRION", 0.0)? > 6.0),
        label: |_| Ok(TaskType::Dfpt),
    },
    TaskRule {
        name: "nmr_shielding",
        applies: |i| Ok(i.flag("LCHIMAG")),
        label: |_| Ok(TaskType::NmrNuclearShielding),
    },
    TaskRule {
        name: "nmr_efg",
        applies: |i| Ok(i.flag("LEFG")),
        label: |_| Ok(TaskType::NmrElectricFieldGradient),
    },
    TaskRule {
        name: "static",
        applies: |i| Ok(i.number("NSW", 1.0)? == 0.0),
        label: |_| Ok(TaskType::Static),
    },
    TaskRule {
        name: "structure_optimization",
        applies: |i| {
            let isif = i.number("ISIF", 2.0)?;
            Ok(isif == 3.0 && i.number("IBRION", 0.0)? > 0.0)
        },
        label: |_| Ok(TaskType::StructureOptimization),
    },
    TaskRule {
        name: "deformation",
        applies: |i| {
            let isif = i.number("ISIF", 3.0)?;
            Ok(isif == 2.0 && i.number("IBRION", 0.0)? > 0.0)
        },
        label: |_| Ok(TaskType::Deformation),
    },
];

/// Determines the task type of a VASP calculation.
///
/// `inputs` holds an `incar` object and optionally a `kpoints` object with a
/// `labels` list; other entries are ignored.
///
/// # Errors
///
/// Returns [`ClassifyError::KpointLabels`] if a non-self-consistent run has
/// unreadable k-point labels, or [`ClassifyError::InvalidParameter`] for
/// INCAR flags of the wrong type.
pub fn task_type(inputs: &Parameters) -> Result<TaskType, ClassifyError> {
    let view = VaspInputs::new(inputs)?;
    for rule in TASK_RULES {
        if (rule.applies)(&view)? {
            let task = (rule.label)(&view)?;
            tracing::trace!(rule = rule.name, %task, "VASP task rule matched");
            return Ok(task);
        }
    }
    Ok(TaskType::Unrecognized)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn inputs(value: Value) -> Parameters {
        match value {
            Value::Object(map) => map,
            _ => Parameters::new(),
        }
    }

    #[test]
    fn rule_order_is_fixed() {
        let names: Vec<_> = TASK_RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            [
                "nscf",
                "dielectric",
                "dfpt",
                "nmr_shielding",
                "nmr_efg",
                "static",
                "structure_optimization",
                "deformation",
            ]
        );
    }

    #[test]
    fn nscf_line_counts_non_null_labels() {
        let i = inputs(json!({
            "incar": {"ICHARG": 11},
            "kpoints": {"labels": ["G", "X", null, "M"]},
        }));
        assert_eq!(task_type(&i), Ok(TaskType::NscfLine));
    }

    #[test]
    fn nscf_uniform_without_labels() {
        let empty = inputs(json!({"incar": {"ICHARG": 11}, "kpoints": {"labels": []}}));
        assert_eq!(task_type(&empty), Ok(TaskType::NscfUniform));
        let nulls = inputs(json!({"incar": {"ICHARG": 11}, "kpoints": {"labels": [null, null]}}));
        assert_eq!(task_type(&nulls), Ok(TaskType::NscfUniform));
        let missing = inputs(json!({"incar": {"ICHARG": 11}}));
        assert_eq!(task_type(&missing), Ok(TaskType::NscfUniform));
    }

    #[test]
    fn bad_kpoint_labels_are_wrapped() {
        let i = inputs(json!({"incar": {"ICHARG": 12}, "kpoints": {"labels": 5}}));
        assert_eq!(
            task_type(&i),
            Err(ClassifyError::KpointLabels {
                source: KpointLabelError::NotAList("5".into())
            })
        );
        let i = inputs(json!({"incar": {"ICHARG": 12}, "kpoints": "line"}));
        assert!(matches!(
            task_type(&i),
            Err(ClassifyError::KpointLabels { .. })
        ));
    }

    #[test]
    fn kpoint_labels_only_read_for_nscf() {
        let i = inputs(json!({"incar": {"NSW": 0}, "kpoints": {"labels": 5}}));
        assert_eq!(task_type(&i), Ok(TaskType::Static));
    }

    #[test]
    fn dielectric_variants() {
        let plain = inputs(json!({"incar": {"LEPSILON": true}}));
        assert_eq!(task_type(&plain), Ok(TaskType::Dielectric));
        let dfpt = inputs(json!({"incar": {"LEPSILON": true, "IBRION": 8}}));
        assert_eq!(task_type(&dfpt), Ok(TaskType::DfptDielectric));
        assert_eq!(TaskType::DfptDielectric.to_string(), "DFPT Dielectric");
    }

    #[test]
    fn dfpt_without_dielectric() {
        let i = inputs(json!({"incar": {"IBRION": 7, "NSW": 0}}));
        assert_eq!(task_type(&i), Ok(TaskType::Dfpt));
    }

    #[test]
    fn nmr_flags() {
        let cs = inputs(json!({"incar": {"LCHIMAG": true, "LEFG": true}}));
        assert_eq!(task_type(&cs), Ok(TaskType::NmrNuclearShielding));
        let efg = inputs(json!({"incar": {"LEFG": true}}));
        assert_eq!(task_type(&efg), Ok(TaskType::NmrElectricFieldGradient));
    }

    #[test]
    fn static_wins_over_relaxation_flags() {
        let i = inputs(json!({"incar": {"NSW": 0, "ISIF": 3, "IBRION": 2}}));
        assert_eq!(task_type(&i), Ok(TaskType::Static));
    }

    #[test]
    fn relaxations() {
        let opt = inputs(json!({"incar": {"NSW": 99, "ISIF": 3, "IBRION": 2}}));
        assert_eq!(task_type(&opt), Ok(TaskType::StructureOptimization));
        let deform = inputs(json!({"incar": {"NSW": 99, "ISIF": 2, "IBRION": 2}}));
        assert_eq!(task_type(&deform), Ok(TaskType::Deformation));
        let default_isif = inputs(json!({"incar": {"NSW": 99, "IBRION": 1}}));
        assert_eq!(task_type(&default_isif), Ok(TaskType::Unrecognized));
    }

    #[test]
    fn defaults_to_unrecognized() {
        assert_eq!(task_type(&Parameters::new()), Ok(TaskType::Unrecognized));
        assert_eq!(TaskType::Unrecognized.to_string(), "");
    }

    #[test]
    fn wrongly_typed_flags_fail() {
        let i = inputs(json!({"incar": {"ICHARG": "eleven"}}));
        assert!(matches!(
            task_type(&i),
            Err(ClassifyError::InvalidParameter { ref key, .. }) if key == "ICHARG"
        ));
        let i = inputs(json!({"incar": [1, 2]}));
        assert!(matches!(
            task_type(&i),
            Err(ClassifyError::InvalidParameter { ref key, .. }) if key == "incar"
        ));
    }
}
