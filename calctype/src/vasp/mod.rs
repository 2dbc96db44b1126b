//! VASP calculation classification.
//!
//! ```
//! use calctype::{vasp, Parameters, RuleTable};
//! use serde_json::json;
//!
//! let table = RuleTable::vasp()?;
//! let parameters: Parameters = serde_json::from_value(json!({"GGA": "PE", "LDAU": true}))?;
//! let inputs: Parameters = serde_json::from_value(json!({"incar": {"NSW": 0}}))?;
//!
//! let ct = vasp::calc_type(table, &inputs, &parameters)?;
//! assert_eq!(ct.to_string(), "PBE+U Static");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod task;

pub use task::{task_type, TaskRule, TaskType, VaspInputs, TASK_RULES};

use crate::error::ClassifyError;
use crate::labels::{CalcType, RunType, HUBBARD_SUFFIX};
use crate::params::{normalize, truthy, Parameters};
use crate::rules::RuleTable;

/// Parameter that marks a Hubbard-corrected calculation.
pub const HUBBARD_FLAG: &str = "LDAU";

/// Run type when no rule matches.
pub const FALLBACK_RUN_TYPE: &str = "LDA";

/// Determines the run type from vasprun.xml parameters.
///
/// Classes are tried in the table's priority order; the first special type
/// whose requirements all match names the run type. `LDA` is returned when
/// nothing matches. Either way `+U` is appended when `LDAU` is set.
#[must_use]
pub fn run_type(table: &RuleTable, parameters: &Parameters) -> RunType {
    let params = normalize(parameters);
    let hubbard = truthy(params.get(HUBBARD_FLAG));
    let run_type = table.classify(&params, hubbard).unwrap_or_else(|| {
        let suffix = if hubbard { HUBBARD_SUFFIX } else { "" };
        RunType::new(format!("{FALLBACK_RUN_TYPE}{suffix}"))
    });
    tracing::trace!(%run_type, "classified VASP run type");
    run_type
}

/// Determines the calc type from the inputs and vasprun.xml parameters.
///
/// # Errors
///
/// Propagates errors from [`task_type`].
pub fn calc_type(
    table: &RuleTable,
    inputs: &Parameters,
    parameters: &Parameters,
) -> Result<CalcType<TaskType>, ClassifyError> {
    let rt = run_type(table, parameters);
    let tt = task_type(inputs)?;
    Ok(CalcType::new(rt, tt))
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::error::RuleTableError;

    fn params(value: Value) -> Parameters {
        match value {
            Value::Object(map) => map,
            _ => Parameters::new(),
        }
    }

    fn classify(value: Value) -> Result<String, RuleTableError> {
        Ok(run_type(RuleTable::vasp()?, &params(value)).to_string())
    }

    #[test]
    fn gga_functionals() -> Result<(), RuleTableError> {
        assert_eq!(classify(json!({"GGA": "PE"}))?, "PBE");
        assert_eq!(classify(json!({"GGA": "ps"}))?, "PBEsol");
        assert_eq!(classify(json!({"GGA": " RE "}))?, "revPBE");
        assert_eq!(classify(json!({"GGA": "--"}))?, "GGA");
        Ok(())
    }

    #[test]
    fn hybrid_beats_gga() -> Result<(), RuleTableError> {
        let hse = json!({
            "GGA": "PE", "LHFCALC": true, "AEXX": 0.25, "AGGAC": 1.0,
            "AGGAX": 0.75, "ALDAC": 1.0, "HFSCREEN": 0.2,
        });
        assert_eq!(classify(hse)?, "HSE06");
        let pbe0 = json!({
            "GGA": "PE", "LHFCALC": true, "AEXX": 0.25, "AGGAC": 1,
            "AGGAX": 0.75, "ALDAC": 1, "HFSCREEN": 0,
        });
        assert_eq!(classify(pbe0)?, "PBE0");
        assert_eq!(classify(json!({"GGA": "PE", "LHFCALC": true}))?, "HFCus");
        assert_eq!(classify(json!({"GGA": "PE", "LHFCALC": 1}))?, "HFCus");
        assert_eq!(classify(json!({"GGA": "PE", "LHFCALC": 0}))?, "PBE");
        Ok(())
    }

    #[test]
    fn vdw_beats_metagga() -> Result<(), RuleTableError> {
        let scan_vdw = json!({"METAGGA": "SCAN", "LUSE_VDW": true, "BPARAM": 15.7});
        assert_eq!(classify(scan_vdw)?, "SCAN+rVV10");
        assert_eq!(classify(json!({"METAGGA": "Scan"}))?, "SCAN");
        assert_eq!(
            classify(json!({"METAGGA": "R2SCAN", "GGA": "PE"}))?,
            "r2SCAN"
        );
        Ok(())
    }

    #[test]
    fn lda_fallback_keeps_hubbard() -> Result<(), RuleTableError> {
        assert_eq!(classify(json!({}))?, "LDA");
        assert_eq!(classify(json!({"GGA": "XX", "LDAU": true}))?, "LDA+U");
        Ok(())
    }

    #[test]
    fn hubbard_suffix() -> Result<(), RuleTableError> {
        assert_eq!(classify(json!({"GGA": "PE", "LDAU": true}))?, "PBE+U");
        assert_eq!(classify(json!({"GGA": "PE", "LDAU": false}))?, "PBE");
        Ok(())
    }

    #[test]
    fn results_are_in_the_table_label_set() -> Result<(), RuleTableError> {
        let table = RuleTable::vasp()?;
        let cases = [
            json!({"GGA": "PE"}),
            json!({"LDAU": true}),
            json!({"METAGGA": "TPSS", "LDAU": 1}),
        ];
        for p in cases {
            let rt = run_type(table, &params(p));
            assert_eq!(table.run_type(rt.as_str()), Ok(rt));
        }
        Ok(())
    }

    #[test]
    fn calc_type_joins_halves() -> Result<(), Box<dyn std::error::Error>> {
        let table = RuleTable::vasp()?;
        let inputs = params(json!({"incar": {"ISIF": 3, "IBRION": 2, "NSW": 40}}));
        let parameters = params(json!({"GGA": "PS"}));
        let ct = calc_type(table, &inputs, &parameters)?;
        assert_eq!(ct.to_string(), "PBEsol Structure Optimization");
        assert_eq!(
            ct.to_string(),
            format!("{} {}", run_type(table, &parameters), task_type(&inputs)?)
        );
        Ok(())
    }
}
