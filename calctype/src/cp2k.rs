//! CP2K calculation classification.
//!
//! CP2K inputs arrive as a single mapping holding the DFT section summary
//! (`functional`, `hfx`, `dft_plus_u`) and the global `Run_type`.

use serde_json::Value;

use crate::error::ClassifyError;
use crate::labels::{task_type_enum, CalcType, RunType};
use crate::params::{invalid, normalize, truthy, unwrap_singleton, Parameters};
use crate::rules::RuleTable;

/// Parameter that marks a Hubbard-corrected calculation.
pub const HUBBARD_FLAG: &str = "dft_plus_u";

task_type_enum! {
    /// What a CP2K calculation computed, from its global `RUN_TYPE`.
    TaskType {
        /// `ENERGY`, `ENERGY_FORCE`, or wavefunction optimization.
        Static => "Static",
        /// Geometry or cell optimization.
        StructureOptimization => "Structure Optimization",
        /// Nudged elastic band and related band methods.
        Band => "Band",
        /// Molecular dynamics.
        MolecularDynamics => "Molecular Dynamics",
        /// Monte Carlo sampling.
        MonteCarlo => "Monte Carlo",
        /// Linear response properties.
        LinearResponse => "Linear Response",
        /// Vibrational analysis or normal modes.
        VibrationalAnalysis => "Vibrational Analysis",
        /// Electronic excitation spectra.
        ElectronicSpectra => "Electronic Spectra",
        /// Non-equilibrium Green's function transport.
        Negf => "Non-equilibrium Green's Function",
        /// Path integral molecular dynamics.
        PathIntegral => "Path Integral",
        /// Real-time propagation or Ehrenfest dynamics.
        RealTimePropagation => "Real-time propagation",
        /// Basis set superposition error correction.
        Bsse => "Base set superposition error",
        /// Debug runs.
        Debug => "Debug analysis",
        /// `RUN_TYPE NONE`.
        None => "None",
        /// No group matched.
        Unrecognized => "",
    }
}

/// `RUN_TYPE` keywords for each task type, tried in order.
pub const TASK_GROUPS: &[(&[&str], TaskType)] = &[
    (
        &[
            "ENERGY",
            "ENERGY_FORCE",
            "WAVEFUNCTION_OPTIMIZATION",
            "WFN_OPT",
        ],
        TaskType::Static,
    ),
    (
        &["GEO_OPT", "GEOMETRY_OPTIMIZATION", "CELL_OPT"],
        TaskType::StructureOptimization,
    ),
    (&["BAND"], TaskType::Band),
    (&["MOLECULAR_DYNAMICS", "MD"], TaskType::MolecularDynamics),
    (&["MONTE_CARLO", "MC", "TMC", "TAMC"], TaskType::MonteCarlo),
    (&["LINEAR_RESPONSE", "LR"], TaskType::LinearResponse),
    (
        &["VIBRATIONAL_ANALYSIS", "NORMAL_MODES"],
        TaskType::VibrationalAnalysis,
    ),
    (
        &["ELECTRONIC_SPECTRA", "SPECTRA"],
        TaskType::ElectronicSpectra,
    ),
    (&["NEGF"], TaskType::Negf),
    (&["PINT", "DRIVER"], TaskType::PathIntegral),
    (
        &["RT_PROPAGATION", "EHRENFEST_DYN"],
        TaskType::RealTimePropagation,
    ),
    (&["BSSE"], TaskType::Bsse),
    (&["DEBUG"], TaskType::Debug),
    (&["NONE"], TaskType::None),
];

/// Builds the rule-matching parameters from a CP2K DFT summary.
///
/// `FUNCTIONAL` is the functional list (unwrapped when it has one entry),
/// `INTERACTION_POTENTIAL` and `FRACTION` come from the `hfx` section, with
/// `FRACTION` defaulting to 0.
#[must_use]
pub fn rule_parameters(dft: &Parameters) -> Parameters {
    let hfx = match dft.get("hfx") {
        Some(Value::Object(hfx)) => Some(hfx),
        _ => None,
    };
    let hfx_value = |key: &str| hfx.and_then(|h| h.get(key)).cloned();

    let mut params = Parameters::new();
    params.insert(
        "FUNCTIONAL".to_owned(),
        dft.get("functional")
            .map(|f| unwrap_singleton(f).clone())
            .unwrap_or(Value::Null),
    );
    params.insert(
        "INTERACTION_POTENTIAL".to_owned(),
        hfx_value("Interaction_Potential").unwrap_or(Value::Null),
    );
    params.insert(
        "FRACTION".to_owned(),
        hfx_value("FRACTION").unwrap_or_else(|| Value::from(0)),
    );
    normalize(&params)
}

/// Determines the run type from a CP2K DFT summary.
///
/// Classes are tried in the table's declaration order and a match is labelled
/// with its class, plus `+U` when `dft_plus_u` is set. Returns `None` when no
/// rule matches: the calculation is unclassified.
#[must_use]
pub fn run_type(table: &RuleTable, dft: &Parameters) -> Option<RunType> {
    let hubbard = truthy(dft.get(HUBBARD_FLAG));
    let run_type = table.classify(&rule_parameters(dft), hubbard);
    match &run_type {
        Some(rt) => tracing::trace!(run_type = %rt, "classified CP2K run type"),
        None => tracing::debug!("no CP2K run type rule matched"),
    }
    run_type
}

/// Determines the task type from the CP2K global `Run_type`.
///
/// # Errors
///
/// Returns [`ClassifyError::InvalidParameter`] if `Run_type` is not a string.
pub fn task_type(inputs: &Parameters) -> Result<TaskType, ClassifyError> {
    let keyword = match inputs.get("Run_type") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.to_uppercase(),
        Some(other) => return Err(invalid("Run_type", "a string", other)),
    };
    let task = TASK_GROUPS
        .iter()
        .find(|(keywords, _)| keywords.contains(&keyword.as_str()))
        .map_or(TaskType::Unrecognized, |&(_, task)| task);
    tracing::trace!(%keyword, %task, "classified CP2K task type");
    Ok(task)
}

/// Determines the calc type of a CP2K calculation.
///
/// Returns `Ok(None)` when the run type is unclassified.
///
/// # Errors
///
/// Propagates errors from [`task_type`].
pub fn calc_type(
    table: &RuleTable,
    inputs: &Parameters,
) -> Result<Option<CalcType<TaskType>>, ClassifyError> {
    let tt = task_type(inputs)?;
    Ok(run_type(table, inputs).map(|rt| CalcType::new(rt, tt)))
}
