//! End-to-end classification through the public API.

use calctype::{cp2k, vasp, CalcType, ClassifyError, Parameters, RuleTable, RuleTableError, Scheme};
use serde_json::{json, Value};

fn params(value: Value) -> Parameters {
    match value {
        Value::Object(map) => map,
        _ => Parameters::new(),
    }
}

// =============================================================================
// Documented scenarios
// =============================================================================

#[test]
fn functional_list_with_custom_table() -> Result<(), Box<dyn std::error::Error>> {
    let table = RuleTable::from_toml_str(
        "functional.toml",
        "[GGA.PBE]\nfunctional = \"PBE\"\n",
        Scheme::VASP,
    );
    // The VASP scheme insists on all four priority classes.
    assert!(matches!(table, Err(RuleTableError::MissingClass { .. })));

    let text = "[HF.PBE0]\nfunctional = \"PBE0\"\n\n[VDW.optB88]\nfunctional = \"OB88\"\n\n\
                [METAGGA.SCAN]\nfunctional = \"SCAN\"\n\n[GGA.PBE]\nfunctional = \"PBE\"\n";
    let table = RuleTable::from_toml_str("functional.toml", text, Scheme::VASP)?;
    let rt = vasp::run_type(&table, &params(json!({"functional": ["PBE"]})));
    assert_eq!(rt.as_str(), "PBE");
    Ok(())
}

#[test]
fn nscf_line_and_uniform() {
    let line = params(json!({
        "incar": {"ICHARG": 11},
        "kpoints": {"labels": ["G", "X", null, "M"]},
    }));
    assert_eq!(
        vasp::task_type(&line).map(|t| t.to_string()).as_deref(),
        Ok("NSCF Line")
    );

    let uniform = params(json!({"incar": {"ICHARG": 11}, "kpoints": {"labels": []}}));
    assert_eq!(
        vasp::task_type(&uniform).map(|t| t.to_string()).as_deref(),
        Ok("NSCF Uniform")
    );
}

#[test]
fn cp2k_geo_opt() {
    let inputs = params(json!({"Run_type": "geo_opt"}));
    assert_eq!(
        cp2k::task_type(&inputs).map(|t| t.to_string()).as_deref(),
        Ok("Structure Optimization")
    );
}

// =============================================================================
// Calc types
// =============================================================================

#[test]
fn vasp_calc_type_round_trips() -> Result<(), Box<dyn std::error::Error>> {
    let table = RuleTable::vasp()?;
    let inputs = params(json!({"incar": {"LEPSILON": true, "IBRION": 8}}));
    let parameters = params(json!({
        "GGA": "PE", "LHFCALC": true, "AEXX": 0.25, "AGGAC": 1.0,
        "AGGAX": 0.75, "ALDAC": 1.0, "HFSCREEN": 0.2, "LDAU": true,
    }));
    let ct = vasp::calc_type(table, &inputs, &parameters)?;
    assert_eq!(ct.to_string(), "HSE06+U DFPT Dielectric");
    assert!(ct.run_type().is_hubbard());
    let parsed = CalcType::<vasp::TaskType>::parse(&ct.to_string(), table);
    assert_eq!(parsed, Ok(ct));
    Ok(())
}

#[test]
fn cp2k_hybrid_with_hubbard() -> Result<(), Box<dyn std::error::Error>> {
    let table = RuleTable::cp2k()?;
    let inputs = params(json!({
        "functional": ["PBE"],
        "hfx": {"FRACTION": 0.25, "Interaction_Potential": "SHORTRANGE"},
        "dft_plus_u": true,
        "Run_type": "ENERGY_FORCE",
    }));
    let ct = cp2k::calc_type(table, &inputs)?.map(|c| c.to_string());
    assert_eq!(ct.as_deref(), Some("HYBRID+U Static"));
    Ok(())
}

#[test]
fn errors_surface_with_context() {
    let inputs = params(json!({"incar": {"ICHARG": 11}, "kpoints": {"labels": "GXM"}}));
    let err = vasp::task_type(&inputs).map_err(|e| e.to_string());
    let expected = "couldn't identify total number of kpt labels: \
                    kpoints.labels must be a list, found \"GXM\"";
    assert_eq!(err, Err(expected.to_owned()));
}

#[test]
fn unknown_names_are_rejected() -> Result<(), RuleTableError> {
    let table = RuleTable::vasp()?;
    assert_eq!(
        table.run_type("B97"),
        Err(ClassifyError::UnknownRunType("B97".into()))
    );
    let cp2k_table = RuleTable::cp2k()?;
    let parse = |label| CalcType::<cp2k::TaskType>::parse(label, cp2k_table);
    assert!(parse("GGA Static").is_ok());
    assert!(parse("GGA Relax").is_err());
    Ok(())
}

// =============================================================================
// Rule-table loading
// =============================================================================

#[test]
fn malformed_tables_are_rejected() {
    let cases = [
        ("not toml", "[GGA"),
        ("class not a table", "GGA = 1\n"),
        ("empty rule", "[GGA.PBE]\n"),
        ("nested table", "[GGA.PBE.X]\nA = 1\n"),
        ("datetime", "[GGA.PBE]\nWHEN = 1979-05-27\n"),
    ];
    for (name, text) in cases {
        assert!(
            RuleTable::from_toml_str(name, text, Scheme::CP2K).is_err(),
            "{name} should not load"
        );
    }
}

#[test]
fn table_files_load_from_disk() -> Result<(), RuleTableError> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("rules/cp2k.toml");
    let table = RuleTable::from_path(&path, Scheme::CP2K)?;
    let bundled = RuleTable::cp2k()?;
    assert_eq!(table.classes(), bundled.classes());
    assert_eq!(table.run_types(), bundled.run_types());
    assert!(table.origin().ends_with("cp2k.toml"));
    Ok(())
}
