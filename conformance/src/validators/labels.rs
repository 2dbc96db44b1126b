//! Label-set consistency: run types resolve, and every calc type label
//! parses back to the pair that produced it.

use std::collections::HashSet;

use calctype::{CalcType, RuleTable, TaskLabel};

use crate::report::{ConformanceReport, TestResult};

const RUN_TYPES: &str = "labels/run-types";
const CALC_TYPES: &str = "labels/calc-types";

/// Checks the run type and calc type label sets of `table` against the task
/// labels `T`.
#[must_use]
pub fn validate<T: TaskLabel>(table: &RuleTable) -> ConformanceReport {
    let mut report = ConformanceReport::new();
    check_run_types(table, &mut report);
    check_calc_types::<T>(table, &mut report);
    report
}

fn check_run_types(table: &RuleTable, report: &mut ConformanceReport) {
    let origin = table.origin();
    let mut details = Vec::new();
    let mut seen = HashSet::new();

    for rt in table.run_types() {
        if !seen.insert(rt.as_str()) {
            details.push(format!("{rt} is listed twice"));
        }
        if table.run_type(rt.as_str()).as_ref() != Ok(rt) {
            details.push(format!("{rt} does not resolve"));
        }
    }
    if let Some(fallback) = table.scheme().fallback {
        if table.run_type(fallback).is_err() {
            details.push(format!("fallback {fallback} is not a run type"));
        }
    }

    report.push(if details.is_empty() {
        TestResult::pass(
            RUN_TYPES,
            origin,
            format!("{} run types resolve", table.run_types().len()),
        )
    } else {
        TestResult::fail(RUN_TYPES, origin, "inconsistent run type set").with_details(details)
    });
}

fn check_calc_types<T: TaskLabel>(table: &RuleTable, report: &mut ConformanceReport) {
    let origin = table.origin();
    let mut checked = 0usize;
    let mut details = Vec::new();

    for ct in CalcType::<T>::all(table) {
        checked += 1;
        let label = ct.to_string();
        match CalcType::<T>::parse(&label, table) {
            Ok(parsed) if parsed == ct => {}
            Ok(parsed) => details.push(format!(
                "`{label}` parses as {} / {:?}",
                parsed.run_type(),
                parsed.task_type()
            )),
            Err(err) => details.push(err.to_string()),
        }
    }

    report.push(if details.is_empty() {
        TestResult::pass(
            CALC_TYPES,
            origin,
            format!("{checked} calc type labels round-trip"),
        )
    } else {
        TestResult::fail(
            CALC_TYPES,
            origin,
            format!("{} ambiguous calc type label(s)", details.len()),
        )
        .with_details(details)
    });
}

#[cfg(test)]
mod tests {
    use calctype::{cp2k, vasp, RuleTableError, Scheme};

    use super::*;

    #[test]
    fn bundled_label_sets_are_consistent() -> Result<(), RuleTableError> {
        assert!(validate::<vasp::TaskType>(RuleTable::vasp()?).all_passed());
        assert!(validate::<cp2k::TaskType>(RuleTable::cp2k()?).all_passed());
        Ok(())
    }

    #[test]
    fn run_type_ending_in_task_word_is_ambiguous() -> Result<(), RuleTableError> {
        // "PBE DFPT Dielectric" reads as both PBE / DFPT Dielectric and
        // PBE DFPT / Dielectric.
        let text = "[HF.PBE0]\nLHFCALC = true\n\n[VDW.optB88]\nLUSE_VDW = true\n\n\
                    [METAGGA.SCAN]\nMETAGGA = \"SCAN\"\n\n[GGA.PBE]\nGGA = \"PE\"\n\n\
                    [GGA.\"PBE DFPT\"]\nGGA = \"PD\"\n";
        let table = RuleTable::from_toml_str("ambiguous", text, Scheme::VASP)?;
        let report = validate::<vasp::TaskType>(&table);
        assert!(!report.all_passed());
        let failed: Vec<_> = report.results.iter().filter(|r| r.is_failure()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].validator, CALC_TYPES);
        Ok(())
    }
}
