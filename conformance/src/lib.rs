//! Conformance checks for calctype rule tables.
//!
//! A rule table is data, so mistakes in it are silent: a rule placed after a
//! more general one never fires, and a run type name that ends in a task
//! word makes calc type labels ambiguous. This crate finds both.
//!
//! | Validator | Failure | Warning |
//! |-----------|---------|---------|
//! | `rules/shadowing` | a rule is unreachable | |
//! | `rules/overlap` | | rules in different classes can both match (declaration-ordered tables only) |
//! | `rules/duplicate-labels` | | two special types share a name |
//! | `labels/run-types` | a run type does not resolve | |
//! | `labels/calc-types` | a calc type label parses to a different pair | |
//!
//! # Entry Point
//!
//! ```no_run
//! use calctype::Settings;
//!
//! let report = calctype_conformance::run_all(&Settings::load(None)?)?;
//! assert!(report.all_passed());
//! # Ok::<(), anyhow::Error>(())
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod report;
pub mod validators;

use anyhow::Context;
use calctype::{cp2k, vasp, RuleTables, Settings};

pub use report::{ConformanceReport, Severity, TestResult};

/// Loads the rule tables selected by `settings` and validates them.
///
/// # Errors
///
/// Returns an error if a rule table cannot be loaded.
pub fn run_all(settings: &Settings) -> anyhow::Result<ConformanceReport> {
    let tables = settings
        .rule_tables()
        .context("failed to load rule tables")?;
    Ok(check_tables(&tables))
}

/// Validates already-loaded rule tables.
///
/// Validators run per table, VASP first:
/// 1. Rule reachability and overlap
/// 2. Run type and calc type labels
#[must_use]
pub fn check_tables(tables: &RuleTables) -> ConformanceReport {
    let mut report = ConformanceReport::new();

    report.extend(validators::rules::validate(&tables.vasp));
    report.extend(validators::labels::validate::<vasp::TaskType>(&tables.vasp));

    report.extend(validators::rules::validate(&tables.cp2k));
    report.extend(validators::labels::validate::<cp2k::TaskType>(&tables.cp2k));

    tracing::debug!(
        results = report.results.len(),
        failures = report.count(Severity::Failure),
        "conformance checks finished"
    );
    report
}
