//! `calctype-conformance`: validates the VASP and CP2K rule tables.
//!
//! Checks that every rule is reachable, that declaration-ordered classes do
//! not overlap, and that run type and calc type labels are unambiguous.
//!
//! **Usage:**
//! ```text
//! calctype-conformance [--config <toml>]
//! ```
//!
//! Exits non-zero if any conformance check fails.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use calctype::Settings;
use calctype_conformance::{run_all, Severity};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Run the rule-table conformance suite.
#[derive(Parser)]
#[command(
    name = "calctype-conformance",
    about = "Validate calctype rule tables"
)]
struct Args {
    /// Settings file (TOML) selecting the rule tables to check.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref())?;
    let report = run_all(&settings)?;

    println!("calctype Rule Table Conformance Report");
    println!("======================================");
    println!();

    for result in &report.results {
        println!("{result}");
    }

    let failed = report.count(Severity::Failure);
    println!();
    println!(
        "Summary: {} passed, {} warnings, {} failed",
        report.count(Severity::Pass),
        report.count(Severity::Warning),
        failed
    );

    if failed > 0 {
        eprintln!("Conformance FAILED: {failed} check(s) did not pass.");
        process::exit(1);
    }

    println!("Conformance PASSED.");
    Ok(())
}
