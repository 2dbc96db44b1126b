//! `calctype`: classifies VASP and CP2K calculations.
//!
//! **Usage:**
//! ```text
//! calctype [--config <toml>] vasp --inputs <json> [--parameters <json>] [--json]
//! calctype [--config <toml>] cp2k --inputs <json> [--json]
//! calctype [--config <toml>] run-types <vasp|cp2k>
//! ```
//!
//! JSON arguments are file paths; `-` reads standard input. Logs go to
//! stderr and are filtered with `RUST_LOG`.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use calctype::{
    cp2k, jsanitize, vasp, CalcType, Parameters, Raw, RunType, SanitizeOptions, Settings,
    TaskLabel, ValueEnum,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Classify VASP and CP2K calculations.
#[derive(Parser)]
#[command(
    name = "calctype",
    about = "Classify VASP and CP2K calculations by run type, task type, and calc type"
)]
struct Args {
    /// Settings file (TOML). Environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a VASP calculation.
    Vasp {
        /// Inputs JSON with an `incar` object and optional `kpoints`.
        #[arg(long)]
        inputs: PathBuf,

        /// vasprun.xml parameters JSON (default: the INCAR from --inputs).
        #[arg(long)]
        parameters: Option<PathBuf>,

        /// Print a JSON document instead of the calc type label.
        #[arg(long)]
        json: bool,
    },

    /// Classify a CP2K calculation.
    Cp2k {
        /// Inputs JSON with `functional`, `hfx`, `dft_plus_u`, and `Run_type`.
        #[arg(long)]
        inputs: PathBuf,

        /// Print a JSON document instead of the calc type label.
        #[arg(long)]
        json: bool,
    },

    /// List every run type a rule table can produce.
    RunTypes {
        /// Simulation code.
        #[arg(value_enum)]
        code: Code,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Code {
    Vasp,
    Cp2k,
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
    let tables = settings.rule_tables()?;
    tracing::debug!(
        vasp = tables.vasp.origin(),
        cp2k = tables.cp2k.origin(),
        "rule tables loaded"
    );

    match args.command {
        Command::Vasp {
            inputs,
            parameters,
            json,
        } => {
            let inputs = read_json(&inputs)?;
            let parameters = match parameters {
                Some(path) => read_json(&path)?,
                None => incar(&inputs),
            };
            let run_type = vasp::run_type(&tables.vasp, &parameters);
            let task_type = vasp::task_type(&inputs)?;
            print_labels(Some(run_type), task_type, json)
        }
        Command::Cp2k { inputs, json } => {
            let inputs = read_json(&inputs)?;
            let run_type = cp2k::run_type(&tables.cp2k, &inputs);
            let task_type = cp2k::task_type(&inputs)?;
            print_labels(run_type, task_type, json)
        }
        Command::RunTypes { code } => {
            let table = match code {
                Code::Vasp => &tables.vasp,
                Code::Cp2k => &tables.cp2k,
            };
            for rt in table.run_types() {
                println!("{rt}");
            }
            Ok(())
        }
    }
}

fn read_json(path: &Path) -> Result<Parameters> {
    let text = if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read standard input")?;
        text
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {} as JSON", path.display()))
}

fn incar(inputs: &Parameters) -> Parameters {
    match inputs.get("incar") {
        Some(serde_json::Value::Object(incar)) => incar.clone(),
        _ => Parameters::new(),
    }
}

fn print_labels<T>(run_type: Option<RunType>, task_type: T, json: bool) -> Result<()>
where
    T: TaskLabel + ValueEnum,
{
    let calc_type = run_type.clone().map(|rt| CalcType::new(rt, task_type));

    if json {
        let run_type = run_type.map_or(Raw::Null, Raw::enumeration);
        let calc_type = calc_type.map_or(Raw::Null, Raw::enumeration);
        let doc = Raw::Map(vec![
            ("run_type".into(), run_type),
            ("task_type".into(), Raw::enumeration(task_type)),
            ("calc_type".into(), calc_type),
        ]);
        let options = SanitizeOptions {
            strict: true,
            allow_bson: false,
        };
        let sanitized = jsanitize(&doc, options)?;
        println!("{}", serde_json::to_string_pretty(&sanitized)?);
        return Ok(());
    }

    match calc_type {
        Some(ct) => println!("{ct}"),
        None => println!("unclassified run type, task type `{}`", task_type.as_str()),
    }
    Ok(())
}
