//! Calculation-type classification for VASP and CP2K.
//!
//! Raw simulation parameters are reduced to three labels:
//!
//! - a **run type**, the exchange-correlation family (`PBE`, `HSE06+U`),
//!   decided by a data-driven [`RuleTable`];
//! - a **task type**, what was computed (`Static`, `NSCF Line`), decided by
//!   a fixed list of predicates per code;
//! - a **calc type**, the two joined by a space (`PBE+U Static`).
//!
//! # Entry Point
//!
//! ```
//! use calctype::{cp2k, Parameters, RuleTable};
//! use serde_json::json;
//!
//! let inputs: Parameters = serde_json::from_value(json!({
//!     "functional": ["PBE"],
//!     "Run_type": "GEO_OPT",
//! }))?;
//! let ct = cp2k::calc_type(RuleTable::cp2k()?, &inputs)?;
//! assert_eq!(ct.map(|c| c.to_string()).as_deref(), Some("GGA Structure Optimization"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The crate also carries two generic helpers used around classification:
//! [`sanitize::jsanitize`] for JSON-safe document trees and
//! [`grouping::group_structures`] for bucketing equivalent structures.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod cp2k;
pub mod error;
pub mod grouping;
pub mod labels;
pub mod params;
pub mod rules;
pub mod sanitize;
pub mod settings;
pub mod vasp;

pub use error::{
    ClassifyError, KpointLabelError, RuleTableError, SanitizeError, SettingsError, SymmetryError,
};
pub use labels::{CalcType, RunType, TaskLabel, HUBBARD_SUFFIX};
pub use params::Parameters;
pub use rules::{FunctionalClass, LabelSource, Rule, RuleTable, Scheme};
pub use sanitize::{jsanitize, AsDict, Raw, SanitizeOptions, Sanitized, ValueEnum};
pub use settings::{RuleTables, Settings};
