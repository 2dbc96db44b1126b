//! Validators, one module per concern.
//!
//! Each validator takes a loaded [`calctype::RuleTable`] and returns a
//! [`crate::ConformanceReport`] with at least one result.

pub mod labels;
pub mod rules;
