//! Conformance report types: check results, severities, and aggregation.

use std::fmt;

/// Outcome of one conformance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// The check passed.
    Pass,
    /// Suspicious but not blocking.
    Warning,
    /// Blocks conformance.
    Failure,
}

impl Severity {
    /// Four-letter tag used in printed reports.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Severity::Pass => "PASS",
            Severity::Warning => "WARN",
            Severity::Failure => "FAIL",
        }
    }
}

/// A single check result against one rule table.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Validator that produced the result, e.g. `rules/shadowing`.
    pub validator: String,
    /// Origin of the table that was checked.
    pub table: String,
    /// One-line outcome.
    pub message: String,
    /// Severity of the result.
    pub severity: Severity,
    /// Offending rules or labels, one per line.
    pub details: Vec<String>,
}

impl TestResult {
    fn new(severity: Severity, validator: &str, table: &str, message: impl Into<String>) -> Self {
        Self {
            validator: validator.to_owned(),
            table: table.to_owned(),
            message: message.into(),
            severity,
            details: Vec::new(),
        }
    }

    /// A passing result.
    #[must_use]
    pub fn pass(validator: &str, table: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Pass, validator, table, message)
    }

    /// A warning.
    #[must_use]
    pub fn warn(validator: &str, table: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, validator, table, message)
    }

    /// A failure.
    #[must_use]
    pub fn fail(validator: &str, table: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Failure, validator, table, message)
    }

    /// Attaches detail lines.
    #[must_use]
    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    /// Returns true if this result blocks conformance.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.severity == Severity::Failure
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}): {}",
            self.severity.tag(),
            self.validator,
            self.table,
            self.message
        )?;
        for detail in &self.details {
            write!(f, "\n       {detail}")?;
        }
        Ok(())
    }
}

/// Results from every validator, in run order.
#[derive(Debug, Default)]
pub struct ConformanceReport {
    /// All individual results.
    pub results: Vec<TestResult>,
}

impl ConformanceReport {
    /// An empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a result.
    pub fn push(&mut self, result: TestResult) {
        self.results.push(result);
    }

    /// Appends every result of another report.
    pub fn extend(&mut self, other: ConformanceReport) {
        self.results.extend(other.results);
    }

    /// Number of results with the given severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.results
            .iter()
            .filter(|r| r.severity == severity)
            .count()
    }

    /// Returns true if nothing failed. Warnings do not count.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.count(Severity::Failure) == 0
    }

    /// Results produced by one validator.
    pub fn by_validator<'a>(&'a self, validator: &'a str) -> impl Iterator<Item = &'a TestResult> {
        self.results.iter().filter(move |r| r.validator == validator)
    }
}
