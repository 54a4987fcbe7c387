use thiserror::Error;

use crate::rules::RuleCode;

/// Errors that can occur while building, parsing, or feeding invoices.
///
/// Rule failures are not errors; they are reported as [`Violation`]s inside
/// a [`ValidationResult`](crate::ValidationResult).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FatooraError {
    /// An invoice file could not be turned into an [`Invoice`](crate::Invoice).
    #[error("parse error: {0}")]
    Parse(String),

    /// Builder encountered invalid or missing configuration.
    #[error("builder error: {0}")]
    Builder(String),

    /// Invalid validation or pipeline configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The invoice source itself could not be opened or enumerated.
    #[error("source error: {0}")]
    Source(String),

    /// XML generation error.
    #[error("XML error: {0}")]
    Xml(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(String),
}

/// How a finding affects the compliance verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    /// Always makes the invoice non-compliant.
    Error,
    /// Only makes the invoice non-compliant in strict mode.
    Warning,
}

/// A single rule finding with field path and message.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Violation {
    /// Stable rule code (e.g. `VAT-001`).
    pub rule: RuleCode,
    /// Severity as emitted by the rule (before strict-mode promotion).
    pub severity: Severity,
    /// Dot-separated path to the offending field (e.g. "lines[0].quantity").
    pub field: String,
    /// Human-readable reason.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.rule.code(), self.field, self.message)
    }
}

impl Violation {
    /// Create an error-severity finding.
    pub fn error(rule: RuleCode, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule,
            severity: Severity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a warning-severity finding.
    pub fn warning(rule: RuleCode, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule,
            severity: Severity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}
