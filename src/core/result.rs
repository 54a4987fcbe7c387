use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{FatooraError, Violation};
use crate::rules::RuleCode;

/// Verdict for one invoice.
///
/// Immutable once produced: fields are private and the only transformation,
/// [`with_duration`](Self::with_duration), consumes the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    invoice_id: String,
    series_id: Option<String>,
    compliant: bool,
    violations: Vec<Violation>,
    warnings: Vec<Violation>,
    invoice_hash: Option<String>,
    duration: Duration,
    validated_at: DateTime<Utc>,
}

impl ValidationResult {
    pub(crate) fn new(
        invoice_id: impl Into<String>,
        series_id: Option<String>,
        violations: Vec<Violation>,
        warnings: Vec<Violation>,
        invoice_hash: Option<String>,
    ) -> Self {
        Self {
            invoice_id: invoice_id.into(),
            series_id,
            compliant: violations.is_empty(),
            violations,
            warnings,
            invoice_hash,
            duration: Duration::ZERO,
            validated_at: Utc::now(),
        }
    }

    /// Degraded result for an item the parser rejected.
    pub fn parse_failure(origin: impl Into<String>, error: &FatooraError) -> Self {
        let violation = match error {
            FatooraError::Parse(_) => Violation::error(RuleCode::ParseFailure, "source", error.to_string()),
            other => Violation::error(
                RuleCode::ParseFailure,
                "source",
                format!("parse error: {other}"),
            ),
        };
        Self::new(origin, None, vec![violation], Vec::new(), None)
    }

    /// Failed result for an invoice whose evaluation faulted.
    pub fn worker_fault(
        invoice_id: impl Into<String>,
        series_id: Option<String>,
        reason: impl Into<String>,
    ) -> Self {
        let violation = Violation::error(
            RuleCode::WorkerFault,
            "system",
            format!("validation fault: {}", reason.into()),
        );
        Self::new(invoice_id, series_id, vec![violation], Vec::new(), None)
    }

    /// Same result with the measured duration attached.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn invoice_id(&self) -> &str {
        &self.invoice_id
    }

    pub fn series_id(&self) -> Option<&str> {
        self.series_id.as_deref()
    }

    /// True iff there are no violations.
    pub fn is_compliant(&self) -> bool {
        self.compliant
    }

    /// Findings that fail the invoice, in rule order.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Warnings kept aside in non-strict mode.
    pub fn warnings(&self) -> &[Violation] {
        &self.warnings
    }

    /// Canonical hash of the validated invoice (absent for degraded results).
    pub fn invoice_hash(&self) -> Option<&str> {
        self.invoice_hash.as_deref()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn validated_at(&self) -> DateTime<Utc> {
        self.validated_at
    }

    /// Whether any violation carries `rule`.
    pub fn has_violation(&self, rule: RuleCode) -> bool {
        self.violations.iter().any(|v| v.rule == rule)
    }

    /// Violation codes in order (duplicates kept).
    pub fn violation_codes(&self) -> Vec<RuleCode> {
        self.violations.iter().map(|v| v.rule).collect()
    }

    /// Equal ignoring timing: identifier, verdict and findings.
    pub fn same_verdict(&self, other: &Self) -> bool {
        self.invoice_id == other.invoice_id
            && self.series_id == other.series_id
            && self.compliant == other.compliant
            && self.violations == other.violations
            && self.warnings == other.warnings
            && self.invoice_hash == other.invoice_hash
    }
}
