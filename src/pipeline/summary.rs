use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::ValidationResult;
use crate::rules::RuleCode;

/// Aggregate statistics of one pipeline run.
///
/// Accumulators built independently (one per worker) combine with
/// [`merge`](Self::merge) in any order to the same counts and timings.
/// Timings cover evaluated invoices only; `SYS-002` results never reached
/// the rules and are left out of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub compliant_count: usize,
    pub failed_count: usize,
    /// Wall-clock time of the run.
    pub processing_time_seconds: f64,
    /// Violation occurrences per rule code (several per invoice possible).
    pub violations_by_rule_code: BTreeMap<String, usize>,
    /// The run stopped early on cancellation.
    pub cancelled: bool,
    /// Results whose evaluation time went into the timing fields.
    pub timed_count: usize,
    /// Sum of per-invoice evaluation times.
    pub evaluation_time_total: Duration,
    /// Fastest evaluation, `None` until one is timed.
    pub evaluation_time_min: Option<Duration>,
    /// Slowest evaluation.
    pub evaluation_time_max: Duration,
}

impl BatchSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one result.
    pub fn record(&mut self, result: &ValidationResult) {
        self.total += 1;
        if result.is_compliant() {
            self.compliant_count += 1;
        } else {
            self.failed_count += 1;
        }
        for violation in result.violations() {
            *self
                .violations_by_rule_code
                .entry(violation.rule.code().to_string())
                .or_default() += 1;
        }
        if !result.has_violation(RuleCode::ParseFailure) {
            let elapsed = result.duration();
            self.timed_count += 1;
            self.evaluation_time_total = self.evaluation_time_total.saturating_add(elapsed);
            self.evaluation_time_min =
                Some(self.evaluation_time_min.map_or(elapsed, |min| min.min(elapsed)));
            self.evaluation_time_max = self.evaluation_time_max.max(elapsed);
        }
    }

    /// Fold another accumulator into this one. Times overlap, so the longer
    /// one is kept.
    pub fn merge(&mut self, other: BatchSummary) {
        self.total += other.total;
        self.compliant_count += other.compliant_count;
        self.failed_count += other.failed_count;
        self.processing_time_seconds = self
            .processing_time_seconds
            .max(other.processing_time_seconds);
        for (code, count) in other.violations_by_rule_code {
            *self.violations_by_rule_code.entry(code).or_default() += count;
        }
        self.cancelled |= other.cancelled;
        self.timed_count += other.timed_count;
        self.evaluation_time_total = self
            .evaluation_time_total
            .saturating_add(other.evaluation_time_total);
        self.evaluation_time_min = match (self.evaluation_time_min, other.evaluation_time_min) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.evaluation_time_max = self.evaluation_time_max.max(other.evaluation_time_max);
    }

    /// Mean evaluation time, `None` when nothing was timed.
    pub fn mean_evaluation_time(&self) -> Option<Duration> {
        if self.timed_count == 0 {
            return None;
        }
        Some(Duration::from_secs_f64(
            self.evaluation_time_total.as_secs_f64() / self.timed_count as f64,
        ))
    }

    /// Results per second over the whole run.
    pub fn throughput(&self) -> f64 {
        per_second(self.total, self.processing_time_seconds)
    }

    /// Percentage of compliant invoices, 0 for an empty run.
    pub fn compliance_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.compliant_count as f64 / self.total as f64 * 100.0
    }

    /// Occurrences of one rule code.
    pub fn violations_of(&self, rule: RuleCode) -> usize {
        self.violations_by_rule_code
            .get(rule.code())
            .copied()
            .unwrap_or(0)
    }
}

impl<'a> FromIterator<&'a ValidationResult> for BatchSummary {
    fn from_iter<I: IntoIterator<Item = &'a ValidationResult>>(iter: I) -> Self {
        let mut summary = Self::new();
        for result in iter {
            summary.record(result);
        }
        summary
    }
}

/// Progress rate for `processed` results since `started`.
pub(crate) fn rate_since(processed: usize, started: Instant) -> f64 {
    per_second(processed, started.elapsed().as_secs_f64())
}

fn per_second(count: usize, seconds: f64) -> f64 {
    if seconds > 0.0 {
        count as f64 / seconds
    } else {
        0.0
    }
}

/// Results grouped by each rule code they violate. A result with several
/// codes appears under each of them once.
pub fn group_by_violation<'a, I>(results: I) -> BTreeMap<RuleCode, Vec<&'a ValidationResult>>
where
    I: IntoIterator<Item = &'a ValidationResult>,
{
    let mut groups: BTreeMap<RuleCode, Vec<&'a ValidationResult>> = BTreeMap::new();
    for result in results {
        let mut codes = result.violation_codes();
        codes.sort();
        codes.dedup();
        for code in codes {
            groups.entry(code).or_default().push(result);
        }
    }
    groups
}

/// Only the non-compliant results.
pub fn failed_only<I>(results: I) -> impl Iterator<Item = ValidationResult>
where
    I: IntoIterator<Item = ValidationResult>,
{
    results.into_iter().filter(|r| !r.is_compliant())
}

/// Only the compliant results.
pub fn compliant_only<I>(results: I) -> impl Iterator<Item = ValidationResult>
where
    I: IntoIterator<Item = ValidationResult>,
{
    results.into_iter().filter(ValidationResult::is_compliant)
}
