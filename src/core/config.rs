use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::FatooraError;

/// Settings consumed by the rule engine and both pipelines.
///
/// Passed explicitly into constructors; there is no ambient configuration.
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// # #[cfg(feature = "json")] {
/// use fatoora::core::ValidationConfig;
///
/// let config = ValidationConfig::from_json(r#"{ "strict_mode": false, "worker_count": 2 }"#).unwrap();
/// assert!(!config.strict_mode);
/// assert!(config.check_signatures);
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Promote warnings to violations.
    pub strict_mode: bool,
    /// Run the signature rule (CRY-001).
    pub check_signatures: bool,
    /// Run the QR rule (CRY-002).
    pub verify_qr: bool,
    /// Worker threads for the concurrent pipeline.
    pub worker_count: usize,
    /// Bound of the concurrent pipeline's work queue. Advisory: affects
    /// memory held in flight, never results.
    pub batch_size: usize,
    /// Maximum absolute difference accepted by the numeric rules.
    pub amount_tolerance: Decimal,
    /// Days an issue date may lie in the future before STR-004 fires.
    pub future_skew_days: i64,
    /// Age in days after which STR-004 emits a warning.
    pub max_age_days: i64,
    /// Fixed "today" for date rules; `None` uses the local clock.
    pub reference_date: Option<NaiveDate>,
    /// Log pipeline progress every N results (0 disables).
    pub progress_interval: usize,
}

/// Upper bound for `future_skew_days` and `max_age_days` (a century).
pub const MAX_WINDOW_DAYS: i64 = 36_500;

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            strict_mode: true,
            check_signatures: true,
            verify_qr: true,
            worker_count: num_cpus::get().max(1),
            batch_size: 100,
            amount_tolerance: Decimal::new(1, 2),
            future_skew_days: 0,
            max_age_days: 730,
            reference_date: None,
            progress_interval: 100,
        }
    }
}

impl ValidationConfig {
    pub fn strict_mode(mut self, on: bool) -> Self {
        self.strict_mode = on;
        self
    }

    pub fn check_signatures(mut self, on: bool) -> Self {
        self.check_signatures = on;
        self
    }

    pub fn verify_qr(mut self, on: bool) -> Self {
        self.verify_qr = on;
        self
    }

    pub fn worker_count(mut self, workers: usize) -> Self {
        self.worker_count = workers;
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn amount_tolerance(mut self, tolerance: Decimal) -> Self {
        self.amount_tolerance = tolerance;
        self
    }

    pub fn future_skew_days(mut self, days: i64) -> Self {
        self.future_skew_days = days;
        self
    }

    pub fn max_age_days(mut self, days: i64) -> Self {
        self.max_age_days = days;
        self
    }

    pub fn reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn progress_interval(mut self, every: usize) -> Self {
        self.progress_interval = every;
        self
    }

    /// The date the date rules compare against.
    pub fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Local::now().date_naive())
    }

    /// Reject settings no pipeline can run with.
    pub fn validate(&self) -> Result<(), FatooraError> {
        if self.worker_count == 0 {
            return Err(FatooraError::Config("worker_count must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(FatooraError::Config("batch_size must be at least 1".into()));
        }
        if self.amount_tolerance.is_sign_negative() {
            return Err(FatooraError::Config(
                "amount_tolerance must not be negative".into(),
            ));
        }
        if self.future_skew_days < 0 || self.max_age_days < 0 {
            return Err(FatooraError::Config(
                "date windows must not be negative".into(),
            ));
        }
        if self.future_skew_days > MAX_WINDOW_DAYS || self.max_age_days > MAX_WINDOW_DAYS {
            return Err(FatooraError::Config(format!(
                "date windows must not exceed {MAX_WINDOW_DAYS} days"
            )));
        }
        Ok(())
    }

    /// Parse a JSON configuration document and validate it.
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> Result<Self, FatooraError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| FatooraError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
