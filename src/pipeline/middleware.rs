//! Composable wrappers around one evaluation.
//!
//! ```
//! use fatoora::core::ValidationResult;
//! use fatoora::pipeline::middleware;
//!
//! let result = middleware::audited("INV-1", || {
//!     middleware::timed(|| ValidationResult::worker_fault("INV-1", None, "demo"))
//! });
//! assert!(!result.is_compliant());
//! ```

use std::time::Instant;

use tracing::{debug, info};

use crate::core::ValidationResult;

/// Target of audit events, for routing them to a dedicated sink.
pub const AUDIT_TARGET: &str = "fatoora::audit";

/// Run `f` and attach its wall-clock duration to the result.
pub fn timed<F>(f: F) -> ValidationResult
where
    F: FnOnce() -> ValidationResult,
{
    let started = Instant::now();
    let result = f();
    let elapsed = started.elapsed();
    debug!(
        invoice = result.invoice_id(),
        elapsed_us = elapsed.as_micros() as u64,
        "evaluation timed"
    );
    result.with_duration(elapsed)
}

/// Run `f` between a start and an outcome audit event for `invoice_id`.
pub fn audited<F>(invoice_id: &str, f: F) -> ValidationResult
where
    F: FnOnce() -> ValidationResult,
{
    info!(target: AUDIT_TARGET, invoice = invoice_id, "validation started");
    let result = f();
    let status = if result.is_compliant() { "compliant" } else { "non-compliant" };
    info!(
        target: AUDIT_TARGET,
        invoice = invoice_id,
        status,
        violations = result.violations().len(),
        "validation finished"
    );
    result
}
