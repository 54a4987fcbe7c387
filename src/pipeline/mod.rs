//! Execution strategies that feed invoices through the [`RuleEngine`].
//!
//! - [`SequentialPipeline`]: a lazy pull over the source, one invoice in
//!   flight, results in source order.
//! - [`ConcurrentPipeline`]: a scoped worker pool over a bounded queue,
//!   per-series chain order preserved by tickets, results in completion
//!   order.
//!
//! Both degrade instead of failing: an unparsable item becomes a `SYS-002`
//! result and a panic while evaluating one invoice becomes a `SYS-001`
//! result. Only a source that cannot be opened is an error.
//!
//! [`RuleEngine`]: crate::rules::RuleEngine

mod cancel;
mod concurrent;
pub mod middleware;
mod sequential;
mod summary;

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{error, warn};

use crate::core::{FatooraError, Invoice, ValidationResult};

pub use cancel::CancellationToken;
pub use concurrent::ConcurrentPipeline;
pub use sequential::{ResultStream, SequentialPipeline};
pub use summary::{BatchSummary, compliant_only, failed_only, group_by_violation};

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// Run one evaluation, turning a panic into a `SYS-001` result.
pub(crate) fn guarded<F>(origin: &str, invoice: &Invoice, f: F) -> ValidationResult
where
    F: FnOnce() -> ValidationResult,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            error!(
                origin,
                invoice = %invoice.number,
                series = %invoice.series_id,
                reason = %reason,
                "invoice evaluation panicked"
            );
            ValidationResult::worker_fault(
                invoice.number.clone(),
                Some(invoice.series_id.clone()),
                reason,
            )
        }
    }
}

/// `SYS-002` result for an item that failed to parse.
pub(crate) fn degraded(origin: &str, error: &FatooraError) -> ValidationResult {
    warn!(origin, error = %error, "invoice could not be parsed");
    ValidationResult::parse_failure(origin, error)
}
