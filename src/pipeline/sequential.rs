use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use super::summary::rate_since;
use super::{BatchSummary, degraded, guarded, middleware};
use crate::chain::ChainTracker;
use crate::core::{FatooraError, ValidationConfig, ValidationResult};
use crate::crypto::SignatureVerifier;
use crate::rules::RuleEngine;
use crate::source::{DirectorySource, SourceItem};

/// Single-threaded pipeline: one engine, one tracker, lazy pull.
///
/// The tracker persists across calls so consecutive batches of one series
/// chain onto each other; call [`reset_chain`](Self::reset_chain) between
/// unrelated batches.
#[derive(Debug)]
pub struct SequentialPipeline {
    engine: RuleEngine,
    tracker: ChainTracker,
}

impl SequentialPipeline {
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            engine: RuleEngine::new(config),
            tracker: ChainTracker::new(),
        }
    }

    pub fn with_verifier(config: ValidationConfig, verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self {
            engine: RuleEngine::with_verifier(config, verifier),
            tracker: ChainTracker::new(),
        }
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    pub fn tracker(&self) -> &ChainTracker {
        &self.tracker
    }

    /// Stream of results, one per source item, in source order.
    ///
    /// Nothing is read until the stream is pulled, and each `next()` reads
    /// exactly one item. Dropping the stream drops the source.
    pub fn process_series<I>(&self, source: I) -> ResultStream<'_, I::IntoIter>
    where
        I: IntoIterator<Item = SourceItem>,
    {
        ResultStream {
            pipeline: self,
            source: source.into_iter(),
        }
    }

    /// [`process_series`](Self::process_series) over the files of `dir`
    /// matching `pattern`.
    pub fn process_directory(
        &self,
        dir: impl AsRef<Path>,
        pattern: &str,
    ) -> Result<ResultStream<'_, DirectorySource>, FatooraError> {
        let source = DirectorySource::open(dir, pattern)?;
        Ok(self.process_series(source))
    }

    /// Drain `source`, calling `callback` with each result, and summarise.
    pub fn run<I, F>(&self, source: I, mut callback: F) -> BatchSummary
    where
        I: IntoIterator<Item = SourceItem>,
        F: FnMut(&ValidationResult),
    {
        let started = Instant::now();
        let every = self.engine.config().progress_interval;
        let mut summary = BatchSummary::new();

        for result in self.process_series(source) {
            summary.record(&result);
            callback(&result);
            if every > 0 && summary.total % every == 0 {
                info!(
                    processed = summary.total,
                    compliant = summary.compliant_count,
                    per_second = rate_since(summary.total, started),
                    "sequential validation progress"
                );
            }
        }

        summary.processing_time_seconds = started.elapsed().as_secs_f64();
        info!(
            total = summary.total,
            compliant = summary.compliant_count,
            failed = summary.failed_count,
            seconds = summary.processing_time_seconds,
            per_second = summary.throughput(),
            mean_eval_us = summary.mean_evaluation_time().map_or(0, |d| d.as_micros() as u64),
            "sequential validation complete"
        );
        summary
    }

    /// Forget all chain state.
    pub fn reset_chain(&self) {
        self.tracker.reset();
    }

    fn evaluate_item(&self, item: SourceItem) -> ValidationResult {
        match item.parsed {
            Ok(invoice) => middleware::audited(&invoice.number, || {
                middleware::timed(|| {
                    guarded(&item.origin, &invoice, || {
                        self.engine.evaluate(&invoice, Some(&self.tracker))
                    })
                })
            }),
            Err(error) => degraded(&item.origin, &error),
        }
    }
}

/// Lazy results of a [`SequentialPipeline`] over one source.
pub struct ResultStream<'a, I> {
    pipeline: &'a SequentialPipeline,
    source: I,
}

impl<I> Iterator for ResultStream<'_, I>
where
    I: Iterator<Item = SourceItem>,
{
    type Item = ValidationResult;

    fn next(&mut self) -> Option<ValidationResult> {
        let item = self.source.next()?;
        Some(self.pipeline.evaluate_item(item))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.source.size_hint()
    }
}
