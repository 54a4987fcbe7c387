use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::summary::rate_since;
use super::{BatchSummary, CancellationToken, degraded, guarded, middleware};
use crate::chain::{ChainTicket, ChainTracker};
use crate::core::{FatooraError, Invoice, ValidationConfig, ValidationResult};
use crate::crypto::{SignatureVerifier, StructuralVerifier};
use crate::rules::RuleEngine;
use crate::source::{DirectorySource, SourceItem};

enum WorkItem {
    Parsed {
        origin: String,
        invoice: Invoice,
        ticket: ChainTicket,
    },
    Unparsed {
        origin: String,
        error: FatooraError,
    },
}

/// Worker-pool pipeline over a bounded queue.
///
/// The calling thread dispatches: it pulls the source, reserves a chain
/// ticket per invoice (so each series settles in source order) and queues
/// the work. Workers evaluate, record into their own summary and call the
/// callback. The queue bound (`batch_size`) caps memory only.
///
/// Sources parse on the dispatcher thread as they are pulled, since the
/// ticket needs the parsed series id. Parsing is therefore serial; only
/// rule evaluation runs on the workers.
///
/// ```
/// use fatoora::core::ValidationConfig;
/// use fatoora::pipeline::ConcurrentPipeline;
///
/// let pipeline = ConcurrentPipeline::new(ValidationConfig::default());
/// let summary = pipeline.process(Vec::new(), 4).unwrap();
/// assert_eq!(summary.total, 0);
/// assert!(pipeline.process(Vec::new(), 0).is_err());
/// ```
pub struct ConcurrentPipeline {
    config: ValidationConfig,
    verifier: Arc<dyn SignatureVerifier>,
    tracker: Arc<ChainTracker>,
    cancel: CancellationToken,
}

impl ConcurrentPipeline {
    pub fn new(config: ValidationConfig) -> Self {
        Self::with_verifier(config, Arc::new(StructuralVerifier))
    }

    pub fn with_verifier(config: ValidationConfig, verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self {
            config,
            verifier,
            tracker: Arc::new(ChainTracker::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Share chain state with another pipeline or caller.
    pub fn with_tracker(mut self, tracker: Arc<ChainTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn tracker(&self) -> &Arc<ChainTracker> {
        &self.tracker
    }

    /// Token that stops a running [`process`](Self::process) early.
    ///
    /// The pipeline owns one token for its lifetime and never clears it: a
    /// run started while it is cancelled dispatches nothing and returns a
    /// `cancelled` summary with `total == 0`. Call
    /// [`CancellationToken::reset`] before reusing the pipeline.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Forget all chain state.
    pub fn reset_chain(&self) {
        self.tracker.reset();
    }

    /// Validate every item with `worker_count` threads.
    pub fn process<I>(&self, source: I, worker_count: usize) -> Result<BatchSummary, FatooraError>
    where
        I: IntoIterator<Item = SourceItem>,
    {
        self.process_with(source, worker_count, |_| {})
    }

    /// Validate every item, calling `callback` on the worker thread that
    /// produced each result. A panicking callback is logged and ignored.
    pub fn process_with<I, F>(
        &self,
        source: I,
        worker_count: usize,
        callback: F,
    ) -> Result<BatchSummary, FatooraError>
    where
        I: IntoIterator<Item = SourceItem>,
        F: Fn(&ValidationResult) + Sync,
    {
        if worker_count == 0 {
            return Err(FatooraError::Config("worker_count must be at least 1".into()));
        }

        let started = Instant::now();
        let (tx, rx) = mpsc::sync_channel::<WorkItem>(self.config.batch_size.max(1));
        let rx = Mutex::new(rx);
        let completed = AtomicUsize::new(0);
        info!(
            workers = worker_count,
            queue = self.config.batch_size,
            "concurrent validation started"
        );

        let mut summary = thread::scope(|scope| -> Result<BatchSummary, FatooraError> {
            // Owned here so that any early return disconnects the workers.
            let tx = tx;
            let mut workers = Vec::with_capacity(worker_count);
            for id in 0..worker_count {
                let engine =
                    RuleEngine::with_verifier(self.config.clone(), Arc::clone(&self.verifier));
                let (rx, callback, completed) = (&rx, &callback, &completed);
                let handle = thread::Builder::new()
                    .name(format!("fatoora-worker-{id}"))
                    .spawn_scoped(scope, move || {
                        self.work(engine, rx, callback, completed, started)
                    })
                    .map_err(|e| FatooraError::Config(format!("cannot spawn worker {id}: {e}")))?;
                workers.push(handle);
            }

            let cancelled = self.dispatch(source.into_iter(), tx);

            let mut total = BatchSummary::new();
            for handle in workers {
                match handle.join() {
                    Ok(partial) => total.merge(partial),
                    Err(_) => error!("validation worker terminated abnormally"),
                }
            }
            total.cancelled = cancelled;
            Ok(total)
        })?;

        summary.processing_time_seconds = started.elapsed().as_secs_f64();
        info!(
            total = summary.total,
            compliant = summary.compliant_count,
            failed = summary.failed_count,
            cancelled = summary.cancelled,
            seconds = summary.processing_time_seconds,
            per_second = summary.throughput(),
            mean_eval_us = summary.mean_evaluation_time().map_or(0, |d| d.as_micros() as u64),
            "concurrent validation complete"
        );
        Ok(summary)
    }

    /// Validate the files of `dir` matching `pattern` with the configured
    /// worker count.
    pub fn process_directory<F>(
        &self,
        dir: impl AsRef<Path>,
        pattern: &str,
        callback: F,
    ) -> Result<BatchSummary, FatooraError>
    where
        F: Fn(&ValidationResult) + Sync,
    {
        let source = DirectorySource::open(dir, pattern)?;
        self.process_with(source, self.config.worker_count, callback)
    }

    /// Queue every item until the source ends or cancellation is requested.
    /// Returns whether it stopped on cancellation.
    fn dispatch<I>(&self, mut source: I, tx: SyncSender<WorkItem>) -> bool
    where
        I: Iterator<Item = SourceItem>,
    {
        let mut queued = 0usize;
        loop {
            if self.cancel.is_cancelled() {
                info!(queued, "cancellation requested, dispatch stopped");
                return true;
            }
            let Some(item) = source.next() else {
                debug!(queued, "source exhausted");
                return false;
            };
            let work = match item.parsed {
                Ok(invoice) => {
                    let ticket = self.tracker.reserve(&invoice.series_id);
                    WorkItem::Parsed {
                        origin: item.origin,
                        invoice,
                        ticket,
                    }
                }
                Err(error) => WorkItem::Unparsed {
                    origin: item.origin,
                    error,
                },
            };
            if tx.send(work).is_err() {
                warn!(queued, "all workers gone, dispatch stopped");
                return self.cancel.is_cancelled();
            }
            queued += 1;
        }
    }

    fn work<F>(
        &self,
        engine: RuleEngine,
        rx: &Mutex<Receiver<WorkItem>>,
        callback: &F,
        completed: &AtomicUsize,
        started: Instant,
    ) -> BatchSummary
    where
        F: Fn(&ValidationResult) + Sync,
    {
        let every = self.config.progress_interval;
        let mut summary = BatchSummary::new();
        loop {
            let next = rx.lock().recv();
            let Ok(item) = next else {
                break;
            };
            let result = match item {
                WorkItem::Parsed {
                    origin,
                    invoice,
                    ticket,
                } => middleware::audited(&invoice.number, || {
                    middleware::timed(|| {
                        guarded(&origin, &invoice, || engine.evaluate_in_turn(&invoice, ticket))
                    })
                }),
                WorkItem::Unparsed { origin, error } => degraded(&origin, &error),
            };

            summary.record(&result);
            if catch_unwind(AssertUnwindSafe(|| callback(&result))).is_err() {
                warn!(invoice = result.invoice_id(), "result callback panicked");
            }

            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if every > 0 && done % every == 0 {
                info!(
                    processed = done,
                    per_second = rate_since(done, started),
                    "concurrent validation progress"
                );
            }
        }
        summary
    }
}

impl std::fmt::Debug for ConcurrentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentPipeline")
            .field("config", &self.config)
            .field("tracker", &self.tracker)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
