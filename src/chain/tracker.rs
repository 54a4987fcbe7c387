use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

/// Last accepted position of one series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    /// Hash of the last accepted invoice; the next PIH must equal it.
    pub last_hash: String,
    /// Issue date of the last accepted invoice.
    pub last_issue_date: NaiveDate,
    /// PIH the last accepted invoice carried (`None` for the first).
    pub anchor_pih: Option<String>,
    /// Invoices accepted into this series since the last reset.
    pub accepted_count: u64,
}

impl ChainState {
    /// State after accepting `hash` on top of `previous`.
    pub fn extend(previous: Option<&ChainState>, hash: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            last_hash: hash.into(),
            last_issue_date: date,
            anchor_pih: previous.map(|p| p.last_hash.clone()),
            accepted_count: previous.map_or(0, |p| p.accepted_count) + 1,
        }
    }
}

#[derive(Debug, Default)]
struct SlotState {
    chain: Option<ChainState>,
    /// Next ticket number to hand out.
    issued: u64,
    /// Ticket whose turn it is.
    serving: u64,
    /// Tickets dropped before their turn.
    abandoned: BTreeSet<u64>,
}

impl SlotState {
    fn finish_turn(&mut self) {
        self.serving += 1;
        while self.abandoned.remove(&self.serving) {
            self.serving += 1;
        }
    }
}

#[derive(Debug, Default)]
struct SeriesSlot {
    state: Mutex<SlotState>,
    turn: Condvar,
}

/// Per-series record of the last accepted invoice.
///
/// The series map sits behind a short-lived global lock; each series has
/// its own lock, so series never contend with each other. Chain state only
/// moves forward through the rule engine (or [`advance`](Self::advance)).
///
/// For concurrent use, [`reserve`](Self::reserve) hands out a
/// [`ChainTicket`] per invoice in source order; tickets of one series settle
/// strictly in the order they were reserved.
#[derive(Debug, Default)]
pub struct ChainTracker {
    series: Mutex<HashMap<String, Arc<SeriesSlot>>>,
}

impl ChainTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, series: &str) -> Arc<SeriesSlot> {
        let mut map = self.series.lock();
        if let Some(slot) = map.get(series) {
            return Arc::clone(slot);
        }
        let slot = Arc::new(SeriesSlot::default());
        map.insert(series.to_string(), Arc::clone(&slot));
        slot
    }

    /// Snapshot of a series' state.
    pub fn get(&self, series: &str) -> Option<ChainState> {
        let slot = self.series.lock().get(series).map(Arc::clone)?;
        let state = slot.state.lock();
        state.chain.clone()
    }

    /// Record `hash` as the series' last accepted invoice without checks.
    pub fn advance(&self, series: &str, hash: impl Into<String>, date: NaiveDate) {
        self.with_series(series, |chain| {
            *chain = Some(ChainState::extend(chain.as_ref(), hash, date));
        });
    }

    /// Forget every series. Tickets still outstanding keep their ordering.
    pub fn reset(&self) {
        let mut map = self.series.lock();
        map.retain(|_, slot| {
            let mut state = slot.state.lock();
            state.chain = None;
            state.issued != state.serving
        });
    }

    /// Number of series with accepted invoices.
    pub fn series_count(&self) -> usize {
        let map = self.series.lock();
        map.values()
            .filter(|slot| slot.state.lock().chain.is_some())
            .count()
    }

    /// Take the next turn in `series`.
    pub fn reserve(&self, series: &str) -> ChainTicket {
        let slot = self.slot(series);
        let seq = {
            let mut state = slot.state.lock();
            let seq = state.issued;
            state.issued += 1;
            seq
        };
        ChainTicket {
            slot,
            seq,
            series_id: series.to_string(),
            settled: false,
        }
    }

    /// Run `f` on the series state under its lock, without waiting for a turn.
    pub(crate) fn with_series<R>(
        &self,
        series: &str,
        f: impl FnOnce(&mut Option<ChainState>) -> R,
    ) -> R {
        let slot = self.slot(series);
        let mut state = slot.state.lock();
        f(&mut state.chain)
    }
}

/// A reserved position in one series' evaluation order.
///
/// Dropping a ticket without settling it (a faulted worker, a cancelled
/// dispatcher) releases its turn, so later tickets never block on it.
pub struct ChainTicket {
    slot: Arc<SeriesSlot>,
    seq: u64,
    series_id: String,
    settled: bool,
}

impl ChainTicket {
    pub fn series_id(&self) -> &str {
        &self.series_id
    }

    /// Position within the series, starting at 0.
    pub fn position(&self) -> u64 {
        self.seq
    }

    /// Block until every earlier ticket of the series is done, then run `f`
    /// on the series state under its lock.
    pub fn settle<R>(mut self, f: impl FnOnce(&mut Option<ChainState>) -> R) -> R {
        let slot = Arc::clone(&self.slot);
        let mut state = slot.state.lock();
        while state.serving != self.seq {
            slot.turn.wait(&mut state);
        }
        let out = f(&mut state.chain);
        state.finish_turn();
        self.settled = true;
        drop(state);
        slot.turn.notify_all();
        out
    }
}

impl Drop for ChainTicket {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.slot.state.lock();
        if state.serving == self.seq {
            state.finish_turn();
            drop(state);
            self.slot.turn.notify_all();
        } else {
            state.abandoned.insert(self.seq);
        }
    }
}

impl std::fmt::Debug for ChainTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainTicket")
            .field("series_id", &self.series_id)
            .field("seq", &self.seq)
            .finish()
    }
}
