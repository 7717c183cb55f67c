//! Run phases and the mutable state threaded through the batch loop.

use crate::error::Result;
use crate::models::{ObjectKey, ObjectKind, StatsRecord};
use crate::persistence::LegacyLookup;
use crate::report::{format_count, format_duration};
use crate::resolver::Resolver;
use std::collections::HashSet;
use std::fmt;
use std::time::Instant;
use tracing::debug;

/// Steps of a migration run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ReportBefore,
    Process(ObjectKind),
    Sweep,
    ReportAfter,
    Done,
}

impl Phase {
    /// The phase after this one. With a type filter only that type is processed
    /// and the sweep is skipped.
    pub fn next(self, filter: Option<ObjectKind>) -> Phase {
        match self {
            Phase::ReportBefore => {
                Phase::Process(filter.unwrap_or(ObjectKind::PROCESSING_ORDER[0]))
            }
            Phase::Process(_) if filter.is_some() => Phase::ReportAfter,
            Phase::Process(kind) => {
                let order = ObjectKind::PROCESSING_ORDER;
                match order.iter().position(|k| *k == kind) {
                    Some(pos) if pos + 1 < order.len() => Phase::Process(order[pos + 1]),
                    _ => Phase::Sweep,
                }
            }
            Phase::Sweep => Phase::ReportAfter,
            Phase::ReportAfter | Phase::Done => Phase::Done,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::ReportBefore => f.write_str("report before"),
            Phase::Process(kind) => write!(f, "process {}", kind),
            Phase::Sweep => f.write_str("sweep"),
            Phase::ReportAfter => f.write_str("report after"),
            Phase::Done => f.write_str("done"),
        }
    }
}

/// Counters, pending documents and cache bookkeeping for one run.
pub struct BatchState {
    /// Records rewritten so far, excluding any whose submission failed.
    pub processed: usize,
    pending: Vec<StatsRecord>,
    pending_uids: HashSet<String>,
    last_item: Option<ObjectKey>,
    last_bitstream: Option<ObjectKey>,
    /// Entries evicted since the last context refresh.
    uncached: usize,
    /// Cache entries accumulated across earlier contexts.
    total_cached: usize,
    started: Instant,
    last_tick: Instant,
}

impl Default for BatchState {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchState {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            processed: 0,
            pending: Vec::new(),
            pending_uids: HashSet::new(),
            last_item: None,
            last_bitstream: None,
            uncached: 0,
            total_cached: 0,
            started: now,
            last_tick: now,
        }
    }

    pub fn reached(&self, max_records: usize) -> bool {
        self.processed >= max_records
    }

    pub fn remaining(&self, max_records: usize) -> usize {
        max_records.saturating_sub(self.processed)
    }

    pub fn is_pending(&self, uid: &str) -> bool {
        self.pending_uids.contains(uid)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Queue a rewritten record for submission.
    pub fn push(&mut self, uid: String, record: StatsRecord) {
        self.pending_uids.insert(uid);
        self.pending.push(record);
        self.processed += 1;
    }

    pub fn take_pending(&mut self) -> Vec<StatsRecord> {
        self.pending_uids.clear();
        std::mem::take(&mut self.pending)
    }

    /// Forget records whose submission failed; they stay legacy in the index.
    pub fn rollback(&mut self, count: usize) {
        self.processed = self.processed.saturating_sub(count);
    }

    /// Drop queued records after an aborted phase.
    pub fn discard_pending(&mut self) -> usize {
        let dropped = self.take_pending().len();
        self.rollback(dropped);
        dropped
    }

    /// Evict the previous item or bitstream once processing moves past it.
    ///
    /// Communities and collections recur across many records and stay cached.
    pub fn note_resolved<L: LegacyLookup>(&mut self, keys: &[ObjectKey], resolver: &Resolver<L>) {
        for key in keys {
            let last = match key.kind {
                ObjectKind::Item => &mut self.last_item,
                ObjectKind::Bitstream => &mut self.last_bitstream,
                _ => continue,
            };
            match last {
                Some(prev) if prev == key => {}
                Some(prev) => {
                    resolver.evict(prev);
                    self.uncached += 1;
                    *last = Some(*key);
                }
                None => *last = Some(*key),
            }
        }
    }

    /// Cache entries since the last refresh, or since the start of the run.
    pub fn cache_count<L: LegacyLookup>(&self, resolver: &Resolver<L>, from_start: bool) -> usize {
        let mut count = resolver.cache_size() + self.uncached;
        if from_start {
            count += self.total_cached;
        }
        count
    }

    /// Rebuild the resolver cache and persistence context.
    pub fn refresh_context<L: LegacyLookup>(&mut self, resolver: &mut Resolver<L>) -> Result<()> {
        debug!(
            "Refreshing resolver context after {} cached entries",
            resolver.cache_size()
        );
        self.total_cached += self.uncached + resolver.cache_size();
        self.uncached = 0;
        self.last_item = None;
        self.last_bitstream = None;
        resolver.reset()
    }

    /// Progress line: count, time since the previous line and since start,
    /// cache counts and queued documents.
    pub fn progress_line<L: LegacyLookup>(
        &mut self,
        resolver: &Resolver<L>,
        from_start: bool,
    ) -> String {
        let now = Instant::now();
        let since_last = now.duration_since(self.last_tick);
        let since_start = now.duration_since(self.started);
        self.last_tick = now;

        let label = if from_start { "TOTAL" } else { "Processed" };
        let step = if from_start { since_start } else { since_last };
        format!(
            "\t{:>12} {:>10}... ({:>6} sec; {}; DB cache: {:>6}/{:>8}; Docs: {:>6})",
            format_count(self.processed as u64),
            label,
            format_count(step.as_secs()),
            format_duration(since_start),
            format_count(resolver.cache_size() as u64),
            format_count(self.cache_count(resolver, from_start) as u64),
            format_count(self.pending.len() as u64),
        )
    }
}
