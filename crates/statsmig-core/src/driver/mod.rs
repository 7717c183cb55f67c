//! Batch migration driver.
//!
//! Walks the run phases, pulling legacy records out of the index, mapping
//! them, and writing them back in committed batches. A failure inside one
//! phase is logged and the run carries on with the next phase; whatever was
//! not committed stays legacy and is picked up by the next run.

mod state;

pub use state::{BatchState, Phase};

use crate::config::MigrationConfig;
use crate::error::{MigrateError, Result};
use crate::index::StatisticsIndex;
use crate::mapper::map_record;
use crate::models::{ObjectKind, StatsRecord};
use crate::persistence::LegacyLookup;
use crate::report::LegacyReport;
use crate::resolver::Resolver;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Records rewritten for one object kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindSummary {
    pub kind: ObjectKind,
    pub processed: usize,
}

/// Where a phase failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureSource {
    /// The statistics index; the shard is left resumable.
    Index,
    /// The repository database behind the lookup.
    Database,
    Other,
}

/// A phase that stopped on an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseFailure {
    pub phase: String,
    pub source: FailureSource,
    pub error: String,
}

/// Outcome of a migration run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub index_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub processed: usize,
    pub kinds: Vec<KindSummary>,
    pub swept: usize,
    pub failures: Vec<PhaseFailure>,
    pub before: Option<LegacyReport>,
    pub after: Option<LegacyReport>,
}

impl RunSummary {
    fn new(index_name: &str) -> Self {
        Self {
            index_name: index_name.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            processed: 0,
            kinds: Vec::new(),
            swept: 0,
            failures: Vec::new(),
            before: None,
            after: None,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Records rewritten for `kind`, zero if that kind did not run.
    pub fn processed_for(&self, kind: ObjectKind) -> usize {
        self.kinds
            .iter()
            .filter(|k| k.kind == kind)
            .map(|k| k.processed)
            .sum()
    }
}

/// Migrates legacy ids in one statistics shard.
pub struct Migrator<I, L> {
    index: I,
    resolver: Resolver<L>,
    config: MigrationConfig,
}

impl<I: StatisticsIndex, L: LegacyLookup> Migrator<I, L> {
    pub fn new(index: I, lookup: L, config: MigrationConfig) -> Result<Self> {
        Self::with_resolver(index, Resolver::new(lookup), config)
    }

    pub fn with_resolver(index: I, resolver: Resolver<L>, config: MigrationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            index,
            resolver,
            config,
        })
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn resolver(&self) -> &Resolver<L> {
        &self.resolver
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Run every phase to completion.
    pub async fn run(&mut self) -> RunSummary {
        let mut summary = RunSummary::new(&self.config.index_name);
        let mut state = BatchState::new();
        let mut phase = Phase::ReportBefore;

        info!(
            "Migrating legacy ids in {} (max {}, batch {})",
            self.config.index_name, self.config.max_records, self.config.batch_size
        );

        while phase != Phase::Done {
            debug!("Entering phase {}", phase);
            let outcome = match phase {
                Phase::ReportBefore => self.report().await.map(|r| summary.before = Some(r)),
                Phase::Process(kind) => self.process_kind(kind, &mut state).await.map(|n| {
                    summary.kinds.push(KindSummary { kind, processed: n });
                }),
                Phase::Sweep => self.sweep(&mut state).await.map(|n| summary.swept = n),
                Phase::ReportAfter if state.processed > 0 => {
                    self.report().await.map(|r| summary.after = Some(r))
                }
                Phase::ReportAfter | Phase::Done => Ok(()),
            };

            if let Err(e) = outcome {
                let dropped = state.discard_pending();
                summary.failures.push(self.phase_failure(phase, &e, dropped));
            }
            phase = phase.next(self.config.object_type);
        }

        println!("{}", state.progress_line(&self.resolver, true));
        summary.processed = state.processed;
        summary.finished_at = Some(Utc::now());
        info!(
            "Migration of {} finished: {} records, {} failed phases",
            summary.index_name,
            summary.processed,
            summary.failures.len()
        );
        summary
    }

    /// Log a failed phase according to where the error came from.
    fn phase_failure(&self, phase: Phase, err: &MigrateError, dropped: usize) -> PhaseFailure {
        let source = if err.is_index_failure() {
            error!(
                "Phase {} failed talking to index {} ({} queued records dropped): {}",
                phase, self.config.index_name, dropped, err
            );
            println!(
                "Error during {}: {}\n\tUncommitted records stay legacy; re-run to resume {}.",
                phase, err, self.config.index_name
            );
            FailureSource::Index
        } else if err.is_persistence_failure() {
            let database = self.resolver.lookup().describe();
            error!(
                "Phase {} failed reading {} ({} queued records dropped): {}",
                phase, database, dropped, err
            );
            println!("Error during {}: lookup in {} failed: {}", phase, database, err);
            FailureSource::Database
        } else {
            error!("Phase {} failed ({} queued records dropped): {}", phase, dropped, err);
            println!("Error during {}: {}", phase, err);
            FailureSource::Other
        };
        PhaseFailure {
            phase: phase.to_string(),
            source,
            error: err.to_string(),
        }
    }

    async fn report(&self) -> Result<LegacyReport> {
        let counts = self.index.report_counts().await?;
        let report = LegacyReport::from_counts(&counts);
        println!("{}", report);
        Ok(report)
    }

    /// Rewrite every record referencing legacy ids of `kind`.
    async fn process_kind(&mut self, kind: ObjectKind, state: &mut BatchState) -> Result<usize> {
        let max = self.config.max_records;
        let start = state.processed;
        println!("Processing {} references", kind);

        while !state.reached(max) {
            let facets = self
                .index
                .legacy_facets(kind, self.config.facet_limit)
                .await?;
            if facets.is_empty() {
                break;
            }

            let page_start = state.processed;
            for facet in facets {
                if state.reached(max) {
                    break;
                }
                let rows = self.config.batch_size.min(state.remaining(max));
                let records = self
                    .index
                    .records_referencing(kind, facet.legacy_id, rows)
                    .await?;
                debug!(
                    "{} {}: {} of {} references fetched",
                    kind,
                    facet.legacy_id,
                    records.len(),
                    facet.count
                );
                for record in records {
                    if state.reached(max) {
                        break;
                    }
                    self.rewrite(record, state).await?;
                }
            }
            self.flush(state).await?;

            if state.processed == page_start {
                warn!("No {} records rewritten in last page, moving on", kind);
                break;
            }
        }

        Ok(state.processed - start)
    }

    /// Rewrite records still matching the legacy query after the typed passes.
    ///
    /// Pages are keyed on `uid`, so records that cannot be fixed are passed
    /// over instead of filling every page.
    async fn sweep(&mut self, state: &mut BatchState) -> Result<usize> {
        let max = self.config.max_records;
        let start = state.processed;
        let mut cursor: Option<String> = None;
        println!("Sweeping remaining legacy references");

        while !state.reached(max) {
            let rows = self.config.batch_size.min(state.remaining(max));
            let records = self.index.legacy_records(cursor.as_deref(), rows).await?;
            let Some(last) = records.last().and_then(|r| r.uid()) else {
                break;
            };

            for record in records {
                if state.reached(max) {
                    break;
                }
                self.rewrite(record, state).await?;
            }
            self.flush(state).await?;
            cursor = Some(last);
        }

        Ok(state.processed - start)
    }

    /// Map one record and queue it, flushing when the batch is full.
    async fn rewrite(&mut self, mut record: StatsRecord, state: &mut BatchState) -> Result<()> {
        let Some(uid) = record.uid() else {
            warn!("Skipping statistics record without uid");
            return Ok(());
        };
        if state.is_pending(&uid) {
            return Ok(());
        }

        let outcome = map_record(&mut record, &self.resolver)?;
        if !outcome.changed() {
            debug!("Record {} has no legacy values left", uid);
            return Ok(());
        }
        state.note_resolved(&outcome.resolved, &self.resolver);
        state.push(uid, record);

        if state.pending_len() >= self.config.batch_size {
            self.flush(state).await?;
        }
        Ok(())
    }

    /// Submit and commit queued records, then bound the resolver cache.
    async fn flush(&mut self, state: &mut BatchState) -> Result<()> {
        if state.pending_len() == 0 {
            return Ok(());
        }

        println!("{}", state.progress_line(&self.resolver, false));
        let docs = state.take_pending();
        if let Err(e) = self.submit(&docs).await {
            state.rollback(docs.len());
            return Err(e);
        }
        debug!("Committed {} records", docs.len());

        if self.resolver.cache_size() > self.config.cache_limit {
            state.refresh_context(&mut self.resolver)?;
        }
        Ok(())
    }

    async fn submit(&self, docs: &[StatsRecord]) -> Result<()> {
        self.index.add(docs).await?;
        self.index.commit().await
    }
}
