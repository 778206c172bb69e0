//! Execution engine module
//!
//! Drives the round loop for each entity and the run across entities.
//!
//! # Overview
//!
//! The engine module provides:
//! - `SyncOrchestrator` - Per-entity state machine and the run driver
//! - `BatchAccumulator` - Row buffer with a flush threshold
//! - `SyncConfig` - Page sizes, parallelism and batch size
//! - `SyncStats` / `SyncReport` - What a run did
//!
//! Each entity moves through
//! `FRESH -> FETCHING -> (FLUSHING)* -> DRAINING -> DONE`, or ends in
//! `FAILED` on a fatal error. Rows are always emitted before the checkpoint
//! that covers them, so a crash can only cause re-emission, never loss.

mod batch;
mod types;

pub use batch::BatchAccumulator;
pub use types::{SyncConfig, SyncPhase, SyncReport, SyncStats, SyncWindow};

use crate::config::{EntityConfig, RunConfig};
use crate::destination::Destination;
use crate::error::{Error, Result};
use crate::fetch::{FetchWindow, PageFetcher, ParallelFetchCoordinator, RoundResult};
use crate::mapper::{PassthroughMapper, RecordMapper};
use crate::source::PageSource;
use crate::state::{CheckpointStore, Cursor, SyncState};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// An entity to sync and how its records become rows
#[derive(Clone)]
pub struct EntityPlan {
    /// Entity name, also the prefix of its state keys
    pub name: String,
    /// Field holding the integer primary key
    pub id_field: String,
    /// Record to row mapping
    pub mapper: Arc<dyn RecordMapper>,
}

impl EntityPlan {
    /// Plan keyed on `id`
    pub fn new(name: impl Into<String>, mapper: Arc<dyn RecordMapper>) -> Self {
        Self {
            name: name.into(),
            id_field: "id".to_string(),
            mapper,
        }
    }

    /// Set the primary key field
    #[must_use]
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Plan for a configured entity using [`PassthroughMapper`]
    pub fn from_config(entity: &EntityConfig) -> Self {
        Self::new(
            entity.name.clone(),
            Arc::new(PassthroughMapper::from_entity(entity)),
        )
        .with_id_field(entity.id_field.clone())
    }
}

impl std::fmt::Debug for EntityPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityPlan")
            .field("name", &self.name)
            .field("id_field", &self.id_field)
            .finish_non_exhaustive()
    }
}

/// Progress of one entity, threaded through the round loop
struct EntityRun {
    cursor: Cursor,
    batch: BatchAccumulator,
    stats: SyncStats,
    phase: SyncPhase,
}

impl EntityRun {
    fn enter(&mut self, phase: SyncPhase) {
        if self.phase != phase {
            debug!("{}: {} -> {}", self.cursor.entity_type, self.phase, phase);
            self.phase = phase;
        }
    }
}

/// Sync orchestrator
pub struct SyncOrchestrator<S: ?Sized> {
    coordinator: ParallelFetchCoordinator<S>,
    destination: Arc<dyn Destination>,
    store: Arc<dyn CheckpointStore>,
    config: SyncConfig,
}

impl<S: PageSource + ?Sized> SyncOrchestrator<S> {
    /// Create an orchestrator
    pub fn new(
        source: Arc<S>,
        destination: Arc<dyn Destination>,
        store: Arc<dyn CheckpointStore>,
        config: SyncConfig,
    ) -> Self {
        let fetcher = PageFetcher::new(source, config.page_sizes.clone());
        let coordinator =
            ParallelFetchCoordinator::new(fetcher, config.page_size, config.parallel_requests);
        Self {
            coordinator,
            destination,
            store,
            config,
        }
    }

    /// Sync configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Sync every entity in order
    ///
    /// Entities already completed by an interrupted run with the same
    /// `sync_started_at` are skipped. When all entities finish, the
    /// completion markers are cleared and `last_sync_time` moves forward so
    /// the next run is incremental.
    pub async fn run(&self, plans: &[EntityPlan], run_config: &RunConfig) -> Result<SyncReport> {
        let started = Instant::now();
        let mut state = self.store.load().await?;

        let sync_started_at = if let Some(at) = state.sync_started_at() {
            info!("Resuming interrupted run started at {at}");
            at.to_string()
        } else {
            let now = Utc::now().to_rfc3339();
            state.set_sync_started_at(now.clone());
            now
        };

        let window = SyncWindow {
            modified_since: run_config
                .debug_start_date
                .clone()
                .or_else(|| state.last_sync_time().map(str::to_string)),
            modified_until: run_config.debug_end_date.clone(),
        };
        if run_config.is_debug_mode() {
            info!(
                "Debug window: {:?} to {:?}",
                window.modified_since, window.modified_until
            );
        }

        let mut report = SyncReport::default();
        for plan in plans {
            if state.is_complete(&plan.name) {
                info!("Skipping {}: already completed in this run", plan.name);
                report.skipped.push(plan.name.clone());
                continue;
            }
            let stats = self.sync_entity(plan, &mut state, &window).await?;
            report.entities.push(stats);
        }

        let last_sync_time = run_config
            .debug_end_date
            .clone()
            .unwrap_or(sync_started_at);
        state.clear_completion_markers();
        state.set_last_sync_time(last_sync_time.clone());
        state.clear_sync_started_at();
        self.store.checkpoint(&state).await?;

        report.last_sync_time = Some(last_sync_time);
        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            "Sync complete: {} records, {} error records across {} entities in {}ms",
            report.total_records(),
            report.total_errors(),
            report.entities.len(),
            report.duration_ms
        );
        Ok(report)
    }

    /// Sync one entity from its persisted cursor to the end of the stream
    ///
    /// `state` is updated in place and checkpointed after every flush. On
    /// a fatal error nothing from the in-flight round is checkpointed and
    /// the error is returned as [`Error::SyncFailed`].
    pub async fn sync_entity(
        &self,
        plan: &EntityPlan,
        state: &mut SyncState,
        window: &SyncWindow,
    ) -> Result<SyncStats> {
        let started = Instant::now();
        let mut run = EntityRun {
            cursor: state.load_cursor(&plan.name),
            batch: BatchAccumulator::new(self.config.batch_size),
            stats: SyncStats::new(&plan.name),
            phase: SyncPhase::Fresh,
        };
        info!(
            "Starting sync for {}: id_cursor={:?}, total_synced={}",
            plan.name, run.cursor.last_id, run.cursor.total_synced
        );

        if let Err(e) = self.drive(plan, state, window, &mut run).await {
            run.enter(SyncPhase::Failed);
            error!(
                "Sync of {} failed after {} records: {e}",
                plan.name, run.cursor.total_synced
            );
            return Err(Error::sync_failed(&plan.name, run.cursor.total_synced, e));
        }

        run.stats.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            "Completed sync for {}: {} records in {} rounds ({} requests, {} error records)",
            plan.name,
            run.stats.records_fetched,
            run.stats.rounds,
            run.stats.requests,
            run.stats.error_records
        );
        Ok(run.stats)
    }

    async fn drive(
        &self,
        plan: &EntityPlan,
        state: &mut SyncState,
        window: &SyncWindow,
        run: &mut EntityRun,
    ) -> Result<()> {
        let template = FetchWindow::new(&plan.name, self.config.page_size).with_modified_range(
            window.modified_since.clone(),
            window.modified_until.clone(),
        );

        loop {
            run.enter(SyncPhase::Fetching);
            let round = self
                .coordinator
                .fetch_round(&template, run.cursor.last_id, &plan.id_field)
                .await?;
            let RoundResult {
                records,
                errors,
                max_id_seen,
                reached_end,
                requests,
                ..
            } = round;

            run.stats.rounds += 1;
            run.stats.requests += requests;
            let error_count = errors.len();
            run.stats.error_records += error_count;

            // Flushes in here checkpoint the previous round's cursor; this
            // round's watermark only counts once all of it is accounted for.
            let mut flushed = false;
            for record in &records {
                run.batch.add(plan.mapper.map(record));
                if run.batch.should_flush() {
                    self.flush(state, run).await?;
                    flushed = true;
                }
            }
            for error_record in errors {
                run.batch
                    .add([error_record.into_table_row(&self.config.error_table)]);
                if run.batch.should_flush() {
                    self.flush(state, run).await?;
                    flushed = true;
                }
            }

            let previous = run.cursor.last_id;
            run.cursor.advance(max_id_seen, records.len());
            run.stats.records_fetched += records.len();

            if flushed && run.batch.is_empty() {
                self.write_checkpoint(state, run).await?;
            }

            if reached_end {
                break;
            }
            if run.cursor.last_id == previous {
                // Error rows still go out; the cursor stays put and the
                // entity stays incomplete so the next run retries from here.
                warn!(
                    "No progress for {} past id {:?} ({} error records in round)",
                    plan.name, previous, error_count
                );
                if !run.batch.is_empty() {
                    self.flush(state, run).await?;
                }
                return Err(Error::NoProgress {
                    entity: plan.name.clone(),
                    cursor: previous,
                    error_records: error_count,
                });
            }
        }

        run.enter(SyncPhase::Draining);
        if !run.batch.is_empty() {
            self.emit(run).await?;
        }

        run.enter(SyncPhase::Done);
        run.stats.total_synced = run.cursor.total_synced;
        state.mark_complete(&plan.name);
        self.store.checkpoint(state).await?;
        run.stats.checkpoints += 1;
        Ok(())
    }

    /// Emit the buffer, then checkpoint the cursor
    async fn flush(&self, state: &mut SyncState, run: &mut EntityRun) -> Result<()> {
        run.enter(SyncPhase::Flushing);
        self.emit(run).await?;
        self.write_checkpoint(state, run).await?;
        run.enter(SyncPhase::Fetching);
        Ok(())
    }

    async fn emit(&self, run: &mut EntityRun) -> Result<()> {
        let rows = run.batch.drain();
        info!(
            "Flushing {} rows for {}",
            rows.len(),
            run.cursor.entity_type
        );
        self.destination.emit(&rows).await?;
        run.stats.flushes += 1;
        run.stats.rows_emitted += rows.len();
        Ok(())
    }

    async fn write_checkpoint(&self, state: &mut SyncState, run: &mut EntityRun) -> Result<()> {
        state.save_cursor(&run.cursor);
        self.store.checkpoint(state).await?;
        run.stats.checkpoints += 1;
        debug!(
            "Checkpoint {}: id_cursor={:?}, total_synced={}",
            run.cursor.entity_type, run.cursor.last_id, run.cursor.total_synced
        );
        Ok(())
    }
}

impl<S: ?Sized> std::fmt::Debug for SyncOrchestrator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("coordinator", &self.coordinator)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
