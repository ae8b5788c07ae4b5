//! The audit pipeline: one run over one dataset.
//!
//! EXECUTION ORDER (fixed, never reordered):
//!   1. Classification   (every inspection record)
//!   2. Reconstruction   (every venue with change events)
//!
//! RULES:
//!   - Engines are pure; only this module persists and logs.
//!   - Every stage outcome is recorded in the event log.
//!   - With `fail_fast`, the first rejection aborts the run before any
//!     output of that stage is written. The abort itself is logged as
//!     `RunAborted` and the run row keeps its failure count.

use serde::Serialize;

use crate::{
    batch::{Batch, Rejection},
    config::PipelineConfig,
    dataset::Dataset,
    error::PipelineResult,
    event::{EventLogEntry, PipelineEvent},
    inspection::{ClassifiedInspection, ComplianceStatus},
    reconstruction_engine::{self, QuarterlyStateRecord},
    store::AuditStore,
    types::RunId,
};

pub const STAGE_RUN: &str = "run";
pub const STAGE_CLASSIFICATION: &str = "classification";
pub const STAGE_RECONSTRUCTION: &str = "reconstruction";

/// End-of-run counts, printed by the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id:             RunId,
    pub classified:         usize,
    pub rejected_records:   usize,
    pub reconstructed:      usize,
    pub venues_rebuilt:     usize,
    pub rejected_venues:    usize,
}

impl RunSummary {
    pub fn is_clean(&self) -> bool {
        self.rejected_records == 0 && self.rejected_venues == 0
    }
}

pub struct AuditPipeline {
    pub run_id: RunId,
    config:     PipelineConfig,
    store:      AuditStore,
    seq:        u64,
}

impl AuditPipeline {
    /// Fails if `config` does not validate.
    pub fn new(run_id: RunId, config: PipelineConfig, store: AuditStore) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self { run_id, config, store, seq: 0 })
    }

    /// Build a pipeline over a fresh, migrated in-memory store with the
    /// run already registered. For tests.
    pub fn build_test(run_id: RunId, config: PipelineConfig) -> PipelineResult<Self> {
        let store = AuditStore::in_memory()?;
        store.migrate()?;
        store.insert_run(&run_id, "test", "1970-01-01T00:00:00Z")?;
        Self::new(run_id, config, store)
    }

    pub fn store(&self) -> &AuditStore {
        &self.store
    }

    /// Run both stages over `dataset` and persist their output.
    pub fn run(&mut self, dataset: &Dataset) -> PipelineResult<RunSummary> {
        self.record(STAGE_RUN, PipelineEvent::RunStarted {
            run_id:        self.run_id.clone(),
            inspections:   dataset.inspections.len(),
            change_events: dataset.change_events.len(),
        })?;

        let classified = self.classify_stage(dataset)?;
        let reconstructed = self.reconstruct_stage(dataset)?;

        let summary = RunSummary {
            run_id:           self.run_id.clone(),
            classified:       classified.ok.len(),
            rejected_records: classified.failures.len(),
            reconstructed:    reconstructed.ok.len(),
            venues_rebuilt:   count_venues(&reconstructed.ok),
            rejected_venues:  reconstructed.failures.len(),
        };

        let failures = summary.rejected_records + summary.rejected_venues;
        self.record(STAGE_RUN, PipelineEvent::RunCompleted {
            run_id:   self.run_id.clone(),
            clean:    summary.is_clean(),
            failures,
        })?;
        self.store.complete_run(&self.run_id, failures)?;

        log::info!(
            "Run {} complete: {} classified, {} state records over {} venues, {} failures",
            self.run_id,
            summary.classified,
            summary.reconstructed,
            summary.venues_rebuilt,
            failures,
        );
        Ok(summary)
    }

    fn classify_stage(&mut self, dataset: &Dataset) -> PipelineResult<Batch<ClassifiedInspection>> {
        let mut batch = self.config.rule.classify_all(&dataset.inspections);
        if self.config.fail_fast && !batch.is_clean() {
            self.record_rejections(STAGE_CLASSIFICATION, &batch.failures, false)?;
            self.abort(STAGE_CLASSIFICATION, batch.failures.len())?;
            if let Some(rejection) = batch.failures.drain(..).next() {
                return Err(rejection.error);
            }
        }

        for row in &batch.ok {
            self.store.insert_classified_inspection(&self.run_id, row)?;
        }
        let count = |status: ComplianceStatus| batch.ok.iter().filter(|c| c.status() == status).count();
        let event = PipelineEvent::InspectionsClassified {
            classified:     batch.ok.len(),
            compliant:      count(ComplianceStatus::Compliant),
            non_compliant:  count(ComplianceStatus::NonCompliant),
            not_applicable: count(ComplianceStatus::NotApplicable),
        };
        self.record(STAGE_CLASSIFICATION, event)?;
        self.record_rejections(STAGE_CLASSIFICATION, &batch.failures, false)?;

        log::info!(
            "Classification: {} records classified, {} rejected",
            batch.ok.len(),
            batch.failures.len()
        );
        Ok(batch)
    }

    fn reconstruct_stage(&mut self, dataset: &Dataset) -> PipelineResult<Batch<QuarterlyStateRecord>> {
        let mut batch = reconstruction_engine::reconstruct_all(&dataset.inspections, &dataset.change_events);
        if self.config.fail_fast && !batch.is_clean() {
            self.record_rejections(STAGE_RECONSTRUCTION, &batch.failures, true)?;
            self.abort(STAGE_RECONSTRUCTION, batch.failures.len())?;
            if let Some(rejection) = batch.failures.drain(..).next() {
                return Err(rejection.error);
            }
        }

        // Output is grouped by venue already; persist venue by venue.
        for series in batch.ok.chunk_by(|a, b| a.venue_id == b.venue_id) {
            self.store.insert_quarterly_states(&self.run_id, series)?;
            let venue_id = series[0].venue_id.clone();
            log::debug!("Reconstructed {} state records for venue {venue_id}", series.len());
            self.record(STAGE_RECONSTRUCTION, PipelineEvent::VenueReconstructed {
                venue_id,
                records: series.len(),
            })?;
        }
        self.record_rejections(STAGE_RECONSTRUCTION, &batch.failures, true)?;

        log::info!(
            "Reconstruction: {} state records, {} venues rejected",
            batch.ok.len(),
            batch.failures.len()
        );
        Ok(batch)
    }

    /// Close the ledger of a run stopped by `fail_fast`.
    fn abort(&mut self, stage: &'static str, failures: usize) -> PipelineResult<()> {
        log::warn!("Run {} aborted in {stage} after {failures} rejections", self.run_id);
        self.record(STAGE_RUN, PipelineEvent::RunAborted {
            run_id: self.run_id.clone(),
            stage:  stage.to_string(),
            failures,
        })?;
        self.store.abort_run(&self.run_id, failures)
    }

    fn record_rejections(
        &mut self,
        stage:     &'static str,
        failures:  &[Rejection],
        per_venue: bool,
    ) -> PipelineResult<()> {
        for rejection in failures {
            log::warn!("{stage}: rejected venue {}: {}", rejection.venue_id, rejection.error);
            let venue_id = rejection.venue_id.clone();
            let code = rejection.error.code().to_string();
            let message = rejection.error.to_string();
            let event = if per_venue {
                PipelineEvent::VenueRejected { venue_id, code, message }
            } else {
                PipelineEvent::RecordRejected { venue_id, code, message }
            };
            self.record(stage, event)?;
        }
        Ok(())
    }

    /// Persist one event to the log.
    fn record(&mut self, stage: &'static str, event: PipelineEvent) -> PipelineResult<()> {
        self.seq += 1;
        let entry = EventLogEntry {
            id:         None,
            run_id:     self.run_id.clone(),
            seq:        self.seq,
            stage:      stage.to_string(),
            event_type: event.type_name().to_string(),
            payload:    serde_json::to_string(&event)?,
        };
        self.store.append_event(&entry)
    }

    // ── Read-back helpers for the runner and tests ────────────

    pub fn store_classified_inspections(&self, venue_id: Option<&str>) -> PipelineResult<Vec<ClassifiedInspection>> {
        self.store.classified_inspections(&self.run_id, venue_id)
    }

    pub fn store_quarterly_states(&self, venue_id: Option<&str>) -> PipelineResult<Vec<QuarterlyStateRecord>> {
        self.store.quarterly_states(&self.run_id, venue_id)
    }

    pub fn store_events(&self) -> PipelineResult<Vec<EventLogEntry>> {
        self.store.events_for_run(&self.run_id)
    }
}

fn count_venues(series: &[QuarterlyStateRecord]) -> usize {
    series.chunk_by(|a, b| a.venue_id == b.venue_id).count()
}
