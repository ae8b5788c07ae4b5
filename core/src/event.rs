//! The pipeline event log.
//!
//! RULE: every stage outcome of a run is recorded as an event, including
//! every rejection. Nothing is skipped silently.

use crate::types::{RunId, VenueId};
use serde::{Deserialize, Serialize};

/// Every event emitted during a pipeline run.
/// Variants are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    // ── Run lifecycle ──────────────────────────────
    RunStarted {
        run_id:        RunId,
        inspections:   usize,
        change_events: usize,
    },
    RunCompleted {
        run_id:   RunId,
        clean:    bool,
        failures: usize,
    },
    RunAborted {
        run_id:   RunId,
        stage:    String,
        failures: usize,
    },

    // ── Classification stage ───────────────────────
    InspectionsClassified {
        classified:     usize,
        compliant:      usize,
        non_compliant:  usize,
        not_applicable: usize,
    },
    RecordRejected {
        venue_id: VenueId,
        code:     String,
        message:  String,
    },

    // ── Reconstruction stage ───────────────────────
    VenueReconstructed {
        venue_id: VenueId,
        records:  usize,
    },
    VenueRejected {
        venue_id: VenueId,
        code:     String,
        message:  String,
    },
}

impl PipelineEvent {
    /// Stable string name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunStarted { .. }            => "run_started",
            Self::RunCompleted { .. }          => "run_completed",
            Self::RunAborted { .. }            => "run_aborted",
            Self::InspectionsClassified { .. } => "inspections_classified",
            Self::RecordRejected { .. }        => "record_rejected",
            Self::VenueReconstructed { .. }    => "venue_reconstructed",
            Self::VenueRejected { .. }         => "venue_rejected",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub run_id:     RunId,
    pub seq:        u64,
    pub stage:      String,
    pub event_type: String,
    pub payload:    String, // JSON-serialized PipelineEvent
}
