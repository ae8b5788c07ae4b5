use chrono::NaiveDate;
use thiserror::Error;

use crate::types::VenueId;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Venue '{venue_id}' has change events but no inspection record to seed a baseline")]
    MissingBaseline { venue_id: VenueId },

    #[error("Unknown situation '{situation}' on change event for venue '{venue_id}' at {date}")]
    UnknownSituation {
        venue_id:  VenueId,
        date:      NaiveDate,
        situation: String,
    },

    #[error("Missing required field '{field}' for venue '{venue_id}' at {date}")]
    MissingField {
        venue_id: VenueId,
        date:     NaiveDate,
        field:    &'static str,
    },

    #[error("Rule needs a positive points_per_competitor, got {points_per_competitor}")]
    InvalidRule { points_per_competitor: i64 },

    #[error("Running totals for venue '{venue_id}' overflow at {date}")]
    CountOverflow { venue_id: VenueId, date: NaiveDate },

    #[error("Change event for venue '{found}' passed to replay of venue '{expected}'")]
    VenueMismatch { expected: VenueId, found: VenueId },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Stable short code, used as the event type suffix in the event log.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_)             => "database",
            Self::Serialization(_)        => "serialization",
            Self::MissingBaseline { .. }  => "missing_baseline",
            Self::UnknownSituation { .. } => "unknown_situation",
            Self::MissingField { .. }     => "missing_field",
            Self::InvalidRule { .. }      => "invalid_rule",
            Self::CountOverflow { .. }    => "count_overflow",
            Self::VenueMismatch { .. }    => "venue_mismatch",
            Self::Other(_)                => "other",
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
