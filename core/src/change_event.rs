//! Change events: the per-venue delta log replayed by reconstruction.

use serde::{Deserialize, Serialize};

use crate::{
    error::{PipelineError, PipelineResult},
    types::{Timestamp, VenueId},
};

/// One row of the change-event table.
///
/// `situation` stays as the raw source tag; the reconstruction engine
/// parses it and rejects anything it does not recognise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub venue_id:       VenueId,
    pub date:           Timestamp,
    pub situation:      String,
    #[serde(default)]
    pub delta_points:   Option<i64>,
    #[serde(default)]
    pub delta_units:    Option<i64>,
    #[serde(default)]
    pub reason:         Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Situation {
    Change,
    Inactive,
}

impl Situation {
    /// Match a source tag, ignoring surrounding whitespace and ASCII case.
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        if tag.eq_ignore_ascii_case("change") {
            Some(Self::Change)
        } else if tag.eq_ignore_ascii_case("inactive") {
            Some(Self::Inactive)
        } else {
            None
        }
    }
}

impl ChangeEvent {
    pub fn situation(&self) -> PipelineResult<Situation> {
        Situation::parse(&self.situation).ok_or_else(|| PipelineError::UnknownSituation {
            venue_id:  self.venue_id.clone(),
            date:      self.date,
            situation: self.situation.clone(),
        })
    }

    /// Both deltas of a `change` event. Either one absent is an error.
    pub fn deltas(&self) -> PipelineResult<(i64, i64)> {
        let missing = |field| PipelineError::MissingField {
            venue_id: self.venue_id.clone(),
            date:     self.date,
            field,
        };
        let units = self.delta_units.ok_or_else(|| missing("delta_units"))?;
        let points = self.delta_points.ok_or_else(|| missing("delta_points"))?;
        Ok((units, points))
    }

    /// Total replay order: date first, then the event's content so that
    /// same-day events land in the same order whatever the input order.
    pub(crate) fn replay_key(&self) -> (Timestamp, &str, Option<i64>, Option<i64>, Option<&str>) {
        (
            self.date,
            self.situation.as_str(),
            self.delta_units,
            self.delta_points,
            self.reason.as_deref(),
        )
    }
}
