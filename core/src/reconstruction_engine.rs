//! Quarterly state reconstruction engine.
//!
//! A venue's operational footprint is never stored as an absolute value.
//! It is rebuilt by folding the venue's change log over a baseline taken
//! from its earliest inspection:
//!
//!   - `change`   adds both deltas to the running totals and emits them.
//!   - `inactive` emits no totals and leaves the running totals frozen, so
//!     a later `change` resumes from the last active count.
//!
//! RULES:
//!   - Events are replayed in date order, always sorted here first.
//!   - The baseline itself is never emitted.
//!   - Venues are independent; the fold is sequential only within one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    batch::Batch,
    change_event::{ChangeEvent, Situation},
    error::{PipelineError, PipelineResult},
    inspection::InspectionRecord,
    period::Period,
    types::{Timestamp, VenueId},
};

/// The two counters carried through a venue's replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningTotals {
    pub total_units:       i64,
    pub dispensing_points: i64,
}

impl RunningTotals {
    /// `None` if either counter would overflow.
    pub fn apply(self, delta_units: i64, delta_points: i64) -> Option<Self> {
        Some(Self {
            total_units:       self.total_units.checked_add(delta_units)?,
            dispensing_points: self.dispensing_points.checked_add(delta_points)?,
        })
    }
}

/// Seed totals for one venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    pub venue_id:    VenueId,
    pub observed_on: Timestamp,
    pub totals:      RunningTotals,
}

impl Baseline {
    pub fn from_inspection(record: &InspectionRecord) -> PipelineResult<Self> {
        Ok(Self {
            venue_id:    record.venue_id.clone(),
            observed_on: record.date,
            totals: RunningTotals {
                total_units:       record.require(record.total_units, "total_units")?,
                dispensing_points: record.require(
                    record.total_dispensing_points,
                    "total_dispensing_points",
                )?,
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationalState {
    Active,
    Inactive,
}

impl OperationalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active   => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active"   => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _          => None,
        }
    }
}

/// One point of a venue's reconstructed series.
///
/// `totals` is `Some` exactly when `state` is `Active`; `reason` only ever
/// accompanies `Inactive`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterlyStateRecord {
    pub venue_id: VenueId,
    pub date:     Timestamp,
    pub period:   Period,
    pub state:    OperationalState,
    pub reason:   Option<String>,
    pub totals:   Option<RunningTotals>,
}

impl QuarterlyStateRecord {
    pub fn total_units(&self) -> Option<i64> {
        self.totals.map(|t| t.total_units)
    }

    pub fn dispensing_points(&self) -> Option<i64> {
        self.totals.map(|t| t.dispensing_points)
    }
}

/// Replay one venue's change log over its baseline.
///
/// `events` may arrive in any order and must all belong to the baseline's
/// venue. Any unknown situation or missing delta aborts the whole replay.
pub fn reconstruct(
    baseline: &Baseline,
    events:   &[ChangeEvent],
) -> PipelineResult<Vec<QuarterlyStateRecord>> {
    let mut ordered: Vec<&ChangeEvent> = events.iter().collect();
    ordered.sort_by(|a, b| a.replay_key().cmp(&b.replay_key()));

    let mut totals = baseline.totals;
    let mut series = Vec::with_capacity(ordered.len());

    for event in ordered {
        if event.venue_id != baseline.venue_id {
            return Err(PipelineError::VenueMismatch {
                expected: baseline.venue_id.clone(),
                found:    event.venue_id.clone(),
            });
        }

        let record = match event.situation()? {
            Situation::Change => {
                let (delta_units, delta_points) = event.deltas()?;
                totals = totals.apply(delta_units, delta_points).ok_or_else(|| {
                    PipelineError::CountOverflow {
                        venue_id: event.venue_id.clone(),
                        date:     event.date,
                    }
                })?;
                QuarterlyStateRecord {
                    venue_id: event.venue_id.clone(),
                    date:     event.date,
                    period:   Period::of(event.date),
                    state:    OperationalState::Active,
                    reason:   None,
                    totals:   Some(totals),
                }
            }
            Situation::Inactive => QuarterlyStateRecord {
                venue_id: event.venue_id.clone(),
                date:     event.date,
                period:   Period::of(event.date),
                state:    OperationalState::Inactive,
                reason:   event.reason.clone(),
                totals:   None,
            },
        };
        series.push(record);
    }

    Ok(series)
}

/// Partition a global change-event table by venue.
///
/// Input order is preserved within each venue; venues iterate in
/// ascending identity order.
pub fn group_by_venue(events: &[ChangeEvent]) -> BTreeMap<&str, Vec<ChangeEvent>> {
    let mut groups: BTreeMap<&str, Vec<ChangeEvent>> = BTreeMap::new();
    for event in events {
        groups.entry(event.venue_id.as_str()).or_default().push(event.clone());
    }
    groups
}

/// The earliest inspection per venue; the first listed wins on a tie.
pub fn select_baselines(inspections: &[InspectionRecord]) -> BTreeMap<&str, &InspectionRecord> {
    let mut earliest: BTreeMap<&str, &InspectionRecord> = BTreeMap::new();
    for record in inspections {
        earliest
            .entry(record.venue_id.as_str())
            .and_modify(|current| {
                if record.date < current.date {
                    *current = record;
                }
            })
            .or_insert(record);
    }
    earliest
}

/// Reconstruct every venue that has change events.
///
/// A venue without an inspection, with an unusable baseline, or with a bad
/// event is rejected as a whole; other venues are unaffected. Output is
/// concatenated in ascending venue order.
pub fn reconstruct_all(
    inspections: &[InspectionRecord],
    events:      &[ChangeEvent],
) -> Batch<QuarterlyStateRecord> {
    let baselines = select_baselines(inspections);
    let mut batch = Batch::default();

    for (venue_id, venue_events) in group_by_venue(events) {
        let result = baselines
            .get(venue_id)
            .ok_or_else(|| PipelineError::MissingBaseline { venue_id: venue_id.to_string() })
            .and_then(|record| Baseline::from_inspection(record))
            .and_then(|baseline| reconstruct(&baseline, &venue_events));

        match result {
            Ok(series) => batch.ok.extend(series),
            Err(e) => batch.reject(venue_id.to_string(), e),
        }
    }

    batch
}
