//! Reporting views over engine output.
//!
//! Everything here is a read-only projection for the presentation layer:
//! left joins onto venue metadata, per-period status counts, and the
//! per-venue lookups the venue detail page needs.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::{
    inspection::{ClassifiedInspection, ComplianceStatus},
    period::Period,
    reconstruction_engine::QuarterlyStateRecord,
    venue::{ContractRecord, Venue},
};

/// A classified inspection with its venue metadata, if the venue is known.
#[derive(Debug, Clone, Serialize)]
pub struct InspectionRow<'a> {
    pub inspection: &'a ClassifiedInspection,
    pub venue:      Option<&'a Venue>,
}

/// A reconstructed state record with its venue metadata, if known.
#[derive(Debug, Clone, Serialize)]
pub struct StateRow<'a> {
    pub state: &'a QuarterlyStateRecord,
    pub venue: Option<&'a Venue>,
}

fn index_venues(venues: &[Venue]) -> HashMap<&str, &Venue> {
    venues.iter().map(|v| (v.venue_id.as_str(), v)).collect()
}

/// Left join: every inspection is kept, unknown venues join as `None`.
pub fn join_inspections<'a>(
    classified: &'a [ClassifiedInspection],
    venues:     &'a [Venue],
) -> Vec<InspectionRow<'a>> {
    let index = index_venues(venues);
    classified
        .iter()
        .map(|inspection| InspectionRow {
            inspection,
            venue: index.get(inspection.venue_id()).copied(),
        })
        .collect()
}

/// Left join: every state record is kept, unknown venues join as `None`.
pub fn join_states<'a>(
    states: &'a [QuarterlyStateRecord],
    venues: &'a [Venue],
) -> Vec<StateRow<'a>> {
    let index = index_venues(venues);
    states
        .iter()
        .map(|state| StateRow {
            state,
            venue: index.get(state.venue_id.as_str()).copied(),
        })
        .collect()
}

/// Distinct inspection periods, newest first.
pub fn periods_desc(classified: &[ClassifiedInspection]) -> Vec<Period> {
    let periods: BTreeSet<Period> = classified.iter().map(|c| c.period).collect();
    periods.into_iter().rev().collect()
}

/// Count of inspections per status, for one period or across all of them.
/// Every status is present, zero when unseen.
pub fn status_counts(
    classified: &[ClassifiedInspection],
    period:     Option<Period>,
) -> BTreeMap<ComplianceStatus, usize> {
    let mut counts: BTreeMap<ComplianceStatus, usize> =
        ComplianceStatus::ALL.into_iter().map(|s| (s, 0)).collect();
    for c in classified {
        if period.is_some_and(|p| p != c.period) {
            continue;
        }
        *counts.entry(c.status()).or_insert(0) += 1;
    }
    counts
}

/// Status of the venue's most recent inspection.
pub fn latest_status(classified: &[ClassifiedInspection], venue_id: &str) -> Option<ComplianceStatus> {
    classified
        .iter()
        .filter(|c| c.venue_id() == venue_id)
        .max_by_key(|c| c.record.date)
        .map(|c| c.status())
}

/// Distinct regions, sorted.
pub fn regions(venues: &[Venue]) -> Vec<&str> {
    let set: BTreeSet<&str> = venues.iter().map(|v| v.region.as_str()).collect();
    set.into_iter().collect()
}

/// Venues in `region`, or all venues for `None`, sorted by identity.
pub fn venues_in_region<'a>(venues: &'a [Venue], region: Option<&str>) -> Vec<&'a Venue> {
    let mut selected: Vec<&Venue> = venues
        .iter()
        .filter(|v| region.map_or(true, |r| v.region == r))
        .collect();
    selected.sort_by(|a, b| a.venue_id.cmp(&b.venue_id));
    selected
}

pub fn contracts_for_venue<'a>(contracts: &'a [ContractRecord], venue_id: &str) -> Vec<&'a ContractRecord> {
    contracts.iter().filter(|c| c.venue_id == venue_id).collect()
}

/// One venue's reconstructed series, in replay order.
pub fn venue_series<'a>(states: &'a [QuarterlyStateRecord], venue_id: &str) -> Vec<&'a QuarterlyStateRecord> {
    states.iter().filter(|s| s.venue_id == venue_id).collect()
}
