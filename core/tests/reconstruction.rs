//! Quarterly state reconstruction tests.
//!
//! Tests cover: the canonical replay scenario, the freeze invariant,
//! baseline selection, every rejection path, and order independence.

use chrono::{Duration, NaiveDate};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use venue_audit_core::{
    change_event::ChangeEvent,
    error::PipelineError,
    inspection::InspectionRecord,
    reconstruction_engine::{
        group_by_venue, reconstruct, reconstruct_all, select_baselines, Baseline,
        OperationalState, RunningTotals,
    },
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn baseline(venue_id: &str, units: i64, points: i64) -> Baseline {
    Baseline {
        venue_id:    venue_id.into(),
        observed_on: date(2024, 1, 5),
        totals:      RunningTotals { total_units: units, dispensing_points: points },
    }
}

fn change(venue_id: &str, on: NaiveDate, units: i64, points: i64) -> ChangeEvent {
    ChangeEvent {
        venue_id:     venue_id.into(),
        date:         on,
        situation:    "change".into(),
        delta_points: Some(points),
        delta_units:  Some(units),
        reason:       None,
    }
}

fn inactive(venue_id: &str, on: NaiveDate, reason: &str) -> ChangeEvent {
    ChangeEvent {
        venue_id:     venue_id.into(),
        date:         on,
        situation:    "inactive".into(),
        delta_points: None,
        delta_units:  None,
        reason:       Some(reason.into()),
    }
}

fn inspection(venue_id: &str, on: NaiveDate, units: i64, points: i64) -> InspectionRecord {
    InspectionRecord {
        venue_id:                venue_id.into(),
        date:                    on,
        total_dispensing_points: Some(points),
        reference_brand_count:   Some(points),
        competitor_brand_count:  Some(0),
        total_units:             Some(units),
        detected_brands:         Vec::new(),
    }
}

#[test]
fn change_inactive_change_scenario() {
    let events = vec![
        change("L-1", date(2024, 3, 31), 2, 0),
        inactive("L-1", date(2024, 6, 30), "closed"),
        change("L-1", date(2024, 9, 30), 1, 1),
    ];
    let series = reconstruct(&baseline("L-1", 10, 4), &events).unwrap();
    assert_eq!(series.len(), 3);

    assert_eq!(series[0].state, OperationalState::Active);
    assert_eq!(series[0].total_units(), Some(12));
    assert_eq!(series[0].dispensing_points(), Some(4));
    assert_eq!(series[0].reason, None);
    assert_eq!(series[0].period.label(), "2024-Q1");

    assert_eq!(series[1].state, OperationalState::Inactive);
    assert_eq!(series[1].totals, None);
    assert_eq!(series[1].reason.as_deref(), Some("closed"));
    assert_eq!(series[1].period.label(), "2024-Q2");

    assert_eq!(series[2].state, OperationalState::Active);
    assert_eq!(series[2].total_units(), Some(13));
    assert_eq!(series[2].dispensing_points(), Some(5));
    assert_eq!(series[2].period.label(), "2024-Q3");
}

#[test]
fn inactive_step_freezes_the_totals() {
    let events = vec![
        inactive("L-1", date(2024, 2, 1), "renovation"),
        change("L-1", date(2024, 5, 1), 2, 1),
    ];
    let series = reconstruct(&baseline("L-1", 7, 3), &events).unwrap();
    assert_eq!(
        series[1].totals,
        Some(RunningTotals { total_units: 9, dispensing_points: 4 }),
        "Reactivation must resume from the baseline, not from zero"
    );
}

#[test]
fn baseline_is_never_emitted() {
    assert!(reconstruct(&baseline("L-1", 7, 3), &[]).unwrap().is_empty());
}

#[test]
fn unsorted_input_is_replayed_chronologically() {
    let events = vec![
        change("L-1", date(2024, 9, 30), 1, 1),
        change("L-1", date(2024, 3, 31), 2, 0),
    ];
    let series = reconstruct(&baseline("L-1", 10, 4), &events).unwrap();
    assert_eq!(series[0].date, date(2024, 3, 31));
    assert_eq!(series[0].total_units(), Some(12));
    assert_eq!(series[1].total_units(), Some(13));
}

#[test]
fn unknown_situation_is_rejected() {
    let mut event = change("L-1", date(2024, 3, 31), 1, 1);
    event.situation = "variation".into();
    match reconstruct(&baseline("L-1", 1, 1), &[event]) {
        Err(PipelineError::UnknownSituation { situation, venue_id, .. }) => {
            assert_eq!(situation, "variation");
            assert_eq!(venue_id, "L-1");
        }
        other => panic!("Expected UnknownSituation, got {other:?}"),
    }
}

#[test]
fn situation_tags_ignore_case_and_padding() {
    let mut event = change("L-1", date(2024, 3, 31), 1, 0);
    event.situation = " Change ".into();
    let series = reconstruct(&baseline("L-1", 1, 1), &[event]).unwrap();
    assert_eq!(series[0].total_units(), Some(2));
}

#[test]
fn change_without_delta_is_rejected() {
    let mut event = change("L-1", date(2024, 3, 31), 1, 1);
    event.delta_units = None;
    let err = reconstruct(&baseline("L-1", 1, 1), &[event]).unwrap_err();
    assert!(
        matches!(err, PipelineError::MissingField { field: "delta_units", .. }),
        "Unexpected error: {err}"
    );
}

#[test]
fn events_of_another_venue_are_rejected() {
    let events = vec![change("L-2", date(2024, 3, 31), 1, 1)];
    let err = reconstruct(&baseline("L-1", 1, 1), &events).unwrap_err();
    assert_eq!(err.code(), "venue_mismatch");
}

#[test]
fn baseline_needs_both_counts() {
    let mut record = inspection("L-1", date(2024, 1, 1), 3, 4);
    record.total_units = None;
    let err = Baseline::from_inspection(&record).unwrap_err();
    assert!(matches!(err, PipelineError::MissingField { field: "total_units", .. }));
}

#[test]
fn overflowing_totals_are_rejected() {
    let events = vec![change("L-1", date(2024, 3, 31), 1, 0)];
    let err = reconstruct(&baseline("L-1", i64::MAX, 4), &events).unwrap_err();
    assert!(
        matches!(err, PipelineError::CountOverflow { ref venue_id, date: on }
            if venue_id == "L-1" && on == date(2024, 3, 31)),
        "Unexpected error: {err}"
    );

    let events = vec![change("L-1", date(2024, 3, 31), 0, -1)];
    let err = reconstruct(&baseline("L-1", 4, i64::MIN), &events).unwrap_err();
    assert_eq!(err.code(), "count_overflow");
}

#[test]
fn earliest_inspection_seeds_the_baseline() {
    let inspections = vec![
        inspection("L-1", date(2024, 7, 1), 99, 99),
        inspection("L-1", date(2024, 1, 1), 10, 4),
        inspection("L-2", date(2024, 2, 1), 5, 2),
    ];
    let baselines = select_baselines(&inspections);
    assert_eq!(baselines.len(), 2);
    assert_eq!(baselines["L-1"].date, date(2024, 1, 1));
    assert_eq!(baselines["L-1"].total_units, Some(10));
}

#[test]
fn missing_baseline_is_reported_never_zeroed() {
    let inspections = vec![inspection("L-1", date(2024, 1, 1), 10, 4)];
    let events = vec![
        change("L-1", date(2024, 3, 31), 1, 0),
        change("L-GHOST", date(2024, 3, 31), 5, 5),
    ];
    let batch = reconstruct_all(&inspections, &events);

    assert_eq!(batch.ok.len(), 1, "The healthy venue must still be rebuilt");
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].venue_id, "L-GHOST");
    assert!(matches!(
        batch.failures[0].error,
        PipelineError::MissingBaseline { ref venue_id } if venue_id == "L-GHOST"
    ));
    assert!(batch.into_result().is_err());
}

#[test]
fn venues_without_events_produce_nothing() {
    let inspections = vec![
        inspection("L-1", date(2024, 1, 1), 10, 4),
        inspection("L-2", date(2024, 1, 1), 3, 2),
    ];
    let events = vec![change("L-1", date(2024, 3, 31), 1, 0)];
    let batch = reconstruct_all(&inspections, &events);
    assert!(batch.is_clean());
    assert!(batch.ok.iter().all(|r| r.venue_id == "L-1"));
}

#[test]
fn grouping_keeps_per_venue_input_order() {
    let events = vec![
        change("L-2", date(2024, 6, 1), 1, 0),
        change("L-1", date(2024, 5, 1), 1, 0),
        change("L-2", date(2024, 1, 1), 2, 0),
    ];
    let groups = group_by_venue(&events);
    let venues: Vec<&str> = groups.keys().copied().collect();
    assert_eq!(venues, vec!["L-1", "L-2"]);
    assert_eq!(groups["L-2"][0].date, date(2024, 6, 1));
    assert_eq!(groups["L-2"][1].date, date(2024, 1, 1));
}

#[test]
fn shuffled_global_table_gives_identical_output() {
    let inspections = vec![
        inspection("L-1", date(2024, 1, 1), 10, 4),
        inspection("L-2", date(2024, 1, 1), 6, 6),
    ];
    let mut events = vec![
        change("L-1", date(2024, 3, 31), 2, 0),
        inactive("L-1", date(2024, 6, 30), "closed"),
        change("L-1", date(2024, 9, 30), 1, 1),
        change("L-2", date(2024, 3, 31), -1, -2),
        change("L-2", date(2024, 3, 31), 3, 1),
        inactive("L-2", date(2024, 12, 31), "sold"),
    ];
    let expected = reconstruct_all(&inspections, &events).into_result().unwrap();

    let mut rng = Pcg64Mcg::seed_from_u64(0x5EED_CAFE);
    for round in 0..20 {
        events.shuffle(&mut rng);
        let actual = reconstruct_all(&inspections, &events).into_result().unwrap();
        assert_eq!(actual, expected, "Output diverged on shuffle round {round}");
    }
}

fn arb_events() -> impl Strategy<Value = Vec<ChangeEvent>> {
    prop::collection::vec((0i64..400, any::<bool>(), -5i64..6, -5i64..6), 0..40).prop_map(|rows| {
        rows.into_iter()
            .map(|(offset, is_change, units, points)| {
                let on = date(2024, 1, 1) + Duration::days(offset);
                if is_change {
                    change("L-P", on, units, points)
                } else {
                    inactive("L-P", on, "closed")
                }
            })
            .collect()
    })
}

proptest! {
    /// Property: the replay does not depend on input order.
    #[test]
    fn replay_is_order_independent(events in arb_events(), seed in any::<u64>()) {
        let base = baseline("L-P", 10, 4);
        let expected = reconstruct(&base, &events).unwrap();

        let mut shuffled = events.clone();
        shuffled.shuffle(&mut Pcg64Mcg::seed_from_u64(seed));
        prop_assert_eq!(reconstruct(&base, &shuffled).unwrap(), expected);
    }

    /// Property: one output per event, and the last active totals are the
    /// baseline plus every change delta. Inactive steps contribute nothing.
    #[test]
    fn final_totals_sum_all_changes(events in arb_events()) {
        let base = baseline("L-P", 10, 4);
        let series = reconstruct(&base, &events).unwrap();
        prop_assert_eq!(series.len(), events.len());

        let changes: Vec<&ChangeEvent> = events.iter().filter(|e| e.situation == "change").collect();
        if let Some(last) = series.iter().rev().find_map(|r| r.totals) {
            let units: i64 = changes.iter().map(|e| e.delta_units.unwrap()).sum();
            let points: i64 = changes.iter().map(|e| e.delta_points.unwrap()).sum();
            prop_assert_eq!(last, RunningTotals { total_units: 10 + units, dispensing_points: 4 + points });
        } else {
            prop_assert!(changes.is_empty());
        }

        for record in &series {
            prop_assert_eq!(record.totals.is_some(), record.state == OperationalState::Active);
            prop_assert_eq!(record.reason.is_some(), record.state == OperationalState::Inactive);
        }
    }
}
