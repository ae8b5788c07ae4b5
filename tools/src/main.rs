//! venue-runner: headless audit run over a data directory.
//!
//! Usage:
//!   venue-runner --data-dir ./data --db audit.db
//!   venue-runner --data-dir ./data --period 2024-Q3 --venue L-001
//!   venue-runner --data-dir ./data --json

use anyhow::Result;
use std::env;
use venue_audit_core::{
    config::PipelineConfig,
    dataset::Dataset,
    inspection::ClassifiedInspection,
    period::Period,
    pipeline::{AuditPipeline, RunSummary},
    reconstruction_engine::QuarterlyStateRecord,
    report,
    store::AuditStore,
};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let data_dir = arg_value(&args, "--data-dir").unwrap_or("./data");
    let db = arg_value(&args, "--db").unwrap_or(":memory:");
    let venue = arg_value(&args, "--venue");
    let period = arg_value(&args, "--period")
        .map(|p| p.parse::<Period>().map_err(anyhow::Error::msg))
        .transpose()?;
    let json = args.iter().any(|a| a == "--json");

    if !json {
        println!("venue-runner");
        println!("  data_dir:  {data_dir}");
        println!("  db:        {db}");
        println!();
    }

    let config = PipelineConfig::load_or_default(data_dir)?;
    let dataset = Dataset::load(data_dir)?;

    let store = AuditStore::open(db)?;
    store.migrate()?;

    let run_id = format!("run-{}", uuid::Uuid::new_v4());
    store.insert_run(&run_id, env!("CARGO_PKG_VERSION"), &now_utc())?;

    let mut pipeline = AuditPipeline::new(run_id, config, store)?;
    let summary = pipeline.run(&dataset)?;

    let classified = pipeline.store_classified_inspections(None)?;
    let states = pipeline.store_quarterly_states(None)?;

    if json {
        print_json(&summary, &classified, &states)?;
    } else {
        print_summary(&summary, &classified, period);
        if let Some(venue_id) = venue {
            print_venue(&dataset, &classified, &states, venue_id);
        }
    }

    Ok(())
}

fn print_json(
    summary:    &RunSummary,
    classified: &[ClassifiedInspection],
    states:     &[QuarterlyStateRecord],
) -> Result<()> {
    let out = serde_json::json!({
        "summary":     summary,
        "inspections": classified,
        "states":      states,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn print_summary(summary: &RunSummary, classified: &[ClassifiedInspection], period: Option<Period>) {
    println!("=== RUN SUMMARY ===");
    println!("  run_id:           {}", summary.run_id);
    println!("  classified:       {}", summary.classified);
    println!("  rejected records: {}", summary.rejected_records);
    println!("  state records:    {}", summary.reconstructed);
    println!("  venues rebuilt:   {}", summary.venues_rebuilt);
    println!("  rejected venues:  {}", summary.rejected_venues);

    println!();
    let period = period.or_else(|| report::periods_desc(classified).first().copied());
    match period {
        None => println!("  (No inspections classified)"),
        Some(p) => {
            println!("=== COMPLIANCE {p} ===");
            for (status, count) in report::status_counts(classified, Some(p)) {
                println!("  {:<28} {count}", status.as_str());
            }
        }
    }
}

fn print_venue(
    dataset:    &Dataset,
    classified: &[ClassifiedInspection],
    states:     &[QuarterlyStateRecord],
    venue_id:   &str,
) {
    println!();
    let Some(venue) = dataset.venue(venue_id) else {
        println!("Unknown venue: {venue_id}");
        return;
    };
    println!("=== VENUE {} ===", venue.venue_id);
    println!("  {} | tax id {}", venue.legal_name, venue.tax_id);
    println!("  {} - {} - {}", venue.address, venue.city, venue.region);
    if let Some(status) = report::latest_status(classified, venue_id) {
        println!("  latest status: {status}");
    }

    println!();
    println!("  period    state     units  points  reason");
    for s in report::venue_series(states, venue_id) {
        println!(
            "  {:<9} {:<9} {:>5}  {:>6}  {}",
            s.period.to_string(),
            s.state.as_str(),
            fmt_count(s.total_units()),
            fmt_count(s.dispensing_points()),
            s.reason.as_deref().unwrap_or("-"),
        );
    }

    let contracts = report::contracts_for_venue(&dataset.contracts, venue_id);
    if !contracts.is_empty() {
        println!();
        for c in contracts {
            let days = c.days_remaining.map_or("-".to_string(), |d| d.to_string());
            println!(
                "  contract: expiring soon {} | days remaining {days} | terminated {}",
                c.expiring_soon, c.terminated
            );
        }
    }
}

fn fmt_count(value: Option<i64>) -> String {
    value.map_or("-".to_string(), |v| v.to_string())
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn now_utc() -> String {
    chrono::Utc::now().to_rfc3339()
}
