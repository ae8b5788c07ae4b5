//! Source tables as handed over by the ingestion layer.
//!
//! The engines only ever see in-memory slices; this module is the one
//! place that knows the tables live as JSON files under a data directory.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{
    change_event::ChangeEvent,
    inspection::InspectionRecord,
    venue::{ContractRecord, Venue},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub venues:        Vec<Venue>,
    pub inspections:   Vec<InspectionRecord>,
    pub change_events: Vec<ChangeEvent>,
    pub contracts:     Vec<ContractRecord>,
}

impl Dataset {
    /// Load all four tables from `data_dir`. `contracts.json` is optional.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let venues: Vec<Venue> = read_table(data_dir, "venues.json")?;
        let inspections: Vec<InspectionRecord> = read_table(data_dir, "inspections.json")?;
        let change_events: Vec<ChangeEvent> = read_table(data_dir, "change_events.json")?;

        let contracts = if Path::new(&format!("{data_dir}/contracts.json")).exists() {
            read_table(data_dir, "contracts.json")?
        } else {
            log::info!("No contracts.json in {data_dir}; continuing without contracts");
            Vec::new()
        };

        log::info!(
            "Loaded dataset from {data_dir}: {} venues, {} inspections, {} change events, {} contracts",
            venues.len(),
            inspections.len(),
            change_events.len(),
            contracts.len(),
        );

        Ok(Self { venues, inspections, change_events, contracts })
    }

    pub fn venue(&self, venue_id: &str) -> Option<&Venue> {
        self.venues.iter().find(|v| v.venue_id == venue_id)
    }
}

fn read_table<T: DeserializeOwned>(data_dir: &str, file: &str) -> anyhow::Result<Vec<T>> {
    let path = format!("{data_dir}/{file}");
    let content = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    let rows = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid table {path}: {e}"))?;
    Ok(rows)
}
