//! Venue reference data and contract records.
//!
//! Both are owned by the source tables and pass through the engines
//! untouched. They are only joined onto engine output for reporting.

use serde::{Deserialize, Serialize};

use crate::types::VenueId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    pub venue_id:   VenueId,
    pub legal_name: String,
    pub tax_id:     String,
    pub address:    String,
    pub city:       String,
    pub region:     String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub venue_id:          VenueId,
    #[serde(default)]
    pub expiring_soon:     bool,
    #[serde(default)]
    pub days_remaining:    Option<i64>,
    #[serde(default)]
    pub terminated:        bool,
    #[serde(default)]
    pub termination_note:  Option<String>,
}
