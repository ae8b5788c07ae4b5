//! Venue compliance classification and quarterly state reconstruction.
//!
//! Two engines sit at the core:
//!   - `classification_engine`: per-inspection compliance rule.
//!   - `reconstruction_engine`: per-venue replay of the change log over a
//!     baseline inspection.
//!
//! `pipeline` drives both over a `dataset` and records the run in the
//! SQLite `store`; `report` projects the output for presentation.

pub mod batch;
pub mod change_event;
pub mod classification_engine;
pub mod config;
pub mod dataset;
pub mod error;
pub mod event;
pub mod inspection;
pub mod period;
pub mod pipeline;
pub mod reconstruction_engine;
pub mod report;
pub mod store;
pub mod types;
pub mod venue;

pub use classification_engine::{classify, ComplianceRule};
pub use error::{PipelineError, PipelineResult};
pub use reconstruction_engine::{reconstruct, reconstruct_all, Baseline};
