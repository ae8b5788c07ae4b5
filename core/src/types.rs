//! Shared primitive types used across the crate.

/// A stable identifier for a venue, as issued by the source tables.
pub type VenueId = String;

/// The canonical run identifier.
pub type RunId = String;

/// Every record in the source tables is dated to the day.
pub type Timestamp = chrono::NaiveDate;
