//! Inspection records: point-in-time equipment counts for a venue.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    error::{PipelineError, PipelineResult},
    period::Period,
    types::{Timestamp, VenueId},
};

/// One inspection of one venue, as supplied by the source table.
///
/// Count fields are optional at the boundary: a blank cell is reported as
/// a missing-field error by whichever engine needs it, never read as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionRecord {
    pub venue_id:               VenueId,
    pub date:                   Timestamp,
    #[serde(default)]
    pub total_dispensing_points: Option<i64>,
    #[serde(default)]
    pub reference_brand_count:  Option<i64>,
    #[serde(default)]
    pub competitor_brand_count: Option<i64>,
    /// Dispensing units on site; seeds the reconstruction baseline.
    #[serde(default)]
    pub total_units:            Option<i64>,
    #[serde(default)]
    pub detected_brands:        Vec<String>,
}

impl InspectionRecord {
    pub fn period(&self) -> Period {
        Period::of(self.date)
    }

    /// Read a count that the caller cannot proceed without.
    pub(crate) fn require(
        &self,
        value: Option<i64>,
        field: &'static str,
    ) -> PipelineResult<i64> {
        value.ok_or_else(|| PipelineError::MissingField {
            venue_id: self.venue_id.clone(),
            date:     self.date,
            field,
        })
    }
}

/// Final compliance category of one inspection.
///
/// Variant order is the reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
    /// Declared for the taxonomy; no current rule produces it.
    NoAgreementOrTerminated,
    NotApplicable,
}

impl ComplianceStatus {
    pub const ALL: [ComplianceStatus; 4] = [
        Self::Compliant,
        Self::NonCompliant,
        Self::NoAgreementOrTerminated,
        Self::NotApplicable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compliant               => "compliant",
            Self::NonCompliant            => "non-compliant",
            Self::NoAgreementOrTerminated => "no-agreement-or-terminated",
            Self::NotApplicable           => "not-applicable",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived compliance fields for one inspection.
///
/// `target` and `complies` are `Some` exactly when `applies` is true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceAssessment {
    pub applies:  bool,
    pub target:   Option<i64>,
    pub complies: Option<bool>,
    pub status:   ComplianceStatus,
}

/// An inspection record enriched by the classification engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedInspection {
    #[serde(flatten)]
    pub record:     InspectionRecord,
    pub period:     Period,
    #[serde(flatten)]
    pub assessment: ComplianceAssessment,
}

impl ClassifiedInspection {
    pub fn venue_id(&self) -> &str {
        &self.record.venue_id
    }

    pub fn status(&self) -> ComplianceStatus {
        self.assessment.status
    }
}
