//! Compliance classification engine.
//!
//! A venue with more than `exemption_threshold` dispensing points must give
//! at least `floor(points / points_per_competitor)` of them to competitor
//! brands. Everything at or below the threshold is exempt.
//!
//! Pure and per-record: no cross-record state, safe in any order.

use serde::{Deserialize, Serialize};

use crate::{
    batch::Batch,
    error::{PipelineError, PipelineResult},
    inspection::{ClassifiedInspection, ComplianceAssessment, ComplianceStatus, InspectionRecord},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceRule {
    /// Venues with this many dispensing points or fewer are exempt.
    pub exemption_threshold:   i64,
    /// One competitor-brand point is required per this many points.
    pub points_per_competitor: i64,
}

impl Default for ComplianceRule {
    fn default() -> Self {
        Self {
            exemption_threshold:   3,
            points_per_competitor: 4,
        }
    }
}

impl ComplianceRule {
    pub fn applies(&self, total_dispensing_points: i64) -> bool {
        total_dispensing_points > self.exemption_threshold
    }

    /// Minimum competitor-brand count for a regulated venue.
    ///
    /// Fails if the divisor is not positive.
    pub fn target(&self, total_dispensing_points: i64) -> PipelineResult<i64> {
        if self.points_per_competitor <= 0 {
            return Err(PipelineError::InvalidRule {
                points_per_competitor: self.points_per_competitor,
            });
        }
        Ok(total_dispensing_points.div_euclid(self.points_per_competitor))
    }

    /// Evaluate the rule on raw counts.
    pub fn assess(
        &self,
        total_dispensing_points: i64,
        competitor_brand_count:  i64,
    ) -> PipelineResult<ComplianceAssessment> {
        let applies = self.applies(total_dispensing_points);
        let (target, complies) = if applies {
            let target = self.target(total_dispensing_points)?;
            (Some(target), Some(competitor_brand_count >= target))
        } else {
            (None, None)
        };
        Ok(ComplianceAssessment {
            applies,
            target,
            complies,
            status: status_for(applies, complies),
        })
    }

    /// Classify one inspection record.
    ///
    /// Fails with a missing-field error if either count the rule reads is
    /// absent.
    pub fn classify(&self, record: &InspectionRecord) -> PipelineResult<ClassifiedInspection> {
        let points = record.require(record.total_dispensing_points, "total_dispensing_points")?;
        let competitor = record.require(record.competitor_brand_count, "competitor_brand_count")?;
        Ok(ClassifiedInspection {
            record:     record.clone(),
            period:     record.period(),
            assessment: self.assess(points, competitor)?,
        })
    }

    /// Classify a whole table, keeping every rejected record.
    pub fn classify_all(&self, records: &[InspectionRecord]) -> Batch<ClassifiedInspection> {
        let mut batch = Batch::default();
        for record in records {
            match self.classify(record) {
                Ok(classified) => batch.ok.push(classified),
                Err(e) => batch.reject(record.venue_id.clone(), e),
            }
        }
        batch
    }
}

/// Total mapping from `(applies, complies)` to a status.
///
/// `NoAgreementOrTerminated` is reached only when a regulated record has no
/// compliance verdict, which `ComplianceRule::assess` never yields.
pub fn status_for(applies: bool, complies: Option<bool>) -> ComplianceStatus {
    match (applies, complies) {
        (false, _)          => ComplianceStatus::NotApplicable,
        (true, Some(true))  => ComplianceStatus::Compliant,
        (true, Some(false)) => ComplianceStatus::NonCompliant,
        (true, None)        => ComplianceStatus::NoAgreementOrTerminated,
    }
}

/// Classify with the default rule.
pub fn classify(record: &InspectionRecord) -> PipelineResult<ClassifiedInspection> {
    ComplianceRule::default().classify(record)
}
