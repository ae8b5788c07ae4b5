//! Store methods for classified inspections.

use crate::{
    error::PipelineResult,
    inspection::{ClassifiedInspection, ComplianceAssessment, ComplianceStatus, InspectionRecord},
    period::Period,
};
use rusqlite::params;

use super::{format_date, parse_column, parse_date, AuditStore};

impl AuditStore {
    pub fn insert_classified_inspection(
        &self,
        run_id: &str,
        row:    &ClassifiedInspection,
    ) -> PipelineResult<()> {
        let record = &row.record;
        let a = &row.assessment;
        self.conn.execute(
            "INSERT INTO classified_inspection
             (run_id, venue_id, date, period, total_dispensing_points,
              reference_brand_count, competitor_brand_count, total_units,
              detected_brands, applies, target, complies, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                run_id,
                record.venue_id,
                format_date(record.date),
                row.period.to_string(),
                record.total_dispensing_points,
                record.reference_brand_count,
                record.competitor_brand_count,
                record.total_units,
                serde_json::to_string(&record.detected_brands)?,
                a.applies as i64,
                a.target,
                a.complies.map(|c| c as i64),
                a.status.as_str(),
            ],
        )?;
        Ok(())
    }

    /// All classified inspections of a run, optionally for one venue,
    /// ordered by venue then date.
    pub fn classified_inspections(
        &self,
        run_id:   &str,
        venue_id: Option<&str>,
    ) -> PipelineResult<Vec<ClassifiedInspection>> {
        let mut stmt = self.conn.prepare(
            "SELECT venue_id, date, period, total_dispensing_points,
                    reference_brand_count, competitor_brand_count, total_units,
                    detected_brands, applies, target, complies, status
             FROM classified_inspection
             WHERE run_id = ?1 AND (?2 IS NULL OR venue_id = ?2)
             ORDER BY venue_id ASC, date ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id, venue_id], |row| {
                let date: String = row.get(1)?;
                let period: String = row.get(2)?;
                let brands: String = row.get(7)?;
                let status: String = row.get(11)?;
                Ok(ClassifiedInspection {
                    record: InspectionRecord {
                        venue_id:                row.get(0)?,
                        date:                    parse_date(1, &date)?,
                        total_dispensing_points: row.get(3)?,
                        reference_brand_count:   row.get(4)?,
                        competitor_brand_count:  row.get(5)?,
                        total_units:             row.get(6)?,
                        detected_brands:         parse_column(7, &brands, |s| serde_json::from_str::<Vec<String>>(s))?,
                    },
                    period: parse_column(2, &period, |s| s.parse::<Period>())?,
                    assessment: ComplianceAssessment {
                        applies:  row.get::<_, i64>(8)? != 0,
                        target:   row.get(9)?,
                        complies: row.get::<_, Option<i64>>(10)?.map(|c| c != 0),
                        status:   parse_column(11, &status, |s| {
                            ComplianceStatus::parse(s).ok_or_else(|| format!("Unknown status '{s}'"))
                        })?,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn classified_inspection_count(&self, run_id: &str) -> PipelineResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM classified_inspection WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
