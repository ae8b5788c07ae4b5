//! Store methods for reconstructed quarterly state.

use crate::{
    error::PipelineResult,
    period::Period,
    reconstruction_engine::{OperationalState, QuarterlyStateRecord, RunningTotals},
};
use rusqlite::params;

use super::{format_date, parse_column, parse_date, AuditStore};

impl AuditStore {
    /// Persist one venue's series. Rows keep their replay order through
    /// the autoincrement id.
    pub fn insert_quarterly_states(
        &self,
        run_id: &str,
        series: &[QuarterlyStateRecord],
    ) -> PipelineResult<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO quarterly_state
             (run_id, venue_id, date, period, state, reason, total_units, dispensing_points)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for record in series {
            stmt.execute(params![
                run_id,
                record.venue_id,
                format_date(record.date),
                record.period.to_string(),
                record.state.as_str(),
                record.reason,
                record.total_units(),
                record.dispensing_points(),
            ])?;
        }
        Ok(())
    }

    /// Reconstructed series of a run, optionally for one venue, in the
    /// order it was emitted.
    pub fn quarterly_states(
        &self,
        run_id:   &str,
        venue_id: Option<&str>,
    ) -> PipelineResult<Vec<QuarterlyStateRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT venue_id, date, period, state, reason, total_units, dispensing_points
             FROM quarterly_state
             WHERE run_id = ?1 AND (?2 IS NULL OR venue_id = ?2)
             ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id, venue_id], |row| {
                let date: String = row.get(1)?;
                let period: String = row.get(2)?;
                let state: String = row.get(3)?;
                let units: Option<i64> = row.get(5)?;
                let points: Option<i64> = row.get(6)?;
                Ok(QuarterlyStateRecord {
                    venue_id: row.get(0)?,
                    date:     parse_date(1, &date)?,
                    period:   parse_column(2, &period, |s| s.parse::<Period>())?,
                    state:    parse_column(3, &state, |s| {
                        OperationalState::parse(s).ok_or_else(|| format!("Unknown state '{s}'"))
                    })?,
                    reason:   row.get(4)?,
                    totals:   units.zip(points).map(|(total_units, dispensing_points)| {
                        RunningTotals { total_units, dispensing_points }
                    }),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn quarterly_state_count(&self, run_id: &str) -> PipelineResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM quarterly_state WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
