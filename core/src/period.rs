//! Reporting periods: calendar year plus quarter-of-year.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::Timestamp;

/// A calendar quarter, rendered as `"2024-Q3"`.
///
/// Ordering is chronological: by year, then quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    pub year:    i32,
    /// 1-indexed, always in `1..=4`.
    pub quarter: u32,
}

impl Period {
    /// The quarter containing `date`.
    pub fn of(date: Timestamp) -> Self {
        Self {
            year:    date.year(),
            quarter: (date.month() - 1) / 3 + 1,
        }
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-Q{}", self.year, self.quarter)
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, quarter) = s
            .trim()
            .split_once("-Q")
            .ok_or_else(|| format!("Invalid period '{s}': expected YYYY-QN"))?;
        let year: i32 = year
            .parse()
            .map_err(|_| format!("Invalid period year in '{s}'"))?;
        let quarter: u32 = quarter
            .parse()
            .map_err(|_| format!("Invalid period quarter in '{s}'"))?;
        if !(1..=4).contains(&quarter) {
            return Err(format!("Invalid period '{s}': quarter must be 1-4"));
        }
        Ok(Self { year, quarter })
    }
}

impl TryFrom<String> for Period {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(p: Period) -> Self {
        p.to_string()
    }
}
