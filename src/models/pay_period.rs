//! Pay period model.
//!
//! This module contains the [`PayPeriod`] type that anchors one submission
//! window. A period is immutable once created.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{WorkflowError, WorkflowResult};

/// Represents a pay period with its inclusive date range.
///
/// # Example
///
/// ```
/// use payroll_cycle::models::PayPeriod;
/// use chrono::NaiveDate;
///
/// let period = PayPeriod::new(
///     "2026-03",
///     "March 2026",
///     NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
/// )
/// .unwrap();
///
/// assert!(period.contains_date(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayPeriod {
    /// Unique identifier for the period.
    pub id: String,
    /// Human-readable label (e.g., "March 2026").
    pub label: String,
    /// The start date of the pay period (inclusive).
    pub start_date: NaiveDate,
    /// The end date of the pay period (inclusive).
    pub end_date: NaiveDate,
}

impl PayPeriod {
    /// Creates a pay period, rejecting an end date before the start date.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> WorkflowResult<Self> {
        if end_date < start_date {
            return Err(WorkflowError::validation(
                "end_date",
                format!("{} is before start date {}", end_date, start_date),
            ));
        }

        Ok(Self {
            id: id.into(),
            label: label.into(),
            start_date,
            end_date,
        })
    }

    /// Checks if a given date falls within this pay period.
    ///
    /// The check is inclusive of both start and end dates.
    ///
    /// ```
    /// use payroll_cycle::models::PayPeriod;
    /// use chrono::NaiveDate;
    ///
    /// let period = PayPeriod::new(
    ///     "2026-03",
    ///     "March 2026",
    ///     NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
    ///     NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
    /// )
    /// .unwrap();
    ///
    /// assert!(period.contains_date(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap())); // start date
    /// assert!(period.contains_date(NaiveDate::from_ymd_opt(2026, 3, 31).unwrap())); // end date
    /// assert!(!period.contains_date(NaiveDate::from_ymd_opt(2026, 4, 1).unwrap())); // after
    /// ```
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Checks whether the inclusive range `start..=end` shares at least one day with this period.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        start <= self.end_date && end >= self.start_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_march_period() -> PayPeriod {
        PayPeriod::new("2026-03", "March 2026", date(2026, 3, 1), date(2026, 3, 31)).unwrap()
    }

    #[test]
    fn test_new_rejects_end_before_start() {
        let result = PayPeriod::new("bad", "Bad", date(2026, 3, 31), date(2026, 3, 1));
        match result {
            Err(WorkflowError::Validation { field, .. }) => assert_eq!(field, "end_date"),
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_new_accepts_single_day_period() {
        let period = PayPeriod::new("d", "Day", date(2026, 3, 1), date(2026, 3, 1)).unwrap();
        assert!(period.contains_date(date(2026, 3, 1)));
    }

    #[test]
    fn test_contains_date_outside_period() {
        let period = create_march_period();
        assert!(!period.contains_date(date(2026, 2, 28)));
        assert!(!period.contains_date(date(2026, 4, 1)));
    }

    #[test]
    fn test_overlaps_range_straddling_start() {
        let period = create_march_period();
        assert!(period.overlaps(date(2026, 2, 27), date(2026, 3, 2)));
    }

    #[test]
    fn test_overlaps_range_inside_period() {
        let period = create_march_period();
        assert!(period.overlaps(date(2026, 3, 10), date(2026, 3, 11)));
    }

    #[test]
    fn test_does_not_overlap_later_range() {
        let period = create_march_period();
        assert!(!period.overlaps(date(2026, 4, 6), date(2026, 4, 7)));
    }

    #[test]
    fn test_serialize_pay_period() {
        let period = create_march_period();
        let json = serde_json::to_string(&period).unwrap();
        assert!(json.contains("\"start_date\":\"2026-03-01\""));
        assert!(json.contains("\"end_date\":\"2026-03-31\""));
        assert!(json.contains("\"label\":\"March 2026\""));
    }
}
