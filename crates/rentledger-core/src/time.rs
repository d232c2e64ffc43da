//! Report periods for filtering payments and rows by date

use chrono::{Datelike, NaiveDate};
use rentledger_config::TimeRange;
use serde::{Deserialize, Serialize};

/// A reporting window, resolved against a reference date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPeriod {
    /// Range kind
    pub range: TimeRange,
    /// Custom start date (when range is Custom)
    pub custom_start: Option<NaiveDate>,
    /// Custom end date (when range is Custom)
    pub custom_end: Option<NaiveDate>,
}

impl Default for ReportPeriod {
    fn default() -> Self {
        Self::new(TimeRange::Month)
    }
}

impl ReportPeriod {
    /// Create a period of the given kind
    pub fn new(range: TimeRange) -> Self {
        Self {
            range,
            custom_start: None,
            custom_end: None,
        }
    }

    /// Create with custom date range
    pub fn custom(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            range: TimeRange::Custom,
            custom_start: Some(start),
            custom_end: Some(end),
        }
    }

    /// First day of the period
    pub fn start_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self.range {
            TimeRange::Month => NaiveDate::from_ymd_opt(today.year(), today.month(), 1),
            TimeRange::Quarter => {
                let quarter_start = (today.month0() / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(today.year(), quarter_start, 1)
            }
            TimeRange::Year => NaiveDate::from_ymd_opt(today.year(), 1, 1),
            TimeRange::All => None,
            TimeRange::Custom => self.custom_start,
        }
    }

    /// Last day of the period
    pub fn end_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self.range {
            TimeRange::Month => last_day_of_month(today.year(), today.month()),
            TimeRange::Quarter => {
                let quarter_end = (today.month0() / 3) * 3 + 3;
                last_day_of_month(today.year(), quarter_end)
            }
            TimeRange::Year => NaiveDate::from_ymd_opt(today.year(), 12, 31),
            TimeRange::All => None,
            TimeRange::Custom => self.custom_end,
        }
    }

    /// Check if a date falls inside the period
    pub fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        match (self.start_date(today), self.end_date(today)) {
            (None, None) => true,
            (Some(s), None) => date >= s,
            (None, Some(e)) => date <= e,
            (Some(s), Some(e)) => date >= s && date <= e,
        }
    }

    /// Get a human-readable description of the period
    pub fn description(&self) -> String {
        match self.range {
            TimeRange::Month => "Current Month".to_string(),
            TimeRange::Quarter => "Current Quarter".to_string(),
            TimeRange::Year => "Current Year".to_string(),
            TimeRange::All => "All Time".to_string(),
            TimeRange::Custom => {
                if let (Some(start), Some(end)) = (self.custom_start, self.custom_end) {
                    format!("{} to {}", start, end)
                } else {
                    "Custom Range".to_string()
                }
            }
        }
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).and_then(|d| d.pred_opt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_bounds() {
        let period = ReportPeriod::new(TimeRange::Month);
        assert_eq!(period.start_date(date(2024, 2, 14)), Some(date(2024, 2, 1)));
        assert_eq!(period.end_date(date(2024, 2, 14)), Some(date(2024, 2, 29)));
        assert_eq!(period.end_date(date(2025, 12, 3)), Some(date(2025, 12, 31)));
    }

    #[test]
    fn test_quarter_bounds() {
        let period = ReportPeriod::new(TimeRange::Quarter);
        assert_eq!(period.start_date(date(2025, 11, 20)), Some(date(2025, 10, 1)));
        assert_eq!(period.end_date(date(2025, 11, 20)), Some(date(2025, 12, 31)));
        assert_eq!(period.end_date(date(2025, 5, 2)), Some(date(2025, 6, 30)));
    }

    #[test]
    fn test_contains() {
        let today = date(2025, 3, 15);
        assert!(ReportPeriod::new(TimeRange::Year).contains(date(2025, 12, 31), today));
        assert!(!ReportPeriod::new(TimeRange::Month).contains(date(2025, 4, 1), today));
        assert!(ReportPeriod::new(TimeRange::All).contains(date(1999, 1, 1), today));

        let custom = ReportPeriod::custom(date(2025, 1, 10), date(2025, 1, 20));
        assert!(custom.contains(date(2025, 1, 10), today));
        assert!(!custom.contains(date(2025, 1, 21), today));
        assert_eq!(custom.description(), "2025-01-10 to 2025-01-20");
    }
}
