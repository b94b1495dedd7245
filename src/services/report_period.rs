//! Report period helpers
//!
//! Gemelnet reports are monthly and identified by a YYYYMM integer. Later
//! months always compare greater, including across a December → January
//! rollover, so plain integer ordering is the period ordering.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated YYYYMM report period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportPeriod(i32);

impl ReportPeriod {
    /// Build from a raw YYYYMM integer. Rejects month outside 1..=12 and
    /// years outside 1900..=9999.
    pub fn new(value: i32) -> Option<Self> {
        let year = value / 100;
        let month = value % 100;
        if (1900..=9999).contains(&year) && (1..=12).contains(&month) {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(self) -> i32 {
        self.0
    }

    pub fn year(self) -> i32 {
        self.0 / 100
    }

    pub fn month(self) -> u32 {
        (self.0 % 100) as u32
    }

    /// Display label used by charts and tables, e.g. `08/2025`.
    pub fn label(self) -> String {
        format!("{:02}/{}", self.month(), self.year())
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A five-year window over a fund's history, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodTab {
    pub label: String,
    pub start: i32,
    pub end: i32,
}

/// Split the years between `earliest` and `latest` into five-year tabs,
/// starting from the latest year and walking back. The oldest tab is
/// clipped to the earliest year.
pub fn five_year_tabs(earliest: ReportPeriod, latest: ReportPeriod) -> Vec<PeriodTab> {
    let earliest_year = earliest.year().min(latest.year());
    let mut current_year = latest.year().max(earliest.year());
    let mut tabs = Vec::new();

    while current_year >= earliest_year {
        let start_year = (current_year - 4).max(earliest_year);
        tabs.push(PeriodTab {
            label: format!("{}-{}", start_year, current_year),
            start: start_year * 100 + 1,
            end: current_year * 100 + 12,
        });
        current_year -= 5;
    }

    tabs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_months() {
        assert!(ReportPeriod::new(202508).is_some());
        assert!(ReportPeriod::new(202500).is_none());
        assert!(ReportPeriod::new(202513).is_none());
        assert!(ReportPeriod::new(2025).is_none());
    }

    #[test]
    fn test_year_rollover_orders_after_december() {
        let december = ReportPeriod::new(202412).unwrap();
        let january = ReportPeriod::new(202501).unwrap();
        assert!(january > december);
        assert_eq!(january.year(), 2025);
        assert_eq!(january.month(), 1);
    }

    #[test]
    fn test_label() {
        assert_eq!(ReportPeriod::new(202508).unwrap().label(), "08/2025");
    }

    #[test]
    fn test_five_year_tabs() {
        let tabs = five_year_tabs(
            ReportPeriod::new(201403).unwrap(),
            ReportPeriod::new(202508).unwrap(),
        );

        assert_eq!(tabs.len(), 3);
        assert_eq!(tabs[0].label, "2021-2025");
        assert_eq!(tabs[0].start, 202101);
        assert_eq!(tabs[0].end, 202512);
        assert_eq!(tabs[1].label, "2016-2020");
        assert_eq!(tabs[2].label, "2014-2015");
        assert_eq!(tabs[2].start, 201401);
    }

    #[test]
    fn test_single_year_tab() {
        let period = ReportPeriod::new(202503).unwrap();
        let tabs = five_year_tabs(period, period);
        assert_eq!(tabs.len(), 1);
        assert_eq!(tabs[0].label, "2025-2025");
    }
}
