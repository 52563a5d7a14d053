//! Inclusive submission-date range filter

use chrono::{DateTime, FixedOffset, NaiveDate};

/// Inclusive lower/upper bounds on the submission date.
///
/// An empty range admits every submission. A submission without a date is
/// treated as negative infinity: it fails a configured lower bound and
/// passes any upper bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    /// Whether a submission dated `date` falls inside the range.
    pub fn contains(&self, date: Option<DateTime<FixedOffset>>) -> bool {
        match date {
            Some(dt) => {
                let day = dt.date_naive();
                self.start.map_or(true, |s| day >= s) && self.end.map_or(true, |e| day <= e)
            }
            None => self.start.is_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> Option<DateTime<FixedOffset>> {
        Some(DateTime::parse_from_rfc3339(s).unwrap())
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_empty_range_admits_all() {
        let range = DateRange::empty();
        assert!(range.contains(date("2020-01-02T10:00:00Z")));
        assert!(range.contains(None));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let range = DateRange::new(Some(day("2020-01-02")), Some(day("2020-01-03")));
        assert!(!range.contains(date("2020-01-01T23:59:59Z")));
        assert!(range.contains(date("2020-01-02T00:00:00Z")));
        assert!(range.contains(date("2020-01-03T23:59:59Z")));
        assert!(!range.contains(date("2020-01-04T00:00:00Z")));
    }

    #[test]
    fn test_missing_date_sorts_below_any_lower_bound() {
        let lower_only = DateRange::new(Some(day("2020-01-01")), None);
        assert!(!lower_only.contains(None));

        let upper_only = DateRange::new(None, Some(day("2020-01-01")));
        assert!(upper_only.contains(None));
    }
}
