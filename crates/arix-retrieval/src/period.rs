//! Reporting period extraction and ordering
//!
//! Financial data point texts carry their reporting period inline as
//! `(Q<quarter>/<year>)`, e.g. `statistics-financial (Q2/2025)`. Quarter 5
//! is the upstream provider's sentinel for an annual aggregate row and is
//! preserved verbatim.

use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;

/// Quarter value the upstream export uses for annual aggregate rows
pub const ANNUAL_QUARTER: u32 = 5;

static PERIOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\(Q(\d+)/(\d+)\)").unwrap()
});

/// A reporting period parsed out of a data point's text
///
/// `(0, 0)` means "no period found"; it sorts after every real period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Period {
    /// Calendar year, 0 when unparseable
    pub year: u32,
    /// Quarter 1-4, or [`ANNUAL_QUARTER`] for annual rows; 0 when unparseable
    pub quarter: u32,
}

impl Period {
    /// Extract the period from a data point text
    ///
    /// Returns the zero period when the text has no `(Q<q>/<y>)` marker.
    pub fn extract(text: &str) -> Self {
        PERIOD_RE
            .captures(text)
            .and_then(|caps| {
                let quarter = caps.get(1)?.as_str().parse().ok()?;
                let year = caps.get(2)?.as_str().parse().ok()?;
                Some(Self { year, quarter })
            })
            .unwrap_or_default()
    }

    /// True for annual aggregate rows (quarter sentinel 5)
    pub fn is_annual(&self) -> bool {
        self.quarter == ANNUAL_QUARTER
    }

    /// True when no period marker was found
    pub fn is_unknown(&self) -> bool {
        self.year == 0 && self.quarter == 0
    }

    /// Newest-first comparison: year descending, then quarter descending
    pub fn cmp_desc(&self, other: &Self) -> Ordering {
        other
            .year
            .cmp(&self.year)
            .then(other.quarter.cmp(&self.quarter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_quarterly() {
        let period = Period::extract("statistics-financial (Q2/2025)\nroe: 18.5");
        assert_eq!(period.quarter, 2);
        assert_eq!(period.year, 2025);
        assert!(!period.is_annual());
    }

    #[test]
    fn test_extract_annual_sentinel() {
        let period = Period::extract("statistics-financial (Q5/2024)");
        assert_eq!(period.quarter, 5);
        assert_eq!(period.year, 2024);
        assert!(period.is_annual());
    }

    #[test]
    fn test_extract_missing_marker() {
        let period = Period::extract("no period in this text");
        assert_eq!(period, Period::default());
        assert!(period.is_unknown());
    }

    #[test]
    fn test_desc_ordering() {
        let mut periods = vec![
            Period::extract("(Q5/2024)"),
            Period::extract("(Q1/2025)"),
            Period::extract("(Q2/2023)"),
            Period::extract("garbage"),
        ];
        periods.sort_by(Period::cmp_desc);

        assert_eq!((periods[0].year, periods[0].quarter), (2025, 1));
        assert_eq!((periods[1].year, periods[1].quarter), (2024, 5));
        assert_eq!((periods[2].year, periods[2].quarter), (2023, 2));
        // Unparseable text sorts last
        assert!(periods[3].is_unknown());
    }

    #[test]
    fn test_quarter_breaks_year_ties() {
        let q1 = Period { year: 2025, quarter: 1 };
        let q3 = Period { year: 2025, quarter: 3 };
        assert_eq!(q3.cmp_desc(&q1), Ordering::Less);
    }
}
