//! Payroll cycle resolution.
//!
//! A cycle runs from the 21st of one calendar month to the 20th of the next and
//! is named after the month it ends in. Every place in the crate that needs the
//! cycle of a date goes through [`resolve_cycle`].

use chrono::{Datelike, NaiveDate};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::payroll::error::{PayrollError, PayrollResult};

/// First day of month that already belongs to the following cycle.
pub const CYCLE_CUTOFF_DAY: u32 = 21;

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 9999;

#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    ToSchema,
)]
#[display(fmt = "{}-{:02}", year, month)]
#[serde(try_from = "CycleParts")]
#[schema(example = json!({"year": 2024, "month": 4}))]
pub struct PayrollCycle {
    year: i32,
    month: u32,
}

#[derive(Deserialize)]
struct CycleParts {
    year: i32,
    month: u32,
}

impl TryFrom<CycleParts> for PayrollCycle {
    type Error = PayrollError;

    fn try_from(parts: CycleParts) -> Result<Self, Self::Error> {
        PayrollCycle::new(parts.year, parts.month)
    }
}

impl PayrollCycle {
    pub fn new(year: i32, month: u32) -> PayrollResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(PayrollError::invalid(format!(
                "month must be between 1 and 12, got {month}"
            )));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(PayrollError::invalid(format!(
                "year must be between {MIN_YEAR} and {MAX_YEAR}, got {year}"
            )));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    /// Inclusive date range covered by this cycle: 21st of the previous month
    /// through the 20th of this one.
    ///
    /// Fails for cycles whose window runs past the calendar range `chrono`
    /// can represent; `resolve_cycle` does not range-check its input.
    pub fn window(&self) -> PayrollResult<(NaiveDate, NaiveDate)> {
        let prev = self.prev();
        let start = NaiveDate::from_ymd_opt(prev.year, prev.month, CYCLE_CUTOFF_DAY);
        let end = NaiveDate::from_ymd_opt(self.year, self.month, CYCLE_CUTOFF_DAY - 1);
        match (start, end) {
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(PayrollError::invalid(format!(
                "cycle {self} is outside the supported calendar"
            ))),
        }
    }

    /// Number of calendar days in the cycle window.
    pub fn days(&self) -> PayrollResult<u32> {
        let (start, end) = self.window()?;
        Ok((end - start).num_days() as u32 + 1)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        resolve_cycle(date) == *self
    }
}

/// Cycle a calendar date is attributed to.
///
/// Dates on or after the 21st roll forward into the next month's cycle
/// (December rolls into January of the following year); earlier dates stay in
/// their own month.
pub fn resolve_cycle(date: NaiveDate) -> PayrollCycle {
    let own = PayrollCycle {
        year: date.year(),
        month: date.month(),
    };
    if date.day() >= CYCLE_CUTOFF_DAY {
        own.next()
    } else {
        own
    }
}

/// [`resolve_cycle`] over an ISO `YYYY-MM-DD` string. Dates whose cycle falls
/// outside the years [`PayrollCycle::new`] accepts are rejected.
pub fn resolve_cycle_str(date: &str) -> PayrollResult<PayrollCycle> {
    let parsed = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|e| PayrollError::invalid(format!("'{date}' is not an ISO date: {e}")))?;
    let cycle = resolve_cycle(parsed);
    PayrollCycle::new(cycle.year, cycle.month)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn cycle(y: i32, m: u32) -> PayrollCycle {
        PayrollCycle::new(y, m).unwrap()
    }

    #[test]
    fn twentieth_stays_twenty_first_rolls() {
        assert_eq!(resolve_cycle_str("2024-03-20").unwrap(), cycle(2024, 3));
        assert_eq!(resolve_cycle_str("2024-03-21").unwrap(), cycle(2024, 4));
        assert_eq!(resolve_cycle_str("2024-12-25").unwrap(), cycle(2025, 1));
    }

    #[test]
    fn every_month_boundary_follows_the_cutoff() {
        for year in [2023, 2024] {
            for month in 1..=12 {
                let on_20th = resolve_cycle(date(year, month, 20));
                let on_21st = resolve_cycle(date(year, month, 21));
                assert_eq!(on_20th, cycle(year, month));
                assert_eq!(on_21st, cycle(year, month).next());
            }
        }
        assert_eq!(resolve_cycle(date(2024, 12, 21)), cycle(2025, 1));
        assert_eq!(resolve_cycle(date(2025, 1, 1)), cycle(2025, 1));
    }

    #[test]
    fn window_spans_21st_to_20th() {
        let (start, end) = cycle(2025, 1).window().unwrap();
        assert_eq!(start, date(2024, 12, 21));
        assert_eq!(end, date(2025, 1, 20));
        assert_eq!(cycle(2025, 1).days().unwrap(), 31);
        // Feb 21 .. Mar 20 in a leap year
        assert_eq!(cycle(2024, 3).days().unwrap(), 29);
    }

    #[test]
    fn window_dates_resolve_back_to_their_cycle() {
        let c = cycle(2024, 7);
        let (start, end) = c.window().unwrap();
        let mut d = start;
        while d <= end {
            assert!(c.contains(d), "{d} should be in {c}");
            d = d.succ_opt().unwrap();
        }
        assert!(!c.contains(start.pred_opt().unwrap()));
        assert!(!c.contains(end.succ_opt().unwrap()));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            resolve_cycle_str("2024-13-01"),
            Err(PayrollError::InvalidInput(_))
        ));
        assert!(resolve_cycle_str("21/03/2024").is_err());
        assert!(PayrollCycle::new(2024, 0).is_err());
        assert!(PayrollCycle::new(2024, 13).is_err());
    }

    #[test]
    fn far_future_dates_are_rejected_not_panicking() {
        assert!(matches!(
            resolve_cycle_str("+262142-12-25"),
            Err(PayrollError::InvalidInput(_))
        ));
        assert!(matches!(
            resolve_cycle_str("9999-12-21"),
            Err(PayrollError::InvalidInput(_))
        ));
        assert_eq!(resolve_cycle_str("9999-12-20").unwrap(), cycle(9999, 12));

        let max = NaiveDate::MAX;
        let edge = resolve_cycle(max.with_day(25).unwrap_or(max));
        assert!(edge.window().is_err());
        assert!(edge.days().is_err());
    }

    #[test]
    fn ordering_and_display() {
        assert!(cycle(2024, 12) < cycle(2025, 1));
        assert!(cycle(2024, 2) < cycle(2024, 10));
        assert_eq!(cycle(2024, 4).to_string(), "2024-04");
        assert_eq!(cycle(2024, 1).prev(), cycle(2023, 12));
    }

    #[test]
    fn deserialization_validates_month() {
        let ok: PayrollCycle = serde_json::from_str(r#"{"year":2024,"month":4}"#).unwrap();
        assert_eq!(ok, cycle(2024, 4));
        assert!(serde_json::from_str::<PayrollCycle>(r#"{"year":2024,"month":0}"#).is_err());
    }
}
