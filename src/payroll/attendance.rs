use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

use crate::payroll::cycle::{PayrollCycle, resolve_cycle};

/// Attendance category of one day. Stored and exchanged as the short codes
/// used on the attendance sheets.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
pub enum DayStatus {
    #[serde(rename = "P", alias = "Present")]
    #[strum(to_string = "P", serialize = "Present")]
    Present,
    #[serde(rename = "½P", alias = "HalfPresent")]
    #[strum(to_string = "½P", serialize = "HalfPresent")]
    HalfPresent,
    #[serde(rename = "A", alias = "Absent")]
    #[strum(to_string = "A", serialize = "Absent")]
    Absent,
    #[serde(rename = "WO", alias = "WeeklyOff")]
    #[strum(to_string = "WO", serialize = "WeeklyOff")]
    WeeklyOff,
    #[serde(rename = "HO", alias = "Holiday")]
    #[strum(to_string = "HO", serialize = "Holiday")]
    Holiday,
    #[serde(rename = "ALF", alias = "AnnualLeaveFull")]
    #[strum(to_string = "ALF", serialize = "AnnualLeaveFull")]
    AnnualLeaveFull,
    #[serde(rename = "ALH", alias = "AnnualLeaveHalf")]
    #[strum(to_string = "ALH", serialize = "AnnualLeaveHalf")]
    AnnualLeaveHalf,
}

/// One attendance row for an employee on a date.
///
/// `emp_id`, `date` and `ctc_without_lop` identify the row and are never
/// touched by reconciliation. `total_days` is context for the counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = "E001")]
    pub emp_id: String,
    #[schema(example = "2024-03-05", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[schema(example = 15000.0, value_type = Option<f64>)]
    pub ctc_without_lop: Option<Decimal>,

    #[serde(default)]
    pub emp_name: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,

    #[schema(example = 30)]
    pub total_days: u32,
    pub days_worked: u32,
    pub days_paid: u32,
    /// Annual leave days.
    pub al: u32,
    /// Privilege leave days.
    #[serde(default)]
    pub pl: u32,
    /// Bereavement or medical leave days.
    #[serde(default)]
    pub bl_or_ml: u32,
    /// Loss-of-pay days.
    pub lop: u32,

    #[schema(value_type = String, example = "P")]
    pub status: DayStatus,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "09:12:00")]
    pub time_in: Option<NaiveTime>,
}

impl AttendanceRecord {
    pub fn cycle(&self) -> PayrollCycle {
        resolve_cycle(self.date)
    }

    /// Whether a punch-in was captured for the day. Sheets write a missing
    /// punch as midnight.
    pub fn has_punch_in(&self) -> bool {
        self.time_in
            .is_some_and(|t| t != NaiveTime::MIN)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn status_codes_round_trip_through_strum_and_serde() {
        for status in DayStatus::iter() {
            let code = status.to_string();
            assert_eq!(DayStatus::from_str(&code).unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{code}\""));
        }
        assert_eq!(DayStatus::from_str("Present").unwrap(), DayStatus::Present);
        assert_eq!(DayStatus::HalfPresent.as_ref(), "½P");
    }

    #[test]
    fn midnight_is_no_punch() {
        let mut record: AttendanceRecord = serde_json::from_value(serde_json::json!({
            "emp_id": "E001",
            "date": "2024-03-05",
            "total_days": 1,
            "days_worked": 1,
            "days_paid": 1,
            "al": 0,
            "lop": 0,
            "status": "WO",
            "time_in": "00:00:00"
        }))
        .unwrap();
        assert!(!record.has_punch_in());
        record.time_in = NaiveTime::from_hms_opt(10, 0, 0);
        assert!(record.has_punch_in());
        assert_eq!(record.cycle(), PayrollCycle::new(2024, 3).unwrap());
    }
}
