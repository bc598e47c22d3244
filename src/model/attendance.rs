use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;

use crate::payroll::{AttendanceRecord, DayStatus, PayrollError};

/// Row of `attendance_records`.
#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceRow {
    pub emp_id: String,
    pub date: NaiveDate,
    pub ctc_without_lop: Option<Decimal>,
    pub emp_name: String,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub total_days: u32,
    pub days_worked: u32,
    pub days_paid: u32,
    pub al: u32,
    pub pl: u32,
    pub bl_or_ml: u32,
    pub lop: u32,
    pub status: String, // status code, e.g. "P", "½P", "WO"
    pub time_in: Option<NaiveTime>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = PayrollError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let status = DayStatus::from_str(&row.status).map_err(|_| {
            PayrollError::invalid(format!(
                "unknown attendance status '{}' for {} on {}",
                row.status, row.emp_id, row.date
            ))
        })?;

        Ok(AttendanceRecord {
            emp_id: row.emp_id,
            date: row.date,
            ctc_without_lop: row.ctc_without_lop,
            emp_name: row.emp_name,
            department: row.department,
            designation: row.designation,
            total_days: row.total_days,
            days_worked: row.days_worked,
            days_paid: row.days_paid,
            al: row.al,
            pl: row.pl,
            bl_or_ml: row.bl_or_ml,
            lop: row.lop,
            status,
            time_in: row.time_in,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> AttendanceRow {
        AttendanceRow {
            emp_id: "E001".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            ctc_without_lop: None,
            emp_name: "Ravi".into(),
            department: None,
            designation: None,
            total_days: 30,
            days_worked: 30,
            days_paid: 30,
            al: 0,
            pl: 0,
            bl_or_ml: 0,
            lop: 0,
            status: status.into(),
            time_in: None,
        }
    }

    #[test]
    fn status_codes_decode() {
        let record = AttendanceRecord::try_from(row("½P")).unwrap();
        assert_eq!(record.status, DayStatus::HalfPresent);
        assert!(matches!(
            AttendanceRecord::try_from(row("XX")),
            Err(PayrollError::InvalidInput(_))
        ));
    }
}
