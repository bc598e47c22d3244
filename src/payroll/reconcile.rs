//! Keeps the attendance counters of one record consistent while a single
//! field is being edited.
//!
//! `days_worked` and `days_paid` always move together. Whichever of
//! `days_paid`, `al` and `lop` was edited drives the others; `total_days` is
//! fixed context.

use chrono::NaiveTime;
use serde::Deserialize;

use crate::payroll::attendance::{AttendanceRecord, DayStatus};
use crate::payroll::error::{PayrollError, PayrollResult};

/// A single-field edit to an attendance record.
///
/// Identity fields (employee, date, CTC without LOP) have no variant and so
/// cannot be changed through reconciliation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum AttendanceEdit {
    DaysWorked(i64),
    DaysPaid(i64),
    Al(i64),
    Lop(i64),
    Pl(i64),
    BlOrMl(i64),
    EmpName(String),
    Department(Option<String>),
    Designation(Option<String>),
    Status(DayStatus),
    TimeIn(Option<NaiveTime>),
}

impl AttendanceEdit {
    pub fn field(&self) -> &'static str {
        match self {
            AttendanceEdit::DaysWorked(_) => "days_worked",
            AttendanceEdit::DaysPaid(_) => "days_paid",
            AttendanceEdit::Al(_) => "al",
            AttendanceEdit::Lop(_) => "lop",
            AttendanceEdit::Pl(_) => "pl",
            AttendanceEdit::BlOrMl(_) => "bl_or_ml",
            AttendanceEdit::EmpName(_) => "emp_name",
            AttendanceEdit::Department(_) => "department",
            AttendanceEdit::Designation(_) => "designation",
            AttendanceEdit::Status(_) => "status",
            AttendanceEdit::TimeIn(_) => "time_in",
        }
    }

    /// Edits that recompute other counters.
    pub fn is_driving(&self) -> bool {
        matches!(
            self,
            AttendanceEdit::DaysWorked(_)
                | AttendanceEdit::DaysPaid(_)
                | AttendanceEdit::Al(_)
                | AttendanceEdit::Lop(_)
        )
    }
}

fn clamp_input(field: &str, value: i64, total_days: u32) -> PayrollResult<u32> {
    if value < 0 {
        return Err(PayrollError::invalid(format!(
            "{field} cannot be negative, got {value}"
        )));
    }
    Ok(value.min(i64::from(total_days)) as u32)
}

/// Applies one edit and recomputes the dependent counters.
pub fn reconcile(record: &AttendanceRecord, edit: AttendanceEdit) -> PayrollResult<AttendanceRecord> {
    let total = record.total_days;
    let mut next = record.clone();

    // stored counters may be stale; bring them into range before use
    let prior_paid = record.days_paid.min(total);
    let prior_al = record.al.min(total);

    let field = edit.field();
    match edit {
        AttendanceEdit::DaysWorked(value) | AttendanceEdit::DaysPaid(value) => {
            let paid = clamp_input(field, value, total)?;
            next.days_worked = paid;
            next.days_paid = paid;
            next.al = prior_al;
            next.lop = total.saturating_sub(paid).saturating_sub(prior_al);
        }
        AttendanceEdit::Al(value) => {
            // annual leave only eats into LOP; days paid stay as they were
            let al = clamp_input(field, value, total)?;
            next.al = al;
            next.days_worked = prior_paid;
            next.days_paid = prior_paid;
            next.lop = total.saturating_sub(prior_paid).saturating_sub(al);
        }
        AttendanceEdit::Lop(value) => {
            let lop = clamp_input(field, value, total)?;
            let paid = total.saturating_sub(lop).saturating_sub(prior_al);
            next.lop = lop;
            next.al = prior_al;
            next.days_worked = paid;
            next.days_paid = paid;
        }
        AttendanceEdit::Pl(value) => next.pl = clamp_input(field, value, total)?,
        AttendanceEdit::BlOrMl(value) => next.bl_or_ml = clamp_input(field, value, total)?,
        AttendanceEdit::EmpName(name) => next.emp_name = name,
        AttendanceEdit::Department(department) => next.department = department,
        AttendanceEdit::Designation(designation) => next.designation = designation,
        AttendanceEdit::Status(status) => next.status = status,
        AttendanceEdit::TimeIn(time_in) => next.time_in = time_in,
    }

    Ok(next)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use super::*;

    fn record(total: u32, paid: u32, al: u32, lop: u32) -> AttendanceRecord {
        AttendanceRecord {
            emp_id: "E001".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            ctc_without_lop: Some(dec!(15000)),
            emp_name: "Asha".into(),
            department: Some("Accounts".into()),
            designation: None,
            total_days: total,
            days_worked: paid,
            days_paid: paid,
            al,
            pl: 0,
            bl_or_ml: 0,
            lop,
            status: DayStatus::Present,
            time_in: None,
        }
    }

    fn counters(r: &AttendanceRecord) -> (u32, u32, u32, u32) {
        (r.days_worked, r.days_paid, r.al, r.lop)
    }

    #[test]
    fn annual_leave_does_not_reduce_days_paid() {
        let out = reconcile(&record(30, 30, 0, 0), AttendanceEdit::Al(2)).unwrap();
        assert_eq!(counters(&out), (30, 30, 2, 0));
    }

    #[test]
    fn annual_leave_eats_into_lop() {
        let out = reconcile(&record(30, 25, 0, 5), AttendanceEdit::Al(3)).unwrap();
        assert_eq!(counters(&out), (25, 25, 3, 2));
    }

    #[test]
    fn days_paid_edit_mirrors_and_recomputes_lop() {
        let out = reconcile(&record(30, 30, 2, 0), AttendanceEdit::DaysPaid(20)).unwrap();
        assert_eq!(counters(&out), (20, 20, 2, 8));

        let out = reconcile(&record(30, 30, 2, 0), AttendanceEdit::DaysWorked(45)).unwrap();
        assert_eq!(counters(&out), (30, 30, 2, 0));
    }

    #[test]
    fn lop_edit_drives_days_paid() {
        let out = reconcile(&record(30, 30, 2, 0), AttendanceEdit::Lop(4)).unwrap();
        assert_eq!(counters(&out), (24, 24, 2, 4));

        let out = reconcile(&record(30, 30, 10, 0), AttendanceEdit::Lop(25)).unwrap();
        assert_eq!(counters(&out), (0, 0, 10, 25));
    }

    #[test]
    fn negative_input_is_rejected() {
        assert!(matches!(
            reconcile(&record(30, 30, 0, 0), AttendanceEdit::Lop(-1)),
            Err(PayrollError::InvalidInput(_))
        ));
        assert!(reconcile(&record(30, 30, 0, 0), AttendanceEdit::Pl(-3)).is_err());
    }

    #[test]
    fn passthrough_edits_leave_counters_alone() {
        let before = record(30, 28, 1, 1);
        let out = reconcile(&before, AttendanceEdit::Department(Some("Ops".into()))).unwrap();
        assert_eq!(out.department.as_deref(), Some("Ops"));
        assert_eq!(counters(&out), counters(&before));

        let out = reconcile(&before, AttendanceEdit::Status(DayStatus::Absent)).unwrap();
        assert_eq!(out.status, DayStatus::Absent);
        assert!(!AttendanceEdit::Status(DayStatus::Absent).is_driving());
    }

    #[test]
    fn identity_survives_every_edit() {
        let before = record(30, 28, 1, 1);
        for edit in [
            AttendanceEdit::DaysPaid(10),
            AttendanceEdit::Al(5),
            AttendanceEdit::Lop(7),
            AttendanceEdit::EmpName("Someone".into()),
        ] {
            let out = reconcile(&before, edit).unwrap();
            assert_eq!(out.emp_id, before.emp_id);
            assert_eq!(out.date, before.date);
            assert_eq!(out.ctc_without_lop, before.ctc_without_lop);
            assert_eq!(out.total_days, before.total_days);
        }
    }

    #[test]
    fn counters_stay_in_range_for_any_edit() {
        for total in [0u32, 1, 15, 30, 31] {
            for paid in [0u32, 10, 31, 40] {
                for al in [0u32, 3, 40] {
                    let start = record(total, paid, al, 0);
                    for value in [0i64, 1, 7, 30, 31, 100] {
                        for edit in [
                            AttendanceEdit::DaysWorked(value),
                            AttendanceEdit::DaysPaid(value),
                            AttendanceEdit::Al(value),
                            AttendanceEdit::Lop(value),
                        ] {
                            let out = reconcile(&start, edit).unwrap();
                            assert_eq!(out.days_worked, out.days_paid);
                            for c in [out.days_worked, out.days_paid, out.al, out.lop] {
                                assert!(c <= total, "{c} > {total}");
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn edits_parse_from_field_value_json() {
        let edit: AttendanceEdit =
            serde_json::from_str(r#"{"field": "al", "value": 2}"#).unwrap();
        assert_eq!(edit, AttendanceEdit::Al(2));
        let edit: AttendanceEdit =
            serde_json::from_str(r#"{"field": "status", "value": "ALH"}"#).unwrap();
        assert_eq!(edit, AttendanceEdit::Status(DayStatus::AnnualLeaveHalf));
        assert!(serde_json::from_str::<AttendanceEdit>(r#"{"field": "emp_id", "value": "x"}"#).is_err());
    }
}
