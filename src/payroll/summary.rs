//! Monthly (per payroll cycle) attendance summaries.
//!
//! Summaries are always rebuilt from the full set of records of a cycle; they
//! are never patched incrementally.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::payroll::attendance::{AttendanceRecord, DayStatus};
use crate::payroll::cycle::PayrollCycle;
use crate::payroll::error::{PayrollError, PayrollResult};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthlySummary {
    #[schema(example = "E001")]
    pub emp_id: String,
    pub emp_name: String,
    #[serde(flatten)]
    pub cycle: PayrollCycle,
    #[schema(value_type = String, format = "date")]
    pub cycle_start: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub cycle_end: NaiveDate,
    /// Calendar days in the cycle window.
    pub cycle_days: u32,
    /// Records considered.
    pub total_days: u32,

    pub present: u32,
    pub half_present: u32,
    pub absent: u32,
    pub weekly_off: u32,
    pub holiday: u32,
    pub annual_leave_full: u32,
    pub annual_leave_half: u32,
    /// Weekly offs on which the employee still punched in.
    pub weekly_off_present: u32,

    pub effective_present: f64,
    pub effective_absent: f64,
    pub effective_leave: f64,
    /// Present days plus paid non-working days (weekly offs and holidays).
    /// Annual leave is not included.
    pub days_worked: f64,
}

impl MonthlySummary {
    fn empty(emp_id: &str, cycle: PayrollCycle) -> PayrollResult<Self> {
        let (cycle_start, cycle_end) = cycle.window()?;
        Ok(Self {
            emp_id: emp_id.to_string(),
            emp_name: String::new(),
            cycle,
            cycle_start,
            cycle_end,
            cycle_days: cycle.days()?,
            total_days: 0,
            present: 0,
            half_present: 0,
            absent: 0,
            weekly_off: 0,
            holiday: 0,
            annual_leave_full: 0,
            annual_leave_half: 0,
            weekly_off_present: 0,
            effective_present: 0.0,
            effective_absent: 0.0,
            effective_leave: 0.0,
            days_worked: 0.0,
        })
    }

    fn count(&mut self, record: &AttendanceRecord) {
        if self.emp_name.is_empty() {
            self.emp_name = record.emp_name.clone();
        }
        self.total_days += 1;

        match record.status {
            DayStatus::Present => {
                self.present += 1;
                self.effective_present += 1.0;
            }
            DayStatus::HalfPresent => {
                self.half_present += 1;
                self.effective_present += 0.5;
                self.effective_absent += 0.5;
            }
            DayStatus::Absent => {
                self.absent += 1;
                self.effective_absent += 1.0;
            }
            DayStatus::WeeklyOff => {
                self.weekly_off += 1;
                if record.has_punch_in() {
                    self.weekly_off_present += 1;
                }
            }
            DayStatus::Holiday => self.holiday += 1,
            DayStatus::AnnualLeaveFull => {
                self.annual_leave_full += 1;
                self.effective_leave += 1.0;
            }
            DayStatus::AnnualLeaveHalf => {
                self.annual_leave_half += 1;
                self.effective_leave += 0.5;
            }
        }

        self.days_worked =
            self.effective_present + f64::from(self.weekly_off) + f64::from(self.holiday);
    }
}

/// Summarises `emp_id`'s records that fall in `cycle`.
///
/// Returns [`PayrollError::EmptyCycle`] when nothing matches; callers treat
/// that as "no data yet".
pub fn aggregate(
    emp_id: &str,
    cycle: PayrollCycle,
    records: &[AttendanceRecord],
) -> PayrollResult<MonthlySummary> {
    let mut summary = MonthlySummary::empty(emp_id, cycle)?;

    for record in records
        .iter()
        .filter(|r| r.emp_id == emp_id && r.cycle() == cycle)
    {
        summary.count(record);
    }

    if summary.total_days == 0 {
        return Err(PayrollError::EmptyCycle {
            emp_id: emp_id.to_string(),
            cycle,
        });
    }
    Ok(summary)
}

/// One summary per cycle that has records for `emp_id`, oldest cycle first.
pub fn aggregate_all(
    emp_id: &str,
    records: &[AttendanceRecord],
) -> PayrollResult<Vec<MonthlySummary>> {
    let mut cycles: BTreeMap<PayrollCycle, MonthlySummary> = BTreeMap::new();

    for record in records.iter().filter(|r| r.emp_id == emp_id) {
        let cycle = record.cycle();
        let summary = match cycles.entry(cycle) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => slot.insert(MonthlySummary::empty(emp_id, cycle)?),
        };
        summary.count(record);
    }

    Ok(cycles.into_values().collect())
}
