//! Monthly payslip from a salary breakdown and the month's attendance counters.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::payroll::attendance::AttendanceRecord;
use crate::payroll::compensation::{CompensationBreakdown, round_whole as whole};
use crate::payroll::cycle::PayrollCycle;
use crate::payroll::error::{PayrollError, PayrollResult};

const PF_RATE: Decimal = dec!(0.12);
const ESI_EMPLOYEE_RATE: Decimal = dec!(0.0075);
const ESI_EMPLOYER_RATE: Decimal = dec!(0.0325);
const BONUS_RATE: Decimal = dec!(0.0833);
/// ESI applies only up to this consolidated salary.
pub const ESI_CEILING: i64 = 21_000;

/// Manually entered amounts for the month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, ToSchema)]
pub struct PayslipExtras {
    /// Performance-linked bonus, paid on top of gross.
    #[serde(default, with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 0.0)]
    pub plb: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 0.0)]
    pub tds: Decimal,
    /// Group personal accident premium.
    #[serde(default, with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 0.0)]
    pub gpap: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 0.0)]
    pub other_deductions: Decimal,
}

impl PayslipExtras {
    fn validate(&self) -> PayrollResult<()> {
        for (name, value) in [
            ("plb", self.plb),
            ("tds", self.tds),
            ("gpap", self.gpap),
            ("other_deductions", self.other_deductions),
        ] {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(PayrollError::invalid(format!(
                    "{name} cannot be negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Payslip {
    pub emp_id: String,
    #[serde(flatten)]
    pub cycle: PayrollCycle,
    pub total_days: u32,
    pub days_paid: u32,
    pub lop: u32,

    pub consolidated_salary: i64,
    pub basic: i64,
    pub hra: i64,
    pub cca: i64,
    pub transport_allowance: i64,
    pub balancing_allowance: i64,
    pub gross_pay: i64,
    /// Consolidated salary lost to LOP days.
    pub lop_amount: i64,

    pub plb: i64,
    pub pf: i64,
    pub esi: i64,
    pub pt: i64,
    pub tds: i64,
    pub gpap: i64,
    pub other_deductions: i64,
    pub net_pay: i64,

    pub pf_employer: i64,
    pub esi_employer: i64,
    pub bonus: i64,
    /// Cost to company for the month after LOP.
    pub lop_ctc: i64,
}

impl Payslip {
    pub fn total_deductions(&self) -> i64 {
        self.pf + self.esi + self.pt + self.tds + self.gpap + self.other_deductions
    }
}

/// Professional tax slab on monthly gross.
pub fn professional_tax(gross_pay: i64) -> i64 {
    if gross_pay > 20_000 {
        200
    } else if gross_pay > 15_000 {
        150
    } else {
        100
    }
}

/// Prorates `breakdown` over the record's days and derives deductions and
/// employer contributions. Every amount is rounded to whole units, and
/// later figures are computed from the rounded ones so the slip adds up.
pub fn compute_payslip(
    breakdown: &CompensationBreakdown,
    attendance: &AttendanceRecord,
    extras: &PayslipExtras,
) -> PayrollResult<Payslip> {
    extras.validate()?;

    let total = attendance.total_days;
    let paid = attendance.days_paid.min(total);
    let lop = attendance.lop.min(total);

    let prorate = |amount: i64, days: u32| -> PayrollResult<i64> {
        if total == 0 {
            return Ok(0);
        }
        whole(Decimal::from(amount) * Decimal::from(days) / Decimal::from(total))
    };

    let basic = prorate(breakdown.basic(), paid)?;
    let hra = prorate(breakdown.hra(), paid)?;
    let cca = prorate(breakdown.cca(), paid)?;
    let transport_allowance = prorate(breakdown.transport_allowance(), paid)?;
    let balancing_allowance = prorate(breakdown.balancing_allowance(), paid)?;
    let lop_amount = prorate(breakdown.consolidated_salary(), lop)?;
    let gross_pay = basic + hra + cca + transport_allowance + balancing_allowance;

    let plb = whole(extras.plb)?;
    let pf = whole(Decimal::from(basic) * PF_RATE)?;
    let (esi, esi_employer) = if breakdown.consolidated_salary() <= ESI_CEILING {
        let base = Decimal::from(gross_pay + plb);
        (whole(base * ESI_EMPLOYEE_RATE)?, whole(base * ESI_EMPLOYER_RATE)?)
    } else {
        (0, 0)
    };
    let pt = professional_tax(gross_pay);
    let tds = whole(extras.tds)?;
    let gpap = whole(extras.gpap)?;
    let other_deductions = whole(extras.other_deductions)?;
    let bonus = whole(Decimal::from(gross_pay) * BONUS_RATE)?;

    let mut slip = Payslip {
        emp_id: attendance.emp_id.clone(),
        cycle: attendance.cycle(),
        total_days: total,
        days_paid: paid,
        lop,
        consolidated_salary: breakdown.consolidated_salary(),
        basic,
        hra,
        cca,
        transport_allowance,
        balancing_allowance,
        gross_pay,
        lop_amount,
        plb,
        pf,
        esi,
        pt,
        tds,
        gpap,
        other_deductions,
        net_pay: 0,
        pf_employer: pf,
        esi_employer,
        bonus,
        lop_ctc: gross_pay + pf + esi_employer + bonus,
    };
    slip.net_pay = gross_pay + plb - slip.total_deductions();
    Ok(slip)
}
