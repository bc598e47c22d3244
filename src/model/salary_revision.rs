use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::payroll::{
    CompensationBreakdown, PayrollCycle, PayrollError, RevisionId, SalaryRevision,
};

/// Row of `salary_revisions`.
#[derive(Debug, sqlx::FromRow)]
pub struct SalaryRevisionRow {
    pub id: String, // CHAR(36) uuid
    pub emp_id: String,
    pub effective_year: i32,
    pub effective_month: u32,
    pub effective_to_year: Option<i32>,
    pub effective_to_month: Option<u32>,
    pub gross_ctc: Decimal,
    pub consolidated_salary: i64,
    pub basic: i64,
    pub hra: i64,
    pub cca: i64,
    pub transport_allowance: i64,
    pub balancing_allowance: i64,
    pub reason: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SalaryRevisionRow> for SalaryRevision {
    type Error = PayrollError;

    fn try_from(row: SalaryRevisionRow) -> Result<Self, Self::Error> {
        let effective_to = match (row.effective_to_year, row.effective_to_month) {
            (Some(year), Some(month)) => Some(PayrollCycle::new(year, month)?),
            (None, None) => None,
            _ => {
                return Err(PayrollError::integrity(format!(
                    "revision {} has a half-written end cycle",
                    row.id
                )));
            }
        };

        Ok(SalaryRevision {
            id: RevisionId::parse(&row.id)?,
            effective_from: PayrollCycle::new(row.effective_year, row.effective_month)?,
            effective_to,
            breakdown: CompensationBreakdown::from_stored(
                row.gross_ctc,
                row.consolidated_salary,
                row.basic,
                row.hra,
                row.balancing_allowance,
            )?,
            emp_id: row.emp_id,
            reason: row.reason,
            updated_by: row.updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
