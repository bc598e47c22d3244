//! MySQL persistence of the salary revision ledger.
//!
//! Each mutation loads the employee's revisions with `SELECT ... FOR UPDATE`,
//! applies the operation to an [`EmployeeLedger`] and writes back only the rows
//! listed in the resulting [`LedgerMutation`], all inside one transaction.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{MySqlConnection, MySqlPool};

use crate::api::error::{ServiceError, ServiceResult};
use crate::model::salary_revision::SalaryRevisionRow;
use crate::payroll::{
    EmployeeLedger, LedgerActor, LedgerMutation, PayrollCycle, PayrollError, RevisionEdit,
    RevisionId, RowWrite, SalaryRevision,
};

macro_rules! select_revisions {
    ($tail:literal) => {
        concat!(
            r#"
            SELECT id, emp_id, effective_year, effective_month,
                   effective_to_year, effective_to_month,
                   gross_ctc, consolidated_salary, basic, hra, cca,
                   transport_allowance, balancing_allowance,
                   reason, updated_by, created_at, updated_at
            FROM salary_revisions
            "#,
            $tail
        )
    };
}

fn into_ledger(emp_id: &str, rows: Vec<SalaryRevisionRow>) -> ServiceResult<EmployeeLedger> {
    let revisions = rows
        .into_iter()
        .map(SalaryRevision::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(EmployeeLedger::from_revisions(emp_id, revisions)?)
}

/// Read-only snapshot of one employee's ledger.
pub async fn load_ledger(pool: &MySqlPool, emp_id: &str) -> ServiceResult<EmployeeLedger> {
    let rows = sqlx::query_as::<_, SalaryRevisionRow>(select_revisions!(
        "WHERE emp_id = ? ORDER BY effective_year, effective_month"
    ))
    .bind(emp_id)
    .fetch_all(pool)
    .await?;
    into_ledger(emp_id, rows)
}

async fn lock_ledger(conn: &mut MySqlConnection, emp_id: &str) -> ServiceResult<EmployeeLedger> {
    let rows = sqlx::query_as::<_, SalaryRevisionRow>(select_revisions!(
        "WHERE emp_id = ? ORDER BY effective_year, effective_month FOR UPDATE"
    ))
    .bind(emp_id)
    .fetch_all(&mut *conn)
    .await?;
    into_ledger(emp_id, rows)
}

async fn owner_of(conn: &mut MySqlConnection, id: RevisionId) -> ServiceResult<String> {
    let owner = sqlx::query_as::<_, (String,)>("SELECT emp_id FROM salary_revisions WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    owner
        .map(|(emp_id,)| emp_id)
        .ok_or_else(|| PayrollError::NotFound(format!("salary revision {id}")).into())
}

fn cycle_parts(cycle: Option<PayrollCycle>) -> (Option<i32>, Option<u32>) {
    match cycle {
        Some(c) => (Some(c.year()), Some(c.month())),
        None => (None, None),
    }
}

async fn upsert_revision(conn: &mut MySqlConnection, rev: &SalaryRevision) -> ServiceResult<()> {
    let (to_year, to_month) = cycle_parts(rev.effective_to);
    let b = &rev.breakdown;

    sqlx::query(
        r#"
        INSERT INTO salary_revisions
            (id, emp_id, effective_year, effective_month, effective_to_year, effective_to_month,
             gross_ctc, consolidated_salary, basic, hra, cca, transport_allowance,
             balancing_allowance, reason, updated_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            effective_year = VALUES(effective_year),
            effective_month = VALUES(effective_month),
            effective_to_year = VALUES(effective_to_year),
            effective_to_month = VALUES(effective_to_month),
            gross_ctc = VALUES(gross_ctc),
            consolidated_salary = VALUES(consolidated_salary),
            basic = VALUES(basic),
            hra = VALUES(hra),
            cca = VALUES(cca),
            transport_allowance = VALUES(transport_allowance),
            balancing_allowance = VALUES(balancing_allowance),
            reason = VALUES(reason),
            updated_by = VALUES(updated_by),
            updated_at = VALUES(updated_at)
        "#,
    )
    .bind(rev.id.to_string())
    .bind(&rev.emp_id)
    .bind(rev.effective_from.year())
    .bind(rev.effective_from.month())
    .bind(to_year)
    .bind(to_month)
    .bind(b.gross_ctc())
    .bind(b.consolidated_salary())
    .bind(b.basic())
    .bind(b.hra())
    .bind(b.cca())
    .bind(b.transport_allowance())
    .bind(b.balancing_allowance())
    .bind(&rev.reason)
    .bind(&rev.updated_by)
    .bind(rev.created_at)
    .bind(rev.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(ServiceError::from_write)?;
    Ok(())
}

async fn write_mutation(conn: &mut MySqlConnection, mutation: &LedgerMutation) -> ServiceResult<()> {
    for write in mutation.writes() {
        match write {
            RowWrite::Delete(removed) => {
                sqlx::query("DELETE FROM salary_revisions WHERE id = ?")
                    .bind(removed.id.to_string())
                    .execute(&mut *conn)
                    .await?;
            }
            RowWrite::Upsert(revision) => upsert_revision(conn, revision).await?,
        }
    }
    Ok(())
}

fn warn_negative_balancing(revision: &SalaryRevision) {
    if revision.breakdown.has_negative_balancing() {
        tracing::warn!(
            emp_id = %revision.emp_id,
            revision_id = %revision.id,
            balancing_allowance = revision.breakdown.balancing_allowance(),
            "Fixed allowances exceed consolidated salary; balancing allowance is negative"
        );
    }
}

fn primary(mutation: &LedgerMutation) -> ServiceResult<SalaryRevision> {
    mutation
        .primary()
        .cloned()
        .ok_or_else(|| PayrollError::integrity("ledger operation produced no revision").into())
}

pub async fn add_revision(
    pool: &MySqlPool,
    emp_id: &str,
    gross_ctc: Decimal,
    effective_from: PayrollCycle,
    reason: &str,
    actor: &dyn LedgerActor,
) -> ServiceResult<SalaryRevision> {
    let mut tx = pool.begin().await?;

    let mut ledger = lock_ledger(&mut tx, emp_id).await?;
    let mutation = ledger.add_revision(gross_ctc, effective_from, reason, actor)?;
    write_mutation(&mut tx, &mutation).await?;

    tx.commit().await?;

    let added = primary(&mutation)?;
    warn_negative_balancing(&added);
    tracing::info!(
        emp_id,
        revision_id = %added.id,
        effective_from = %effective_from,
        updated_by = actor.actor_name(),
        "Salary revision added"
    );
    Ok(added)
}

pub async fn edit_revision(
    pool: &MySqlPool,
    id: RevisionId,
    edit: RevisionEdit,
    actor: &dyn LedgerActor,
) -> ServiceResult<SalaryRevision> {
    let mut tx = pool.begin().await?;

    let emp_id = owner_of(&mut tx, id).await?;
    let mut ledger = lock_ledger(&mut tx, &emp_id).await?;
    let mutation = ledger.edit_revision(id, edit, actor)?;
    write_mutation(&mut tx, &mutation).await?;

    tx.commit().await?;

    let edited = primary(&mutation)?;
    warn_negative_balancing(&edited);
    tracing::info!(
        emp_id,
        revision_id = %id,
        rows = mutation.upserted.len(),
        updated_by = actor.actor_name(),
        "Salary revision edited"
    );
    Ok(edited)
}

pub async fn delete_revision(
    pool: &MySqlPool,
    id: RevisionId,
    actor: &dyn LedgerActor,
) -> ServiceResult<LedgerMutation> {
    let mut tx = pool.begin().await?;

    let emp_id = owner_of(&mut tx, id).await?;
    let mut ledger = lock_ledger(&mut tx, &emp_id).await?;
    let mutation = ledger.delete_revision(id, actor)?;
    write_mutation(&mut tx, &mutation).await?;

    tx.commit().await?;

    tracing::info!(
        emp_id,
        revision_id = %id,
        reopened = ?mutation.reopened.map(|r| r.to_string()),
        gap = mutation.gap.is_some(),
        updated_by = actor.actor_name(),
        "Salary revision deleted"
    );
    Ok(mutation)
}

pub async fn active_revision_at(
    pool: &MySqlPool,
    emp_id: &str,
    date: NaiveDate,
) -> ServiceResult<SalaryRevision> {
    let ledger = load_ledger(pool, emp_id).await?;
    Ok(ledger.active_at(date)?.clone())
}
