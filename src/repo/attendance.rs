use chrono::NaiveDate;
use futures::stream::BoxStream;
use sqlx::{MySqlConnection, MySqlPool};

use crate::api::error::ServiceResult;
use crate::model::attendance::AttendanceRow;
use crate::payroll::{AttendanceEdit, AttendanceRecord, PayrollCycle, PayrollError, reconcile};

macro_rules! select_records {
    ($tail:literal) => {
        concat!(
            r#"
            SELECT emp_id, date, ctc_without_lop, emp_name, department, designation,
                   total_days, days_worked, days_paid, al, pl, bl_or_ml, lop,
                   status, time_in
            FROM attendance_records
            "#,
            $tail
        )
    };
}

fn into_records(rows: Vec<AttendanceRow>) -> ServiceResult<Vec<AttendanceRecord>> {
    Ok(rows
        .into_iter()
        .map(AttendanceRecord::try_from)
        .collect::<Result<Vec<_>, _>>()?)
}

fn not_found(emp_id: &str, date: NaiveDate) -> PayrollError {
    PayrollError::NotFound(format!("no attendance record for {emp_id} on {date}"))
}

pub async fn fetch_record(
    pool: &MySqlPool,
    emp_id: &str,
    date: NaiveDate,
) -> ServiceResult<AttendanceRecord> {
    let row = sqlx::query_as::<_, AttendanceRow>(select_records!("WHERE emp_id = ? AND date = ?"))
        .bind(emp_id)
        .bind(date)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| not_found(emp_id, date))?;
    Ok(AttendanceRecord::try_from(row)?)
}

/// Records of `emp_id` inside the cycle's date window.
pub async fn fetch_cycle(
    pool: &MySqlPool,
    emp_id: &str,
    cycle: PayrollCycle,
) -> ServiceResult<Vec<AttendanceRecord>> {
    let (start, end) = cycle.window()?;
    let rows = sqlx::query_as::<_, AttendanceRow>(select_records!(
        "WHERE emp_id = ? AND date BETWEEN ? AND ? ORDER BY date"
    ))
    .bind(emp_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;
    into_records(rows)
}

pub async fn fetch_all(pool: &MySqlPool, emp_id: &str) -> ServiceResult<Vec<AttendanceRecord>> {
    let rows = sqlx::query_as::<_, AttendanceRow>(select_records!("WHERE emp_id = ? ORDER BY date"))
        .bind(emp_id)
        .fetch_all(pool)
        .await?;
    into_records(rows)
}

/// Every record from `since` on, ordered by employee then date.
pub fn stream_since(
    pool: &MySqlPool,
    since: NaiveDate,
) -> BoxStream<'_, Result<AttendanceRow, sqlx::Error>> {
    sqlx::query_as::<_, AttendanceRow>(select_records!("WHERE date >= ? ORDER BY emp_id, date"))
        .bind(since)
        .fetch(pool)
}

async fn save_counters(conn: &mut MySqlConnection, record: &AttendanceRecord) -> ServiceResult<()> {
    sqlx::query(
        r#"
        UPDATE attendance_records
        SET emp_name = ?, department = ?, designation = ?,
            days_worked = ?, days_paid = ?, al = ?, pl = ?, bl_or_ml = ?, lop = ?,
            status = ?, time_in = ?
        WHERE emp_id = ? AND date = ?
        "#,
    )
    .bind(&record.emp_name)
    .bind(&record.department)
    .bind(&record.designation)
    .bind(record.days_worked)
    .bind(record.days_paid)
    .bind(record.al)
    .bind(record.pl)
    .bind(record.bl_or_ml)
    .bind(record.lop)
    .bind(record.status.as_ref())
    .bind(record.time_in)
    .bind(&record.emp_id)
    .bind(record.date)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Applies one edit to the stored record under a row lock and persists the
/// reconciled counters.
pub async fn reconcile_record(
    pool: &MySqlPool,
    emp_id: &str,
    date: NaiveDate,
    edit: AttendanceEdit,
) -> ServiceResult<AttendanceRecord> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, AttendanceRow>(select_records!(
        "WHERE emp_id = ? AND date = ? FOR UPDATE"
    ))
    .bind(emp_id)
    .bind(date)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| not_found(emp_id, date))?;

    let current = AttendanceRecord::try_from(row)?;
    let field = edit.field();
    let updated = reconcile(&current, edit)?;
    save_counters(&mut tx, &updated).await?;

    tx.commit().await?;

    tracing::info!(
        emp_id,
        %date,
        field,
        days_paid = updated.days_paid,
        al = updated.al,
        lop = updated.lop,
        "Attendance record reconciled"
    );
    Ok(updated)
}
