use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::api::error::ServiceResult;
use crate::auth::auth::AuthUser;
use crate::payroll::{LedgerGap, PayrollCycle, RevisionEdit, RevisionId, SalaryRevision};
use crate::repo::salary_history;

#[derive(Deserialize, ToSchema)]
pub struct AddRevision {
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 18000.0)]
    pub gross_ctc: Decimal,
    /// First payroll cycle the new salary applies to.
    pub effective_from: PayrollCycle,
    #[serde(default)]
    #[schema(example = "Annual increment")]
    pub reason: String,
}

#[derive(Serialize, ToSchema)]
pub struct RevisionHistoryResponse {
    pub emp_id: String,
    /// Newest first
    pub revisions: Vec<SalaryRevision>,
    /// Cycles no revision covers
    pub gaps: Vec<LedgerGap>,
}

#[derive(Serialize, ToSchema)]
pub struct DeleteRevisionResponse {
    pub message: String,
    pub removed: String,
    /// Revision that became current again
    pub reopened: Option<String>,
    pub gap: Option<LedgerGap>,
}

#[derive(Deserialize, IntoParams)]
pub struct ActiveQuery {
    #[param(value_type = String, format = Date, example = "2024-03-21")]
    pub date: NaiveDate,
}

/// Salary history of an employee
#[utoipa::path(
    get,
    path = "/api/salary/{emp_id}/revisions",
    params(("emp_id", description = "Employee ID")),
    responses(
        (status = 200, body = RevisionHistoryResponse),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Stored revisions are inconsistent")
    ),
    security(("bearer_auth" = [])),
    tag = "Salary"
)]
pub async fn list_revisions(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let emp_id = path.into_inner();
    auth.require_can_read(&emp_id)?;

    let ledger = salary_history::load_ledger(pool.get_ref(), &emp_id).await?;

    Ok(HttpResponse::Ok().json(RevisionHistoryResponse {
        revisions: ledger.history(),
        gaps: ledger.gaps(),
        emp_id,
    }))
}

/// Add a salary revision
#[utoipa::path(
    post,
    path = "/api/salary/{emp_id}/revisions",
    params(("emp_id", description = "Employee ID")),
    request_body = AddRevision,
    responses(
        (status = 201, description = "Revision added; the previous one is closed", body = SalaryRevision),
        (status = 400, description = "Invalid CTC"),
        (status = 403, description = "HR/Admin only"),
        (status = 409, description = "Effective cycle does not follow the current revision")
    ),
    security(("bearer_auth" = [])),
    tag = "Salary"
)]
#[tracing::instrument(skip_all, fields(user = %auth.username))]
pub async fn add_revision(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    body: web::Json<AddRevision>,
) -> ServiceResult<HttpResponse> {
    let emp_id = path.into_inner();
    let body = body.into_inner();

    let revision = salary_history::add_revision(
        pool.get_ref(),
        &emp_id,
        body.gross_ctc,
        body.effective_from,
        &body.reason,
        &auth,
    )
    .await?;

    Ok(HttpResponse::Created().json(revision))
}

/// Salary revision in force on a date
#[utoipa::path(
    get,
    path = "/api/salary/{emp_id}/active",
    params(("emp_id", description = "Employee ID"), ActiveQuery),
    responses(
        (status = 200, body = SalaryRevision),
        (status = 404, description = "No revision covers the date's payroll cycle")
    ),
    security(("bearer_auth" = [])),
    tag = "Salary"
)]
pub async fn active_revision(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    query: web::Query<ActiveQuery>,
) -> ServiceResult<HttpResponse> {
    let emp_id = path.into_inner();
    auth.require_can_read(&emp_id)?;

    let revision = salary_history::active_revision_at(pool.get_ref(), &emp_id, query.date).await?;
    Ok(HttpResponse::Ok().json(revision))
}

/// Edit a salary revision
#[utoipa::path(
    put,
    path = "/api/salary/revisions/{revision_id}",
    params(("revision_id", description = "Revision ID")),
    request_body = RevisionEdit,
    responses(
        (status = 200, body = SalaryRevision),
        (status = 400, description = "Invalid CTC or empty edit"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Revision not found"),
        (status = 409, description = "Effective cycle would cross a neighbouring revision")
    ),
    security(("bearer_auth" = [])),
    tag = "Salary"
)]
#[tracing::instrument(skip_all, fields(user = %auth.username))]
pub async fn edit_revision(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    body: web::Json<RevisionEdit>,
) -> ServiceResult<HttpResponse> {
    let id = RevisionId::parse(&path)?;

    let revision = salary_history::edit_revision(pool.get_ref(), id, body.into_inner(), &auth).await?;
    Ok(HttpResponse::Ok().json(revision))
}

/// Delete a salary revision
#[utoipa::path(
    delete,
    path = "/api/salary/revisions/{revision_id}",
    params(("revision_id", description = "Revision ID")),
    responses(
        (status = 200, body = DeleteRevisionResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Revision not found"),
        (status = 409, description = "Only revision of the employee")
    ),
    security(("bearer_auth" = [])),
    tag = "Salary"
)]
#[tracing::instrument(skip_all, fields(user = %auth.username))]
pub async fn delete_revision(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let id = RevisionId::parse(&path)?;

    let mutation = salary_history::delete_revision(pool.get_ref(), id, &auth).await?;

    let message = match (&mutation.reopened, &mutation.gap) {
        (Some(_), _) => "Salary revision deleted; previous revision is current again",
        (None, Some(_)) => "Salary revision deleted; its cycles are no longer covered",
        (None, None) => "Salary revision deleted",
    };

    Ok(HttpResponse::Ok().json(DeleteRevisionResponse {
        message: message.to_string(),
        removed: id.to_string(),
        reopened: mutation.reopened.map(|r| r.to_string()),
        gap: mutation.gap,
    }))
}
