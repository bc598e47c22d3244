use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::api::error::{ServiceError, ServiceResult};
use crate::auth::auth::AuthUser;
use crate::payroll::{
    AllowanceCounters, AttendanceEdit, AttendanceRecord, DayDecision, DayPunch, MonthlySummary,
    PayrollCycle, aggregate_all, evaluate_day,
};
use crate::repo::attendance as attendance_repo;
use crate::utils::summary_cache;

#[derive(Deserialize, IntoParams)]
pub struct SummaryQuery {
    #[param(example = 2024)]
    pub year: i32,
    #[param(example = 3)]
    pub month: u32,
}

#[derive(Serialize, ToSchema)]
pub struct SummaryListResponse {
    pub emp_id: String,
    /// Oldest cycle first
    pub summaries: Vec<MonthlySummary>,
}

#[derive(Deserialize, ToSchema)]
pub struct EvaluateRequest {
    pub punch: DayPunch,
    /// Allowances already used this cycle
    #[serde(default)]
    pub counters: AllowanceCounters,
}

#[derive(Serialize, ToSchema)]
pub struct EvaluateResponse {
    pub decision: DayDecision,
    /// `counters` with this day's usage applied
    pub counters: AllowanceCounters,
}

/// Edit one field of an attendance record
#[utoipa::path(
    put,
    path = "/api/attendance/{emp_id}/{date}",
    params(
        ("emp_id", description = "Employee ID"),
        ("date", description = "Record date, YYYY-MM-DD")
    ),
    request_body(
        content = serde_json::Value,
        description = "One field and its new value. `field` is one of `days_worked`, \
            `days_paid`, `al`, `lop`, `pl`, `bl_or_ml`, `emp_name`, `department`, \
            `designation`, `status`, `time_in`",
        example = json!({"field": "al", "value": 2})
    ),
    responses(
        (status = 200, description = "Record with reconciled counters", body = AttendanceRecord),
        (status = 400, description = "Negative or malformed value"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[tracing::instrument(skip_all, fields(user = %auth.username))]
pub async fn reconcile_record(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<(String, NaiveDate)>,
    body: web::Json<AttendanceEdit>,
) -> ServiceResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let (emp_id, date) = path.into_inner();

    let updated =
        attendance_repo::reconcile_record(pool.get_ref(), &emp_id, date, body.into_inner()).await?;
    summary_cache::invalidate(&emp_id, date).await;

    Ok(HttpResponse::Ok().json(updated))
}

/// Attendance summary of one payroll cycle
#[utoipa::path(
    get,
    path = "/api/attendance/{emp_id}/summary",
    params(("emp_id", description = "Employee ID"), SummaryQuery),
    responses(
        (status = 200, description = "Summary, or a message when the cycle has no records", body = MonthlySummary),
        (status = 400, description = "Invalid year or month"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn monthly_summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    query: web::Query<SummaryQuery>,
) -> ServiceResult<HttpResponse> {
    let emp_id = path.into_inner();
    auth.require_can_read(&emp_id)?;
    let cycle = PayrollCycle::new(query.year, query.month)?;

    match summary_cache::summary_for(pool.get_ref(), &emp_id, cycle).await {
        Ok(summary) => Ok(HttpResponse::Ok().json(summary.as_ref())),
        Err(ServiceError::Payroll(e)) if e.is_recoverable() => {
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "message": "no data for this period",
                "emp_id": emp_id,
                "year": cycle.year(),
                "month": cycle.month(),
            })))
        }
        Err(e) => Err(e),
    }
}

/// Summaries of every cycle with records
#[utoipa::path(
    get,
    path = "/api/attendance/{emp_id}/summaries",
    params(("emp_id", description = "Employee ID")),
    responses(
        (status = 200, body = SummaryListResponse),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_summaries(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let emp_id = path.into_inner();
    auth.require_can_read(&emp_id)?;

    let seen = summary_cache::generations();
    let records = attendance_repo::fetch_all(pool.get_ref(), &emp_id).await?;
    let summaries = aggregate_all(&emp_id, &records)?;
    for summary in &summaries {
        summary_cache::put(summary.clone(), &seen).await;
    }

    Ok(HttpResponse::Ok().json(SummaryListResponse { emp_id, summaries }))
}

/// Status of a day from punch times
#[utoipa::path(
    post,
    path = "/api/attendance/evaluate",
    request_body = EvaluateRequest,
    responses(
        (status = 200, body = EvaluateResponse),
        (status = 400, description = "Malformed times")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn evaluate(body: web::Json<EvaluateRequest>) -> HttpResponse {
    let decision = evaluate_day(&body.punch, &body.counters);
    let mut counters = body.counters;
    counters.apply(&decision);

    HttpResponse::Ok().json(EvaluateResponse { decision, counters })
}
