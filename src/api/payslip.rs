use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::api::error::ServiceResult;
use crate::auth::auth::AuthUser;
use crate::payroll::{Payslip, PayslipExtras, compute_payslip};
use crate::repo::{attendance as attendance_repo, salary_history};

#[derive(Serialize, ToSchema)]
pub struct PayslipResponse {
    pub payslip: Payslip,
    /// Salary revision the slip was computed from
    pub revision_id: String,
}

/// Compute a payslip
#[utoipa::path(
    post,
    path = "/api/payslip/{emp_id}/{date}",
    params(
        ("emp_id", description = "Employee ID"),
        ("date", description = "Attendance record date, YYYY-MM-DD")
    ),
    request_body = PayslipExtras,
    responses(
        (status = 200, body = PayslipResponse),
        (status = 400, description = "Negative extras"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No attendance record or salary revision")
    ),
    security(("bearer_auth" = [])),
    tag = "Payslip"
)]
pub async fn compute(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<(String, NaiveDate)>,
    body: web::Json<PayslipExtras>,
) -> ServiceResult<HttpResponse> {
    let (emp_id, date) = path.into_inner();
    auth.require_can_read(&emp_id)?;

    let record = attendance_repo::fetch_record(pool.get_ref(), &emp_id, date).await?;
    let revision = salary_history::active_revision_at(pool.get_ref(), &emp_id, date).await?;
    let payslip = compute_payslip(&revision.breakdown, &record, &body)?;

    tracing::debug!(
        emp_id,
        cycle = %payslip.cycle,
        revision_id = %revision.id,
        net_pay = payslip.net_pay,
        "Payslip computed"
    );

    Ok(HttpResponse::Ok().json(PayslipResponse {
        payslip,
        revision_id: revision.id.to_string(),
    }))
}
