use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::payroll::{CompensationBreakdown, PayrollError, decompose_str};

#[derive(Deserialize, ToSchema)]
pub struct PreviewRequest {
    /// Number or numeric string, as typed into the salary form.
    #[schema(value_type = f64, example = 15000.0)]
    pub gross_ctc: Value,
}

#[derive(Serialize, ToSchema)]
pub struct PreviewResponse {
    #[serde(flatten)]
    pub breakdown: CompensationBreakdown,
    /// Fixed allowances exceed what is left after basic and HRA.
    pub negative_balancing: bool,
}

fn raw_amount(value: &Value) -> Result<String, PayrollError> {
    match value {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        other => Err(PayrollError::invalid(format!(
            "gross_ctc must be a number, got {other}"
        ))),
    }
}

/// Live salary breakdown for a gross CTC
#[utoipa::path(
    post,
    path = "/api/compensation/preview",
    request_body = PreviewRequest,
    responses(
        (status = 200, description = "Salary breakdown", body = PreviewResponse),
        (status = 400, description = "Not a positive number, or no bracket covers it", body = Object, example = json!({
            "error": "AmbiguousBracket",
            "message": "consolidated salary bracket is undefined for 34298.5"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Compensation"
)]
pub async fn preview(payload: web::Json<PreviewRequest>) -> Result<HttpResponse, PayrollError> {
    let breakdown = decompose_str(&raw_amount(&payload.gross_ctc)?)?;

    let negative_balancing = breakdown.has_negative_balancing();
    if negative_balancing {
        tracing::warn!(
            gross_ctc = %breakdown.gross_ctc(),
            balancing_allowance = breakdown.balancing_allowance(),
            "Preview produced a negative balancing allowance"
        );
    }

    Ok(HttpResponse::Ok().json(PreviewResponse {
        breakdown,
        negative_balancing,
    }))
}
