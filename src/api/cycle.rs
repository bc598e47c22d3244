use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::payroll::{PayrollCycle, PayrollError, resolve_cycle_str};

#[derive(Deserialize, IntoParams)]
pub struct CycleQuery {
    /// Calendar date, `YYYY-MM-DD`
    #[param(example = "2024-03-21")]
    pub date: String,
}

#[derive(Serialize, ToSchema)]
pub struct CycleResponse {
    #[serde(flatten)]
    pub cycle: PayrollCycle,
    #[schema(example = "2024-04")]
    pub label: String,
    #[schema(value_type = String, format = "date", example = "2024-03-21")]
    pub start: NaiveDate,
    #[schema(value_type = String, format = "date", example = "2024-04-20")]
    pub end: NaiveDate,
    pub days: u32,
}

impl TryFrom<PayrollCycle> for CycleResponse {
    type Error = PayrollError;

    fn try_from(cycle: PayrollCycle) -> Result<Self, Self::Error> {
        let (start, end) = cycle.window()?;
        Ok(Self {
            label: cycle.to_string(),
            start,
            end,
            days: cycle.days()?,
            cycle,
        })
    }
}

/// Payroll cycle a date belongs to
#[utoipa::path(
    get,
    path = "/api/cycle",
    params(CycleQuery),
    responses(
        (status = 200, body = CycleResponse),
        (status = 400, description = "Not a YYYY-MM-DD date, or outside the supported years")
    ),
    security(("bearer_auth" = [])),
    tag = "Compensation"
)]
pub async fn resolve(query: web::Query<CycleQuery>) -> Result<HttpResponse, PayrollError> {
    let cycle = resolve_cycle_str(&query.date)?;
    Ok(HttpResponse::Ok().json(CycleResponse::try_from(cycle)?))
}
