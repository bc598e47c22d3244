use crate::api::attendance::{EvaluateRequest, EvaluateResponse, SummaryListResponse};
use crate::api::compensation::{PreviewRequest, PreviewResponse};
use crate::api::cycle::CycleResponse;
use crate::api::payslip::PayslipResponse;
use crate::api::salary_revision::{AddRevision, DeleteRevisionResponse, RevisionHistoryResponse};
use crate::payroll::{
    AllowanceCounters, AttendanceRecord, CompensationBreakdown, DayDecision, DayPunch, DayStatus,
    LedgerGap, MonthlySummary, PayrollCycle, Payslip, PayslipExtras, RevisionEdit, SalaryRevision,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Payroll API",
        version = "1.0.0",
        description = r#"
## Payroll Composition & Reconciliation

Salary structure, salary history and attendance reconciliation for the HRM system.

### 🔹 Key Features
- **Compensation**
  - Break a gross CTC into consolidated salary, basic, HRA and allowances
  - Resolve the payroll cycle (21st to 20th) a date belongs to
- **Salary History**
  - Effective-dated salary revisions with one current revision per employee
- **Attendance**
  - Single-field edits that keep days paid, annual leave and LOP consistent
  - Monthly summaries per payroll cycle
  - Day status from punch times and late/permission allowances
- **Payslip**
  - Prorated earnings, PF, ESI, PT, bonus and net pay

### 🔐 Security
Every endpoint requires a **JWT Bearer** access token.
Only **Admin** or **HR** can change salary revisions or attendance; only **Admin** can delete revisions.
"#,
    ),
    paths(
        crate::api::compensation::preview,
        crate::api::cycle::resolve,

        crate::api::salary_revision::list_revisions,
        crate::api::salary_revision::add_revision,
        crate::api::salary_revision::active_revision,
        crate::api::salary_revision::edit_revision,
        crate::api::salary_revision::delete_revision,

        crate::api::attendance::reconcile_record,
        crate::api::attendance::monthly_summary,
        crate::api::attendance::list_summaries,
        crate::api::attendance::evaluate,

        crate::api::payslip::compute
    ),
    components(
        schemas(
            PreviewRequest,
            PreviewResponse,
            CompensationBreakdown,
            PayrollCycle,
            CycleResponse,
            AddRevision,
            RevisionEdit,
            SalaryRevision,
            LedgerGap,
            RevisionHistoryResponse,
            DeleteRevisionResponse,
            DayStatus,
            AttendanceRecord,
            MonthlySummary,
            SummaryListResponse,
            DayPunch,
            AllowanceCounters,
            DayDecision,
            EvaluateRequest,
            EvaluateResponse,
            PayslipExtras,
            Payslip,
            PayslipResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Compensation", description = "CTC breakdown and payroll cycles"),
        (name = "Salary", description = "Salary revision history"),
        (name = "Attendance", description = "Attendance reconciliation and summaries"),
        (name = "Payslip", description = "Payslip computation"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_payroll_paths_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let paths: Vec<_> = doc.paths.paths.keys().cloned().collect();
        for expected in [
            "/api/compensation/preview",
            "/api/salary/{emp_id}/revisions",
            "/api/attendance/{emp_id}/{date}",
            "/api/payslip/{emp_id}/{date}",
        ] {
            assert!(paths.iter().any(|p| p == expected), "missing {expected}");
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }

    #[test]
    fn attendance_edit_documents_its_wire_shape() {
        let doc = ApiDoc::openapi();
        let item = &doc.paths.paths["/api/attendance/{emp_id}/{date}"];
        let put = &item.operations[&utoipa::openapi::PathItemType::Put];
        let body = put.request_body.as_ref().expect("request body");
        let example = body.content["application/json"]
            .example
            .as_ref()
            .expect("example");
        assert_eq!(example["field"], "al");
        assert_eq!(example["value"], 2);
    }
}
