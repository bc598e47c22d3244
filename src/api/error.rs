use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::payroll::PayrollError;

impl ResponseError for PayrollError {
    fn status_code(&self) -> StatusCode {
        match self {
            PayrollError::InvalidInput(_) | PayrollError::AmbiguousBracket { .. } => {
                StatusCode::BAD_REQUEST
            }
            PayrollError::LedgerIntegrityViolation(_) => StatusCode::CONFLICT,
            PayrollError::NotFound(_) => StatusCode::NOT_FOUND,
            PayrollError::Forbidden(_) => StatusCode::FORBIDDEN,
            // handlers answer this before it gets here
            PayrollError::EmptyCycle { .. } => StatusCode::OK,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let PayrollError::EmptyCycle { emp_id, cycle } = self {
            return HttpResponse::Ok().json(json!({
                "message": "no data for this period",
                "emp_id": emp_id,
                "year": cycle.year(),
                "month": cycle.month(),
            }));
        }
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }))
    }
}

/// Failure of a handler that talks to the database.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Payroll(#[from] PayrollError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    /// Unique-key violations come from the ledger constraints in the schema.
    pub fn from_write(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.code().as_deref() == Some("23000") {
                return PayrollError::integrity(format!(
                    "concurrent change rejected by the database: {}",
                    db_err.message()
                ))
                .into();
            }
        }
        ServiceError::Database(e)
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Payroll(e) => e.status_code(),
            ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ServiceError::Payroll(e) => e.error_response(),
            ServiceError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                HttpResponse::InternalServerError().json(json!({
                    "error": "Internal Server Error"
                }))
            }
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::fmt;

    use actix_web::body::to_bytes;
    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;
    use crate::payroll::{BracketStage, PayrollCycle};

    #[derive(Debug)]
    struct MySqlFailure {
        code: &'static str,
        message: &'static str,
    }

    impl fmt::Display for MySqlFailure {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message)
        }
    }

    impl std::error::Error for MySqlFailure {}

    impl DatabaseError for MySqlFailure {
        fn message(&self) -> &str {
            self.message
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            if self.code == "23000" {
                ErrorKind::UniqueViolation
            } else {
                ErrorKind::Other
            }
        }
    }

    fn db_error(code: &'static str, message: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(MySqlFailure { code, message }))
    }

    #[test]
    fn duplicate_key_on_write_is_a_conflict() {
        let err = ServiceError::from_write(db_error(
            "23000",
            "Duplicate entry 'E001' for key 'uq_salary_revisions_open'",
        ));
        assert!(matches!(
            err,
            ServiceError::Payroll(PayrollError::LedgerIntegrityViolation(_))
        ));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn other_write_failures_stay_database_errors() {
        let err = ServiceError::from_write(db_error("42S02", "Table doesn't exist"));
        assert!(matches!(err, ServiceError::Database(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = ServiceError::from_write(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, ServiceError::Database(_)));
    }

    async fn body_json(resp: HttpResponse) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn status_codes() {
        assert_eq!(PayrollError::invalid("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            PayrollError::AmbiguousBracket {
                stage: BracketStage::Basic,
                value: "13000".into()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(PayrollError::integrity("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            PayrollError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PayrollError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::Database(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn error_body_names_the_kind() {
        let body = body_json(PayrollError::integrity("overlap").error_response()).await;
        assert_eq!(body["error"], "LedgerIntegrityViolation");
        assert_eq!(body["message"], "ledger integrity violation: overlap");
    }

    #[actix_web::test]
    async fn empty_cycle_is_a_plain_message() {
        let err = PayrollError::EmptyCycle {
            emp_id: "E001".into(),
            cycle: PayrollCycle::new(2024, 3).unwrap(),
        };
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["message"], "no data for this period");
        assert_eq!(body["month"], 3);
    }
}
