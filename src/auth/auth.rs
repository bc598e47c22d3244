use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};

use crate::model::role::Role;
use crate::models::Claims;
use crate::payroll::{LedgerActor, PayrollError};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<String>,
}

impl AuthUser {
    pub fn from_claims(claims: Claims) -> Option<Self> {
        Some(AuthUser {
            role: Role::from_id(claims.role)?,
            user_id: claims.user_id,
            username: claims.sub,
            employee_id: claims.employee_id,
        })
    }
}

/// Reads the caller `auth_middleware` stored for this request.
impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| ErrorUnauthorized("Not authenticated")),
        )
    }
}

impl AuthUser {
    /// Payroll data of `emp_id` is visible to staff roles and to the
    /// employee themself.
    pub fn require_can_read(&self, emp_id: &str) -> Result<(), PayrollError> {
        if self.role.can_read_all() || self.employee_id.as_deref() == Some(emp_id) {
            Ok(())
        } else {
            Err(PayrollError::Forbidden(format!(
                "{} may not view payroll data of {emp_id}",
                self.username
            )))
        }
    }

    pub fn require_hr_or_admin(&self) -> Result<(), PayrollError> {
        if self.role.can_revise_payroll() {
            Ok(())
        } else {
            Err(PayrollError::Forbidden("HR/Admin only".to_string()))
        }
    }
}

impl LedgerActor for AuthUser {
    fn actor_name(&self) -> &str {
        &self.username
    }

    fn can_revise(&self, _emp_id: &str) -> bool {
        self.role.can_revise_payroll()
    }

    fn can_remove(&self, _emp_id: &str) -> bool {
        self.role.can_remove_revisions()
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    fn user(role: Role, employee_id: Option<&str>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "someone".into(),
            role,
            employee_id: employee_id.map(str::to_string),
        }
    }

    #[test]
    fn employees_read_only_their_own_data() {
        let me = user(Role::Employee, Some("E001"));
        assert!(me.require_can_read("E001").is_ok());
        assert!(matches!(
            me.require_can_read("E002"),
            Err(PayrollError::Forbidden(_))
        ));
        assert!(user(Role::Hr, None).require_can_read("E002").is_ok());
    }

    #[test]
    fn ledger_capability_follows_role() {
        let hr = user(Role::Hr, None);
        assert!(hr.can_revise("E001"));
        assert!(!hr.can_remove("E001"));
        assert_eq!(hr.actor_name(), "someone");
        assert!(user(Role::Admin, None).can_remove("E001"));
        assert!(!user(Role::Employee, Some("E001")).can_revise("E001"));
    }

    #[actix_web::test]
    async fn extractor_reads_the_stored_caller_only() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer not-checked-here"))
            .to_http_request();
        assert!(AuthUser::extract(&req).await.is_err());

        req.extensions_mut().insert(user(Role::Hr, None));
        let found = AuthUser::extract(&req).await.unwrap();
        assert_eq!(found.role, Role::Hr);
    }
}
