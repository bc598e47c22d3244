use actix_web::http::header::{AUTHORIZATION, HeaderMap};
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;

/// Why a request was turned away before reaching a payroll handler.
#[derive(Debug, Error, PartialEq)]
pub enum AuthRejection {
    #[error("Missing Authorization header")]
    MissingHeader,
    #[error("Invalid Authorization header encoding")]
    BadEncoding,
    #[error("Authorization header must start with Bearer")]
    NotBearer,
    #[error("Invalid or expired token")]
    InvalidToken(String),
    #[error("Invalid role")]
    UnknownRole,
}

impl AuthRejection {
    pub fn response(&self) -> HttpResponse {
        let body = match self {
            AuthRejection::InvalidToken(details) => {
                json!({"error": self.to_string(), "details": details})
            }
            _ => json!({"error": self.to_string()}),
        };
        HttpResponse::Unauthorized().json(body)
    }
}

/// Resolves the caller from a `Bearer` access token.
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthUser, AuthRejection> {
    let token = headers
        .get(AUTHORIZATION)
        .ok_or(AuthRejection::MissingHeader)?
        .to_str()
        .map_err(|_| AuthRejection::BadEncoding)?
        .strip_prefix("Bearer ")
        .ok_or(AuthRejection::NotBearer)?;
    let claims = verify_token(token, secret).map_err(AuthRejection::InvalidToken)?;
    AuthUser::from_claims(claims).ok_or(AuthRejection::UnknownRole)
}

/// Puts the [`AuthUser`] into request extensions or answers 401.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    match authenticate(req.headers(), &config.jwt_secret) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.call(req).await
        }
        Err(rejection) => {
            tracing::debug!(reason = %rejection, path = req.path(), "Rejected request");
            Ok(req.into_response(rejection.response().map_into_boxed_body()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use actix_web::http::header::HeaderValue;
    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;
    use crate::model::role::Role;
    use crate::models::{Claims, TokenType};

    const SECRET: &str = "secret";

    fn token(role: u8, token_type: TokenType) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as usize;
        let claims = Claims {
            user_id: 9,
            sub: "emp.ravi".into(),
            role,
            exp: now + 600,
            jti: "jti".into(),
            token_type,
            employee_id: Some("E009".into()),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn access_token_yields_the_caller() {
        let bearer = format!("Bearer {}", token(Role::Employee as u8, TokenType::Access));
        let user = authenticate(&headers(&bearer), SECRET).unwrap();
        assert_eq!(user.username, "emp.ravi");
        assert_eq!(user.role, Role::Employee);
        assert_eq!(user.employee_id.as_deref(), Some("E009"));
    }

    #[test]
    fn malformed_headers_are_rejected() {
        assert_eq!(
            authenticate(&HeaderMap::new(), SECRET).unwrap_err(),
            AuthRejection::MissingHeader
        );
        let raw = token(Role::Hr as u8, TokenType::Access);
        assert_eq!(
            authenticate(&headers(&raw), SECRET).unwrap_err(),
            AuthRejection::NotBearer
        );
        assert!(matches!(
            authenticate(&headers(&format!("Bearer {raw}")), "other"),
            Err(AuthRejection::InvalidToken(_))
        ));
    }

    #[test]
    fn refresh_tokens_and_unknown_roles_are_rejected() {
        let refresh = format!("Bearer {}", token(Role::Hr as u8, TokenType::Refresh));
        assert!(matches!(
            authenticate(&headers(&refresh), SECRET),
            Err(AuthRejection::InvalidToken(_))
        ));
        let unknown = format!("Bearer {}", token(200, TokenType::Access));
        assert_eq!(
            authenticate(&headers(&unknown), SECRET).unwrap_err(),
            AuthRejection::UnknownRole
        );
    }
}
