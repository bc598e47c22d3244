use jsonwebtoken::{DecodingKey, Validation, decode};

use crate::models::{Claims, TokenType};

/// Decodes and checks an access token. Refresh tokens are not accepted on
/// API calls.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())?;

    if claims.token_type != TokenType::Access {
        return Err("refresh token cannot be used for API access".to_string());
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;

    fn token(token_type: TokenType, exp_offset: i64) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        let claims = Claims {
            user_id: 7,
            sub: "hr.anita".into(),
            role: 2,
            exp: (now + exp_offset) as usize,
            jti: uuid::Uuid::new_v4().to_string(),
            token_type,
            employee_id: None,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"secret")).unwrap()
    }

    #[test]
    fn accepts_access_tokens() {
        let claims = verify_token(&token(TokenType::Access, 600), "secret").unwrap();
        assert_eq!(claims.sub, "hr.anita");
    }

    #[test]
    fn rejects_refresh_expired_and_foreign_tokens() {
        assert!(verify_token(&token(TokenType::Refresh, 600), "secret").is_err());
        assert!(verify_token(&token(TokenType::Access, -3600), "secret").is_err());
        assert!(verify_token(&token(TokenType::Access, 600), "other").is_err());
    }
}
