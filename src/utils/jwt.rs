use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Claims issued by the identity provider. Roles live in our database, not the token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,     // provider subject, e.g. "auth0|abc123"
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: i64,        // expiration timestamp
    pub iat: i64,        // issued at timestamp
}

pub fn create_token(
    subject: &str,
    email: &str,
    name: Option<&str>,
    secret: &str,
    expiration_hours: i64,
) -> AppResult<String> {
    let now = Utc::now();
    let exp = now + Duration::hours(expiration_hours);

    let claims = Claims {
        sub: subject.to_string(),
        email: email.to_string(),
        name: name.map(str::to_string),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
}

pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_verifies_with_same_secret() {
        let token = create_token("auth0|worker", "worker@lief.care", Some("Bob"), "s3cret", 1).unwrap();
        let claims = verify_token(&token, "s3cret").unwrap();
        assert_eq!(claims.sub, "auth0|worker");
        assert_eq!(claims.email, "worker@lief.care");
        assert_eq!(claims.name.as_deref(), Some("Bob"));
    }

    #[test]
    fn test_token_rejected_with_other_secret() {
        let token = create_token("auth0|worker", "worker@lief.care", None, "s3cret", 1).unwrap();
        assert!(matches!(
            verify_token(&token, "other"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = create_token("auth0|worker", "worker@lief.care", None, "s3cret", -2).unwrap();
        assert!(verify_token(&token, "s3cret").is_err());
    }
}
