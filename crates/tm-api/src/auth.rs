use axum::async_trait;
use axum::extract::FromRef;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// The authenticated caller. Only the employee id travels in the token; the
/// caller's role is looked up per request so a role change takes effect
/// immediately instead of at the next token refresh.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub employee_id: i64,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[allow(dead_code)]
    exp: usize,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AuthConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        authorize_bearer(&AuthConfig::from_ref(state), header)
    }
}

pub fn authorize_bearer(config: &AuthConfig, header: Option<&str>) -> Result<AuthUser, ApiError> {
    let header =
        header.ok_or_else(|| ApiError::Unauthorized("Authorization header is required".into()))?;

    let token = header.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::Unauthorized("Authorization header must use the Bearer scheme".into())
    })?;

    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let data = decode::<Claims>(token, &key, &Validation::new(Algorithm::HS256))
        .map_err(|err| ApiError::Unauthorized(format!("token rejected: {err}")))?;

    let employee_id = data
        .claims
        .sub
        .parse::<i64>()
        .map_err(|_| ApiError::Unauthorized("token subject must be a numeric employee id".into()))?;

    Ok(AuthUser { employee_id })
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct TestClaims {
        sub: String,
        exp: usize,
    }

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".into(),
        }
    }

    fn token(sub: &str, secret: &str) -> String {
        let claims = TestClaims {
            sub: sub.into(),
            exp: 4_102_444_800, // far future
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn accepts_a_valid_bearer_token() {
        let header = format!("Bearer {}", token("42", "test-secret"));
        let user = authorize_bearer(&config(), Some(&header)).unwrap();
        assert_eq!(user.employee_id, 42);
    }

    #[test]
    fn rejects_a_missing_header() {
        let err = authorize_bearer(&config(), None).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn rejects_a_token_signed_with_another_secret() {
        let header = format!("Bearer {}", token("42", "other-secret"));
        let err = authorize_bearer(&config(), Some(&header)).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn rejects_a_non_numeric_subject() {
        let header = format!("Bearer {}", token("alice", "test-secret"));
        let err = authorize_bearer(&config(), Some(&header)).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
