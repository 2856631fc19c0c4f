use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{json, Value};
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::{claims::Claims, repo_types::UserId};
use crate::{config::JwtConfig, state::AppState};

pub trait TokenIssuer: Send + Sync {
    fn sign(&self, id: Option<UserId>) -> anyhow::Result<String>;
    fn verify(&self, token: &str) -> anyhow::Result<Claims>;
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
        }
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation
    }
}

impl TokenIssuer for JwtKeys {
    fn sign(&self, id: Option<UserId>) -> anyhow::Result<String> {
        let claims = Claims {
            id,
            iat: OffsetDateTime::now_utc().unix_timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id = ?id, "jwt signed");
        Ok(token)
    }

    fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Self::validation())?;
        debug!(user_id = ?data.claims.id, "jwt verified");
        Ok(data.claims)
    }
}

/// Verified claims of the bearer token on the request.
pub struct AuthUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Access denied!" })),
            ))?;

        match state.tokens.verify(token) {
            Ok(claims) => Ok(AuthUser(claims)),
            Err(e) => {
                warn!(error = %e, "invalid token");
                Err((
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "message": "invalid token" })),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
        })
    }

    #[test]
    fn sign_and_verify_with_id() {
        let keys = make_keys("dev-secret");
        let token = keys.sign(Some(7)).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.id, Some(7));
        assert!(claims.iat > 0);
    }

    #[test]
    fn unset_id_is_omitted_from_payload() {
        let keys = make_keys("dev-secret");
        let token = keys.sign(None).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.id, None);

        let payload = serde_json::to_value(&claims).unwrap();
        assert!(payload.get("id").is_none());
    }

    #[test]
    fn verify_rejects_other_secret() {
        let token = make_keys("one").sign(Some(1)).expect("sign");
        assert!(make_keys("two").verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_garbage() {
        assert!(make_keys("dev-secret").verify("not.a.jwt").is_err());
    }
}
