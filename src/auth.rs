use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
    guard::{Session, SessionSource},
    repository::RepositoryState,
};

/// Claims
///
/// Payload of a session token. Signed with the configured HS256 secret and
/// validated on every request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The user's id.
    pub sub: Uuid,
    /// The clinic the user signed in to.
    pub clinic: Uuid,
    pub iat: usize,
    pub exp: usize,
}

/// Signs a token for `user_id`. Returns the token and its expiry (unix seconds).
pub fn issue_token(
    user_id: Uuid,
    clinic_id: Uuid,
    config: &AppConfig,
) -> Result<(String, i64), ApiError> {
    let now = Utc::now().timestamp();
    let exp = now + config.session_ttl_secs as i64;
    let claims = Claims {
        sub: user_id,
        clinic: clinic_id,
        iat: now as usize,
        exp: exp as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("failed to sign session token: {:?}", e);
        ApiError::Internal
    })?;

    Ok((token, exp))
}

fn decode_claims(token: &str, secret: &str) -> Option<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            tracing::debug!("rejected session token: {:?}", e.kind());
            None
        }
    }
}

async fn session_for_user(repo: &RepositoryState, user_id: Uuid) -> Result<Option<Session>, ApiError> {
    match repo.load_identity(user_id).await? {
        Some(identity) => Ok(Some(Session::from_identity(identity)?)),
        None => Ok(None),
    }
}

/// resolve_session
///
/// Resolves the caller's session from the request headers:
/// 1. `Env::Local` only: an `x-user-id` header naming an existing user.
/// 2. `Authorization: Bearer <jwt>`, whose subject must still exist and
///    belong to the clinic named in the token.
///
/// Missing, malformed or expired credentials resolve to `Ok(None)`; only
/// repository failures and inconsistent role markers are errors.
pub async fn resolve_session(
    headers: &HeaderMap,
    repo: &RepositoryState,
    config: &AppConfig,
) -> Result<Option<Session>, ApiError> {
    if config.env == Env::Local {
        let bypass = headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| Uuid::parse_str(raw).ok());
        if let Some(user_id) = bypass {
            if let Some(session) = session_for_user(repo, user_id).await? {
                return Ok(Some(session));
            }
        }
    }

    let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    else {
        return Ok(None);
    };

    let Some(claims) = decode_claims(token, &config.jwt_secret) else {
        return Ok(None);
    };

    let session = session_for_user(repo, claims.sub).await?;
    Ok(session.filter(|s| s.clinic_id() == claims.clinic))
}

/// The session, or 401 when the request carries none.
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already resolved by a role layer.
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(session.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        resolve_session(&parts.headers, &repo, &config)
            .await?
            .ok_or(ApiError::Unauthorized)
    }
}

/// HeaderSessionSource
///
/// A `SessionSource` that resolves lazily from a request's headers, so the
/// guard performs the identity lookup itself.
pub struct HeaderSessionSource {
    pub headers: HeaderMap,
    pub repo: RepositoryState,
    pub config: AppConfig,
}

#[async_trait]
impl SessionSource for HeaderSessionSource {
    async fn current_session(&self) -> Result<Option<Session>, ApiError> {
        resolve_session(&self.headers, &self.repo, &self.config).await
    }
}

/// Router layer: only clinic administrators get through (401 without a
/// session, 403 with another role).
pub async fn require_clinic_admin(
    State(state): State<crate::AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = resolve_session(request.headers(), &state.repo, &state.config)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    session.require_clinic_admin()?;
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// Router layer: only health workers get through.
pub async fn require_health_worker(
    State(state): State<crate::AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = resolve_session(request.headers(), &state.repo, &state.config)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    session.require_health_worker()?;
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// Router layer: any signed-in user.
pub async fn require_session(session: Session, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(session);
    next.run(request).await
}

/// Bcrypt hashing runs on the blocking pool; it is deliberately slow.
pub async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| {
            tracing::error!("password hashing task failed: {:?}", e);
            ApiError::Internal
        })?
        .map_err(|e| {
            tracing::error!("password hashing failed: {:?}", e);
            ApiError::Internal
        })
}

/// `false` for a wrong password and for a malformed stored hash alike.
pub async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .map_err(|e| {
            tracing::error!("password verification task failed: {:?}", e);
            ApiError::Internal
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_decode_with_the_same_secret_only() {
        let config = AppConfig::default();
        let user = Uuid::new_v4();
        let clinic = Uuid::new_v4();

        let (token, exp) = issue_token(user, clinic, &config).unwrap();
        let claims = decode_claims(&token, &config.jwt_secret).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.clinic, clinic);
        assert_eq!(claims.exp as i64, exp);

        assert!(decode_claims(&token, "another-secret").is_none());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let config = AppConfig::default();
        let past = (Utc::now().timestamp() - 3600) as usize;
        let claims = Claims {
            sub: Uuid::new_v4(),
            clinic: Uuid::new_v4(),
            iat: past - 60,
            exp: past,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();
        assert!(decode_claims(&token, &config.jwt_secret).is_none());
    }

    #[tokio::test]
    async fn passwords_round_trip_through_bcrypt() {
        let hash = hash_password("s3creta".into()).await.unwrap();
        assert!(verify_password("s3creta".into(), hash.clone()).await.unwrap());
        assert!(!verify_password("otra".into(), hash).await.unwrap());
        assert!(!verify_password("x".into(), "not-a-hash".into()).await.unwrap());
    }
}
