use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::{issue_token, verify_password},
    error::ApiError,
    guard::{Role, Session},
    models::{SignInRequest, SignInResponse},
    validation::clean_ci,
};

/// sign_in
///
/// [Public Route] Exchanges clinic + CI + password for a session token.
///
/// Unknown clinic, unknown CI, a user without a password and a wrong password
/// all produce the same 401, so the endpoint cannot be used to probe accounts.
/// Users holding neither role are refused as well: the portal has no page for them.
#[utoipa::path(
    post,
    path = "/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> Result<Json<SignInResponse>, ApiError> {
    let ci = clean_ci(&payload.ci);

    let login = state
        .repo
        .find_login(payload.clinic_id, &ci)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    let hash = login.password_hash.ok_or(ApiError::Unauthorized)?;

    if !verify_password(payload.password, hash).await? {
        tracing::info!(clinic = %payload.clinic_id, "sign-in rejected: wrong password");
        return Err(ApiError::Unauthorized);
    }

    let identity = state
        .repo
        .load_identity(login.user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    let session = Session::from_identity(identity)?;
    if session.role == Role::Unassigned {
        tracing::warn!(user = %session.user_id(), "sign-in rejected: user has no role");
        return Err(ApiError::Unauthorized);
    }

    let (token, expires_at) = issue_token(session.user_id(), session.clinic_id(), &state.config)?;
    tracing::info!(user = %session.user_id(), clinic = %session.clinic_id(), "signed in");

    Ok(Json(SignInResponse { token, expires_at }))
}
