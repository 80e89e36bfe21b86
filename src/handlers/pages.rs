use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
};
use serde::Deserialize;

use crate::{
    AppState,
    auth::HeaderSessionSource,
    error::ApiError,
    guard::{self, GuardDecision, Session},
};

/// GuardQuery
///
/// The page path the frontend is about to render.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct GuardQuery {
    /// e.g. `/usuarios-de-salud/12345672`
    pub path: String,
}

/// page_guard
///
/// [Public Route] Runs the page guard for the caller.
///
/// `200` with the session when the page may render, `200 null` for public
/// pages visited anonymously, `303 See Other` with `Location` otherwise.
#[utoipa::path(
    get,
    path = "/guard",
    params(GuardQuery),
    responses(
        (status = 200, description = "Render; body is the session or null", body = Option<Session>),
        (status = 303, description = "Redirect to the Location header")
    )
)]
pub async fn page_guard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<GuardQuery>,
) -> Result<GuardDecision, ApiError> {
    let source = HeaderSessionSource {
        headers,
        repo: state.repo.clone(),
        config: state.config.clone(),
    };
    guard::guard(&source, &query.path).await
}

/// get_me
///
/// [Authenticated Route] The caller's session: user, clinic and role.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Session", body = Session),
        (status = 401, description = "No session")
    )
)]
pub async fn get_me(session: Session) -> Json<Session> {
    Json(session)
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}
