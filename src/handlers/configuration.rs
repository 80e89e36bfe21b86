use axum::{Json, extract::State};

use crate::{
    AppState,
    error::ApiError,
    guard::Session,
    models::{Configuration, ConfigurationChanges},
    validation::{Validator, non_empty},
};

/// get_configuration
///
/// [Authenticated Route] The branding of the caller's clinic.
#[utoipa::path(
    get,
    path = "/configuration",
    responses(
        (status = 200, description = "Configuration", body = Configuration),
        (status = 404, description = "Clinic has no configuration")
    )
)]
pub async fn get_configuration(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Configuration>, ApiError> {
    state
        .repo
        .get_configuration(session.clinic_id())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("configuration not found"))
}

/// update_configuration
///
/// [Admin Route] Partial update. Empty strings are ignored; colors must be
/// `#RRGGBB`.
#[utoipa::path(
    put,
    path = "/configuration",
    request_body = ConfigurationChanges,
    responses(
        (status = 200, description = "Updated", body = Configuration),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Clinic has no configuration")
    )
)]
pub async fn update_configuration(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<ConfigurationChanges>,
) -> Result<Json<Configuration>, ApiError> {
    let changes = ConfigurationChanges {
        portal_title: non_empty(payload.portal_title),
        sidebar_text_color: non_empty(payload.sidebar_text_color),
        sidebar_background_color: non_empty(payload.sidebar_background_color),
        background_color: non_empty(payload.background_color),
        icon_text_color: non_empty(payload.icon_text_color),
        icon_background_color: non_empty(payload.icon_background_color),
        card_background_color: non_empty(payload.card_background_color),
        card_text_color: non_empty(payload.card_text_color),
    };

    let mut v = Validator::new();
    if let Some(title) = &changes.portal_title {
        v.length("portalTitle", title, 1, 100);
    }
    for (field, color) in changes.colors() {
        if let Some(color) = color {
            v.color(field, color);
        }
    }
    v.finish()?;

    save(&state, &session, &changes).await
}

/// reset_configuration
///
/// [Admin Route] Restores the default branding.
#[utoipa::path(
    post,
    path = "/configuration/reset",
    responses(
        (status = 200, description = "Defaults restored", body = Configuration),
        (status = 404, description = "Clinic has no configuration")
    )
)]
pub async fn reset_configuration(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Configuration>, ApiError> {
    save(&state, &session, &ConfigurationChanges::defaults()).await
}

async fn save(
    state: &AppState,
    session: &Session,
    changes: &ConfigurationChanges,
) -> Result<Json<Configuration>, ApiError> {
    let configuration = state
        .repo
        .update_configuration(session.clinic_id(), changes)
        .await?
        .ok_or_else(|| ApiError::not_found("configuration not found"))?;
    tracing::info!(clinic = %session.clinic_id(), "configuration updated");
    Ok(Json(configuration))
}
