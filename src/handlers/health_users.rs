//! Health users live in HCEN; these handlers validate, scope to the session's
//! clinic and forward.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    AppState,
    error::ApiError,
    guard::Session,
    hcen::{
        AccessRequest, AccessRequestFilter, ClinicalHistory, HealthUser, HealthUserPage,
        HealthUserQuery, NewAccessRequest, NewHealthUser, format_date,
    },
    validation::{Validator, clean_ci, is_loose_phone, is_valid_ci, non_empty},
};

/// Oldest accepted date of birth, in years.
const MAX_AGE_YEARS: i32 = 150;

/// Largest page of health users requested from HCEN.
const MAX_PAGE_SIZE: u32 = 100;

#[utoipa::path(
    get,
    path = "/health-users",
    params(HealthUserQuery),
    responses(
        (status = 200, description = "One page of health users", body = HealthUserPage),
        (status = 502, description = "HCEN failed")
    )
)]
pub async fn list_health_users(
    State(state): State<AppState>,
    Query(mut query): Query<HealthUserQuery>,
) -> Result<Json<HealthUserPage>, ApiError> {
    query.page_size = query.page_size.clamp(1, MAX_PAGE_SIZE);
    let page = state.hcen.list_health_users(&query).await?;
    Ok(Json(page))
}

/// create_health_user
///
/// [Admin Route] Registers a patient in HCEN, linked to the administrator's
/// clinic. Any `clinicNames` sent by the client are replaced.
#[utoipa::path(
    post,
    path = "/health-users",
    request_body = NewHealthUser,
    responses(
        (status = 201, description = "Created in HCEN", body = HealthUser),
        (status = 400, description = "Validation failed"),
        (status = 502, description = "HCEN failed")
    )
)]
pub async fn create_health_user(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<NewHealthUser>,
) -> Result<(StatusCode, Json<HealthUser>), ApiError> {
    let phone = non_empty(payload.phone);
    let address = non_empty(payload.address);

    let mut v = Validator::new();
    v.check("ci", is_valid_ci(&payload.ci), "La cédula no es válida")
        .length("firstName", &payload.first_name, 1, 50)
        .length("lastName", &payload.last_name, 1, 50)
        .email("email", &payload.email);
    if let Some(phone) = &phone {
        v.check(
            "phone",
            is_loose_phone(phone),
            "El formato del teléfono no es válido",
        );
    }
    if let Some(address) = &address {
        v.length("address", address, 1, 200);
    }
    let date_of_birth = v.date_of_birth("dateOfBirth", &payload.date_of_birth, Some(MAX_AGE_YEARS));
    v.finish()?;
    // Set whenever validation passed.
    let date_of_birth = date_of_birth.ok_or(ApiError::Internal)?;

    let request = NewHealthUser {
        ci: clean_ci(&payload.ci),
        first_name: payload.first_name.trim().to_string(),
        last_name: payload.last_name.trim().to_string(),
        gender: payload.gender,
        email: payload.email.trim().to_lowercase(),
        phone,
        address,
        date_of_birth: format_date(date_of_birth),
        clinic_names: vec![session.clinic.name.clone()],
    };

    let created = state.hcen.create_health_user(&request).await?;
    tracing::info!(clinic = %session.clinic_id(), "health user registered in HCEN");
    Ok((StatusCode::CREATED, Json(created)))
}

/// get_clinical_history
///
/// [Health Worker Route] The patient's history as HCEN lets this worker see it.
/// HCEN applies the patient's access policies.
#[utoipa::path(
    get,
    path = "/health-users/{ci}/clinical-history",
    params(("ci" = String, Path, description = "Health user CI")),
    responses(
        (status = 200, description = "Clinical history", body = ClinicalHistory),
        (status = 404, description = "Unknown health user"),
        (status = 502, description = "HCEN failed")
    )
)]
pub async fn get_clinical_history(
    State(state): State<AppState>,
    session: Session,
    Path(ci): Path<String>,
) -> Result<Json<ClinicalHistory>, ApiError> {
    let history = state
        .hcen
        .clinical_history(&clean_ci(&ci), &session.clinic.name, &session.user.ci)
        .await?;
    Ok(Json(history))
}

#[utoipa::path(
    post,
    path = "/health-users/{ci}/access-requests",
    params(("ci" = String, Path, description = "Health user CI")),
    responses(
        (status = 201, description = "Access requested"),
        (status = 502, description = "HCEN failed")
    )
)]
pub async fn create_access_request(
    State(state): State<AppState>,
    session: Session,
    Path(ci): Path<String>,
) -> Result<StatusCode, ApiError> {
    let request = NewAccessRequest {
        health_user_ci: clean_ci(&ci),
        health_worker_ci: session.user.ci.clone(),
        clinic_name: session.clinic.name.clone(),
    };
    state.hcen.create_access_request(&request).await?;

    tracing::info!(health_worker = %session.user_id(), "access request sent to HCEN");
    Ok(StatusCode::CREATED)
}

#[derive(Debug, Deserialize, Default, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequestQuery {
    pub health_user_ci: Option<String>,
}

/// list_access_requests
///
/// [Health Worker Route] Requests made by the caller from this clinic.
#[utoipa::path(
    get,
    path = "/access-requests",
    params(AccessRequestQuery),
    responses(
        (status = 200, description = "Access requests", body = [AccessRequest]),
        (status = 502, description = "HCEN failed")
    )
)]
pub async fn list_access_requests(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<AccessRequestQuery>,
) -> Result<Json<Vec<AccessRequest>>, ApiError> {
    let filter = AccessRequestFilter {
        health_user_ci: non_empty(query.health_user_ci).as_deref().map(clean_ci),
        health_worker_ci: Some(session.user.ci.clone()),
        clinic_name: Some(session.clinic.name.clone()),
    };
    let requests = state.hcen.list_access_requests(&filter).await?;
    Ok(Json(requests))
}
