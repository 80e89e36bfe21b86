use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use super::{ensure_unique_user, optional_password_hash};
use crate::{
    AppState,
    error::ApiError,
    guard::Session,
    models::{
        CreateHealthWorkerRequest, HealthWorker, NewUser, SearchFilter, UniqueUserFields,
        UpdateHealthWorkerRequest, UserChanges,
    },
    validation::{Validator, clean_ci, non_empty},
};

/// list_health_workers
///
/// [Authenticated Route] Health workers of the caller's clinic. `search` matches
/// names, email, CI and phone.
#[utoipa::path(
    get,
    path = "/health-workers",
    params(SearchFilter),
    responses(
        (status = 200, description = "Health workers", body = [HealthWorker]),
        (status = 401, description = "No session")
    )
)]
pub async fn list_health_workers(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<SearchFilter>,
) -> Result<Json<Vec<HealthWorker>>, ApiError> {
    let workers = state
        .repo
        .list_health_workers(session.clinic_id(), filter.search.as_deref())
        .await?;
    Ok(Json(workers))
}

/// create_health_worker
///
/// [Admin Route] Creates the user and its health-worker marker in the
/// administrator's clinic.
#[utoipa::path(
    post,
    path = "/health-workers",
    request_body = CreateHealthWorkerRequest,
    responses(
        (status = 201, description = "Created", body = HealthWorker),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not a clinic admin"),
        (status = 409, description = "Email, CI or phone already used")
    )
)]
pub async fn create_health_worker(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateHealthWorkerRequest>,
) -> Result<(StatusCode, Json<HealthWorker>), ApiError> {
    let mut v = Validator::new();
    v.required("firstName", &payload.first_name, "El nombre es requerido")
        .required("lastName", &payload.last_name, "El apellido es requerido")
        .required("ci", &payload.ci, "La cédula es requerida")
        .email("email", &payload.email)
        .phone("phone", &payload.phone)
        .required("address", &payload.address, "La dirección es requerida");
    let date_of_birth = v.date_of_birth("dateOfBirth", &payload.date_of_birth, None);
    v.finish()?;

    let ci = clean_ci(&payload.ci);
    let email = payload.email.trim().to_lowercase();
    let phone = payload.phone.trim().to_string();

    ensure_unique_user(
        &state,
        session.clinic_id(),
        UniqueUserFields {
            email: Some(email.clone()),
            ci: Some(ci.clone()),
            phone: Some(phone.clone()),
        },
        None,
    )
    .await?;

    let password_hash = optional_password_hash(payload.password).await?;
    let worker = state
        .repo
        .create_health_worker(NewUser {
            clinic_id: session.clinic_id(),
            ci,
            first_name: payload.first_name.trim().to_string(),
            last_name: payload.last_name.trim().to_string(),
            email,
            phone: Some(phone),
            address: Some(payload.address.trim().to_string()),
            date_of_birth,
            password_hash,
        })
        .await?;

    tracing::info!(health_worker = %worker.id, clinic = %session.clinic_id(), "health worker created");
    Ok((StatusCode::CREATED, Json(worker)))
}

/// update_health_worker
///
/// [Authenticated Route] Partial update. Allowed for administrators of the
/// worker's clinic and for the worker editing their own profile. Empty strings
/// leave a field unchanged.
#[utoipa::path(
    put,
    path = "/health-workers/{id}",
    params(("id" = Uuid, Path, description = "Health worker ID")),
    request_body = UpdateHealthWorkerRequest,
    responses(
        (status = 200, description = "Updated", body = HealthWorker),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Email, CI or phone already used")
    )
)]
pub async fn update_health_worker(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateHealthWorkerRequest>,
) -> Result<Json<HealthWorker>, ApiError> {
    let is_self = session.health_worker_id() == Some(id);
    if !is_self && !session.is_clinic_admin() {
        return Err(ApiError::forbidden(
            "only clinic admins can edit other health workers",
        ));
    }

    let worker = state
        .repo
        .get_health_worker(id)
        .await?
        .ok_or_else(|| ApiError::not_found("health worker not found"))?;
    session.require_clinic(worker.user.clinic_id)?;

    let changes = user_changes(payload)?;
    ensure_unique_user(
        &state,
        session.clinic_id(),
        UniqueUserFields {
            email: changes.email.clone(),
            ci: changes.ci.clone(),
            phone: changes.phone.clone(),
        },
        Some(worker.user.id),
    )
    .await?;

    let user = state
        .repo
        .update_user(worker.user.id, &changes)
        .await?
        .ok_or_else(|| ApiError::not_found("health worker not found"))?;

    Ok(Json(HealthWorker { id: worker.id, user }))
}

fn user_changes(payload: UpdateHealthWorkerRequest) -> Result<UserChanges, ApiError> {
    let first_name = non_empty(payload.first_name);
    let last_name = non_empty(payload.last_name);
    let ci = non_empty(payload.ci);
    let email = non_empty(payload.email);
    let phone = non_empty(payload.phone);
    let address = non_empty(payload.address);
    let raw_date_of_birth = non_empty(payload.date_of_birth);

    let mut v = Validator::new();
    if let Some(email) = &email {
        v.email("email", email);
    }
    if let Some(phone) = &phone {
        v.phone("phone", phone);
    }
    let date_of_birth = raw_date_of_birth
        .as_deref()
        .and_then(|raw| v.date_of_birth("dateOfBirth", raw, None));
    v.finish()?;

    Ok(UserChanges {
        ci: ci.as_deref().map(clean_ci),
        first_name,
        last_name,
        email: email.map(|e| e.to_lowercase()),
        phone,
        address,
        date_of_birth,
    })
}

/// delete_health_worker
///
/// [Admin Route] Removes the worker's user; the marker and owned rows cascade.
#[utoipa::path(
    delete,
    path = "/health-workers/{id}",
    params(("id" = Uuid, Path, description = "Health worker ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Another clinic"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_health_worker(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let worker = state
        .repo
        .get_health_worker(id)
        .await?
        .ok_or_else(|| ApiError::not_found("health worker not found"))?;
    session.require_clinic(worker.user.clinic_id)?;

    if !state.repo.delete_user(worker.user.id).await? {
        return Err(ApiError::not_found("health worker not found"));
    }

    tracing::info!(health_worker = %id, "health worker deleted");
    Ok(StatusCode::NO_CONTENT)
}
