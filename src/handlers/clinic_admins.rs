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
        ClinicAdmin, CreateClinicAdminRequest, NewUser, SearchFilter, UniqueUserFields,
        UpdateClinicAdminRequest, UserChanges,
    },
    validation::{Validator, clean_ci, non_empty},
};

/// list_clinic_admins
///
/// [Authenticated Route] Administrators of the caller's clinic.
#[utoipa::path(
    get,
    path = "/clinic-admins",
    params(SearchFilter),
    responses(
        (status = 200, description = "Clinic admins", body = [ClinicAdmin]),
        (status = 401, description = "No session")
    )
)]
pub async fn list_clinic_admins(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<SearchFilter>,
) -> Result<Json<Vec<ClinicAdmin>>, ApiError> {
    let admins = state
        .repo
        .list_clinic_admins(session.clinic_id(), filter.search.as_deref())
        .await?;
    Ok(Json(admins))
}

#[utoipa::path(
    post,
    path = "/clinic-admins",
    request_body = CreateClinicAdminRequest,
    responses(
        (status = 201, description = "Created", body = ClinicAdmin),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email, CI or phone already used")
    )
)]
pub async fn create_clinic_admin(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateClinicAdminRequest>,
) -> Result<(StatusCode, Json<ClinicAdmin>), ApiError> {
    let phone = non_empty(payload.phone);

    let mut v = Validator::new();
    v.required("firstName", &payload.first_name, "El nombre es requerido")
        .required("lastName", &payload.last_name, "El apellido es requerido")
        .required("ci", &payload.ci, "La cédula es requerida")
        .email("email", &payload.email);
    if let Some(phone) = &phone {
        v.phone("phone", phone);
    }
    v.finish()?;

    let ci = clean_ci(&payload.ci);
    let email = payload.email.trim().to_lowercase();
    ensure_unique_user(
        &state,
        session.clinic_id(),
        UniqueUserFields {
            email: Some(email.clone()),
            ci: Some(ci.clone()),
            phone: phone.clone(),
        },
        None,
    )
    .await?;

    let password_hash = optional_password_hash(payload.password).await?;
    let admin = state
        .repo
        .create_clinic_admin(NewUser {
            clinic_id: session.clinic_id(),
            ci,
            first_name: payload.first_name.trim().to_string(),
            last_name: payload.last_name.trim().to_string(),
            email,
            phone,
            password_hash,
            ..NewUser::default()
        })
        .await?;

    tracing::info!(clinic_admin = %admin.id, clinic = %session.clinic_id(), "clinic admin created");
    Ok((StatusCode::CREATED, Json(admin)))
}

async fn find_in_clinic(
    state: &AppState,
    session: &Session,
    id: Uuid,
) -> Result<ClinicAdmin, ApiError> {
    let admin = state
        .repo
        .get_clinic_admin(id)
        .await?
        .ok_or_else(|| ApiError::not_found("clinic admin not found"))?;
    session.require_clinic(admin.user.clinic_id)?;
    Ok(admin)
}

#[utoipa::path(
    put,
    path = "/clinic-admins/{id}",
    params(("id" = Uuid, Path, description = "Clinic admin ID")),
    request_body = UpdateClinicAdminRequest,
    responses(
        (status = 200, description = "Updated", body = ClinicAdmin),
        (status = 403, description = "Another clinic"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Email, CI or phone already used")
    )
)]
pub async fn update_clinic_admin(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateClinicAdminRequest>,
) -> Result<Json<ClinicAdmin>, ApiError> {
    let admin = find_in_clinic(&state, &session, id).await?;

    let email = non_empty(payload.email);
    let phone = non_empty(payload.phone);
    let mut v = Validator::new();
    if let Some(email) = &email {
        v.email("email", email);
    }
    if let Some(phone) = &phone {
        v.phone("phone", phone);
    }
    v.finish()?;

    let changes = UserChanges {
        ci: non_empty(payload.ci).as_deref().map(clean_ci),
        first_name: non_empty(payload.first_name),
        last_name: non_empty(payload.last_name),
        email: email.map(|e| e.to_lowercase()),
        phone,
        ..UserChanges::default()
    };
    ensure_unique_user(
        &state,
        session.clinic_id(),
        UniqueUserFields {
            email: changes.email.clone(),
            ci: changes.ci.clone(),
            phone: changes.phone.clone(),
        },
        Some(admin.user.id),
    )
    .await?;

    let user = state
        .repo
        .update_user(admin.user.id, &changes)
        .await?
        .ok_or_else(|| ApiError::not_found("clinic admin not found"))?;

    Ok(Json(ClinicAdmin { id: admin.id, user }))
}

/// delete_clinic_admin
///
/// [Admin Route] Deletes another administrator of the same clinic. Deleting
/// one's own account is refused with 409.
#[utoipa::path(
    delete,
    path = "/clinic-admins/{id}",
    params(("id" = Uuid, Path, description = "Clinic admin ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Another clinic"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Cannot delete yourself")
    )
)]
pub async fn delete_clinic_admin(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if session.clinic_admin_id() == Some(id) {
        return Err(ApiError::Conflict(
            "you cannot delete your own account".to_string(),
        ));
    }

    let admin = find_in_clinic(&state, &session, id).await?;
    if !state.repo.delete_user(admin.user.id).await? {
        return Err(ApiError::not_found("clinic admin not found"));
    }

    tracing::info!(clinic_admin = %id, by = %session.user_id(), "clinic admin deleted");
    Ok(StatusCode::NO_CONTENT)
}
