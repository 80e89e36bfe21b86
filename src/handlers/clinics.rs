use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use super::optional_password_hash;
use crate::{
    AppState,
    error::ApiError,
    models::{
        Clinic, ClinicFilter, ClinicProvisioned, CreateClinicRequest, HealthWorker, NewClinic,
        NewUser,
    },
    validation::{Validator, clean_ci, non_empty},
};

/// list_clinics
///
/// [Public Route] Clinics for the sign-in selector, optionally narrowed by
/// provider name.
#[utoipa::path(
    get,
    path = "/clinics",
    params(ClinicFilter),
    responses((status = 200, description = "Clinics", body = [Clinic]))
)]
pub async fn list_clinics(
    State(state): State<AppState>,
    Query(filter): Query<ClinicFilter>,
) -> Result<Json<Vec<Clinic>>, ApiError> {
    let clinics = state
        .repo
        .list_clinics(filter.provider_name.as_deref())
        .await?;
    Ok(Json(clinics))
}

#[utoipa::path(
    get,
    path = "/clinics/{name}",
    params(("name" = String, Path, description = "Clinic name")),
    responses(
        (status = 200, description = "Found", body = Clinic),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_clinic(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Clinic>, ApiError> {
    state
        .repo
        .find_clinic_by_name(&name)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("clinic not found"))
}

/// create_clinic
///
/// [Public Route] Provisions a clinic with its first administrator and the
/// default portal configuration, atomically.
#[utoipa::path(
    post,
    path = "/clinics",
    request_body = CreateClinicRequest,
    responses(
        (status = 201, description = "Created", body = ClinicProvisioned),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Name already taken")
    )
)]
pub async fn create_clinic(
    State(state): State<AppState>,
    Json(payload): Json<CreateClinicRequest>,
) -> Result<(StatusCode, Json<ClinicProvisioned>), ApiError> {
    let admin = payload.clinic_admin;
    let admin_phone = non_empty(admin.phone);

    let mut v = Validator::new();
    v.required("name", &payload.name, "El nombre es requerido")
        .email("email", &payload.email)
        .required("phone", &payload.phone, "El teléfono es requerido")
        .required("address", &payload.address, "La dirección es requerida")
        .required("clinicAdmin.firstName", &admin.first_name, "El nombre es requerido")
        .required("clinicAdmin.lastName", &admin.last_name, "El apellido es requerido")
        .required("clinicAdmin.ci", &admin.ci, "La cédula es requerida")
        .email("clinicAdmin.email", &admin.email);
    if let Some(phone) = &admin_phone {
        v.phone("clinicAdmin.phone", phone);
    }
    v.finish()?;

    let password_hash = optional_password_hash(admin.password).await?;

    let (clinic, clinic_admin) = state
        .repo
        .create_clinic(
            NewClinic {
                name: payload.name.trim().to_string(),
                email: payload.email.trim().to_lowercase(),
                phone: payload.phone.trim().to_string(),
                address: payload.address.trim().to_string(),
                provider_name: non_empty(payload.provider_name),
            },
            NewUser {
                ci: clean_ci(&admin.ci),
                first_name: admin.first_name.trim().to_string(),
                last_name: admin.last_name.trim().to_string(),
                email: admin.email.trim().to_lowercase(),
                phone: admin_phone,
                password_hash,
                ..NewUser::default()
            },
        )
        .await?;

    tracing::info!(clinic = %clinic.id, name = %clinic.name, "clinic provisioned");
    Ok((
        StatusCode::CREATED,
        Json(ClinicProvisioned {
            clinic,
            clinic_admin,
        }),
    ))
}

/// get_clinic_health_worker
///
/// [Public Route] Looks up a health worker of a clinic by CI. Used by HCEN to
/// confirm that a professional belongs to the clinic.
#[utoipa::path(
    get,
    path = "/clinics/{name}/health-workers/{ci}",
    params(
        ("name" = String, Path, description = "Clinic name"),
        ("ci" = String, Path, description = "Health worker CI")
    ),
    responses(
        (status = 200, description = "Found", body = HealthWorker),
        (status = 404, description = "Clinic or health worker not found")
    )
)]
pub async fn get_clinic_health_worker(
    State(state): State<AppState>,
    Path((name, ci)): Path<(String, String)>,
) -> Result<Json<HealthWorker>, ApiError> {
    let clinic = state
        .repo
        .find_clinic_by_name(&name)
        .await?
        .ok_or_else(|| ApiError::not_found("clinic not found"))?;

    state
        .repo
        .find_health_worker_by_ci(clinic.id, &clean_ci(&ci))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("health worker not found"))
}
