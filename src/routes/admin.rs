use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Admin Router Module
///
/// Clinic management: staff, branding and patient registration in HCEN.
/// The whole router sits behind `auth::require_clinic_admin`, so a request
/// only reaches these handlers with a clinic-admin session of the clinic it
/// acts on.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- Staff ---
        .route(
            "/health-workers",
            post(handlers::health_workers::create_health_worker),
        )
        .route(
            "/health-workers/{id}",
            delete(handlers::health_workers::delete_health_worker),
        )
        .route(
            "/clinic-admins",
            post(handlers::clinic_admins::create_clinic_admin),
        )
        // An administrator cannot delete their own account.
        .route(
            "/clinic-admins/{id}",
            put(handlers::clinic_admins::update_clinic_admin)
                .delete(handlers::clinic_admins::delete_clinic_admin),
        )
        // --- Branding ---
        .route(
            "/configuration",
            put(handlers::configuration::update_configuration),
        )
        .route(
            "/configuration/reset",
            post(handlers::configuration::reset_configuration),
        )
        // --- Health users (HCEN) ---
        // New patients are linked to the administrator's clinic.
        .route(
            "/health-users",
            get(handlers::health_users::list_health_users)
                .post(handlers::health_users::create_health_user),
        )
}
