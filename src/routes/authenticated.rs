use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Authenticated Router Module
///
/// Routes open to any signed-in user of a clinic. Everything returned is
/// scoped to the session's clinic.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET /me
        // The caller's user, clinic and role.
        .route("/me", get(handlers::pages::get_me))
        // GET /health-workers?search=
        .route(
            "/health-workers",
            get(handlers::health_workers::list_health_workers),
        )
        // PUT /health-workers/{id}
        // Administrators edit anyone in their clinic; a health worker only
        // themself. Checked in the handler.
        .route(
            "/health-workers/{id}",
            put(handlers::health_workers::update_health_worker),
        )
        // GET /clinic-admins?search=
        .route(
            "/clinic-admins",
            get(handlers::clinic_admins::list_clinic_admins),
        )
        // GET /configuration
        // Branding is needed by every page, whatever the role.
        .route(
            "/configuration",
            get(handlers::configuration::get_configuration),
        )
}
