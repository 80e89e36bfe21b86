use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session: monitoring, sign-in, the page guard
/// (which itself decides what an anonymous caller may see) and the clinic
/// directory used by the sign-in screen and by HCEN.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(handlers::pages::health))
        // POST /auth/sign-in
        // Clinic + CI + password in, bearer token out.
        .route("/auth/sign-in", post(handlers::session::sign_in))
        // GET /guard?path=/...
        // 200 with the session (or null) when the page may render, 303 otherwise.
        .route("/guard", get(handlers::pages::page_guard))
        // GET/POST /clinics
        // Clinic selector listing, and provisioning of a new clinic with its
        // first administrator.
        .route(
            "/clinics",
            get(handlers::clinics::list_clinics).post(handlers::clinics::create_clinic),
        )
        .route("/clinics/{name}", get(handlers::clinics::get_clinic))
        // GET /clinics/{name}/health-workers/{ci}
        // Membership lookup used by HCEN.
        .route(
            "/clinics/{name}/health-workers/{ci}",
            get(handlers::clinics::get_clinic_health_worker),
        )
}
