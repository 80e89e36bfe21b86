use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Navigation: path classification and the page guard.
pub mod guard;
pub mod paths;

// Services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod hcen;
pub mod models;
pub mod repository;
pub mod storage;
pub mod validation;

// Routers, one per access level.
pub mod routes;
use routes::{admin, authenticated, health_worker, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use hcen::{HcenState, MockHcenClient, ReqwestHcenClient};
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document built from the `#[utoipa::path]` handlers and the
/// `ToSchema` models. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::pages::health, handlers::pages::page_guard, handlers::pages::get_me,
        handlers::session::sign_in,
        handlers::clinics::list_clinics, handlers::clinics::get_clinic,
        handlers::clinics::create_clinic, handlers::clinics::get_clinic_health_worker,
        handlers::health_workers::list_health_workers, handlers::health_workers::create_health_worker,
        handlers::health_workers::update_health_worker, handlers::health_workers::delete_health_worker,
        handlers::clinic_admins::list_clinic_admins, handlers::clinic_admins::create_clinic_admin,
        handlers::clinic_admins::update_clinic_admin, handlers::clinic_admins::delete_clinic_admin,
        handlers::configuration::get_configuration, handlers::configuration::update_configuration,
        handlers::configuration::reset_configuration,
        handlers::health_users::list_health_users, handlers::health_users::create_health_user,
        handlers::health_users::get_clinical_history, handlers::health_users::create_access_request,
        handlers::health_users::list_access_requests,
        handlers::clinical_documents::get_upload_url, handlers::clinical_documents::create_clinical_document,
        handlers::clinical_documents::list_clinical_documents, handlers::clinical_documents::get_clinical_document,
        handlers::clinical_documents::update_clinical_document, handlers::clinical_documents::delete_clinical_document,
        handlers::clinical_documents::get_signed_url,
        handlers::chat::send_message, handlers::chat::get_conversation,
        handlers::chat::create_conversation, handlers::chat::list_conversations,
        handlers::chat::delete_conversation
    ),
    components(
        schemas(
            guard::Session, guard::Role, error::ErrorBody, error::FieldError,
            models::Clinic, models::ClinicProvisioned, models::Configuration, models::ConfigurationChanges,
            models::User, models::HealthWorker, models::ClinicAdmin,
            models::ClinicalDocument, models::DocumentChanges,
            models::Conversation, models::ConversationDetail, models::ConversationSummary,
            models::Message, models::MessageRole,
            models::SignInRequest, models::SignInResponse, models::CreateClinicRequest,
            models::CreateHealthWorkerRequest, models::UpdateHealthWorkerRequest,
            models::CreateClinicAdminRequest, models::UpdateClinicAdminRequest,
            models::UploadUrlRequest, models::UploadUrlResponse, models::CreateClinicalDocumentRequest,
            models::SignedUrlResponse, models::SendMessageRequest, models::SendMessageResponse,
            models::CreateConversationRequest,
            hcen::Gender, hcen::HealthUser, hcen::HealthUserPage, hcen::NewHealthUser,
            hcen::ClinicalHistory, hcen::HcenClinicalDocument, hcen::HcenClinic,
            hcen::HcenHealthWorker, hcen::AccessRequest, hcen::ChatSource,
        )
    ),
    tags(
        (name = "clinic-portal", description = "Clinic Portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cheaply clonable container for every service a handler may need.
#[derive(Clone)]
pub struct AppState {
    /// Persistence (Postgres, or the in-memory repository in tests).
    pub repo: RepositoryState,
    /// Object storage for clinical document files.
    pub storage: StorageState,
    /// The national clinical records service.
    pub hcen: HcenState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for HcenState {
    fn from_ref(app_state: &AppState) -> HcenState {
        app_state.hcen.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routers, applies the per-module access layers and the global
/// observability stack, and registers the state.
///
/// The routers are merged, not nested: several paths (`/health-workers`,
/// `/configuration`, ...) carry methods from different access levels, and
/// each method keeps the layer of the router it came from.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::require_session,
            )),
        )
        .merge(
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::require_clinic_admin,
            )),
        )
        .merge(
            health_worker::health_worker_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::require_health_worker,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// Span for one request, tagged with its `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
