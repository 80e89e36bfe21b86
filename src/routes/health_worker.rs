use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Health Worker Router Module
///
/// Clinical work: patient histories from HCEN, clinical documents and the
/// history chatbot. Behind `auth::require_health_worker`.
pub fn health_worker_routes() -> Router<AppState> {
    Router::new()
        // --- HCEN ---
        .route(
            "/health-users/{ci}/clinical-history",
            get(handlers::health_users::get_clinical_history),
        )
        .route(
            "/health-users/{ci}/access-requests",
            post(handlers::health_users::create_access_request),
        )
        .route(
            "/access-requests",
            get(handlers::health_users::list_access_requests),
        )
        // --- Clinical documents ---
        // POST /clinical-documents/upload-url
        // Presigned PUT URL (10 minutes) under the clinic's key prefix.
        .route(
            "/clinical-documents/upload-url",
            post(handlers::clinical_documents::get_upload_url),
        )
        .route(
            "/clinical-documents",
            get(handlers::clinical_documents::list_clinical_documents)
                .post(handlers::clinical_documents::create_clinical_document),
        )
        .route(
            "/clinical-documents/{id}",
            get(handlers::clinical_documents::get_clinical_document)
                .put(handlers::clinical_documents::update_clinical_document)
                .delete(handlers::clinical_documents::delete_clinical_document),
        )
        // GET /clinical-documents/{id}/signed-url
        // Presigned GET URL valid for one hour.
        .route(
            "/clinical-documents/{id}/signed-url",
            get(handlers::clinical_documents::get_signed_url),
        )
        // --- Chat ---
        .route("/chat/messages", post(handlers::chat::send_message))
        .route("/chat/conversation", get(handlers::chat::get_conversation))
        .route(
            "/chat/conversations",
            get(handlers::chat::list_conversations).post(handlers::chat::create_conversation),
        )
        .route(
            "/chat/conversations/{id}",
            axum::routing::delete(handlers::chat::delete_conversation),
        )
}
