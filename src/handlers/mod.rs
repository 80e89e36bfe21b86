//! HTTP handlers, grouped by resource. Every handler resolves the caller's
//! clinic from the session; request bodies never choose the tenant.

use uuid::Uuid;

use crate::{AppState, auth, error::ApiError, models::UniqueUserFields};

pub mod chat;
pub mod clinic_admins;
pub mod clinical_documents;
pub mod clinics;
pub mod configuration;
pub mod health_users;
pub mod health_workers;
pub mod pages;
pub mod session;

/// Fails with 409 when another user of the clinic already uses one of `fields`.
pub(crate) async fn ensure_unique_user(
    state: &AppState,
    clinic_id: Uuid,
    fields: UniqueUserFields,
    exclude_user: Option<Uuid>,
) -> Result<(), ApiError> {
    match state
        .repo
        .find_duplicate_user(clinic_id, &fields, exclude_user)
        .await?
    {
        Some(field) => Err(ApiError::Conflict(format!(
            "a user with that {field} already exists in this clinic"
        ))),
        None => Ok(()),
    }
}

pub(crate) async fn optional_password_hash(
    password: Option<String>,
) -> Result<Option<String>, ApiError> {
    match crate::validation::non_empty(password) {
        Some(password) => Ok(Some(auth::hash_password(password).await?)),
        None => Ok(None),
    }
}
