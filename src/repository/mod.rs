use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{
    Clinic, ClinicAdmin, ClinicalDocument, Configuration, ConfigurationChanges, Conversation,
    ConversationSummary, DocumentChanges, DocumentFilter, HealthWorker, Identity, LoginRecord,
    Message, MessageRole, NewClinic, NewClinicalDocument, NewUser, UniqueUserFields, User,
    UserChanges,
};

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness rule was violated; the message names what collided.
    #[error("{0}")]
    Conflict(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository
///
/// The persistence contract. Handlers talk to `Arc<dyn Repository>` only, so
/// `PostgresRepository` and the in-memory `MemoryRepository` used by the
/// integration tests are interchangeable.
///
/// Lookups return `Ok(None)` for missing rows; `Err` is reserved for storage
/// failures and uniqueness conflicts.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Clinics ---
    /// Case-insensitive substring filter on the provider name.
    async fn list_clinics(&self, provider_name: Option<&str>) -> RepoResult<Vec<Clinic>>;
    async fn find_clinic_by_name(&self, name: &str) -> RepoResult<Option<Clinic>>;
    /// Creates the clinic, its first administrator and its default configuration
    /// atomically.
    async fn create_clinic(
        &self,
        clinic: NewClinic,
        admin: NewUser,
    ) -> RepoResult<(Clinic, ClinicAdmin)>;

    // --- Identity ---
    async fn find_login(&self, clinic_id: Uuid, ci: &str) -> RepoResult<Option<LoginRecord>>;
    /// The user, their clinic and both role markers.
    async fn load_identity(&self, user_id: Uuid) -> RepoResult<Option<Identity>>;
    /// Returns the wire name of the first identifying field (`email`, `ci`,
    /// `phone`) already used by another user of the clinic.
    async fn find_duplicate_user(
        &self,
        clinic_id: Uuid,
        fields: &UniqueUserFields,
        exclude_user: Option<Uuid>,
    ) -> RepoResult<Option<&'static str>>;

    // --- Health workers ---
    async fn list_health_workers(
        &self,
        clinic_id: Uuid,
        search: Option<&str>,
    ) -> RepoResult<Vec<HealthWorker>>;
    async fn get_health_worker(&self, id: Uuid) -> RepoResult<Option<HealthWorker>>;
    async fn find_health_worker_by_ci(
        &self,
        clinic_id: Uuid,
        ci: &str,
    ) -> RepoResult<Option<HealthWorker>>;
    async fn create_health_worker(&self, user: NewUser) -> RepoResult<HealthWorker>;

    // --- Users (shared by both roles) ---
    async fn update_user(&self, user_id: Uuid, changes: &UserChanges) -> RepoResult<Option<User>>;
    /// Deletes the user and, through cascades, its role marker and owned rows.
    async fn delete_user(&self, user_id: Uuid) -> RepoResult<bool>;

    // --- Clinic admins ---
    async fn list_clinic_admins(
        &self,
        clinic_id: Uuid,
        search: Option<&str>,
    ) -> RepoResult<Vec<ClinicAdmin>>;
    async fn get_clinic_admin(&self, id: Uuid) -> RepoResult<Option<ClinicAdmin>>;
    async fn create_clinic_admin(&self, user: NewUser) -> RepoResult<ClinicAdmin>;

    // --- Configuration ---
    async fn get_configuration(&self, clinic_id: Uuid) -> RepoResult<Option<Configuration>>;
    async fn update_configuration(
        &self,
        clinic_id: Uuid,
        changes: &ConfigurationChanges,
    ) -> RepoResult<Option<Configuration>>;

    // --- Clinical documents ---
    async fn create_document(&self, document: NewClinicalDocument) -> RepoResult<ClinicalDocument>;
    /// Newest first.
    async fn list_documents(
        &self,
        clinic_id: Uuid,
        filter: &DocumentFilter,
    ) -> RepoResult<Vec<ClinicalDocument>>;
    async fn get_document(&self, id: Uuid) -> RepoResult<Option<ClinicalDocument>>;
    async fn update_document(
        &self,
        id: Uuid,
        changes: &DocumentChanges,
    ) -> RepoResult<Option<ClinicalDocument>>;
    async fn delete_document(&self, id: Uuid) -> RepoResult<bool>;

    // --- Chat ---
    async fn find_conversation(&self, id: Uuid) -> RepoResult<Option<Conversation>>;
    /// The most recently active conversation between the worker and the patient.
    async fn find_latest_conversation(
        &self,
        health_worker_id: Uuid,
        health_user_ci: &str,
    ) -> RepoResult<Option<Conversation>>;
    async fn create_conversation(
        &self,
        health_worker_id: Uuid,
        health_user_ci: &str,
    ) -> RepoResult<Conversation>;
    /// Oldest first.
    async fn list_messages(&self, conversation_id: Uuid) -> RepoResult<Vec<Message>>;
    /// Appends a message and bumps the conversation's `updated_at`.
    async fn add_message(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> RepoResult<Message>;
    /// Most recently active first.
    async fn list_conversations(
        &self,
        health_worker_id: Uuid,
        health_user_ci: Option<&str>,
    ) -> RepoResult<Vec<ConversationSummary>>;
    async fn delete_conversation(&self, id: Uuid) -> RepoResult<bool>;
}

pub type RepositoryState = Arc<dyn Repository>;

/// Which of `fields` an existing user's `email`/`ci`/`phone` collides with, in
/// that order of precedence.
pub(crate) fn first_collision(
    fields: &UniqueUserFields,
    email: &str,
    ci: &str,
    phone: Option<&str>,
) -> Option<&'static str> {
    if fields
        .email
        .as_deref()
        .is_some_and(|candidate| candidate.eq_ignore_ascii_case(email))
    {
        return Some("email");
    }
    if fields.ci.as_deref() == Some(ci) {
        return Some("ci");
    }
    match (fields.phone.as_deref(), phone) {
        (Some(candidate), Some(existing)) if candidate == existing => Some("phone"),
        _ => None,
    }
}

/// Case-insensitive "contains" used by the in-memory search filters.
pub(crate) fn matches_search(haystacks: &[Option<&str>], needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    needle.is_empty()
        || haystacks
            .iter()
            .flatten()
            .any(|value| value.to_lowercase().contains(&needle))
}
