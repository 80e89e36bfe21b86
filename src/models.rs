use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Tenancy ---

/// Clinic
///
/// The tenant. Every user, document and configuration row hangs off exactly one clinic.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Clinic {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub provider_name: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewClinic {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub provider_name: Option<String>,
}

/// Configuration
///
/// Per-clinic portal branding. One row per clinic, created with the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Configuration {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub portal_title: String,
    pub sidebar_text_color: String,
    pub sidebar_background_color: String,
    pub background_color: String,
    pub icon_text_color: String,
    pub icon_background_color: String,
    pub card_background_color: String,
    pub card_text_color: String,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

pub const DEFAULT_PORTAL_TITLE: &str = "Portal de Clínica";

impl Configuration {
    /// Builds the default branding for a freshly provisioned clinic.
    pub fn defaults_for(clinic_id: Uuid) -> Self {
        let mut configuration = Self {
            id: Uuid::new_v4(),
            clinic_id,
            portal_title: String::new(),
            sidebar_text_color: String::new(),
            sidebar_background_color: String::new(),
            background_color: String::new(),
            icon_text_color: String::new(),
            icon_background_color: String::new(),
            card_background_color: String::new(),
            card_text_color: String::new(),
            updated_at: Utc::now(),
        };
        configuration.apply(&ConfigurationChanges::defaults());
        configuration
    }

    /// Applies every `Some` field of `changes`.
    pub fn apply(&mut self, changes: &ConfigurationChanges) {
        let fields = [
            (&mut self.portal_title, &changes.portal_title),
            (&mut self.sidebar_text_color, &changes.sidebar_text_color),
            (&mut self.sidebar_background_color, &changes.sidebar_background_color),
            (&mut self.background_color, &changes.background_color),
            (&mut self.icon_text_color, &changes.icon_text_color),
            (&mut self.icon_background_color, &changes.icon_background_color),
            (&mut self.card_background_color, &changes.card_background_color),
            (&mut self.card_text_color, &changes.card_text_color),
        ];
        for (target, change) in fields {
            if let Some(value) = change {
                *target = value.clone();
            }
        }
        self.updated_at = Utc::now();
    }
}

/// ConfigurationChanges
///
/// Partial update of the clinic branding. Empty strings coming from forms are
/// normalized to `None` before they reach this struct.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ConfigurationChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portal_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sidebar_text_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sidebar_background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_text_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_text_color: Option<String>,
}

impl ConfigurationChanges {
    pub fn defaults() -> Self {
        Self {
            portal_title: Some(DEFAULT_PORTAL_TITLE.to_string()),
            sidebar_text_color: Some("#111827".to_string()),
            sidebar_background_color: Some("#F1F5F9".to_string()),
            background_color: Some("#F8FAFC".to_string()),
            icon_text_color: Some("#FFFFFF".to_string()),
            icon_background_color: Some("#3B82F6".to_string()),
            card_background_color: Some("#FFFFFF".to_string()),
            card_text_color: Some("#111827".to_string()),
        }
    }

    /// The color fields, paired with their wire names, for validation.
    pub fn colors(&self) -> [(&'static str, Option<&str>); 7] {
        [
            ("sidebarTextColor", self.sidebar_text_color.as_deref()),
            ("sidebarBackgroundColor", self.sidebar_background_color.as_deref()),
            ("backgroundColor", self.background_color.as_deref()),
            ("iconTextColor", self.icon_text_color.as_deref()),
            ("iconBackgroundColor", self.icon_background_color.as_deref()),
            ("cardBackgroundColor", self.card_background_color.as_deref()),
            ("cardTextColor", self.card_text_color.as_deref()),
        ]
    }
}

// --- Staff ---

/// User
///
/// A clinic staff member. The password hash lives in its own column and is never
/// selected into this struct.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub ci: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// HealthWorker
///
/// The health-worker role marker joined with its user row.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HealthWorker {
    #[sqlx(rename = "health_worker_id")]
    pub id: Uuid,
    #[sqlx(flatten)]
    pub user: User,
}

/// ClinicAdmin
///
/// The clinic-admin role marker joined with its user row.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ClinicAdmin {
    #[sqlx(rename = "clinic_admin_id")]
    pub id: Uuid,
    #[sqlx(flatten)]
    pub user: User,
}

/// Identity
///
/// Everything the identity provider knows about a signed-in user. This is the raw
/// material a `Session` is built from; the role markers are not yet checked for
/// exclusivity here.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: User,
    pub clinic: Clinic,
    pub health_worker_id: Option<Uuid>,
    pub clinic_admin_id: Option<Uuid>,
}

/// Credentials row used only by the sign-in flow.
#[derive(Debug, Clone, FromRow)]
pub struct LoginRecord {
    pub user_id: Uuid,
    pub password_hash: Option<String>,
}

/// NewUser
///
/// Validated input for creating a staff user. `password_hash` is already a bcrypt hash.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub clinic_id: Uuid,
    pub ci: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub password_hash: Option<String>,
}

/// UserChanges
///
/// Partial update of a staff user. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub ci: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

impl UserChanges {
    pub fn apply_to(&self, user: &mut User) {
        if let Some(ci) = &self.ci {
            user.ci = ci.clone();
        }
        if let Some(first_name) = &self.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            user.last_name = last_name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            user.phone = Some(phone.clone());
        }
        if let Some(address) = &self.address {
            user.address = Some(address.clone());
        }
        if let Some(date_of_birth) = self.date_of_birth {
            user.date_of_birth = Some(date_of_birth);
        }
    }
}

/// The identifying fields checked for duplicates within a clinic.
#[derive(Debug, Clone, Default)]
pub struct UniqueUserFields {
    pub email: Option<String>,
    pub ci: Option<String>,
    pub phone: Option<String>,
}

// --- Clinical documents ---

/// ClinicalDocument
///
/// A document registered by a health worker about a health user. The file itself,
/// when present, lives in object storage under `s3_key`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ClinicalDocument {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub health_worker_id: Uuid,
    pub health_user_ci: String,
    pub title: String,
    pub description: String,
    pub document_type: String,
    pub content: Option<String>,
    pub s3_key: Option<String>,
    pub content_type: Option<String>,
    pub file_size: Option<i64>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewClinicalDocument {
    pub clinic_id: Uuid,
    pub health_worker_id: Uuid,
    pub health_user_ci: String,
    pub title: String,
    pub description: String,
    pub document_type: String,
    pub content: Option<String>,
    pub s3_key: Option<String>,
    pub content_type: Option<String>,
    pub file_size: Option<i64>,
}

/// Filters for listing documents. The clinic is always taken from the session.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFilter {
    pub health_user_ci: Option<String>,
    pub document_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DocumentChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

// --- Chat ---

/// Conversation
///
/// A chatbot thread between one health worker and the clinical history of one health user.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Conversation {
    pub id: Uuid,
    pub health_worker_id: Uuid,
    pub health_user_ci: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[ts(export)]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// A conversation with its full transcript, oldest message first.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// Listing entry: the conversation, its newest message and its size.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub last_message: Option<Message>,
    pub message_count: i64,
}

// --- Request Payloads (Input Schemas) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SignInRequest {
    pub clinic_id: Uuid,
    pub ci: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SignInResponse {
    pub token: String,
    /// Unix timestamp (seconds) after which the token is rejected.
    pub expires_at: i64,
}

/// CreateClinicRequest
///
/// Provisions a clinic together with its first administrator.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateClinicRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub provider_name: Option<String>,
    pub clinic_admin: CreateClinicAdminRequest,
}

/// The result of provisioning: the clinic and the administrator created with it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ClinicProvisioned {
    pub clinic: Clinic,
    pub clinic_admin: ClinicAdmin,
}

#[derive(Debug, Clone, Deserialize, Default, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ClinicFilter {
    pub provider_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateHealthWorkerRequest {
    pub first_name: String,
    pub last_name: String,
    pub ci: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    /// `YYYY-MM-DD`.
    pub date_of_birth: String,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateHealthWorkerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default, utoipa::IntoParams)]
pub struct SearchFilter {
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateClinicAdminRequest {
    pub first_name: String,
    pub last_name: String,
    pub ci: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateClinicAdminRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UploadUrlRequest {
    #[schema(example = "hemograma.pdf")]
    pub file_name: String,
    #[schema(example = "application/pdf")]
    pub content_type: String,
    pub health_user_ci: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UploadUrlResponse {
    /// Time-limited URL for the client's PUT request.
    pub upload_url: String,
    /// Object key to send back when registering the document.
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateClinicalDocumentRequest {
    pub title: String,
    pub description: String,
    pub health_user_ci: String,
    pub document_type: String,
    pub content: Option<String>,
    pub s3_key: Option<String>,
    pub content_type: Option<String>,
    pub file_size: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SignedUrlResponse {
    pub signed_url: String,
    pub expires_in: u64,
    pub file_name: String,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SendMessageRequest {
    pub health_user_ci: String,
    pub message: String,
    pub conversation_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SendMessageResponse {
    pub conversation_id: Uuid,
    pub user_message: Message,
    pub assistant_message: Message,
    pub sources: Vec<crate::hcen::ChatSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateConversationRequest {
    pub health_user_ci: String,
}

#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ConversationQuery {
    pub health_user_ci: String,
    pub conversation_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Default, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ConversationFilter {
    pub health_user_ci: Option<String>,
}
