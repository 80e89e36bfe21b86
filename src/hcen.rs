use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// HcenError
///
/// Failures talking to the national clinical records service.
#[derive(Debug, thiserror::Error)]
pub enum HcenError {
    /// HCEN answered with a non-success status.
    #[error("HCEN responded {status}: {message}")]
    Status { status: u16, message: String },

    #[error("HCEN unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("invalid HCEN response: {0}")]
    Decode(#[source] reqwest::Error),

    /// Rejected locally before any request was sent.
    #[error("{0}")]
    InvalidInput(String),
}

// --- Wire models ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// HealthUser
///
/// A patient as registered in HCEN. The portal never stores these locally.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HealthUser {
    pub id: String,
    pub ci: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub clinic_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HealthUserPage {
    pub items: Vec<HealthUser>,
    pub page_index: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

fn default_page_size() -> u32 {
    10
}

/// Query string accepted by `GET /health-users` and forwarded to HCEN as is.
#[derive(Debug, Clone, Serialize, Deserialize, IntoParams, PartialEq)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct HealthUserQuery {
    #[serde(default)]
    pub page_index: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinic: Option<String>,
}

impl Default for HealthUserQuery {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: default_page_size(),
            name: None,
            ci: None,
            clinic: None,
        }
    }
}

/// Body of `POST /health-users`, both from the portal client and towards HCEN.
/// `clinic_names` is overwritten server side with the session's clinic.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewHealthUser {
    pub ci: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// `YYYY-MM-DD`.
    pub date_of_birth: String,
    #[serde(default)]
    pub clinic_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HcenClinic {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HcenHealthWorker {
    pub id: String,
    pub document: String,
    pub document_type: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// One entry of a health user's clinical history, as seen across clinics.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HcenClinicalDocument {
    pub clinic: HcenClinic,
    pub health_worker: HcenHealthWorker,
    pub created_at: String,
    pub s3_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ClinicalHistory {
    pub health_user: HealthUser,
    pub documents: Vec<HcenClinicalDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AccessRequest {
    pub id: String,
    pub health_user_ci: String,
    pub health_worker: HcenHealthWorker,
    pub clinic: HcenClinic,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewAccessRequest {
    pub health_user_ci: String,
    pub health_worker_ci: String,
    pub clinic_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequestFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_user_ci: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_worker_ci: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinic_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// Request body for HCEN's retrieval-augmented chat over a clinical history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub query: String,
    pub conversation_history: Vec<ChatTurn>,
    pub health_user_ci: String,
    pub document_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ChatSource {
    pub document_id: String,
    pub document_title: String,
    pub chunk_content: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<ChatSource>,
}

// --- Client contract ---

/// HcenClient
///
/// The operations the portal needs from HCEN. Handlers only ever see this trait,
/// so tests swap in `MockHcenClient`.
#[async_trait]
pub trait HcenClient: Send + Sync {
    async fn list_health_users(&self, query: &HealthUserQuery)
    -> Result<HealthUserPage, HcenError>;

    async fn create_health_user(&self, user: &NewHealthUser) -> Result<HealthUser, HcenError>;

    /// A health user's history as visible to `health_worker_ci` working at `clinic_name`.
    async fn clinical_history(
        &self,
        health_user_ci: &str,
        clinic_name: &str,
        health_worker_ci: &str,
    ) -> Result<ClinicalHistory, HcenError>;

    async fn create_access_request(&self, request: &NewAccessRequest) -> Result<(), HcenError>;

    async fn list_access_requests(
        &self,
        filter: &AccessRequestFilter,
    ) -> Result<Vec<AccessRequest>, HcenError>;

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, HcenError>;
}

pub type HcenState = Arc<dyn HcenClient>;

/// ReqwestHcenClient
///
/// Talks to `{base_url}/api/{path}` with HTTP basic credentials.
#[derive(Clone)]
pub struct ReqwestHcenClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct HcenErrorBody {
    message: Option<String>,
}

impl ReqwestHcenClient {
    pub fn new(base_url: &str, username: &str, password: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}/api/{}", self.base_url, path))
            .basic_auth(&self.username, Some(&self.password))
    }

    /// Sends the request and maps non-success statuses to `HcenError::Status`,
    /// preferring HCEN's own `message` field when it sent one.
    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, HcenError> {
        let response = builder.send().await.map_err(HcenError::Transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<HcenErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| "Error al comunicarse con HCEN".to_string());

        Err(HcenError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, HcenError> {
        self.send(builder)
            .await?
            .json::<T>()
            .await
            .map_err(HcenError::Decode)
    }
}

fn non_empty_ci(ci: &str) -> Result<&str, HcenError> {
    let trimmed = ci.trim();
    if trimmed.is_empty() {
        return Err(HcenError::InvalidInput("La cédula no puede estar vacía".to_string()));
    }
    Ok(trimmed)
}

#[async_trait]
impl HcenClient for ReqwestHcenClient {
    async fn list_health_users(
        &self,
        query: &HealthUserQuery,
    ) -> Result<HealthUserPage, HcenError> {
        self.send_json(self.request(Method::GET, "health-users").query(query))
            .await
    }

    async fn create_health_user(&self, user: &NewHealthUser) -> Result<HealthUser, HcenError> {
        self.send_json(self.request(Method::POST, "health-users").json(user))
            .await
    }

    async fn clinical_history(
        &self,
        health_user_ci: &str,
        clinic_name: &str,
        health_worker_ci: &str,
    ) -> Result<ClinicalHistory, HcenError> {
        let ci = non_empty_ci(health_user_ci)?;
        let builder = self
            .request(Method::GET, &format!("health-users/{ci}/clinical-history"))
            .query(&[("clinicName", clinic_name), ("healthWorkerCi", health_worker_ci)]);
        self.send_json(builder).await
    }

    async fn create_access_request(&self, request: &NewAccessRequest) -> Result<(), HcenError> {
        non_empty_ci(&request.health_user_ci)?;
        self.send(self.request(Method::POST, "access-requests").json(request))
            .await?;
        Ok(())
    }

    async fn list_access_requests(
        &self,
        filter: &AccessRequestFilter,
    ) -> Result<Vec<AccessRequest>, HcenError> {
        self.send_json(self.request(Method::GET, "access-requests").query(filter))
            .await
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, HcenError> {
        self.send_json(self.request(Method::POST, "clinical-history/chat").json(request))
            .await
    }
}

// --- Mock ---

/// MockHcenClient
///
/// In-memory stand-in for HCEN used by the integration tests. Seeded with one
/// patient; every call fails with a 503 when `should_fail` is set.
#[derive(Default)]
pub struct MockHcenClient {
    pub should_fail: bool,
    users: Mutex<Vec<HealthUser>>,
    access_requests: Mutex<Vec<NewAccessRequest>>,
    chats: Mutex<Vec<ChatRequest>>,
}

impl MockHcenClient {
    pub fn new() -> Self {
        let seeded = HealthUser {
            id: Uuid::from_u128(0xfeed).to_string(),
            ci: "12345672".to_string(),
            first_name: "María".to_string(),
            last_name: "González".to_string(),
            gender: Gender::Female,
            email: "maria@example.com".to_string(),
            phone: Some("+59899123456".to_string()),
            address: None,
            date_of_birth: "1980-05-14".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
            clinic_names: vec![],
        };
        Self {
            users: Mutex::new(vec![seeded]),
            ..Self::default()
        }
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new()
        }
    }

    /// Every chat request received so far, oldest first.
    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        lock(&self.chats).clone()
    }

    pub fn access_requests(&self) -> Vec<NewAccessRequest> {
        lock(&self.access_requests).clone()
    }

    fn check(&self) -> Result<(), HcenError> {
        if self.should_fail {
            return Err(HcenError::Status {
                status: 503,
                message: "Mock HCEN Error: Simulation requested".to_string(),
            });
        }
        Ok(())
    }
}

// A poisoned lock only means another test thread panicked mid-write.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl HcenClient for MockHcenClient {
    async fn list_health_users(
        &self,
        query: &HealthUserQuery,
    ) -> Result<HealthUserPage, HcenError> {
        self.check()?;
        let users = lock(&self.users);
        let matching: Vec<HealthUser> = users
            .iter()
            .filter(|u| query.ci.as_ref().is_none_or(|ci| u.ci.contains(ci.as_str())))
            .filter(|u| {
                query.name.as_ref().is_none_or(|name| {
                    let needle = name.to_lowercase();
                    u.first_name.to_lowercase().contains(&needle)
                        || u.last_name.to_lowercase().contains(&needle)
                })
            })
            .filter(|u| {
                query
                    .clinic
                    .as_ref()
                    .is_none_or(|clinic| u.clinic_names.iter().any(|c| c == clinic))
            })
            .cloned()
            .collect();

        let page_size = query.page_size.max(1);
        let total = matching.len() as u64;
        let total_pages = total.div_ceil(page_size as u64) as u32;
        let items = matching
            .into_iter()
            .skip((query.page_index as usize).saturating_mul(page_size as usize))
            .take(page_size as usize)
            .collect();

        Ok(HealthUserPage {
            items,
            page_index: query.page_index,
            page_size,
            total,
            total_pages,
            has_next_page: query.page_index.saturating_add(1) < total_pages,
            has_previous_page: query.page_index > 0,
        })
    }

    async fn create_health_user(&self, user: &NewHealthUser) -> Result<HealthUser, HcenError> {
        self.check()?;
        let mut users = lock(&self.users);
        if users.iter().any(|u| u.ci == user.ci) {
            return Err(HcenError::Status {
                status: 409,
                message: "health user already exists".to_string(),
            });
        }
        let now = Utc::now().to_rfc3339();
        let created = HealthUser {
            id: Uuid::new_v4().to_string(),
            ci: user.ci.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            gender: user.gender,
            email: user.email.clone(),
            phone: user.phone.clone(),
            address: user.address.clone(),
            date_of_birth: user.date_of_birth.clone(),
            created_at: now.clone(),
            updated_at: now,
            clinic_names: user.clinic_names.clone(),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn clinical_history(
        &self,
        health_user_ci: &str,
        _clinic_name: &str,
        _health_worker_ci: &str,
    ) -> Result<ClinicalHistory, HcenError> {
        self.check()?;
        let ci = non_empty_ci(health_user_ci)?;
        let health_user = lock(&self.users)
            .iter()
            .find(|u| u.ci == ci)
            .cloned()
            .ok_or_else(|| HcenError::Status {
                status: 404,
                message: "Usuario de salud no encontrado".to_string(),
            })?;
        Ok(ClinicalHistory {
            health_user,
            documents: vec![],
        })
    }

    async fn create_access_request(&self, request: &NewAccessRequest) -> Result<(), HcenError> {
        self.check()?;
        non_empty_ci(&request.health_user_ci)?;
        lock(&self.access_requests).push(request.clone());
        Ok(())
    }

    async fn list_access_requests(
        &self,
        filter: &AccessRequestFilter,
    ) -> Result<Vec<AccessRequest>, HcenError> {
        self.check()?;
        let requests = lock(&self.access_requests);
        Ok(requests
            .iter()
            .filter(|r| {
                filter
                    .health_user_ci
                    .as_ref()
                    .is_none_or(|ci| &r.health_user_ci == ci)
            })
            .filter(|r| {
                filter
                    .health_worker_ci
                    .as_ref()
                    .is_none_or(|ci| &r.health_worker_ci == ci)
            })
            .enumerate()
            .map(|(index, r)| AccessRequest {
                id: index.to_string(),
                health_user_ci: r.health_user_ci.clone(),
                health_worker: HcenHealthWorker {
                    id: Uuid::nil().to_string(),
                    document: r.health_worker_ci.clone(),
                    document_type: "CI".to_string(),
                    first_name: String::new(),
                    last_name: String::new(),
                    email: String::new(),
                    phone: None,
                },
                clinic: HcenClinic {
                    id: Uuid::nil().to_string(),
                    name: r.clinic_name.clone(),
                    email: String::new(),
                    phone: String::new(),
                    address: String::new(),
                },
                created_at: Utc::now().to_rfc3339(),
            })
            .collect())
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, HcenError> {
        lock(&self.chats).push(request.clone());
        self.check()?;
        Ok(ChatResponse {
            answer: format!("Resumen de la historia clínica de {}", request.health_user_ci),
            sources: vec![ChatSource {
                document_id: Uuid::from_u128(0xd0c).to_string(),
                document_title: "Hemograma".to_string(),
                chunk_content: "Valores dentro del rango normal.".to_string(),
                similarity: 0.87,
            }],
        })
    }
}

/// Formats a date of birth the way HCEN expects it.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
