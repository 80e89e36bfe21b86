#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use clinic_portal::{
    AppConfig, AppState, MemoryRepository, MockHcenClient, MockStorageService, create_router,
    hcen::HcenState,
    models::{Clinic, ClinicAdmin, HealthWorker, NewClinic, NewUser},
    repository::{Repository, RepositoryState},
    storage::StorageState,
};
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "s3creta";

/// One clinic with an administrator and two health workers.
pub struct SeededClinic {
    pub clinic: Clinic,
    pub admin: ClinicAdmin,
    pub worker: HealthWorker,
    pub other_worker: HealthWorker,
}

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<MemoryRepository>,
    pub storage: Arc<MockStorageService>,
    pub hcen: Arc<MockHcenClient>,
    pub config: AppConfig,
    pub norte: SeededClinic,
    pub sur: SeededClinic,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::build(
            AppConfig::default(),
            MockStorageService::new(),
            MockHcenClient::new(),
        )
        .await
    }

    pub async fn with_failing_hcen() -> Self {
        Self::build(
            AppConfig::default(),
            MockStorageService::new(),
            MockHcenClient::new_failing(),
        )
        .await
    }

    pub async fn with_failing_storage() -> Self {
        Self::build(
            AppConfig::default(),
            MockStorageService::new_failing(),
            MockHcenClient::new(),
        )
        .await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        Self::build(config, MockStorageService::new(), MockHcenClient::new()).await
    }

    async fn build(config: AppConfig, storage: MockStorageService, hcen: MockHcenClient) -> Self {
        let repo = Arc::new(MemoryRepository::new());
        let storage = Arc::new(storage);
        let hcen = Arc::new(hcen);

        let norte = seed_clinic(&repo, "Clínica Norte", "Norte Salud", 1).await;
        let sur = seed_clinic(&repo, "Clínica Sur", "Sur Salud", 4).await;

        let state = AppState {
            repo: repo.clone() as RepositoryState,
            storage: storage.clone() as StorageState,
            hcen: hcen.clone() as HcenState,
            config: config.clone(),
        };

        TestApp {
            router: create_router(state),
            repo,
            storage,
            hcen,
            config,
            norte,
            sur,
        }
    }

    /// Sends a request, authenticated through the local `x-user-id` header when
    /// `user` is set.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user: Option<Uuid>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user.to_string());
        }
        self.send(builder, body).await
    }

    pub async fn request_with_token(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        body: Option<Value>,
    ) -> TestResponse {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"));
        self.send(builder, body).await
    }

    async fn send(&self, builder: axum::http::request::Builder, body: Option<Value>) -> TestResponse {
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, user: Option<Uuid>) -> TestResponse {
        self.request(Method::GET, uri, user, None).await
    }

    pub async fn post(&self, uri: &str, user: Option<Uuid>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, user, Some(body)).await
    }

    pub async fn put(&self, uri: &str, user: Option<Uuid>, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, user, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: Option<Uuid>) -> TestResponse {
        self.request(Method::DELETE, uri, user, None).await
    }
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    /// Wire names of the fields that failed validation.
    pub fn invalid_fields(&self) -> Vec<String> {
        self.body["fields"]
            .as_array()
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|f| f["field"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn staff(clinic_id: Uuid, ci: &str, first_name: &str, n: u32) -> NewUser {
    NewUser {
        clinic_id,
        ci: ci.to_string(),
        first_name: first_name.to_string(),
        last_name: "Test".to_string(),
        email: format!("{}{n}@clinica.uy", first_name.to_lowercase()),
        phone: Some(format!("+5989100000{n}")),
        // Low cost keeps the suite fast; verification reads the cost from the hash.
        password_hash: Some(bcrypt::hash(PASSWORD, 4).unwrap()),
        ..NewUser::default()
    }
}

/// Staff of the clinic get the numbers `n`, `n + 1` and `n + 2` in their email and phone.
async fn seed_clinic(repo: &MemoryRepository, name: &str, provider: &str, n: u32) -> SeededClinic {
    let (clinic, admin) = repo
        .create_clinic(
            NewClinic {
                name: name.to_string(),
                email: format!("contacto{n}@clinica.uy"),
                phone: "+59824000000".to_string(),
                address: "Av. Italia 1234".to_string(),
                provider_name: Some(provider.to_string()),
            },
            staff(Uuid::nil(), &format!("1000000{n}"), "Admin", n),
        )
        .await
        .unwrap();

    let worker = repo
        .create_health_worker(staff(clinic.id, &format!("2000000{n}"), "Ana", n + 1))
        .await
        .unwrap();
    let other_worker = repo
        .create_health_worker(staff(clinic.id, &format!("3000000{n}"), "Bruno", n + 2))
        .await
        .unwrap();

    SeededClinic {
        clinic,
        admin,
        worker,
        other_worker,
    }
}
