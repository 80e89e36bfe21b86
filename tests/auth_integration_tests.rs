mod common;

use axum::http::{Method, StatusCode};
use clinic_portal::{
    AppConfig,
    auth::issue_token,
    config::Env,
};
use common::{PASSWORD, TestApp};
use serde_json::json;

async fn sign_in(app: &TestApp, clinic_id: uuid::Uuid, ci: &str, password: &str) -> common::TestResponse {
    app.post(
        "/auth/sign-in",
        None,
        json!({ "clinicId": clinic_id, "ci": ci, "password": password }),
    )
    .await
}

#[tokio::test]
async fn sign_in_issues_a_token_that_authenticates_requests() {
    let app = TestApp::spawn().await;

    // The CI may be typed with its hyphen.
    let res = sign_in(&app, app.norte.clinic.id, "2000000-1", PASSWORD).await;
    assert_eq!(res.status, StatusCode::OK);
    let token = res.body["token"].as_str().unwrap().to_string();
    assert!(res.body["expiresAt"].as_i64().unwrap() > chrono::Utc::now().timestamp());

    let me = app
        .request_with_token(Method::GET, "/me", &token, None)
        .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user"]["id"], app.norte.worker.user.id.to_string());
    assert_eq!(me.body["role"]["kind"], "healthWorker");
}

#[tokio::test]
async fn every_sign_in_failure_looks_the_same() {
    let app = TestApp::spawn().await;

    let wrong_password = sign_in(&app, app.norte.clinic.id, "20000001", "otra").await;
    let unknown_ci = sign_in(&app, app.norte.clinic.id, "99999999", PASSWORD).await;
    // A real user, but of another clinic.
    let wrong_clinic = sign_in(&app, app.sur.clinic.id, "20000001", PASSWORD).await;

    for res in [wrong_password, unknown_ci, wrong_clinic] {
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.body["error"], "authentication required");
    }
}

#[tokio::test]
async fn tokens_are_bound_to_their_clinic() {
    let app = TestApp::spawn().await;

    let (token, _) = issue_token(app.norte.admin.user.id, app.sur.clinic.id, &app.config).unwrap();
    let res = app
        .request_with_token(Method::GET, "/me", &token, None)
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app
        .request_with_token(Method::GET, "/me", "not.a.jwt", None)
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn the_user_id_header_only_works_locally() {
    let config = AppConfig {
        env: Env::Production,
        ..AppConfig::default()
    };
    let app = TestApp::with_config(config).await;

    let res = app.get("/me", Some(app.norte.admin.user.id)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let (token, _) = issue_token(app.norte.admin.user.id, app.norte.clinic.id, &app.config).unwrap();
    let res = app
        .request_with_token(Method::GET, "/me", &token, None)
        .await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn admin_routes_reject_health_workers_and_anonymous_callers() {
    let app = TestApp::spawn().await;
    let body = json!({});

    let anonymous = app.put("/configuration", None, body.clone()).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let worker = app
        .put("/configuration", Some(app.norte.worker.user.id), body)
        .await;
    assert_eq!(worker.status, StatusCode::FORBIDDEN);

    let worker = app
        .get("/health-users", Some(app.norte.worker.user.id))
        .await;
    assert_eq!(worker.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn health_worker_routes_reject_clinic_admins() {
    let app = TestApp::spawn().await;
    let admin = Some(app.norte.admin.user.id);

    let res = app.get("/clinical-documents", admin).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .post(
            "/chat/messages",
            admin,
            json!({ "healthUserCi": "12345672", "message": "hola" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.get("/access-requests", None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn shared_paths_keep_each_method_behind_its_own_layer() {
    let app = TestApp::spawn().await;

    // GET /configuration is open to any role, PUT only to administrators.
    let res = app
        .get("/configuration", Some(app.norte.worker.user.id))
        .await;
    assert_eq!(res.status, StatusCode::OK);

    // GET /health-workers is open to any role, POST only to administrators.
    let res = app
        .get("/health-workers", Some(app.norte.worker.user.id))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let res = app
        .post("/health-workers", Some(app.norte.worker.user.id), json!({}))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}
