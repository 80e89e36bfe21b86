mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::Value;

#[tokio::test]
async fn anonymous_visitors_are_sent_to_sign_in() {
    let app = TestApp::spawn().await;

    for path in ["/", "/configuracion", "/usuarios-de-salud/12345672", "/no-existe"] {
        let res = app.get(&format!("/guard?path={path}"), None).await;
        assert_eq!(res.status, StatusCode::SEE_OTHER, "path {path}");
        assert_eq!(res.location(), Some("/sign-in"), "path {path}");
    }
}

#[tokio::test]
async fn public_pages_render_without_a_session() {
    let app = TestApp::spawn().await;

    for path in ["/sign-in", "/sign-up"] {
        let res = app.get(&format!("/guard?path={path}"), None).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body, Value::Null);
    }
}

#[tokio::test]
async fn health_workers_reach_clinical_history_but_not_admin_pages() {
    let app = TestApp::spawn().await;
    let worker = Some(app.norte.worker.user.id);

    let res = app
        .get("/guard?path=/usuarios-de-salud/1234567-2", worker)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["role"]["kind"], "healthWorker");
    assert_eq!(res.body["role"]["id"], app.norte.worker.id.to_string());
    assert_eq!(res.body["clinic"]["name"], "Clínica Norte");

    let res = app.get("/guard?path=/configuracion", worker).await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.location(), Some("/"));

    // Signed-in users are bounced off the public pages.
    let res = app.get("/guard?path=/sign-in", worker).await;
    assert_eq!(res.location(), Some("/"));
}

#[tokio::test]
async fn clinic_admins_land_on_configuration_outside_their_pages() {
    let app = TestApp::spawn().await;
    let admin = Some(app.norte.admin.user.id);

    let res = app.get("/guard?path=/configuracion/", admin).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["role"]["kind"], "clinicAdmin");

    let res = app.get("/guard?path=/profesionales-de-salud", admin).await;
    assert_eq!(res.status, StatusCode::OK);

    for path in ["/usuarios-de-salud/12345672", "/sign-up", "/no-existe"] {
        let res = app.get(&format!("/guard?path={path}"), admin).await;
        assert_eq!(res.status, StatusCode::SEE_OTHER, "path {path}");
        assert_eq!(res.location(), Some("/configuracion"), "path {path}");
    }
}

#[tokio::test]
async fn a_user_with_both_role_markers_is_rejected() {
    let app = TestApp::spawn().await;
    app.repo
        .grant_health_worker_marker(app.norte.admin.user.id);

    let res = app
        .get("/guard?path=/", Some(app.norte.admin.user.id))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn me_returns_the_session_or_401() {
    let app = TestApp::spawn().await;

    let res = app.get("/me", None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "authentication required");

    let res = app.get("/me", Some(app.sur.admin.user.id)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["user"]["ci"], "10000004");
    assert_eq!(res.body["clinic"]["id"], app.sur.clinic.id.to_string());
}

#[tokio::test]
async fn health_check_is_public() {
    let app = TestApp::spawn().await;
    let res = app.get("/health", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, Value::String("ok".into()));
}
