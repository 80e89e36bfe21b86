mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::{Value, json};
use uuid::Uuid;

async fn upload_key(app: &TestApp, worker: Uuid) -> String {
    let res = app
        .post(
            "/clinical-documents/upload-url",
            Some(worker),
            json!({
                "fileName": "hemograma.PDF",
                "contentType": "application/pdf",
                "healthUserCi": "1234567-2",
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    res.body["key"].as_str().unwrap().to_string()
}

fn document(s3_key: Option<&str>) -> Value {
    json!({
        "title": "Hemograma completo",
        "description": "Control anual",
        "healthUserCi": "12345672",
        "documentType": "LAB_RESULT",
        "s3Key": s3_key,
        "contentType": s3_key.map(|_| "application/pdf"),
        "fileSize": s3_key.map(|_| 52_431),
    })
}

async fn create_document(app: &TestApp, worker: Uuid, s3_key: Option<&str>) -> Value {
    let res = app
        .post("/clinical-documents", Some(worker), document(s3_key))
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    res.body
}

#[tokio::test]
async fn upload_keys_live_under_the_clinic_prefix() {
    let app = TestApp::spawn().await;
    let worker = app.norte.worker.user.id;

    let res = app
        .post(
            "/clinical-documents/upload-url",
            Some(worker),
            json!({
                "fileName": "estudio.pdf",
                "contentType": "application/pdf",
                "healthUserCi": "1234567-2",
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let key = res.body["key"].as_str().unwrap();
    let prefix = format!("clinical-documents/clinic-{}/12345672/", app.norte.clinic.id);
    assert!(key.starts_with(&prefix), "unexpected key {key}");
    assert!(key.ends_with(".pdf"));
    let upload_url = res.body["uploadUrl"].as_str().unwrap();
    assert!(upload_url.contains(key));
}

#[tokio::test]
async fn files_without_a_usable_extension_get_bin() {
    let app = TestApp::spawn().await;
    let res = app
        .post(
            "/clinical-documents/upload-url",
            Some(app.norte.worker.user.id),
            json!({
                "fileName": "radiografia",
                "contentType": "image/png",
                "healthUserCi": "12345672",
            }),
        )
        .await;
    assert!(res.body["key"].as_str().unwrap().ends_with(".bin"));
}

#[tokio::test]
async fn upload_url_requires_all_fields() {
    let app = TestApp::spawn().await;
    let res = app
        .post(
            "/clinical-documents/upload-url",
            Some(app.norte.worker.user.id),
            json!({ "fileName": "", "contentType": "", "healthUserCi": "../x" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        res.invalid_fields(),
        vec!["fileName", "contentType", "healthUserCi"]
    );
}

#[tokio::test]
async fn storage_failures_surface_as_500() {
    let app = TestApp::with_failing_storage().await;
    let res = app
        .post(
            "/clinical-documents/upload-url",
            Some(app.norte.worker.user.id),
            json!({
                "fileName": "estudio.pdf",
                "contentType": "application/pdf",
                "healthUserCi": "12345672",
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body["error"], "internal server error");
}

#[tokio::test]
async fn documents_only_reference_keys_of_their_own_clinic() {
    let app = TestApp::spawn().await;
    let worker = Some(app.norte.worker.user.id);

    let foreign = format!("clinical-documents/clinic-{}/12345672/a.pdf", app.sur.clinic.id);
    let escaping = format!(
        "clinical-documents/clinic-{}/../clinic-{}/a.pdf",
        app.norte.clinic.id, app.sur.clinic.id
    );

    for key in [foreign, escaping] {
        let res = app
            .post("/clinical-documents", worker, document(Some(&key)))
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "key {key}");
        assert_eq!(res.invalid_fields(), vec!["s3Key"]);
    }
}

#[tokio::test]
async fn documents_are_created_listed_and_scoped_to_the_clinic() {
    let app = TestApp::spawn().await;
    let worker = app.norte.worker.user.id;

    let key = upload_key(&app, worker).await;
    let created = create_document(&app, worker, Some(&key)).await;
    assert_eq!(created["healthWorkerId"], app.norte.worker.id.to_string());
    assert_eq!(created["clinicId"], app.norte.clinic.id.to_string());
    assert_eq!(created["s3Key"], key.as_str());
    create_document(&app, worker, None).await;

    let list = app
        .get("/clinical-documents?healthUserCi=1234567-2", Some(worker))
        .await;
    assert_eq!(list.body.as_array().unwrap().len(), 2);

    let list = app
        .get("/clinical-documents?documentType=OTHER", Some(worker))
        .await;
    assert!(list.body.as_array().unwrap().is_empty());

    let list = app
        .get("/clinical-documents", Some(app.sur.worker.user.id))
        .await;
    assert!(list.body.as_array().unwrap().is_empty());

    let path = format!("/clinical-documents/{}", created["id"].as_str().unwrap());
    let res = app.get(&path, Some(app.norte.other_worker.user.id)).await;
    assert_eq!(res.status, StatusCode::OK);
    let res = app.get(&path, Some(app.sur.worker.user.id)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let res = app
        .get(&format!("/clinical-documents/{}", Uuid::new_v4()), Some(worker))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn documents_can_be_edited() {
    let app = TestApp::spawn().await;
    let worker = app.norte.worker.user.id;
    let created = create_document(&app, worker, None).await;
    let path = format!("/clinical-documents/{}", created["id"].as_str().unwrap());

    let res = app
        .put(
            &path,
            Some(worker),
            json!({ "title": "Hemograma (corregido)", "documentType": "" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["title"], "Hemograma (corregido)");
    assert_eq!(res.body["documentType"], "LAB_RESULT");

    let res = app
        .put(&path, Some(app.sur.worker.user.id), json!({ "title": "x" }))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn signed_urls_are_valid_for_an_hour() {
    let app = TestApp::spawn().await;
    let worker = app.norte.worker.user.id;

    let key = upload_key(&app, worker).await;
    let with_file = create_document(&app, worker, Some(&key)).await;
    let res = app
        .get(
            &format!(
                "/clinical-documents/{}/signed-url",
                with_file["id"].as_str().unwrap()
            ),
            Some(worker),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["expiresIn"], 3600);
    assert_eq!(res.body["contentType"], "application/pdf");
    assert_eq!(res.body["fileName"], key.rsplit('/').next().unwrap());
    assert!(res.body["signedUrl"].as_str().unwrap().contains("expires=3600"));

    let without_file = create_document(&app, worker, None).await;
    let res = app
        .get(
            &format!(
                "/clinical-documents/{}/signed-url",
                without_file["id"].as_str().unwrap()
            ),
            Some(worker),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_a_document_removes_its_file() {
    let app = TestApp::spawn().await;
    let worker = app.norte.worker.user.id;

    let key = upload_key(&app, worker).await;
    let created = create_document(&app, worker, Some(&key)).await;
    let path = format!("/clinical-documents/{}", created["id"].as_str().unwrap());

    let res = app.delete(&path, Some(app.sur.worker.user.id)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert!(app.storage.deleted_keys().is_empty());

    let res = app.delete(&path, Some(worker)).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert_eq!(app.storage.deleted_keys(), vec![key]);

    let res = app.get(&path, Some(worker)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}
