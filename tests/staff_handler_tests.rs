mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::{Value, json};

fn new_worker() -> Value {
    json!({
        "firstName": "Carla",
        "lastName": "Rodríguez",
        "ci": "4567890-1",
        "email": "Carla@Clinica.uy",
        "phone": "+59899111222",
        "address": "Bv. Artigas 100",
        "dateOfBirth": "1990-02-01",
    })
}

// --- Clinics ---

#[tokio::test]
async fn clinics_are_listed_and_filtered_by_provider() {
    let app = TestApp::spawn().await;

    let res = app.get("/clinics", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body.as_array().unwrap().len(), 2);

    let res = app.get("/clinics?providerName=sur", None).await;
    let clinics = res.body.as_array().unwrap();
    assert_eq!(clinics.len(), 1);
    assert_eq!(clinics[0]["name"], "Clínica Sur");

    let res = app.get("/clinics/Cl%C3%ADnica%20Norte", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["id"], app.norte.clinic.id.to_string());

    let res = app.get("/clinics/Inexistente", None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn provisioning_creates_the_clinic_admin_and_branding() {
    let app = TestApp::spawn().await;
    let payload = json!({
        "name": "Clínica Este",
        "email": "este@clinica.uy",
        "phone": "+59824111111",
        "address": "Rambla 1",
        "providerName": "Este Salud",
        "clinicAdmin": {
            "firstName": "Eva",
            "lastName": "Silva",
            "ci": "5555555-5",
            "email": "eva@clinica.uy",
        },
    });

    let res = app.post("/clinics", None, payload.clone()).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["clinic"]["name"], "Clínica Este");
    assert_eq!(res.body["clinicAdmin"]["user"]["ci"], "55555555");
    let admin_user: uuid::Uuid = res.body["clinicAdmin"]["user"]["id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();

    let config = app.get("/configuration", Some(admin_user)).await;
    assert_eq!(config.status, StatusCode::OK);
    assert_eq!(config.body["portalTitle"], "Portal de Clínica");

    let again = app.post("/clinics", None, payload).await;
    assert_eq!(again.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn provisioning_reports_every_invalid_field() {
    let app = TestApp::spawn().await;
    let res = app
        .post(
            "/clinics",
            None,
            json!({
                "name": "",
                "email": "no-es-email",
                "phone": "+59824111111",
                "address": "Rambla 1",
                "clinicAdmin": {
                    "firstName": "Eva",
                    "lastName": "",
                    "ci": "55555555",
                    "email": "eva@clinica.uy",
                    "phone": "099123456",
                },
            }),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        res.invalid_fields(),
        vec!["name", "email", "clinicAdmin.lastName", "clinicAdmin.phone"]
    );
}

#[tokio::test]
async fn hcen_can_look_up_a_clinic_member_by_ci() {
    let app = TestApp::spawn().await;

    let res = app
        .get("/clinics/Cl%C3%ADnica%20Norte/health-workers/2000000-1", None)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["id"], app.norte.worker.id.to_string());

    // Members of another clinic are not found.
    let res = app
        .get("/clinics/Cl%C3%ADnica%20Norte/health-workers/20000004", None)
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

// --- Health workers ---

#[tokio::test]
async fn admins_create_health_workers_in_their_clinic() {
    let app = TestApp::spawn().await;
    let admin = Some(app.norte.admin.user.id);

    let res = app.post("/health-workers", admin, new_worker()).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["user"]["ci"], "45678901");
    assert_eq!(res.body["user"]["email"], "carla@clinica.uy");
    assert_eq!(res.body["user"]["dateOfBirth"], "1990-02-01");
    assert_eq!(res.body["user"]["clinicId"], app.norte.clinic.id.to_string());

    let list = app.get("/health-workers?search=CARLA", admin).await;
    let workers = list.body.as_array().unwrap();
    assert_eq!(workers.len(), 1);
    assert_eq!(workers[0]["user"]["firstName"], "Carla");

    // Other clinics do not see it.
    let list = app
        .get("/health-workers", Some(app.sur.admin.user.id))
        .await;
    assert_eq!(list.body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn duplicates_are_checked_per_clinic() {
    let app = TestApp::spawn().await;

    let mut payload = new_worker();
    payload["email"] = json!("ana2@clinica.uy");
    let res = app
        .post("/health-workers", Some(app.norte.admin.user.id), payload.clone())
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(
        res.body["error"],
        "a user with that email already exists in this clinic"
    );

    // The same email is free in another clinic.
    let res = app
        .post("/health-workers", Some(app.sur.admin.user.id), payload)
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
}

#[tokio::test]
async fn health_worker_validation_collects_all_errors() {
    let app = TestApp::spawn().await;

    let mut payload = new_worker();
    payload["phone"] = json!("099 111 222");
    payload["dateOfBirth"] = json!("2999-01-01");
    payload["firstName"] = json!("  ");
    let res = app
        .post("/health-workers", Some(app.norte.admin.user.id), payload)
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.invalid_fields(), vec!["firstName", "phone", "dateOfBirth"]);
}

#[tokio::test]
async fn health_workers_edit_only_their_own_profile() {
    let app = TestApp::spawn().await;
    let worker = &app.norte.worker;

    let res = app
        .put(
            &format!("/health-workers/{}", worker.id),
            Some(worker.user.id),
            json!({ "address": "Nueva dirección 5", "email": "" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["user"]["address"], "Nueva dirección 5");
    // Empty strings leave the field unchanged.
    assert_eq!(res.body["user"]["email"], "ana2@clinica.uy");

    let res = app
        .put(
            &format!("/health-workers/{}", app.norte.other_worker.id),
            Some(worker.user.id),
            json!({ "address": "x" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admins_cannot_touch_workers_of_other_clinics() {
    let app = TestApp::spawn().await;
    let foreign = format!("/health-workers/{}", app.sur.worker.id);
    let admin = Some(app.norte.admin.user.id);

    let res = app.put(&foreign, admin, json!({ "firstName": "X" })).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.delete(&foreign, admin).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn updates_cannot_steal_another_users_phone() {
    let app = TestApp::spawn().await;

    let res = app
        .put(
            &format!("/health-workers/{}", app.norte.worker.id),
            Some(app.norte.admin.user.id),
            json!({ "phone": "+59891000003" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(
        res.body["error"],
        "a user with that phone already exists in this clinic"
    );
}

#[tokio::test]
async fn deleting_a_health_worker_removes_the_user() {
    let app = TestApp::spawn().await;
    let path = format!("/health-workers/{}", app.norte.other_worker.id);

    let res = app.delete(&path, Some(app.norte.admin.user.id)).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let res = app.delete(&path, Some(app.norte.admin.user.id)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.get("/me", Some(app.norte.other_worker.user.id)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

// --- Clinic admins ---

#[tokio::test]
async fn clinic_admins_are_managed_within_the_clinic() {
    let app = TestApp::spawn().await;
    let admin = Some(app.norte.admin.user.id);

    let res = app
        .post(
            "/clinic-admins",
            admin,
            json!({
                "firstName": "Diego",
                "lastName": "Méndez",
                "ci": "77777777",
                "email": "diego@clinica.uy",
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["user"]["phone"], Value::Null);
    let new_id = res.body["id"].as_str().unwrap().to_string();

    let res = app
        .put(
            &format!("/clinic-admins/{new_id}"),
            admin,
            json!({ "phone": "+59898765432" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["user"]["phone"], "+59898765432");

    let res = app.get("/clinic-admins", admin).await;
    assert_eq!(res.body.as_array().unwrap().len(), 2);

    let res = app.delete(&format!("/clinic-admins/{new_id}"), admin).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn admins_cannot_delete_themselves_or_foreign_admins() {
    let app = TestApp::spawn().await;
    let admin = Some(app.norte.admin.user.id);

    let res = app
        .delete(&format!("/clinic-admins/{}", app.norte.admin.id), admin)
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = app
        .delete(&format!("/clinic-admins/{}", app.sur.admin.id), admin)
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

// --- Configuration ---

#[tokio::test]
async fn configuration_updates_ignore_empty_fields_and_validate_colors() {
    let app = TestApp::spawn().await;
    let admin = Some(app.norte.admin.user.id);

    let res = app
        .put(
            "/configuration",
            admin,
            json!({ "portalTitle": "Norte", "backgroundColor": "", "cardTextColor": "#000000" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["portalTitle"], "Norte");
    assert_eq!(res.body["backgroundColor"], "#F8FAFC");
    assert_eq!(res.body["cardTextColor"], "#000000");

    let res = app
        .put(
            "/configuration",
            admin,
            json!({ "sidebarTextColor": "red", "iconTextColor": "#12345" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.invalid_fields(), vec!["sidebarTextColor", "iconTextColor"]);

    // Other clinics keep their own branding.
    let res = app
        .get("/configuration", Some(app.sur.worker.user.id))
        .await;
    assert_eq!(res.body["portalTitle"], "Portal de Clínica");
}

#[tokio::test]
async fn reset_restores_the_default_branding() {
    let app = TestApp::spawn().await;
    let admin = Some(app.norte.admin.user.id);

    app.put(
        "/configuration",
        admin,
        json!({ "portalTitle": "Norte", "iconBackgroundColor": "#FF0000" }),
    )
    .await;

    let res = app.post("/configuration/reset", admin, json!({})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["portalTitle"], "Portal de Clínica");
    assert_eq!(res.body["iconBackgroundColor"], "#3B82F6");
    assert_eq!(res.body["sidebarBackgroundColor"], "#F1F5F9");
}
