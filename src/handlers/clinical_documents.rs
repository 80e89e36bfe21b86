use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    guard::Session,
    models::{
        ClinicalDocument, CreateClinicalDocumentRequest, DocumentChanges, DocumentFilter,
        NewClinicalDocument, SignedUrlResponse, UploadUrlRequest, UploadUrlResponse,
    },
    storage::{DOWNLOAD_URL_TTL_SECS, sanitize_key},
    validation::{Validator, clean_ci, non_empty},
};

/// Object keys of a clinic's documents all start with this prefix.
fn clinic_prefix(clinic_id: Uuid) -> String {
    format!("clinical-documents/clinic-{clinic_id}/")
}

/// get_upload_url
///
/// [Health Worker Route] A presigned PUT URL for uploading a document file
/// straight to object storage.
///
/// The key is generated here, never by the client:
/// `clinical-documents/clinic-{clinicId}/{healthUserCi}/{uuid}.{ext}`. The URL
/// expires after ten minutes and only accepts the declared content type.
#[utoipa::path(
    post,
    path = "/clinical-documents/upload-url",
    request_body = UploadUrlRequest,
    responses(
        (status = 200, description = "URL", body = UploadUrlResponse),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn get_upload_url(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<UploadUrlRequest>,
) -> Result<Json<UploadUrlResponse>, ApiError> {
    let ci = clean_ci(&payload.health_user_ci);

    let mut v = Validator::new();
    v.required("fileName", &payload.file_name, "El nombre del archivo es requerido")
        .required("contentType", &payload.content_type, "El tipo de contenido es requerido")
        .check(
            "healthUserCi",
            !ci.is_empty() && ci.chars().all(|c| c.is_ascii_digit()),
            "La cédula no es válida",
        );
    v.finish()?;

    let extension = std::path::Path::new(payload.file_name.trim())
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin");
    let key = format!(
        "{}{}/{}.{}",
        clinic_prefix(session.clinic_id()),
        ci,
        Uuid::new_v4(),
        extension
    );

    let upload_url = state
        .storage
        .get_presigned_upload_url(&key, payload.content_type.trim())
        .await?;

    Ok(Json(UploadUrlResponse { upload_url, key }))
}

/// create_clinical_document
///
/// [Health Worker Route] Registers a document written by the caller. A file
/// uploaded beforehand is referenced through `s3Key`, which must belong to the
/// caller's clinic.
#[utoipa::path(
    post,
    path = "/clinical-documents",
    request_body = CreateClinicalDocumentRequest,
    responses(
        (status = 201, description = "Created", body = ClinicalDocument),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn create_clinical_document(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateClinicalDocumentRequest>,
) -> Result<(StatusCode, Json<ClinicalDocument>), ApiError> {
    let health_worker_id = session.require_health_worker()?;
    let s3_key = non_empty(payload.s3_key);

    let mut v = Validator::new();
    v.required("title", &payload.title, "El título es requerido")
        .required("healthUserCi", &payload.health_user_ci, "La cédula es requerida")
        .required("documentType", &payload.document_type, "El tipo de documento es requerido");
    if let Some(key) = &s3_key {
        v.check(
            "s3Key",
            key.starts_with(&clinic_prefix(session.clinic_id())) && sanitize_key(key) == *key,
            "La clave del archivo no pertenece a esta clínica",
        );
    }
    if let Some(size) = payload.file_size {
        v.check("fileSize", size >= 0, "El tamaño del archivo no es válido");
    }
    v.finish()?;

    let document = state
        .repo
        .create_document(NewClinicalDocument {
            clinic_id: session.clinic_id(),
            health_worker_id,
            health_user_ci: clean_ci(&payload.health_user_ci),
            title: payload.title.trim().to_string(),
            description: payload.description.trim().to_string(),
            document_type: payload.document_type.trim().to_string(),
            content: non_empty(payload.content),
            s3_key,
            content_type: non_empty(payload.content_type),
            file_size: payload.file_size,
        })
        .await?;

    tracing::info!(document = %document.id, clinic = %session.clinic_id(), "clinical document registered");
    Ok((StatusCode::CREATED, Json(document)))
}

#[utoipa::path(
    get,
    path = "/clinical-documents",
    params(DocumentFilter),
    responses((status = 200, description = "Newest first", body = [ClinicalDocument]))
)]
pub async fn list_clinical_documents(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<DocumentFilter>,
) -> Result<Json<Vec<ClinicalDocument>>, ApiError> {
    let filter = DocumentFilter {
        health_user_ci: non_empty(filter.health_user_ci).as_deref().map(clean_ci),
        document_type: non_empty(filter.document_type),
    };
    let documents = state
        .repo
        .list_documents(session.clinic_id(), &filter)
        .await?;
    Ok(Json(documents))
}

/// 404 when missing, 403 when the document belongs to another clinic.
async fn find_in_clinic(
    state: &AppState,
    session: &Session,
    id: Uuid,
) -> Result<ClinicalDocument, ApiError> {
    let document = state
        .repo
        .get_document(id)
        .await?
        .ok_or_else(|| ApiError::not_found("clinical document not found"))?;
    session.require_clinic(document.clinic_id)?;
    Ok(document)
}

#[utoipa::path(
    get,
    path = "/clinical-documents/{id}",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Found", body = ClinicalDocument),
        (status = 403, description = "Another clinic"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_clinical_document(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<ClinicalDocument>, ApiError> {
    find_in_clinic(&state, &session, id).await.map(Json)
}

#[utoipa::path(
    put,
    path = "/clinical-documents/{id}",
    params(("id" = Uuid, Path, description = "Document ID")),
    request_body = DocumentChanges,
    responses(
        (status = 200, description = "Updated", body = ClinicalDocument),
        (status = 403, description = "Another clinic"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_clinical_document(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<DocumentChanges>,
) -> Result<Json<ClinicalDocument>, ApiError> {
    find_in_clinic(&state, &session, id).await?;

    let changes = DocumentChanges {
        title: non_empty(payload.title),
        description: payload.description.map(|d| d.trim().to_string()),
        document_type: non_empty(payload.document_type),
        content: payload.content,
    };
    state
        .repo
        .update_document(id, &changes)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("clinical document not found"))
}

/// delete_clinical_document
///
/// [Health Worker Route] Deletes the stored file first, then the row, so a
/// storage failure leaves the document intact and retryable.
#[utoipa::path(
    delete,
    path = "/clinical-documents/{id}",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Another clinic"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_clinical_document(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let document = find_in_clinic(&state, &session, id).await?;

    if let Some(key) = &document.s3_key {
        state.storage.delete_object(key).await?;
    }
    if !state.repo.delete_document(id).await? {
        return Err(ApiError::not_found("clinical document not found"));
    }

    tracing::info!(document = %id, by = %session.user_id(), "clinical document deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// get_signed_url
///
/// [Health Worker Route] A presigned GET URL for the document's file, valid
/// for one hour.
#[utoipa::path(
    get,
    path = "/clinical-documents/{id}/signed-url",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "URL", body = SignedUrlResponse),
        (status = 400, description = "The document has no file"),
        (status = 403, description = "Another clinic"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_signed_url(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<SignedUrlResponse>, ApiError> {
    let document = find_in_clinic(&state, &session, id).await?;
    let key = document
        .s3_key
        .ok_or_else(|| ApiError::BadRequest("the document has no attached file".to_string()))?;

    let signed_url = state
        .storage
        .get_presigned_download_url(&key, DOWNLOAD_URL_TTL_SECS)
        .await?;
    let file_name = key.rsplit('/').next().unwrap_or(&key).to_string();

    Ok(Json(SignedUrlResponse {
        signed_url,
        expires_in: DOWNLOAD_URL_TTL_SECS,
        file_name,
        content_type: document.content_type,
    }))
}
