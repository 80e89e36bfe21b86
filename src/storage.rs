use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;

/// Lifetime of a presigned upload URL.
pub const UPLOAD_URL_TTL_SECS: u64 = 600;
/// Lifetime of a presigned download URL.
pub const DOWNLOAD_URL_TTL_SECS: u64 = 3600;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid presigning window: {0}")]
    Presigning(String),

    #[error("object storage request failed: {0}")]
    Request(String),
}

/// StorageService
///
/// Abstract contract for the object storage holding clinical document files.
/// Handlers hold an `Arc<dyn StorageService>` so the S3 client and the mock
/// are interchangeable.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket if missing. Only called for `Env::Local` (MinIO).
    async fn ensure_bucket_exists(&self);

    /// A time-limited URL the client can `PUT` the file to directly. The
    /// request must carry the given `content_type`.
    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError>;

    /// A time-limited `GET` URL for an existing object.
    async fn get_presigned_download_url(
        &self,
        key: &str,
        expires_secs: u64,
    ) -> Result<String, StorageError>;

    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;
}

/// S3StorageClient
///
/// AWS SDK client for any S3-compatible endpoint (MinIO locally, a managed
/// bucket in production). Path-style addressing is forced for MinIO.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }
}

fn presigning(expires_secs: u64) -> Result<PresigningConfig, StorageError> {
    PresigningConfig::expires_in(Duration::from_secs(expires_secs))
        .map_err(|e| StorageError::Presigning(e.to_string()))
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        // CreateBucket fails harmlessly when the bucket is already there.
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!("create_bucket({}) skipped: {:?}", self.bucket_name, e);
        }
    }

    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .presigned(presigning(UPLOAD_URL_TTL_SECS)?)
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        Ok(presigned_req.uri().to_string())
    }

    async fn get_presigned_download_url(
        &self,
        key: &str,
        expires_secs: u64,
    ) -> Result<String, StorageError> {
        let presigned_req = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .presigned(presigning(expires_secs)?)
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        Ok(presigned_req.uri().to_string())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;
        Ok(())
    }
}

/// sanitize_key
///
/// Drops empty, `.` and `..` segments so a client-supplied key segment can
/// never climb out of its prefix.
pub(crate) fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// MockStorageService
///
/// Deterministic storage for tests: URLs point at a fake local bucket, deleted
/// keys are recorded, and `should_fail` turns every call into an error.
#[derive(Default)]
pub struct MockStorageService {
    pub should_fail: bool,
    deleted: std::sync::Mutex<Vec<String>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn deleted_keys(&self) -> Vec<String> {
        self.deleted
            .lock()
            .map(|keys| keys.clone())
            .unwrap_or_default()
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.should_fail {
            return Err(StorageError::Request(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn get_presigned_upload_url(
        &self,
        key: &str,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        self.check()?;
        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake",
            sanitize_key(key)
        ))
    }

    async fn get_presigned_download_url(
        &self,
        key: &str,
        expires_secs: u64,
    ) -> Result<String, StorageError> {
        self.check()?;
        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?expires={}&signature=fake",
            sanitize_key(key),
            expires_secs
        ))
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.check()?;
        if let Ok(mut deleted) = self.deleted.lock() {
            deleted.push(key.to_string());
        }
        Ok(())
    }
}

pub type StorageState = Arc<dyn StorageService>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_key_strips_traversal_segments() {
        assert_eq!(
            sanitize_key("clinical-documents/../../etc/./passwd"),
            "clinical-documents/etc/passwd"
        );
        assert_eq!(sanitize_key("//a//b/"), "a/b");
    }

    #[tokio::test]
    async fn mock_records_deletions() {
        let storage = MockStorageService::new();
        storage.delete_object("clinical-documents/x.pdf").await.unwrap();
        assert_eq!(storage.deleted_keys(), vec!["clinical-documents/x.pdf"]);
    }
}
