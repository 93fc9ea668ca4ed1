//! Storage for generated files
//!
//! Rendered documents are uploaded to a hosted storage bucket, or written to
//! a local directory that the web server exposes under `/files/`.

use crate::config::{Config, StorageConfig};
use crate::documents::RenderedDocument;
use crate::error::{ForgeError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// URL prefix under which the local backend is served
pub const LOCAL_FILES_ROUTE: &str = "/files";

/// Destination for rendered documents
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Backend name used in logs
    fn name(&self) -> &'static str;

    /// Store a document and return its public download URL
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::Upload` if the object could not be stored
    async fn put(&self, document: &RenderedDocument) -> Result<String>;
}

/// Hosted storage bucket reached over its REST API
#[derive(Debug, Clone)]
pub struct SupabaseBucket {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    service_key: String,
}

impl SupabaseBucket {
    /// Create a bucket client
    ///
    /// # Arguments
    ///
    /// * `base_url` - Project URL, e.g. `https://abc.supabase.co`
    /// * `bucket` - Bucket name
    /// * `service_key` - Service role key with write access to the bucket
    /// * `timeout_seconds` - Upload timeout
    pub fn new(base_url: &str, bucket: &str, service_key: &str, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ForgeError::Upload(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            service_key: service_key.to_string(),
        })
    }

    /// Public URL of an object in this bucket
    ///
    /// # Examples
    ///
    /// ```
    /// use lesson_forge::files::SupabaseBucket;
    ///
    /// let bucket = SupabaseBucket::new("https://p.supabase.co/", "generated-files", "k", 5).unwrap();
    /// assert_eq!(
    ///     bucket.public_url("1_lesson_u.pdf"),
    ///     "https://p.supabase.co/storage/v1/object/public/generated-files/1_lesson_u.pdf"
    /// );
    /// ```
    pub fn public_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, name
        )
    }

    fn upload_url(&self, name: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, name)
    }
}

#[async_trait]
impl ObjectStore for SupabaseBucket {
    fn name(&self) -> &'static str {
        "supabase"
    }

    async fn put(&self, document: &RenderedDocument) -> Result<String> {
        if self.service_key.trim().is_empty() {
            return Err(ForgeError::Upload("Storage service key is not configured".to_string()).into());
        }

        let response = self
            .client
            .post(self.upload_url(&document.file_name))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("Content-Type", document.mime)
            .header("x-upsert", "false")
            .body(document.bytes.clone())
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Upload of {} failed: {}", document.file_name, e);
                ForgeError::Upload(format!("Upload request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Storage returned error {}: {}", status, error_text);
            return Err(ForgeError::Upload(format!(
                "Storage returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        tracing::info!(
            "Uploaded {} ({} bytes) to bucket {}",
            document.file_name,
            document.bytes.len(),
            self.bucket
        );
        Ok(self.public_url(&document.file_name))
    }
}

/// Local directory backend
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    dir: PathBuf,
    public_base: String,
}

impl LocalDirStore {
    /// Create a store writing into `dir`, linking files under `public_base/files/`
    pub fn new(dir: impl Into<PathBuf>, public_base: &str) -> Self {
        Self {
            dir: dir.into(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    /// Directory files are written to
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

#[async_trait]
impl ObjectStore for LocalDirStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn put(&self, document: &RenderedDocument) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ForgeError::Upload(format!("Failed to create {}: {}", self.dir.display(), e)))?;

        let path = self.dir.join(&document.file_name);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| ForgeError::Upload(format!("Failed to create {}: {}", path.display(), e)))?;
        file.write_all(&document.bytes)
            .await
            .map_err(|e| ForgeError::Upload(format!("Failed to write {}: {}", path.display(), e)))?;
        file.flush()
            .await
            .map_err(|e| ForgeError::Upload(format!("Failed to write {}: {}", path.display(), e)))?;

        tracing::info!("Stored {} ({} bytes)", path.display(), document.bytes.len());
        Ok(format!(
            "{}{}/{}",
            self.public_base, LOCAL_FILES_ROUTE, document.file_name
        ))
    }
}

/// Create the object store named by the configuration
///
/// # Errors
///
/// Returns `ForgeError::Config` for an unknown backend
pub fn create_store(config: &Config) -> Result<Arc<dyn ObjectStore>> {
    let storage: &StorageConfig = &config.storage;
    match storage.backend.as_str() {
        "supabase" => Ok(Arc::new(SupabaseBucket::new(
            config.identity.effective_url(),
            &storage.bucket,
            &config.identity.service_role_key,
            storage.upload_timeout_seconds,
        )?)),
        "local" => Ok(Arc::new(LocalDirStore::new(
            storage.local_dir.clone(),
            &config.server.public_url,
        ))),
        other => Err(ForgeError::Config(format!("Unknown storage backend: {}", other)).into()),
    }
}
