use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use uuid::Uuid;

use crate::config::{S3Config, StorageConfig, StorageDriver};
use crate::error::{AppError, AppResult};

/// Key prefix for objects written to a bucket.
pub const UPLOAD_FOLDER: &str = "uploads";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub url: String,
    /// Filesystem path or object key.
    pub path: String,
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn save(&self, bytes: Vec<u8>, filename: &str, content_type: &str) -> AppResult<StoredFile>;
}

pub fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/avif" => Some("avif"),
        _ => None,
    }
}

/// Extension from the original name, lower-cased and reduced to `[a-z0-9]`, else from the MIME type.
pub fn file_extension(original: &str, content_type: &str) -> Option<String> {
    let from_name = original
        .rsplit_once('.')
        .map(|(_, ext)| {
            ext.to_ascii_lowercase()
                .chars()
                .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                .collect::<String>()
        })
        .filter(|ext| !ext.is_empty());

    from_name.or_else(|| extension_for_mime(content_type).map(str::to_string))
}

pub fn generate_filename(original: &str, content_type: &str) -> String {
    let id = Uuid::new_v4();
    match file_extension(original, content_type) {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

pub struct LocalStorage {
    dir: PathBuf,
    public_path: String,
}

impl LocalStorage {
    pub fn new(dir: impl Into<PathBuf>, public_path: &str) -> Self {
        Self {
            dir: dir.into(),
            public_path: public_path.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn save(&self, bytes: Vec<u8>, filename: &str, content_type: &str) -> AppResult<StoredFile> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::StorageError(format!("create {}: {}", self.dir.display(), e)))?;

        let name = generate_filename(filename, content_type);
        let target = self.dir.join(&name);
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| AppError::StorageError(format!("write {}: {}", target.display(), e)))?;

        Ok(StoredFile {
            url: format!("{}/{}", self.public_path, name),
            path: target.display().to_string(),
        })
    }
}

pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_url: Option<String>,
}

impl S3Storage {
    pub async fn from_config(config: &S3Config) -> AppResult<Self> {
        if config.bucket.is_empty() {
            return Err(AppError::StorageError(
                "S3 bucket is required when the storage driver is s3".to_string(),
            ));
        }

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
                key_id.clone(),
                secret.clone(),
                None,
                None,
                "config",
            ));
        }
        let shared = loader.load().await;

        let mut builder =
            aws_sdk_s3::config::Builder::from(&shared).force_path_style(config.force_path_style);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            public_url: config
                .public_url
                .as_ref()
                .map(|u| u.trim_end_matches('/').to_string()),
        })
    }

    fn object_url(&self, key: &str) -> String {
        object_url(&self.bucket, self.public_url.as_deref(), key)
    }
}

fn object_url(bucket: &str, public_url: Option<&str>, key: &str) -> String {
    match public_url {
        Some(base) if !base.is_empty() => format!("{base}/{key}"),
        _ => format!("https://{bucket}.s3.amazonaws.com/{key}"),
    }
}

#[async_trait]
impl StorageBackend for S3Storage {
    async fn save(&self, bytes: Vec<u8>, filename: &str, content_type: &str) -> AppResult<StoredFile> {
        let key = format!("{}/{}", UPLOAD_FOLDER, generate_filename(filename, content_type));

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| AppError::StorageError(format!("put {}: {}", key, e)))?;

        Ok(StoredFile {
            url: self.object_url(&key),
            path: key,
        })
    }
}

/// S3 initialisation failures fall back to local storage.
pub async fn create_storage(config: &StorageConfig) -> Arc<dyn StorageBackend> {
    if config.driver == StorageDriver::S3 {
        match S3Storage::from_config(&config.s3).await {
            Ok(storage) => {
                log::info!("Using S3 storage, bucket {}", config.s3.bucket);
                return Arc::new(storage);
            }
            Err(e) => log::error!("S3 storage unavailable, using local storage: {}", e),
        }
    }
    log::info!("Using local storage at {}", config.local_dir);
    Arc::new(LocalStorage::new(&config.local_dir, &config.public_path))
}
