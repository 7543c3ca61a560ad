use std::sync::Arc;

use crate::error::{AppResult, MediaError};
use crate::external::StorageBackend;
use crate::models::MediaUploadResponse;

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const ALLOWED_CONTENT_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/avif",
    "image/gif",
];

pub fn validate_upload(size: usize, content_type: &str) -> Result<(), MediaError> {
    if size == 0 {
        return Err(MediaError::FileEmpty);
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(MediaError::FileTooLarge);
    }
    if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return Err(MediaError::UnsupportedType);
    }
    Ok(())
}

#[derive(Clone)]
pub struct MediaService {
    storage: Arc<dyn StorageBackend>,
}

impl MediaService {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> AppResult<MediaUploadResponse> {
        validate_upload(bytes.len(), content_type)?;

        let size = bytes.len();
        let stored = self.storage.save(bytes, filename, content_type).await?;
        log::info!("Stored upload {} ({} bytes) at {}", filename, size, stored.path);

        Ok(MediaUploadResponse { url: stored.url })
    }
}
