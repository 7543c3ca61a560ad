use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MediaUploadResponse {
    #[schema(example = "/uploads/0b6f8e0e-6a4f-4f3c-8d53-5f2f8b1b2c3d.jpg")]
    pub url: String,
}

/// Multipart body for the OpenAPI document.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct MediaUploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}
