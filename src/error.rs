use std::collections::BTreeMap;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Field name -> validation messages, returned as `details`.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("post not found")]
    PostNotFound,
    #[error("post is free")]
    PostIsFree,
    #[error("post already purchased")]
    AlreadyPurchased,
    #[error("checkout session not found")]
    SessionNotFound,
    #[error("checkout session not paid")]
    SessionNotPaid,
    #[error("checkout session metadata mismatch")]
    SessionMetadataMismatch,
}

impl CheckoutError {
    pub fn code(&self) -> &'static str {
        match self {
            CheckoutError::PostNotFound => "POST_NOT_FOUND",
            CheckoutError::PostIsFree => "POST_IS_FREE",
            CheckoutError::AlreadyPurchased => "ALREADY_PURCHASED",
            CheckoutError::SessionNotFound => "SESSION_NOT_FOUND",
            CheckoutError::SessionNotPaid => "SESSION_NOT_PAID",
            CheckoutError::SessionMetadataMismatch => "SESSION_METADATA_MISMATCH",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            CheckoutError::PostNotFound | CheckoutError::SessionNotFound => StatusCode::NOT_FOUND,
            CheckoutError::SessionMetadataMismatch => StatusCode::FORBIDDEN,
            CheckoutError::SessionNotPaid => StatusCode::CONFLICT,
            CheckoutError::PostIsFree | CheckoutError::AlreadyPurchased => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaError {
    #[error("file is empty")]
    FileEmpty,
    #[error("file exceeds the upload limit")]
    FileTooLarge,
    #[error("unsupported content type")]
    UnsupportedType,
}

impl MediaError {
    pub fn code(&self) -> &'static str {
        match self {
            MediaError::FileEmpty => "FILE_EMPTY",
            MediaError::FileTooLarge => "FILE_TOO_LARGE",
            MediaError::UnsupportedType => "UNSUPPORTED_TYPE",
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostError {
    #[error("scheduled post requires a publish date")]
    ScheduledPostRequiresDate,
    #[error("paid post requires a positive price")]
    PaidPostRequiresPrice,
    #[error("slug already in use")]
    SlugTaken,
}

impl PostError {
    pub fn code(&self) -> &'static str {
        match self {
            PostError::ScheduledPostRequiresDate => "SCHEDULED_POST_REQUIRES_DATE",
            PostError::PaidPostRequiresPrice => "PAID_POST_REQUIRES_PRICE",
            PostError::SlugTaken => "SLUG_TAKEN",
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookError {
    #[error("missing stripe-signature header")]
    MissingSignature,
    #[error("webhook signature verification failed")]
    InvalidSignature,
    #[error("payment gateway not configured")]
    NotConfigured,
    #[error("webhook secret not set")]
    SecretNotSet,
}

impl WebhookError {
    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::MissingSignature => "MISSING_SIGNATURE",
            WebhookError::InvalidSignature => "INVALID_SIGNATURE",
            WebhookError::NotConfigured => "STRIPE_NOT_CONFIGURED",
            WebhookError::SecretNotSet => "WEBHOOK_SECRET_NOT_SET",
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Invalid request body")]
    InvalidBody(Option<FieldErrors>),

    #[error("Invalid query string")]
    InvalidQuery(Option<FieldErrors>),

    #[error("Bad request: {0}")]
    BadRequest(&'static str),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    Unavailable(&'static str),

    #[error("Comments are disabled")]
    CommentsDisabled,

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Post error: {0}")]
    Post(#[from] PostError),

    #[error("Webhook error: {0}")]
    Webhook(#[from] WebhookError),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl AppError {
    /// Single-field body validation failure.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let mut details = FieldErrors::new();
        details.insert(field.to_string(), vec![message.into()]);
        AppError::InvalidBody(Some(details))
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InvalidBody(_) => "INVALID_BODY",
            AppError::InvalidQuery(_) => "INVALID_QUERY",
            AppError::BadRequest(code) => code,
            AppError::AuthError(_) => "INVALID_CREDENTIALS",
            AppError::Unauthenticated | AppError::JwtError(_) => "UNAUTHENTICATED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unavailable(code) => code,
            AppError::CommentsDisabled => "COMMENTS_DISABLED",
            AppError::Checkout(e) => e.code(),
            AppError::Media(e) => e.code(),
            AppError::Post(e) => e.code(),
            AppError::Webhook(e) => e.code(),
            AppError::ExternalApiError(_) | AppError::ReqwestError(_) => "PAYMENT_PROVIDER_ERROR",
            AppError::StorageError(_) => "UPLOAD_FAILED",
            AppError::InternalError(_) | AppError::SerdeJsonError(_) => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidBody(_)
            | AppError::InvalidQuery(_)
            | AppError::BadRequest(_)
            | AppError::CommentsDisabled => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) | AppError::Unauthenticated | AppError::JwtError(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Checkout(e) => e.status(),
            AppError::Media(MediaError::FileTooLarge) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Media(_) => StatusCode::BAD_REQUEST,
            AppError::Post(PostError::SlugTaken) => StatusCode::CONFLICT,
            AppError::Post(_) => StatusCode::BAD_REQUEST,
            AppError::Webhook(WebhookError::NotConfigured | WebhookError::SecretNotSet) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Webhook(_) => StatusCode::BAD_REQUEST,
            AppError::ExternalApiError(_) | AppError::ReqwestError(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseError(_)
            | AppError::StorageError(_)
            | AppError::InternalError(_)
            | AppError::SerdeJsonError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            log::error!("{self}");
        } else {
            log::warn!("{self}");
        }

        let details = match self {
            AppError::InvalidBody(Some(details)) | AppError::InvalidQuery(Some(details)) => {
                Some(details)
            }
            _ => None,
        };

        let body = match details {
            Some(details) => json!({ "error": self.code(), "details": details }),
            None => json!({ "error": self.code() }),
        };

        HttpResponse::build(status_code).json(body)
    }
}
