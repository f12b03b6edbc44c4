use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{FormRejection, JsonRejection, PathRejection},
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::auth::jwt::TokenError;

/// Stable, machine-checkable error category returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    NotFound,
    Conflict,
    Unauthorized,
    InternalStorageError,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("name must not be empty")]
    InvalidName,

    #[error("file is too large, maximum is {limit} bytes")]
    FileTooLarge { limit: usize },

    #[error("unsupported image format, only jpg, jpeg and png are allowed")]
    UnsupportedFormat,

    #[error("item not found")]
    ItemNotFound,

    #[error("email already registered")]
    EmailTaken,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("missing or malformed Authorization header")]
    MissingToken,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("filesystem error")]
    Filesystem(#[from] std::io::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_)
            | AppError::InvalidName
            | AppError::FileTooLarge { .. }
            | AppError::UnsupportedFormat => ErrorKind::ValidationError,
            AppError::ItemNotFound => ErrorKind::NotFound,
            AppError::EmailTaken => ErrorKind::Conflict,
            AppError::InvalidCredentials | AppError::MissingToken | AppError::Token(_) => {
                ErrorKind::Unauthorized
            }
            AppError::Database(_) | AppError::Filesystem(_) => ErrorKind::InternalStorageError,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "invalid_input",
            AppError::InvalidName => "invalid_name",
            AppError::FileTooLarge { .. } => "file_too_large",
            AppError::UnsupportedFormat => "unsupported_format",
            AppError::ItemNotFound => "item_not_found",
            AppError::EmailTaken => "email_taken",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::MissingToken => "missing_token",
            AppError::Token(TokenError::Expired) => "expired_token",
            AppError::Token(_) => "invalid_token",
            AppError::Database(_) => "database",
            AppError::Filesystem(_) => "filesystem",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::InternalStorageError | ErrorKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

macro_rules! rejection_is_validation {
    ($($rejection:ty),+ $(,)?) => {
        $(
            impl From<$rejection> for AppError {
                fn from(rejection: $rejection) -> Self {
                    AppError::Validation(rejection.body_text())
                }
            }
        )+
    };
}

rejection_is_validation!(FormRejection, JsonRejection, PathRejection, MultipartRejection);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            match &self {
                AppError::Database(e) => error!(error = %e, "database failure"),
                AppError::Filesystem(e) => error!(error = %e, "filesystem failure"),
                AppError::Internal(e) => error!(error = format!("{:#}", e), "internal failure"),
                _ => {}
            }
        }

        let body = Json(json!({
            "error": {
                "kind": self.kind(),
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        let mut res = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            res.headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        res
    }
}
