use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::mail::MailError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("No post with that id")]
    PostNotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("That email is already registered")]
    DuplicateEmail,

    #[error("A post with that title already exists")]
    DuplicateTitle,

    #[error("That email is not registered")]
    UnknownEmail,

    #[error("Wrong password")]
    BadPassword,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Mail transport failure: {0}")]
    Mail(#[from] MailError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Password hashing error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound | AppError::PostNotFound => {
                (StatusCode::NOT_FOUND, "Not found".to_string())
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            AppError::DuplicateEmail
            | AppError::DuplicateTitle
            | AppError::UnknownEmail
            | AppError::BadPassword => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Mail(e) => {
                tracing::error!("Mail transport failure: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "Could not deliver mail".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Bcrypt(e) => {
                tracing::error!("Bcrypt error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, message).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
