use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use transfer::TransferError;

pub type Result<T> = std::result::Result<T, BackendError>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Invalid input: {0}")]
    BadRequest(String),

    #[error("Image or result not found")]
    NotFound,

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("Multipart error")]
    Multipart(#[from] MultipartError),

    #[error("Tokio IO error")]
    TokioIo(#[from] tokio::io::Error),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let status = match &self {
            BackendError::BadRequest(_) | BackendError::Multipart(_) => StatusCode::BAD_REQUEST,
            BackendError::NotFound => StatusCode::NOT_FOUND,
            BackendError::Transfer(
                TransferError::Codec(_)
                | TransferError::InvalidParameter { .. }
                | TransferError::ShapeMismatch { .. },
            ) => StatusCode::BAD_REQUEST,
            BackendError::Transfer(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BackendError::TokioIo(_) | BackendError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}
