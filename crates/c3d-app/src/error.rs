use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{error, warn};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Error from backend: {0}")]
    BackendError(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Core(#[from] c3d_core::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        use c3d_core::Error as Core;

        match self {
            Self::Core(e) if !e.is_rejection() => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Core(Core::IndexOutOfRange(_) | Core::UnknownObject(_)) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Core(Core::Busy { .. } | Core::BatchActive) => StatusCode::CONFLICT,
            Self::Core(Core::NotConvertible { .. } | Core::BlankInput(_) | Core::EmptyGallery) => StatusCode::BAD_REQUEST,
            Self::BackendError(_) | Self::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
