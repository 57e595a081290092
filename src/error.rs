//! Errores de la API y su traducción a respuestas HTTP `{"error": ...}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{conversation::ChatError, preferences::PreferenceError, report::ReportError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Todavía no hay ningún análisis disponible.")]
    NoAnalysis,

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Preferences(#[from] PreferenceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NoAnalysis => StatusCode::NOT_FOUND,
            ApiError::Report(ReportError::MissingAnalysis) => StatusCode::PRECONDITION_FAILED,
            ApiError::Chat(ChatError::Busy) => StatusCode::CONFLICT,
            ApiError::Preferences(e) => {
                error!("Error guardando preferencias: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
