// src/errors.rs
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;
use uuid::Uuid;

use crate::models::ViewState;

#[derive(Error, Debug)]
pub enum FitGeniusError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Image ingestion error: {0}")]
    Ingestion(String),

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("Outfit generation failed: {0}")]
    Generation(String),

    #[error("Image synthesis failed: {0}")]
    Synthesis(String),

    #[error("Inference service error: {0}")]
    Upstream(String),

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: ViewState, to: ViewState },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl FitGeniusError {
    fn label(&self) -> &'static str {
        match self {
            FitGeniusError::Configuration(_) => "Configuration error",
            FitGeniusError::Ingestion(_) => "Image processing error",
            FitGeniusError::Analysis(_) => {
                "Could not analyze image. Please ensure your API key is valid and the image is clear."
            }
            FitGeniusError::Generation(_) => "Failed to generate outfit. Please check API key.",
            FitGeniusError::Synthesis(_) => "Preview rendering failed",
            FitGeniusError::Upstream(_) => "AI service error",
            FitGeniusError::SessionNotFound(_) => "Session not found",
            FitGeniusError::InvalidTransition { .. } => "Invalid navigation",
            FitGeniusError::Validation(_) => "Validation error",
        }
    }
}

impl ResponseError for FitGeniusError {
    fn status_code(&self) -> StatusCode {
        match self {
            FitGeniusError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FitGeniusError::Ingestion(_) | FitGeniusError::Validation(_) => StatusCode::BAD_REQUEST,
            FitGeniusError::Analysis(_)
            | FitGeniusError::Generation(_)
            | FitGeniusError::Synthesis(_) => StatusCode::BAD_GATEWAY,
            FitGeniusError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
            FitGeniusError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            FitGeniusError::InvalidTransition { .. } => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.label(),
            "message": self.to_string()
        }))
    }
}
