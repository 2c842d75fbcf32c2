//! Request-level failures of the graph pipeline

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::metrics::RequestOutcome;

/// Each variant names the stage that failed, so a caller can tell
/// "the model gave bad output" apart from "the graph could not be drawn".
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The document could not be read or the page range selects nothing
    #[error("Document error: {0}")]
    Document(#[source] anyhow::Error),

    /// The language model call failed after retries
    #[error("Language model error: {0}")]
    Model(#[source] anyhow::Error),

    /// The graph was built but could not be rendered
    #[error("Render error: {0}")]
    Render(#[source] anyhow::Error),

    /// Malformed request (missing upload, bad form field)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Document(_) => "document",
            Self::Model(_) => "model",
            Self::Render(_) => "render",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Document(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Model(_) => StatusCode::BAD_GATEWAY,
            Self::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Short message for people, without the cause chain
    pub fn message(&self) -> &'static str {
        match self {
            Self::Document(_) => "Failed to read the document.",
            Self::Model(_) => "Failed to get a response from the language model.",
            Self::Render(_) => "Failed to parse and visualize the graph.",
            Self::InvalidRequest(_) => "The request was invalid.",
        }
    }

    /// Full cause chain for diagnostics
    pub fn detail(&self) -> String {
        match self {
            Self::Document(e) | Self::Model(e) | Self::Render(e) => format!("{:#}", e),
            Self::InvalidRequest(msg) => msg.clone(),
        }
    }

    pub(crate) fn outcome(&self) -> Option<RequestOutcome> {
        match self {
            Self::Document(_) => Some(RequestOutcome::DocumentError),
            Self::Model(_) => Some(RequestOutcome::ModelError),
            Self::Render(_) => Some(RequestOutcome::RenderError),
            Self::InvalidRequest(_) => None,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let body = json!({
            "status": "error",
            "error": self.kind(),
            "message": self.message(),
            "detail": self.detail(),
        });
        (self.status(), Json(body)).into_response()
    }
}
