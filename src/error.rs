use crate::catalog::CatalogError;
use crate::chat::PromptError;
use crate::llm::CompletionError;
use crate::retrieval::SearchError;
use crate::tools::ToolError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    ValidationError(String),

    #[error("Context retrieval failed: {0}")]
    Retrieval(#[from] SearchError),

    #[error("Product catalog failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Tool endpoint failed: {0}")]
    ToolEndpoint(#[from] ToolError),

    #[error("Completion failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("Prompt rendering failed: {0}")]
    Prompt(#[from] PromptError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Prompt(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Retrieval(_)
            | AppError::Catalog(_)
            | AppError::ToolEndpoint(_)
            | AppError::Completion(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::ValidationError(msg) => {
                tracing::warn!(error = %msg, "Validation error");
                msg.clone()
            }
            AppError::Prompt(e) => {
                tracing::error!(error = %e, "Prompt rendering error");
                self.to_string()
            }
            other => {
                tracing::error!(error = %other, "Collaborator failure");
                other.to_string()
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
