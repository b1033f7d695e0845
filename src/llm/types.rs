//! Completion request/response types.

use crate::llm::http::ApiError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One candidate answer returned by the completion service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub text: Option<String>,
}

impl Generation {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub generations: Vec<Generation>,
}

impl CompletionResponse {
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            generations: texts.into_iter().map(Generation::text).collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("completion response is missing {0}")]
    InvalidResponse(String),
    #[error("model kept requesting tools after {0} rounds")]
    TooManyToolIterations(usize),
}
