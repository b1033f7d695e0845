//! Type definitions for context retrieval.

use crate::llm::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Number of documents requested per question.
pub const TOP_K: usize = 5;

/// Minimum similarity a document needs to be returned.
pub const SIMILARITY_THRESHOLD: f32 = 0.4;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: usize,
    pub similarity_threshold: f32,
}

impl SearchRequest {
    /// Fixed retrieval policy used for every chat question.
    pub fn for_question(question: impl Into<String>) -> Self {
        Self {
            query: question.into(),
            top_k: TOP_K,
            similarity_threshold: SIMILARITY_THRESHOLD,
        }
    }
}

/// A document returned by similarity search, best match first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub text: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl RetrievedDocument {
    pub fn new(text: impl Into<String>, metadata: Map<String, Value>) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    /// Convenience constructor for a document with only a `name` entry.
    pub fn named(name: &str, text: impl Into<String>) -> Self {
        let mut metadata = Map::new();
        metadata.insert("name".to_string(), Value::String(name.to_string()));
        Self::new(text, metadata)
    }

    /// The `name` metadata entry. Non-string values are rendered as JSON,
    /// a missing entry as an empty string.
    pub fn name(&self) -> String {
        match self.metadata.get("name") {
            Some(Value::String(name)) => name.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query embedding failed: {0}")]
    Embedding(#[from] ApiError),
    #[error("embedding service returned no vector")]
    EmptyEmbedding,
    #[error("embedding dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("failed to load vector store: {0}")]
    Load(String),
}
