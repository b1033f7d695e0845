//! In-memory similarity search over pre-computed document embeddings.
//!
//! Documents are embedded offline and shipped as a JSON file. At startup the
//! vectors are L2-normalized into one matrix, so scoring a query is a single
//! matrix-vector product: cosine similarity = dot product of unit vectors.

use crate::retrieval::embedding::EmbeddingClient;
use crate::retrieval::types::{RetrievedDocument, SearchError, SearchRequest};
use async_trait::async_trait;
use ndarray::{Array1, Array2, Axis};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Documents scoring at least `similarity_threshold`, best first, at most
    /// `top_k` of them.
    async fn similarity_search(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<RetrievedDocument>, SearchError>;
}

/// One document record in the store file.
#[derive(Debug, Deserialize)]
struct StoredDocument {
    #[serde(alias = "content")]
    text: String,
    #[serde(default)]
    metadata: Map<String, Value>,
    embedding: Vec<f32>,
}

/// Accepted store layouts: an object keyed by document id, or an array.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoreFile {
    Keyed(BTreeMap<String, StoredDocument>),
    List(Vec<StoredDocument>),
}

pub struct SimpleVectorStore {
    documents: Vec<RetrievedDocument>,
    /// One L2-normalized row per document.
    embeddings: Array2<f32>,
    embedder: Arc<dyn EmbeddingClient>,
}

impl SimpleVectorStore {
    /// Load a store file written by the offline embedding job.
    pub fn load(path: &Path, embedder: Arc<dyn EmbeddingClient>) -> Result<Self, SearchError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SearchError::Load(format!("failed to read '{}': {}", path.display(), e))
        })?;

        let file: StoreFile = serde_json::from_str(&raw).map_err(|e| {
            SearchError::Load(format!("'{}' is not a valid store file: {}", path.display(), e))
        })?;

        let records: Vec<StoredDocument> = match file {
            StoreFile::Keyed(map) => map.into_values().collect(),
            StoreFile::List(list) => list,
        };

        let store = Self::from_records(records, embedder)?;

        tracing::info!(
            path = %path.display(),
            documents = store.len(),
            embedding_dim = store.dimension(),
            "Vector store loaded"
        );

        Ok(store)
    }

    /// Build a store from already-embedded documents.
    pub fn from_documents(
        documents: Vec<(RetrievedDocument, Vec<f32>)>,
        embedder: Arc<dyn EmbeddingClient>,
    ) -> Result<Self, SearchError> {
        let records = documents
            .into_iter()
            .map(|(doc, embedding)| StoredDocument {
                text: doc.text,
                metadata: doc.metadata,
                embedding,
            })
            .collect();
        Self::from_records(records, embedder)
    }

    fn from_records(
        records: Vec<StoredDocument>,
        embedder: Arc<dyn EmbeddingClient>,
    ) -> Result<Self, SearchError> {
        let dim = records.first().map(|r| r.embedding.len()).unwrap_or(0);

        let mut flat = Vec::with_capacity(records.len() * dim);
        let mut documents = Vec::with_capacity(records.len());

        for record in records {
            if record.embedding.len() != dim {
                return Err(SearchError::DimensionMismatch {
                    expected: dim,
                    actual: record.embedding.len(),
                });
            }
            flat.extend(record.embedding);
            documents.push(RetrievedDocument::new(record.text, record.metadata));
        }

        let mut embeddings = Array2::from_shape_vec((documents.len(), dim), flat)
            .map_err(|e| SearchError::Load(format!("invalid embedding matrix: {}", e)))?;

        for mut row in embeddings.axis_iter_mut(Axis(0)) {
            let norm = row.dot(&row).sqrt();
            if norm > 0.0 {
                row /= norm;
            }
        }

        Ok(Self {
            documents,
            embeddings,
            embedder,
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.embeddings.ncols()
    }

    /// Score every document against a query embedding and apply the request
    /// policy. Returns `(index, score)` pairs, best first.
    fn rank(
        &self,
        query: Vec<f32>,
        request: &SearchRequest,
    ) -> Result<Vec<(usize, f32)>, SearchError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        if query.len() != self.dimension() {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimension(),
                actual: query.len(),
            });
        }

        let mut query = Array1::from(query);
        let norm = query.dot(&query).sqrt();
        if norm > 0.0 {
            query /= norm;
        }

        let scores = self.embeddings.dot(&query);

        let mut ranked: Vec<(usize, f32)> = scores
            .into_iter()
            .enumerate()
            .filter(|&(_, score)| score >= request.similarity_threshold)
            .collect();

        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(request.top_k);

        Ok(ranked)
    }
}

#[async_trait]
impl VectorStore for SimpleVectorStore {
    async fn similarity_search(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<RetrievedDocument>, SearchError> {
        let start_time = std::time::Instant::now();

        let query_embedding = self.embedder.embed(&request.query).await?;
        let ranked = self.rank(query_embedding, request)?;

        tracing::debug!(
            candidates = self.len(),
            returned = ranked.len(),
            top_score = ranked.first().map(|(_, s)| *s),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Similarity search completed"
        );

        Ok(ranked
            .into_iter()
            .filter_map(|(idx, _)| self.documents.get(idx).cloned())
            .collect())
    }
}
