//! Context retrieval: turns the user's question into the documents that ground
//! the system prompt.

pub mod embedding;
pub mod store;
pub mod types;

pub use embedding::{EmbeddingClient, OpenAiEmbeddingClient};
pub use store::{SimpleVectorStore, VectorStore};
pub use types::{RetrievedDocument, SearchError, SearchRequest, SIMILARITY_THRESHOLD, TOP_K};
