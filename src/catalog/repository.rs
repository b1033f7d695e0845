//! Product lookup.
//!
//! The orchestrator only sees the [`ProductRepository`] trait. The bundled
//! implementation keeps the whole catalog in memory, loaded once at startup
//! from a JSON file.

use crate::catalog::types::Product;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog '{path}' is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Look up a single product. `Ok(None)` means the id is unknown.
    async fn find_by_id(&self, id: &str) -> Result<Option<Product>, CatalogError>;

    /// Every product, in catalog order.
    async fn list(&self) -> Result<Vec<Product>, CatalogError>;
}

/// Accepted catalog layouts: a bare array or `{"data": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    List(Vec<Product>),
    Wrapped { data: Vec<Product> },
}

/// In-memory catalog backed by a JSON file.
pub struct JsonProductRepository {
    products: Vec<Product>,
    by_id: HashMap<String, usize>,
}

impl JsonProductRepository {
    /// Load the catalog from `path`.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let file: CatalogFile =
            serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let products = match file {
            CatalogFile::List(products) | CatalogFile::Wrapped { data: products } => products,
        };

        tracing::info!(
            path = %path.display(),
            products = products.len(),
            "Product catalog loaded"
        );

        Ok(Self::from_products(products))
    }

    pub fn from_products(products: Vec<Product>) -> Self {
        let mut by_id = HashMap::with_capacity(products.len());
        for (idx, product) in products.iter().enumerate() {
            if by_id.insert(product.id.clone(), idx).is_some() {
                tracing::warn!(id = %product.id, "Duplicate product id, later entry wins lookups");
            }
        }

        Self { products, by_id }
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[async_trait]
impl ProductRepository for JsonProductRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Product>, CatalogError> {
        Ok(self
            .by_id
            .get(id)
            .and_then(|&idx| self.products.get(idx))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.clone())
    }
}
