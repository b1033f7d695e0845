//! Product catalog: the structured product data merged into product-aware
//! prompts and used to annotate answers.

pub mod repository;
pub mod types;

pub use repository::{CatalogError, JsonProductRepository, ProductRepository};
pub use types::Product;
