//! Type definitions for the product catalog.

use serde::{Deserialize, Serialize};

/// A product as stored in the catalog file.
///
/// Only the fields the chat pipeline reads are kept. Catalog files usually
/// carry more (prices, image URLs); those are ignored on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub short_description: String,

    /// Long-form description. Stored as `description` in catalog files.
    #[serde(default, rename = "description", alias = "fullDescription")]
    pub full_description: String,
}

impl Product {
    /// Tags joined the way the product prompt expects them (`"audio,wireless"`).
    pub fn joined_tags(&self) -> String {
        self.tags.join(",")
    }

    /// Marker that replaces the product name in answers: `{{name|id}}`.
    pub fn marker(&self) -> String {
        format!("{{{{{}|{}}}}}", self.name, self.id)
    }
}
