//! System prompt assembly.
//!
//! Two templates are compiled once at startup: one for general questions
//! (`context`) and one for questions about a specific product (`name`, `tags`,
//! `shortDescription`, `fullDescription`, `additionalContext`). Undefined
//! variables are errors, so a template that references a field the assembler
//! never supplies is caught by the startup check instead of rendering blank.

use crate::catalog::Product;
use crate::chat::types::ChatMessage;
use crate::retrieval::RetrievedDocument;
use minijinja::{context, Environment, UndefinedBehavior};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const WITHOUT_PRODUCT: &str = "chat_without_product_id";
pub const WITH_PRODUCT: &str = "chat_with_product_id";

const BUILTIN_WITHOUT_PRODUCT: &str = include_str!("../../prompts/chat_without_product_id.txt");
const BUILTIN_WITH_PRODUCT: &str = include_str!("../../prompts/chat_with_product_id.txt");

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("failed to read prompt template '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid prompt template '{name}': {source}")]
    Template {
        name: &'static str,
        #[source]
        source: minijinja::Error,
    },
    #[error("failed to render prompt '{name}': {source}")]
    Render {
        name: &'static str,
        #[source]
        source: minijinja::Error,
    },
}

pub struct PromptTemplates {
    env: Environment<'static>,
}

impl std::fmt::Debug for PromptTemplates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptTemplates").finish_non_exhaustive()
    }
}

impl PromptTemplates {
    /// The templates shipped with the binary.
    pub fn builtin() -> Result<Self, PromptError> {
        Self::from_sources(
            BUILTIN_WITHOUT_PRODUCT.to_string(),
            BUILTIN_WITH_PRODUCT.to_string(),
        )
    }

    /// Load templates, falling back to the built-in one for each path not given.
    pub fn load(
        without_product: Option<&Path>,
        with_product: Option<&Path>,
    ) -> Result<Self, PromptError> {
        let without = match without_product {
            Some(path) => read_template(path)?,
            None => BUILTIN_WITHOUT_PRODUCT.to_string(),
        };
        let with = match with_product {
            Some(path) => read_template(path)?,
            None => BUILTIN_WITH_PRODUCT.to_string(),
        };

        Self::from_sources(without, with)
    }

    /// Compile both templates and render each once with sample values.
    pub fn from_sources(without_product: String, with_product: String) -> Result<Self, PromptError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);

        env.add_template_owned(WITHOUT_PRODUCT, without_product)
            .map_err(|source| PromptError::Template {
                name: WITHOUT_PRODUCT,
                source,
            })?;
        env.add_template_owned(WITH_PRODUCT, with_product)
            .map_err(|source| PromptError::Template {
                name: WITH_PRODUCT,
                source,
            })?;

        let templates = Self { env };
        templates.check()?;
        Ok(templates)
    }

    fn check(&self) -> Result<(), PromptError> {
        let sample = Product {
            id: "sample".to_string(),
            name: "Sample".to_string(),
            tags: vec!["sample".to_string()],
            short_description: "Sample".to_string(),
            full_description: "Sample".to_string(),
        };

        self.render_without_product(&[])
            .and_then(|_| self.render_with_product(&sample, &[]))
            .map(|_| ())
            .map_err(|err| match err {
                PromptError::Render { name, source } => PromptError::Template { name, source },
                other => other,
            })
    }

    /// System message for a general question.
    pub fn render_without_product(
        &self,
        documents: &[RetrievedDocument],
    ) -> Result<ChatMessage, PromptError> {
        let ctx = context! {
            context => document_block(documents),
        };
        self.render(WITHOUT_PRODUCT, ctx)
    }

    /// System message for a question about `product`.
    pub fn render_with_product(
        &self,
        product: &Product,
        documents: &[RetrievedDocument],
    ) -> Result<ChatMessage, PromptError> {
        let ctx = context! {
            name => product.name.as_str(),
            tags => product.joined_tags(),
            shortDescription => product.short_description.as_str(),
            fullDescription => product.full_description.as_str(),
            additionalContext => document_block(documents),
        };
        self.render(WITH_PRODUCT, ctx)
    }

    fn render(&self, name: &'static str, ctx: minijinja::Value) -> Result<ChatMessage, PromptError> {
        let rendered = self
            .env
            .get_template(name)
            .and_then(|tmpl| tmpl.render(ctx))
            .map_err(|source| PromptError::Render { name, source })?;

        Ok(ChatMessage::system(rendered))
    }
}

fn read_template(path: &Path) -> Result<String, PromptError> {
    let source = std::fs::read_to_string(path).map_err(|source| PromptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "Loaded prompt template");
    Ok(source)
}

/// Retrieved documents as prompt text, in retrieval order.
///
/// Each document becomes `"Product Name: {name}\nText: {text}\n"`; blocks are
/// joined with `"\n"`, leaving a blank line between them.
pub fn document_block(documents: &[RetrievedDocument]) -> String {
    documents
        .iter()
        .map(|doc| format!("Product Name: {}\nText: {}\n", doc.name(), doc.text))
        .collect::<Vec<_>>()
        .join("\n")
}
