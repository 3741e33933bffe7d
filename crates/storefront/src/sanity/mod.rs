//! Sanity content store client.
//!
//! # Architecture
//!
//! - GROQ queries over the HTTP query endpoint, parameters sent as
//!   JSON-encoded `$name` query pairs
//! - Order documents written through the mutate endpoint with a single
//!   `create` mutation
//! - [`ContentStore`] is the seam the catalog and order services use; the
//!   services own their queries and document shapes
//!
//! # Example
//!
//! ```rust,ignore
//! use basketry_storefront::sanity::{ContentStore, SanityClient};
//!
//! let sanity = SanityClient::new(&config.sanity)?;
//! let result = sanity.fetch("*[_type == $type]", &[("type", json!("product"))]).await?;
//! ```

mod client;
pub mod types;

pub use client::SanityClient;
pub use types::*;

use async_trait::async_trait;
use basketry_core::DocumentId;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when interacting with Sanity.
#[derive(Debug, Error)]
pub enum SanityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Sanity returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response could not be decoded, or a request could not be built.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A mutation succeeded but reported no affected document.
    #[error("Mutation returned no document id")]
    EmptyMutationResult,
}

/// Operations the storefront needs from the content store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Run a GROQ query and return its `result`.
    async fn fetch(&self, query: &str, params: &[(&str, Value)]) -> Result<Value, SanityError>;

    /// Create a document and return its id.
    async fn create(&self, document: Value) -> Result<DocumentId, SanityError>;
}
