//! Product catalog queries.

use std::sync::Arc;

use basketry_core::Product;
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::sanity::{ContentStore, SanityError};

/// Products referencing the category with slug `$categorySlug`, by name.
pub const PRODUCTS_BY_CATEGORY_QUERY: &str = r#"*[_type == "product" && references(*[_type == "category" && slug.current == $categorySlug]._id)] | order(name asc)"#;

/// Read-only access to catalog documents.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn ContentStore>,
}

impl CatalogService {
    #[must_use]
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Products in a category, sorted by name.
    ///
    /// Never fails: transport, API and decoding errors are logged and an
    /// empty list is returned.
    #[instrument(skip(self))]
    pub async fn products_by_category(&self, category: &str) -> Vec<Product> {
        match self.fetch_products_by_category(category).await {
            Ok(products) => {
                debug!(count = products.len(), "Fetched products by category");
                products
            }
            Err(e) => {
                error!(error = %e, "Error fetching products by category");
                Vec::new()
            }
        }
    }

    async fn fetch_products_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<Product>, SanityError> {
        let result = self
            .store
            .fetch(
                PRODUCTS_BY_CATEGORY_QUERY,
                &[("categorySlug", Value::String(category.to_string()))],
            )
            .await?;

        if result.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(result).map_err(|e| SanityError::Parse(e.to_string()))
    }
}
