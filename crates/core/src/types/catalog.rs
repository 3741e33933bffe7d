//! Catalog documents as stored in the Sanity content store.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// A `product` document.
///
/// Only the fields the storefront reads are modelled; unknown fields are
/// ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Sanity document id.
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: Option<String>,
    pub slug: Option<Slug>,
    pub image: Option<ImageRef>,
    /// Portable text blocks, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<serde_json::Value>,
    /// Price in major currency units.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
}

impl Product {
    /// Display name, falling back to a placeholder for unnamed products.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(Self::UNNAMED)
    }

    /// Placeholder used when a product has no name.
    pub const UNNAMED: &'static str = "Unnamed Product";
}

/// A Sanity `slug` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slug {
    pub current: String,
}

/// A Sanity `image` field referencing an uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub asset: Option<ImageAsset>,
}

/// Reference to an image asset document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    /// Asset document id, e.g. `image-Tb9Ew8CXIwaY6R1kjMvI0uRR-2000x3000-jpg`.
    #[serde(rename = "_ref")]
    pub reference: String,
}

impl ImageRef {
    /// Resolve the asset reference to its CDN URL.
    ///
    /// Returns `None` when the image has no asset or the reference is not
    /// in the `image-<hash>-<width>x<height>-<format>` form.
    ///
    /// ```
    /// use basketry_core::{ImageAsset, ImageRef};
    ///
    /// let image = ImageRef {
    ///     asset: Some(ImageAsset { reference: "image-abc123-800x600-png".into() }),
    /// };
    /// assert_eq!(
    ///     image.cdn_url("proj", "production").as_deref(),
    ///     Some("https://cdn.sanity.io/images/proj/production/abc123-800x600.png"),
    /// );
    /// ```
    #[must_use]
    pub fn cdn_url(&self, project_id: &str, dataset: &str) -> Option<String> {
        let reference = &self.asset.as_ref()?.reference;
        let (id, format) = reference.strip_prefix("image-")?.rsplit_once('-')?;
        let (_, dimensions) = id.rsplit_once('-')?;
        let (width, height) = dimensions.split_once('x')?;
        if format.is_empty() || !is_dimension(width) || !is_dimension(height) {
            return None;
        }

        Some(format!(
            "https://cdn.sanity.io/images/{project_id}/{dataset}/{id}.{format}"
        ))
    }
}

fn is_dimension(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
