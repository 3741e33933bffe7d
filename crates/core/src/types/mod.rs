//! Core types for Basketry.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod basket;
pub mod catalog;
pub mod email;
pub mod id;
pub mod metadata;
pub mod price;
pub mod status;

pub use basket::{
    BasketError, BasketItem, GroupedBasketItem, group_basket_items, validate_basket,
};
pub use catalog::{ImageAsset, ImageRef, Product, Slug};
pub use email::{Email, EmailError};
pub use id::*;
pub use metadata::{MetadataError, OrderMetadata};
pub use price::{CurrencyCode, PriceError, major_to_minor, minor_to_major};
pub use status::OrderStatus;
