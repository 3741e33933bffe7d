//! Basketry Core - Shared domain types.
//!
//! This crate provides the types exchanged between the storefront, Stripe
//! and the Sanity content store:
//! - catalog products and image references as stored in Sanity
//! - basket items and their grouping by product
//! - order metadata attached to Stripe checkout sessions
//! - prices, currency codes and minor-unit conversion
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Anything that talks to Stripe or Sanity lives in the storefront.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers and domain records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
