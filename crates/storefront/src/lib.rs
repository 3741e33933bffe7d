//! Basketry Storefront library.
//!
//! Checkout and order recording for a Sanity-backed shop paying through
//! Stripe. Exposed as a library so the router can be driven in-process by
//! the integration tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod sanity;
pub mod services;
pub mod state;
pub mod stripe;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
