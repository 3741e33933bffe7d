//! Order metadata carried on a Stripe checkout session.
//!
//! Stripe stores metadata as a flat string map. The storefront writes it
//! with [`OrderMetadata::to_pairs`] when the session is created and reads it
//! back with [`OrderMetadata::from_map`] when the completed session arrives
//! on the webhook.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::email::{Email, EmailError};

/// Metadata key for the storefront order number.
pub const ORDER_NUMBER_KEY: &str = "orderNumber";
/// Metadata key for the buyer's display name.
pub const CUSTOMER_NAME_KEY: &str = "customerName";
/// Metadata key for the buyer's email.
pub const CUSTOMER_EMAIL_KEY: &str = "customerEmail";
/// Metadata key for the signed-in user id.
pub const USER_ID_KEY: &str = "userId";

/// Errors reading order metadata back from a session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// A required key is absent.
    #[error("order metadata is missing `{0}`")]
    MissingField(&'static str),
    /// The order number is blank.
    #[error("order number cannot be empty")]
    EmptyOrderNumber,
    /// The order number has leading or trailing whitespace.
    #[error("order number cannot start or end with whitespace")]
    UntrimmedOrderNumber,
    /// The customer email does not parse.
    #[error("invalid customer email: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// Identifiers attached to a checkout session and copied onto the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMetadata {
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: Email,
    /// Id of the signed-in user; empty for guest checkouts.
    #[serde(default)]
    pub user_id: String,
}

impl OrderMetadata {
    /// Flatten into the key/value pairs sent as `metadata[...]`.
    ///
    /// Empty values are left out: Stripe drops metadata keys posted with an
    /// empty value, so they would not come back anyway.
    pub fn to_pairs(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            (ORDER_NUMBER_KEY, self.order_number.as_str()),
            (CUSTOMER_NAME_KEY, self.customer_name.as_str()),
            (CUSTOMER_EMAIL_KEY, self.customer_email.as_str()),
            (USER_ID_KEY, self.user_id.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
    }

    /// Check the order number before it is attached to a session.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::EmptyOrderNumber`] for a blank value and
    /// [`MetadataError::UntrimmedOrderNumber`] for surrounding whitespace.
    pub fn validate(&self) -> Result<(), MetadataError> {
        check_order_number(&self.order_number)
    }

    /// Parse metadata read back from a completed session.
    ///
    /// The order number and email are required and kept as received. Name
    /// and user id default to empty when absent (guest checkouts).
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] describing the first invalid field.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, MetadataError> {
        let required = |key: &'static str| {
            map.get(key)
                .map(String::as_str)
                .ok_or(MetadataError::MissingField(key))
        };
        let optional = |key: &str| map.get(key).cloned().unwrap_or_default();

        let order_number = required(ORDER_NUMBER_KEY)?;
        if order_number.trim().is_empty() {
            return Err(MetadataError::EmptyOrderNumber);
        }

        Ok(Self {
            order_number: order_number.to_string(),
            customer_name: optional(CUSTOMER_NAME_KEY),
            customer_email: Email::parse(required(CUSTOMER_EMAIL_KEY)?)?,
            user_id: optional(USER_ID_KEY),
        })
    }
}

fn check_order_number(order_number: &str) -> Result<(), MetadataError> {
    let trimmed = order_number.trim();
    if trimmed.is_empty() {
        Err(MetadataError::EmptyOrderNumber)
    } else if trimmed.len() != order_number.len() {
        Err(MetadataError::UntrimmedOrderNumber)
    } else {
        Ok(())
    }
}
