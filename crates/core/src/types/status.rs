//! Status values recorded on order documents.

use serde::Serialize;

/// Status of an order document in the content store.
///
/// The webhook recorder only ever writes [`OrderStatus::Paid`]; later
/// states belong to whoever manages orders in the studio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Paid,
}
