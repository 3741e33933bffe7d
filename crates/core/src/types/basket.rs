//! Basket items and the checks they must pass before checkout.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::catalog::Product;
use super::id::ProductId;

/// Reasons a basket cannot be sent to checkout.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BasketError {
    /// The basket has no items.
    #[error("basket is empty")]
    Empty,
    /// A product has no price, or a price that is not positive.
    #[error("Some items do not have a price: {0}")]
    MissingPrice(ProductId),
    /// A line asks for zero units.
    #[error("quantity must be at least 1 for product {0}")]
    ZeroQuantity(ProductId),
}

/// One entry added to the basket on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketItem {
    pub product: Product,
    pub quantity: u32,
}

/// Basket entries coalesced by product id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedBasketItem {
    pub product: Product,
    pub quantity: u32,
}

impl GroupedBasketItem {
    /// The product price if it is defined and positive.
    #[must_use]
    pub fn checkout_price(&self) -> Option<Decimal> {
        self.product.price.filter(|price| *price > Decimal::ZERO)
    }
}

/// Coalesce basket items with the same product id, summing quantities.
///
/// Groups keep the order in which each product was first added.
#[must_use]
pub fn group_basket_items<I>(items: I) -> Vec<GroupedBasketItem>
where
    I: IntoIterator<Item = BasketItem>,
{
    let mut grouped: Vec<GroupedBasketItem> = Vec::new();
    for item in items {
        if let Some(existing) = grouped
            .iter_mut()
            .find(|group| group.product.id == item.product.id)
        {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            grouped.push(GroupedBasketItem {
                product: item.product,
                quantity: item.quantity,
            });
        }
    }
    grouped
}

/// Check that a grouped basket can be priced.
///
/// # Errors
///
/// Returns the first problem found: an empty basket, a product without a
/// positive price, or a zero quantity.
pub fn validate_basket(items: &[GroupedBasketItem]) -> Result<(), BasketError> {
    if items.is_empty() {
        return Err(BasketError::Empty);
    }

    if let Some(item) = items.iter().find(|item| item.checkout_price().is_none()) {
        return Err(BasketError::MissingPrice(item.product.id.clone()));
    }

    if let Some(item) = items.iter().find(|item| item.quantity == 0) {
        return Err(BasketError::ZeroQuantity(item.product.id.clone()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, price: Option<Decimal>) -> Product {
        Product {
            id: ProductId::new(id),
            name: Some(format!("Product {id}")),
            slug: None,
            image: None,
            description: None,
            price,
            stock: None,
        }
    }

    fn grouped(id: &str, price: Option<Decimal>, quantity: u32) -> GroupedBasketItem {
        GroupedBasketItem {
            product: product(id, price),
            quantity,
        }
    }

    #[test]
    fn test_group_sums_quantities_in_first_seen_order() {
        let items = vec![
            BasketItem {
                product: product("b", Some(Decimal::ONE)),
                quantity: 1,
            },
            BasketItem {
                product: product("a", Some(Decimal::ONE)),
                quantity: 2,
            },
            BasketItem {
                product: product("b", Some(Decimal::ONE)),
                quantity: 3,
            },
        ];

        let grouped = group_basket_items(items);
        let summary: Vec<(&str, u32)> = grouped
            .iter()
            .map(|g| (g.product.id.as_str(), g.quantity))
            .collect();
        assert_eq!(summary, vec![("b", 4), ("a", 2)]);
    }

    #[test]
    fn test_validate_accepts_priced_basket() {
        let items = vec![
            grouped("a", Some(Decimal::new(999, 2)), 1),
            grouped("b", Some(Decimal::new(1, 2)), 5),
        ];
        assert_eq!(validate_basket(&items), Ok(()));
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert_eq!(validate_basket(&[]), Err(BasketError::Empty));
    }

    #[test]
    fn test_validate_rejects_missing_or_zero_price() {
        let missing = vec![grouped("a", Some(Decimal::ONE), 1), grouped("b", None, 1)];
        assert_eq!(
            validate_basket(&missing),
            Err(BasketError::MissingPrice(ProductId::new("b")))
        );

        let zero = vec![grouped("z", Some(Decimal::ZERO), 1)];
        assert_eq!(
            validate_basket(&zero),
            Err(BasketError::MissingPrice(ProductId::new("z")))
        );

        let negative = vec![grouped("n", Some(Decimal::NEGATIVE_ONE), 1)];
        assert!(matches!(
            validate_basket(&negative),
            Err(BasketError::MissingPrice(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_quantity() {
        let items = vec![grouped("a", Some(Decimal::ONE), 0)];
        assert_eq!(
            validate_basket(&items),
            Err(BasketError::ZeroQuantity(ProductId::new("a")))
        );
    }
}
