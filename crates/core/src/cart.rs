//! Session-local shopping cart.
//!
//! A [`Cart`] is an ordered list of [`CartLine`]s. Every line has an implicit
//! quantity of one: adding the same product and size twice yields two lines.
//! Prices are copied from the selected variant when a line is added and are
//! not updated if the catalog changes afterwards.

use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::{FulfillmentVariantId, Price, ProductId};

/// Errors from cart mutations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// No size was selected for the product.
    #[error("Please select a size")]
    MissingSize,
    /// The selected size is not sold for this product.
    #[error("Size '{size}' is not available for {product}")]
    UnknownSize {
        /// Product display name.
        product: String,
        /// Requested size label.
        size: String,
    },
}

/// A single product+size entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub size: String,
    pub name: String,
    /// Unit price snapshotted from the variant at add time.
    pub price: Price,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfillment_id: Option<FulfillmentVariantId>,
}

impl CartLine {
    /// Label shown to shoppers and on the payment page, e.g. `Insanity Tee (M)`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.size)
    }
}

/// Ordered cart contents for one shopper session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Append a line for `product` in the selected size and return a copy of it.
    ///
    /// The line's price is the selected variant's price, never the product's
    /// base price.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::MissingSize`] if `size` is absent or blank and
    /// [`CartError::UnknownSize`] if the product has no such variant. The
    /// cart is unchanged on error.
    pub fn add_line(&mut self, product: &Product, size: Option<&str>) -> Result<CartLine, CartError> {
        let size = size
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(CartError::MissingSize)?;

        let variant = product
            .variant(size)
            .ok_or_else(|| CartError::UnknownSize {
                product: product.name().to_owned(),
                size: size.to_owned(),
            })?;

        let line = CartLine {
            product_id: product.id(),
            size: variant.size.clone(),
            name: product.name().to_owned(),
            price: variant.price,
            image: product.image().to_owned(),
            fulfillment_id: variant.fulfillment_id.clone(),
        };
        self.lines.push(line.clone());
        Ok(line)
    }

    /// Remove the line at `position`.
    ///
    /// Out-of-range positions are ignored and return `None`.
    pub fn remove_line(&mut self, position: usize) -> Option<CartLine> {
        (position < self.lines.len()).then(|| self.lines.remove(position))
    }

    /// Sum of unit prices of all lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(|line| line.price).sum()
    }

    /// Number of lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines in the order they were added.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Drop every line, e.g. once payment is confirmed.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::str::FromStr;

    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use super::*;
    use crate::catalog::{Catalog, Variant};

    fn product(id: i64, name: &str, sizes: &[(&str, &str)]) -> Product {
        Product::new(
            ProductId::new(id),
            name,
            Price::from_cents(100),
            format!("https://img.test/{id}.png"),
            sizes
                .iter()
                .map(|(size, price)| {
                    Variant::new(
                        *size,
                        *size,
                        Price::new(Decimal::from_str(price).unwrap()).unwrap(),
                        Some(FulfillmentVariantId::new(format!("{id}-{size}"))),
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_tee_and_hoodie_total() {
        let tee = product(1, "Tee", &[("M", "39.99")]);
        let hoodie = product(2, "Hoodie", &[("L", "89.99")]);
        let mut cart = Cart::new();
        cart.add_line(&tee, Some("M")).unwrap();
        cart.add_line(&hoodie, Some("L")).unwrap();

        assert_eq!(cart.total(), Price::new(Decimal::from_str("129.98").unwrap()).unwrap());
        assert_eq!(cart.line_count(), 2);
        assert_eq!(cart.lines()[0].label(), "Tee (M)");
    }

    #[test]
    fn test_add_without_size_leaves_cart_unchanged() {
        let tee = product(1, "Tee", &[("M", "39.99")]);
        let mut cart = Cart::new();
        cart.add_line(&tee, Some("M")).unwrap();
        let before = cart.clone();

        assert_eq!(cart.add_line(&tee, None).unwrap_err(), CartError::MissingSize);
        assert_eq!(cart.add_line(&tee, Some("  ")).unwrap_err(), CartError::MissingSize);
        assert_eq!(cart, before);
    }

    #[test]
    fn test_add_unknown_size() {
        let tee = product(1, "Tee", &[("M", "39.99")]);
        let mut cart = Cart::new();
        let err = cart.add_line(&tee, Some("XXL")).unwrap_err();
        assert!(matches!(err, CartError::UnknownSize { ref size, .. } if size == "XXL"));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_variant_price_wins_over_base_price() {
        let shirt = product(1, "Shirt", &[("S", "10.00"), ("XL", "12.50")]);
        let mut cart = Cart::new();
        let line = cart.add_line(&shirt, Some("XL")).unwrap();
        assert_eq!(line.price, Price::from_cents(1250));
        assert_eq!(line.fulfillment_id, Some(FulfillmentVariantId::new("1-XL")));
    }

    #[test]
    fn test_same_product_twice_appends_lines() {
        let tee = product(1, "Tee", &[("M", "39.99")]);
        let mut cart = Cart::new();
        cart.add_line(&tee, Some("M")).unwrap();
        cart.add_line(&tee, Some("M")).unwrap();
        assert_eq!(cart.line_count(), 2);
    }

    #[test]
    fn test_remove_out_of_range_is_noop() {
        let tee = product(1, "Tee", &[("M", "39.99")]);
        let mut cart = Cart::new();
        cart.add_line(&tee, Some("M")).unwrap();
        let before = cart.clone();

        assert!(cart.remove_line(1).is_none());
        assert!(cart.remove_line(usize::MAX).is_none());
        assert_eq!(cart, before);
    }

    #[test]
    fn test_remove_by_position_keeps_order() {
        let catalog = Catalog::fallback();
        let mut cart = Cart::new();
        for product in catalog.products() {
            cart.add_line(product, Some("S")).unwrap();
        }
        let removed = cart.remove_line(1).unwrap();
        assert_eq!(removed.name, "Insanity Tee");
        let names: Vec<_> = cart.lines().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Chaos Hoodie", "Madness Pants", "Psycho Jacket"]);
    }

    #[test]
    fn test_session_roundtrip_shape() {
        let tee = product(1, "Tee", &[("M", "39.99")]);
        let mut cart = Cart::new();
        cart.add_line(&tee, Some("M")).unwrap();
        let json = serde_json::to_value(&cart).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["size"], "M");
        let back: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(back, cart);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add { product: usize, size: Option<usize> },
        Remove(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..4usize, proptest::option::of(0..5usize))
                .prop_map(|(product, size)| Op::Add { product, size }),
            (0..12usize).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn prop_total_and_count_track_lines(ops in proptest::collection::vec(op(), 0..40)) {
            let catalog = Catalog::fallback();
            let sizes = ["S", "M", "L", "XL", "XXL"];
            let mut cart = Cart::new();
            let mut model: Vec<Price> = Vec::new();

            for op in ops {
                match op {
                    Op::Add { product, size } => {
                        let product = &catalog.products()[product];
                        let size = size.map(|i| sizes[i]);
                        match cart.add_line(product, size) {
                            Ok(line) => model.push(line.price),
                            Err(_) => prop_assert!(size.is_none_or(|s| product.variant(s).is_none())),
                        }
                    }
                    Op::Remove(position) => {
                        let removed = cart.remove_line(position);
                        if position < model.len() {
                            prop_assert_eq!(removed.map(|l| l.price), Some(model.remove(position)));
                        } else {
                            prop_assert!(removed.is_none());
                        }
                    }
                }

                prop_assert_eq!(cart.line_count(), model.len());
                prop_assert_eq!(cart.total(), model.iter().sum::<Price>());
            }
        }
    }
}
