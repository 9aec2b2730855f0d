//! Products and their size variants.
//!
//! A [`Catalog`] comes from one of two sources: the fulfillment provider's
//! product listing, or the built-in [`Catalog::fallback`] list used whenever
//! that listing cannot be fetched.

use std::collections::HashSet;

use serde::Serialize;

use crate::types::{FulfillmentVariantId, Price, ProductId};

/// Errors raised when a product violates catalog invariants.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A product must be sold in at least one size.
    #[error("product {0} has no variants")]
    NoVariants(ProductId),
    /// Two variants of the same product share a size label.
    #[error("product {product} lists size '{size}' more than once")]
    DuplicateSize {
        /// Offending product.
        product: ProductId,
        /// Repeated size label.
        size: String,
    },
    /// A size label is blank.
    #[error("product {0} has a variant with an empty size")]
    EmptySize(ProductId),
    /// A source listed a variant below zero or above the price ceiling.
    #[error("product {product} size '{size}' has an invalid price")]
    NegativePrice {
        /// Offending product.
        product: ProductId,
        /// Size label of the mispriced variant.
        size: String,
    },
}

/// One purchasable size of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
    /// Size label shoppers select, e.g. `"M"`. Unique within its product.
    pub size: String,
    /// Human readable size name, e.g. `"Medium"`.
    pub name: String,
    /// Price of this size. May differ from the product's base price.
    pub price: Price,
    /// Provider variant reference, required for fulfillment orders.
    pub fulfillment_id: Option<FulfillmentVariantId>,
}

impl Variant {
    /// Create a variant.
    #[must_use]
    pub fn new(
        size: impl Into<String>,
        name: impl Into<String>,
        price: Price,
        fulfillment_id: Option<FulfillmentVariantId>,
    ) -> Self {
        Self {
            size: size.into(),
            name: name.into(),
            price,
            fulfillment_id,
        }
    }
}

/// A catalog product with at least one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    id: ProductId,
    name: String,
    base_price: Price,
    image: String,
    variants: Vec<Variant>,
}

impl Product {
    /// Create a product, checking variant invariants.
    ///
    /// # Errors
    ///
    /// Returns an error if `variants` is empty, contains a blank size, or
    /// repeats a size label.
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        base_price: Price,
        image: impl Into<String>,
        variants: Vec<Variant>,
    ) -> Result<Self, CatalogError> {
        if variants.is_empty() {
            return Err(CatalogError::NoVariants(id));
        }

        let mut seen = HashSet::with_capacity(variants.len());
        for variant in &variants {
            if variant.size.trim().is_empty() {
                return Err(CatalogError::EmptySize(id));
            }
            if !seen.insert(variant.size.as_str()) {
                return Err(CatalogError::DuplicateSize {
                    product: id,
                    size: variant.size.clone(),
                });
            }
        }

        Ok(Self {
            id,
            name: name.into(),
            base_price,
            image: image.into(),
            variants,
        })
    }

    #[must_use]
    pub const fn id(&self) -> ProductId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Price shown before a size is chosen.
    #[must_use]
    pub const fn base_price(&self) -> Price {
        self.base_price
    }

    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Variants in display order. Never empty.
    #[must_use]
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// Look up a variant by its size label.
    #[must_use]
    pub fn variant(&self, size: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.size == size)
    }
}

/// An ordered list of products.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    #[must_use]
    pub const fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// The built-in product list shown when the provider listing is
    /// unavailable.
    #[must_use]
    pub fn fallback() -> Self {
        Self::new(vec![
            fallback_product(1, "Chaos Hoodie", 8999, "Hoodie", "hoodie"),
            fallback_product(2, "Insanity Tee", 3999, "T-Shirt", "tee"),
            fallback_product(3, "Madness Pants", 7999, "Pants", "pants"),
            fallback_product(4, "Psycho Jacket", 12999, "Jacket", "jacket"),
        ])
    }

    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    #[must_use]
    pub fn find(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }
}

const FALLBACK_SIZES: [(&str, &str); 4] = [
    ("S", "Small"),
    ("M", "Medium"),
    ("L", "Large"),
    ("XL", "X-Large"),
];

fn fallback_product(id: i64, name: &str, cents: u32, label: &str, sku: &str) -> Product {
    let price = Price::from_cents(cents);
    Product {
        id: ProductId::new(id),
        name: name.to_owned(),
        base_price: price,
        image: format!("https://via.placeholder.com/300x300/000000/FFFFFF?text={label}"),
        variants: FALLBACK_SIZES
            .iter()
            .map(|(size, size_name)| Variant {
                size: (*size).to_owned(),
                name: (*size_name).to_owned(),
                price,
                fulfillment_id: Some(FulfillmentVariantId::new(format!(
                    "{sku}_{}",
                    size.to_lowercase()
                ))),
            })
            .collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn variant(size: &str) -> Variant {
        Variant::new(size, size, Price::from_cents(1000), None)
    }

    #[test]
    fn test_product_requires_variants() {
        let err = Product::new(ProductId::new(9), "Cap", Price::ZERO, "", vec![]).unwrap_err();
        assert_eq!(err, CatalogError::NoVariants(ProductId::new(9)));
    }

    #[test]
    fn test_product_rejects_duplicate_sizes() {
        let err = Product::new(
            ProductId::new(9),
            "Cap",
            Price::ZERO,
            "",
            vec![variant("M"), variant("L"), variant("M")],
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateSize { ref size, .. } if size == "M"));
    }

    #[test]
    fn test_product_rejects_blank_size() {
        let err = Product::new(ProductId::new(9), "Cap", Price::ZERO, "", vec![variant(" ")])
            .unwrap_err();
        assert_eq!(err, CatalogError::EmptySize(ProductId::new(9)));
    }

    #[test]
    fn test_fallback_catalog_is_valid() {
        let catalog = Catalog::fallback();
        assert_eq!(catalog.len(), 4);
        for product in catalog.products() {
            // Rebuilding through the checked constructor must succeed.
            Product::new(
                product.id(),
                product.name(),
                product.base_price(),
                product.image(),
                product.variants().to_vec(),
            )
            .unwrap();
        }
        let tee = catalog.find(ProductId::new(2)).unwrap();
        assert_eq!(tee.name(), "Insanity Tee");
        let medium = tee.variant("M").unwrap();
        assert_eq!(medium.price, Price::from_cents(3999));
        assert_eq!(
            medium.fulfillment_id.as_ref().map(FulfillmentVariantId::as_str),
            Some("tee_m")
        );
    }
}
