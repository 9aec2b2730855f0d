//! Mapping Printful sync products onto catalog products.

use std::str::FromStr;

use psychosis_core::types::{FulfillmentVariantId, Price, ProductId};
use psychosis_core::{CatalogError, Product, Variant};
use rust_decimal::Decimal;

use super::types::{SyncProductDetail, SyncVariant};

/// Convert a synced product into a catalog product.
///
/// Ignored variants are skipped. When several colours share a size, the
/// first listed one is sold. The product's base price is its cheapest size.
///
/// # Errors
///
/// Returns a [`CatalogError`] if a price is unparseable or negative, or if
/// no sellable variant remains.
pub fn convert_sync_product(detail: &SyncProductDetail) -> Result<Product, CatalogError> {
    let id = ProductId::new(detail.sync_product.id);
    let mut variants: Vec<Variant> = Vec::with_capacity(detail.sync_variants.len());

    for sync_variant in detail.sync_variants.iter().filter(|v| !v.is_ignored) {
        let size = size_label(sync_variant);
        if size.is_empty() {
            return Err(CatalogError::EmptySize(id));
        }
        if variants.iter().any(|v| v.size == size) {
            continue;
        }

        let price = Decimal::from_str(sync_variant.retail_price.trim())
            .ok()
            .and_then(|amount| Price::new(amount).ok())
            .ok_or_else(|| CatalogError::NegativePrice {
                product: id,
                size: size.clone(),
            })?;

        variants.push(Variant::new(
            size.clone(),
            size_name(&size),
            price,
            Some(FulfillmentVariantId::new(sync_variant.variant_id.to_string())),
        ));
    }

    let base_price = variants
        .iter()
        .map(|v| v.price)
        .min()
        .unwrap_or(Price::ZERO);

    Product::new(
        id,
        detail.sync_product.name.clone(),
        base_price,
        detail.sync_product.thumbnail_url.clone().unwrap_or_default(),
        variants,
    )
}

/// Size from the explicit field, otherwise the last segment of names like
/// `"Insanity Tee / M"` or `"Chaos Hoodie - Black / XL"`.
fn size_label(variant: &SyncVariant) -> String {
    variant
        .size
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map_or_else(
            || {
                variant
                    .name
                    .rsplit(['/', '-'])
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_owned()
            },
            str::to_owned,
        )
}

fn size_name(size: &str) -> String {
    match size.to_ascii_uppercase().as_str() {
        "XS" => "X-Small".to_owned(),
        "S" => "Small".to_owned(),
        "M" => "Medium".to_owned(),
        "L" => "Large".to_owned(),
        "XL" => "X-Large".to_owned(),
        "2XL" | "XXL" => "2X-Large".to_owned(),
        "3XL" => "3X-Large".to_owned(),
        _ => size.to_owned(),
    }
}
