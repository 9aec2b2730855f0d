//! Printful API response types.

use serde::Deserialize;

/// Every Printful response wraps its payload in `{code, result}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub code: u16,
    pub result: T,
}

/// Error body, e.g. `{"code": 401, "result": "...", "error": {"message": "..."}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub error: Option<ErrorBody>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
}

/// Entry in `GET /store/products`.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncProductSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub is_ignored: bool,
}

/// Body of `GET /store/products/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncProductDetail {
    pub sync_product: SyncProductSummary,
    #[serde(default)]
    pub sync_variants: Vec<SyncVariant>,
}

/// A sellable size/colour of a synced product.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncVariant {
    pub id: i64,
    pub name: String,
    /// Catalog variant id, the one order items refer to.
    pub variant_id: i64,
    /// Decimal string, e.g. `"39.99"`.
    pub retail_price: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub is_ignored: bool,
}

/// Body of a successful `POST /orders`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderResult {
    pub id: i64,
    #[serde(default)]
    pub status: String,
}
