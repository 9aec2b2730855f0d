//! Home page route handler.
//!
//! The home page is the whole shop: the product grid with size selectors,
//! and the cart with its checkout button.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use psychosis_core::{Product, Variant};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::models::session::load_cart;
use crate::routes::cart::CartView;
use crate::state::AppState;

/// Size option display data for templates.
#[derive(Debug, Clone)]
pub struct VariantView {
    pub size: String,
    pub name: String,
    pub price: String,
}

/// Product display data for templates.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: i64,
    pub name: String,
    /// Price shown before a size is chosen.
    pub price: String,
    pub image: String,
    pub variants: Vec<VariantView>,
}

impl From<&Variant> for VariantView {
    fn from(variant: &Variant) -> Self {
        Self {
            size: variant.size.clone(),
            name: variant.name.clone(),
            price: variant.price.display(),
        }
    }
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id().as_i64(),
            name: product.name().to_owned(),
            price: product.base_price().display(),
            image: product.image().to_owned(),
            variants: product.variants().iter().map(VariantView::from).collect(),
        }
    }
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub products: Vec<ProductView>,
    pub cart: CartView,
}

/// Display the home page.
#[instrument(skip(state, session))]
pub async fn home(State(state): State<AppState>, session: Session) -> Result<impl IntoResponse> {
    let catalog = state.catalog().catalog().await;
    let cart = load_cart(&session).await?;

    Ok(HomeTemplate {
        products: catalog.products().iter().map(ProductView::from).collect(),
        cart: CartView::from(&cart),
    })
}
