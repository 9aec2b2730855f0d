//! Cart route handlers.
//!
//! Every mutation re-renders the whole `#cart` container from the session
//! cart and refreshes the header count badge out-of-band in the same
//! response. Nothing is patched incrementally.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Response},
};
use psychosis_core::types::ProductId;
use psychosis_core::{Cart, CartLine, Notice};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::models::session::{load_cart, save_cart};
use crate::routes::htmx;
use crate::state::AppState;

/// One rendered cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineView {
    /// Current index in the cart, posted back by the remove button.
    pub position: usize,
    pub name: String,
    pub size: String,
    pub price: String,
    pub image: String,
}

/// Cart display data for templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total: String,
    pub count: usize,
}

impl CartView {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            lines: cart
                .lines()
                .iter()
                .enumerate()
                .map(|(position, line)| CartLineView::new(position, line))
                .collect(),
            total: cart.total().display(),
            count: cart.line_count(),
        }
    }
}

impl CartLineView {
    fn new(position: usize, line: &CartLine) -> Self {
        Self {
            position,
            name: line.name.clone(),
            size: line.size.clone(),
            price: line.price.display(),
            image: line.image.clone(),
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: i64,
    #[serde(default)]
    pub size: Option<String>,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub position: usize,
}

/// Cart container plus out-of-band count badge (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_fragment.html")]
pub struct CartFragmentTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: usize,
}

fn fragment(cart: &Cart) -> CartFragmentTemplate {
    CartFragmentTemplate {
        cart: CartView::from(cart),
    }
}

/// Render the cart container.
#[instrument(skip(session))]
pub async fn show(session: Session) -> Result<impl IntoResponse> {
    let cart = load_cart(&session).await?;
    Ok(fragment(&cart))
}

/// Add a product in the selected size (HTMX).
///
/// A missing or unknown size leaves the cart untouched and only raises an
/// error notice.
#[instrument(skip(state, session, form), fields(product_id = form.product_id, size = ?form.size))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let Some(product) = state.catalog().find(ProductId::new(form.product_id)).await else {
        return Ok(htmx::notice_only(&Notice::error(
            "That product is no longer available",
        )));
    };

    let mut cart = load_cart(&session).await?;
    let line = match cart.add_line(&product, form.size.as_deref()) {
        Ok(line) => line,
        Err(e) => return Ok(htmx::notice_only(&Notice::from_error(&e))),
    };
    save_cart(&session, &cart).await?;

    let product_id = form.product_id.to_string();
    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", product_id.as_str()), ("size", line.size.as_str())]),
    );

    let notice = Notice::success(format!("{} added to cart!", line.label()));
    Ok(htmx::with_notice(&notice, fragment(&cart)))
}

/// Remove the line at a position (HTMX).
///
/// Positions outside the cart are ignored and the cart is re-rendered as is.
#[instrument(skip(session))]
pub async fn remove(session: Session, Form(form): Form<RemoveFromCartForm>) -> Result<Response> {
    let mut cart = load_cart(&session).await?;

    if let Some(line) = cart.remove_line(form.position) {
        save_cart(&session, &cart).await?;
        tracing::debug!(label = %line.label(), "Removed cart line");
    }

    Ok(fragment(&cart).into_response())
}

/// Get cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session) -> Result<impl IntoResponse> {
    let cart = load_cart(&session).await?;
    Ok(CartCountTemplate {
        count: cart.line_count(),
    })
}
