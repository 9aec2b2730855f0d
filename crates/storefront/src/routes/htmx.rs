//! HTMX response helpers.
//!
//! Notices travel in an `HX-Trigger` header as a `notify` event, which
//! `static/js/notify.js` turns into a toast. Redirects use `HX-Redirect` for
//! HTMX requests so the browser navigates instead of swapping the page into
//! a fragment target.

use std::fmt::Write as _;

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use psychosis_core::Notice;

/// Request header set by HTMX on every request it issues.
pub const HX_REQUEST: &str = "hx-request";

/// Response header that fires client-side events.
pub const HX_TRIGGER: &str = "hx-trigger";

/// Response header that makes HTMX perform a full navigation.
pub const HX_REDIRECT: &str = "hx-redirect";

/// Whether the request was issued by HTMX.
#[must_use]
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get(HX_REQUEST)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "true")
}

/// `{"notify": {...}}` encoded as a header-safe string.
///
/// Header values must be visible ASCII, so non-ASCII characters in product
/// names are written as JSON `\u` escapes.
#[must_use]
pub fn notify_trigger(notice: &Notice) -> String {
    let json = serde_json::json!({ "notify": notice }).to_string();
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                let _ = write!(out, "\\u{unit:04x}");
            }
        }
    }
    out
}

/// Attach `notice` to `response` as an `HX-Trigger` event.
pub fn with_notice(notice: &Notice, response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    match HeaderValue::from_str(&notify_trigger(notice)) {
        Ok(value) => {
            response.headers_mut().insert(HX_TRIGGER, value);
        }
        Err(e) => tracing::warn!(error = %e, "Dropping notice with invalid header value"),
    }
    response
}

/// A response that only raises a notice and leaves the page as it is.
#[must_use]
pub fn notice_only(notice: &Notice) -> Response {
    with_notice(notice, StatusCode::NO_CONTENT)
}

/// Navigate to `to`: `HX-Redirect` for HTMX requests, `303 See Other` otherwise.
#[must_use]
pub fn redirect(headers: &HeaderMap, to: &str) -> Response {
    let Ok(location) = HeaderValue::from_str(to) else {
        tracing::error!(location = %to, "Refusing to redirect to invalid location");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    if is_htmx(headers) {
        let mut response = StatusCode::OK.into_response();
        response.headers_mut().insert(HX_REDIRECT, location);
        response
    } else {
        let mut response = StatusCode::SEE_OTHER.into_response();
        response.headers_mut().insert(LOCATION, location);
        response
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn htmx_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HX_REQUEST, HeaderValue::from_static("true"));
        headers
    }

    #[test]
    fn test_notify_trigger_shape() {
        let trigger = notify_trigger(&Notice::success("Insanity Tee (M) added to cart!"));
        let value: serde_json::Value = serde_json::from_str(&trigger).unwrap();

        assert_eq!(value["notify"]["message"], "Insanity Tee (M) added to cart!");
        assert_eq!(value["notify"]["kind"], "success");
    }

    #[test]
    fn test_notify_trigger_escapes_non_ascii() {
        let trigger = notify_trigger(&Notice::error("Café Tee (M) 👕"));

        assert!(trigger.is_ascii());
        assert!(HeaderValue::from_str(&trigger).is_ok());
        let value: serde_json::Value = serde_json::from_str(&trigger).unwrap();
        assert_eq!(value["notify"]["message"], "Café Tee (M) 👕");
    }

    #[test]
    fn test_notice_only_is_no_content() {
        let response = notice_only(&Notice::error("Your cart is empty"));

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().contains_key(HX_TRIGGER));
    }

    #[test]
    fn test_redirect_htmx_and_plain() {
        let response = redirect(&htmx_headers(), "/checkout/details");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[HX_REDIRECT], "/checkout/details");

        let response = redirect(&HeaderMap::new(), "https://checkout.stripe.com/c/pay/cs_1");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[LOCATION],
            "https://checkout.stripe.com/c/pay/cs_1"
        );
    }
}
