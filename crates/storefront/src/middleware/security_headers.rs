//! Security headers middleware for XSS, clickjacking and sniffing protection.
//!
//! Adds restrictive headers to all responses. The CSP is locked down except
//! for the three outside origins the store depends on: the HTMX CDN, product
//! image hosts and the hosted payment page.

use axum::{
    extract::Request,
    http::{
        HeaderName, HeaderValue,
        header::{
            CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

/// Content Security Policy applied to every response.
///
/// `form-action` must include the payment host because a non-HTMX checkout
/// form submission is answered with a redirect to it.
pub const CONTENT_SECURITY_POLICY_VALUE: &str = "default-src 'none'; \
     script-src 'self' https://unpkg.com; \
     style-src 'self'; \
     font-src 'self'; \
     img-src 'self' https://via.placeholder.com https://files.cdn.printful.com; \
     connect-src 'self'; \
     frame-src 'none'; \
     object-src 'none'; \
     base-uri 'self'; \
     form-action 'self' https://checkout.stripe.com; \
     frame-ancestors 'none'";

/// Add security headers to all responses.
///
/// Headers applied:
/// - `X-Frame-Options: DENY` - Prevent clickjacking
/// - `X-Content-Type-Options: nosniff` - Prevent MIME sniffing
/// - `Referrer-Policy: strict-origin-when-cross-origin`
/// - `Content-Security-Policy` - see [`CONTENT_SECURITY_POLICY_VALUE`]
/// - `Permissions-Policy` - Deny sensitive device features
/// - `Cache-Control: no-store` - Cart fragments are per shopper
/// - `Cross-Origin-Opener-Policy: same-origin` - Process isolation
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));

    // The payment page is told where the shopper came from, nothing more
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    headers.insert(
        CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(CONTENT_SECURITY_POLICY_VALUE),
    );

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "accelerometer=(), \
             camera=(), \
             geolocation=(), \
             gyroscope=(), \
             magnetometer=(), \
             microphone=(), \
             payment=(), \
             usb=()",
        ),
    );

    headers
        .entry(HeaderName::from_static("cache-control"))
        .or_insert(HeaderValue::from_static("no-store, max-age=0"));

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );

    response
}
