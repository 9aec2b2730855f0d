//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, added in `main`)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded on the request span)
//! 4. Security headers (CSP, frame and sniffing protection)
//! 5. Session lock (one request at a time per session cookie)
//! 6. Session layer (tower-sessions with a bounded in-memory store)

pub mod request_id;
pub mod security_headers;
pub mod session;
pub mod session_lock;

pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{MokaSessionStore, create_session_layer};
pub use session_lock::{SessionLocks, session_lock_middleware};
