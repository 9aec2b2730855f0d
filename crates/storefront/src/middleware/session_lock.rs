//! Per-session request serialisation.
//!
//! Cart handlers load the cart from the session, change it and let the
//! session layer write it back after the response. Two requests on the same
//! cookie would otherwise both read the old cart and the later write would
//! drop the earlier line. This layer sits outside the session layer, so a
//! request holds its session's lock until the record has been saved.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::header::COOKIE,
    middleware::Next,
    response::Response,
};
use moka::future::Cache;
use tokio::sync::Mutex;
use tower_sessions::cookie::Cookie;

use super::session::SESSION_COOKIE_NAME;

/// Locks unused for this long are dropped.
const LOCK_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

const LOCK_CAPACITY: u64 = 100_000;

/// One async mutex per session cookie.
#[derive(Clone)]
pub struct SessionLocks {
    locks: Cache<String, Arc<Mutex<()>>>,
}

impl SessionLocks {
    #[must_use]
    pub fn new() -> Self {
        Self {
            locks: Cache::builder()
                .max_capacity(LOCK_CAPACITY)
                .time_to_idle(LOCK_IDLE_TIMEOUT)
                .build(),
        }
    }

    /// The lock for `session`, created on first use.
    pub async fn lock_for(&self, session: &str) -> Arc<Mutex<()>> {
        self.locks
            .get_with(session.to_owned(), async { Arc::new(Mutex::new(())) })
            .await
    }
}

impl Default for SessionLocks {
    fn default() -> Self {
        Self::new()
    }
}

/// Value of the session cookie, if the request carries one.
fn session_cookie(request: &Request) -> Option<String> {
    request
        .headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_owned())
}

/// Run requests that share a session cookie one at a time.
///
/// Requests without a session cookie start a fresh session and are not
/// serialised. Static assets skip the lock.
pub async fn session_lock_middleware(
    State(locks): State<SessionLocks>,
    request: Request,
    next: Next,
) -> Response {
    let session = session_cookie(&request).filter(|_| !request.uri().path().starts_with("/static"));
    let Some(session) = session else {
        return next.run(request).await;
    };

    let lock = locks.lock_for(&session).await;
    let _guard = lock.lock().await;
    next.run(request).await
}
