//! Session middleware configuration.
//!
//! Carts live in a server-side in-memory store keyed by a session cookie
//! that the browser drops when it closes. The store is a bounded `moka`
//! cache, so abandoned sessions are evicted after a day without requests.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tower_sessions::cookie::time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "cp_session";

/// Most sessions kept at once; the least recently used are evicted first.
const SESSION_CAPACITY: u64 = 100_000;

/// Sessions untouched for this long are dropped.
const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// In-memory session store with bounded size and idle eviction.
#[derive(Debug, Clone)]
pub struct MokaSessionStore {
    cache: Cache<Id, Record>,
}

impl MokaSessionStore {
    #[must_use]
    pub fn new(capacity: u64, idle_timeout: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(capacity)
                .time_to_idle(idle_timeout)
                .build(),
        }
    }
}

impl Default for MokaSessionStore {
    fn default() -> Self {
        Self::new(SESSION_CAPACITY, SESSION_IDLE_TIMEOUT)
    }
}

#[async_trait]
impl SessionStore for MokaSessionStore {
    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.cache.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        Ok(self
            .cache
            .get(session_id)
            .await
            .filter(|record| record.expiry_date > OffsetDateTime::now_utc()))
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.cache.invalidate(session_id).await;
        Ok(())
    }
}

/// Create the session layer with the in-memory store.
///
/// Sessions end with the browser session; nothing is persisted across
/// restarts.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MokaSessionStore> {
    SessionManagerLayer::new(MokaSessionStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnSessionEnd)
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
