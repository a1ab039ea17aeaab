use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use tracing::error;

use memorial_db::Database;

use crate::blob::BlobStore;
use crate::config::Config;
use crate::error::ApiError;
use crate::rate_limit::{RateLimiter, SlidingWindowLimiter};
use crate::session::SessionManager;

/// Shared application state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<Config>,
    pub blobs: Arc<dyn BlobStore>,
    pub sessions: SessionManager,
    pub memory_limiter: Arc<dyn RateLimiter>,
    pub login_limiter: Arc<dyn RateLimiter>,
}

impl AppState {
    /// State with the default in-process rate limiters.
    pub fn new(
        config: Config,
        db: Arc<Database>,
        blobs: Arc<dyn BlobStore>,
    ) -> anyhow::Result<Self> {
        let sessions =
            SessionManager::new(db.clone(), &config.session_secret, config.production)?;
        Ok(Self {
            db,
            config: Arc::new(config),
            blobs,
            sessions,
            memory_limiter: Arc::new(SlidingWindowLimiter::memory_submissions()),
            login_limiter: Arc::new(SlidingWindowLimiter::admin_login()),
        })
    }

    /// Swaps in other limiters, e.g. a shared store for multi-instance runs.
    pub fn with_rate_limiters(
        mut self,
        memory: Arc<dyn RateLimiter>,
        login: Arc<dyn RateLimiter>,
    ) -> Self {
        self.memory_limiter = memory;
        self.login_limiter = login;
        self
    }

    /// Runs blocking DB work off the async runtime. Any failure becomes
    /// [`ApiError::Storage`] with `message` as the client-facing text.
    pub async fn run_db<F, T>(&self, message: &'static str, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::storage(message, e)
            })?
            .map_err(|e| ApiError::storage(message, format!("{:#}", e)))
    }
}

/// Lets `SignedCookieJar` pull its key straight from the state.
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.key().clone()
    }
}
