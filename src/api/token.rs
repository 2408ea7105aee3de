use anyhow::{anyhow, Result};
use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::sync::Mutex;

/// Tokens expiring within this window are treated as stale.
pub const REFRESH_LENIENCY_SECS: i64 = 15 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: i64, // epoch seconds
}

impl StoredToken {
    pub fn from_expires_in(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "Bearer".into(),
            expires_at: Utc::now().timestamp() + expires_in,
        }
    }
}

fn needs_refresh(token: Option<&StoredToken>, now: i64) -> bool {
    match token {
        None => true,
        Some(st) => st.expires_at < now + REFRESH_LENIENCY_SECS,
    }
}

/// Cached access token with single-flight refresh.
///
/// The lock is held for the whole refresh, so concurrent callers queue
/// behind the one doing the work and then see the fresh token instead of
/// issuing their own request.
#[derive(Default)]
pub struct TokenCache {
    token: Mutex<Option<StoredToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn should_update(&self) -> bool {
        let lock = self.token.lock().await;
        needs_refresh(lock.as_ref(), Utc::now().timestamp())
    }

    /// Return an `Authorization` header value, refreshing first if needed.
    pub async fn bearer<F, Fut>(&self, refresh: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<StoredToken>>,
    {
        let mut lock = self.token.lock().await;
        if needs_refresh(lock.as_ref(), Utc::now().timestamp()) {
            debug!("access token missing or near expiry, refreshing");
            *lock = Some(refresh().await?);
        }
        let st = lock.as_ref().ok_or_else(|| anyhow!("no token loaded"))?;
        Ok(format!("Bearer {}", st.access_token))
    }

    /// Refresh unconditionally.
    pub async fn force_refresh<F, Fut>(&self, refresh: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<StoredToken>>,
    {
        let mut lock = self.token.lock().await;
        *lock = Some(refresh().await?);
        Ok(())
    }

    /// Drop the cached token, e.g. after the platform answered 401.
    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
    }
}
