use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::config::WeChatCredentials;
use crate::error::{AppError, Result};
use crate::wechat::WeChatClient;

/// Tokens are treated as expired this long before the provider says they are.
pub const EXPIRY_MARGIN_SECS: i64 = 300;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub value: String,
    pub expire_at: DateTime<Utc>,
}

/// Single-entry token cache.
///
/// The lock is only held while reading or replacing the entry, never across a
/// fetch, so callers racing on an empty cache may each refresh once.
#[derive(Debug, Default)]
pub struct TokenCache {
    slot: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached token if `now` is before its expiry.
    pub fn get(&self, now: DateTime<Utc>) -> Option<String> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref()
            .filter(|cached| now < cached.expire_at)
            .map(|cached| cached.value.clone())
    }

    pub fn set(&self, value: String, expire_at: DateTime<Utc>) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(CachedToken { value, expire_at });
    }
}

/// Lazily refreshing access-token getter shared by the server's handlers.
pub struct AccessTokenProvider {
    client: WeChatClient,
    credentials: WeChatCredentials,
    cache: TokenCache,
    clock: Arc<dyn Clock>,
}

impl AccessTokenProvider {
    pub fn new(client: WeChatClient, credentials: WeChatCredentials) -> Self {
        Self::with_clock(client, credentials, Arc::new(SystemClock))
    }

    pub fn with_clock(client: WeChatClient, credentials: WeChatCredentials, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            credentials,
            cache: TokenCache::new(),
            clock,
        }
    }

    pub async fn get_access_token(&self) -> Result<String> {
        if let Some(token) = self.cache.get(self.clock.now()) {
            debug!("Using cached access token");
            return Ok(token);
        }

        let (appid, secret) = match (&self.credentials.appid, &self.credentials.secret) {
            (Some(appid), Some(secret)) => (appid, secret),
            _ => return Err(AppError::AuthError("APPID or APPSECRET is not configured".to_string())),
        };

        let grant = self.client.fetch_access_token(appid, secret).await?;
        let now = self.clock.now();
        let expire_at = grant
            .expires_in
            .checked_sub(EXPIRY_MARGIN_SECS)
            .and_then(Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| AppError::AuthError(format!("unusable expires_in: {}", grant.expires_in)))?;
        self.cache.set(grant.access_token.clone(), expire_at);

        Ok(grant.access_token)
    }
}
