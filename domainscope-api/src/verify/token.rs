//! Bearer Token Lifecycle
//!
//! Manages the reputation service's bearer token: a statically configured
//! token is used as-is, otherwise a login call mints one and it is reused
//! until shortly before expiry. An expiry margin keeps us from sending a
//! token that dies mid-flight, and auth failures invalidate the cached
//! token so the next request logs in again.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::config::SpamhausConfig;
use crate::verify::send_with_retry;

/// Tokens are considered expired this long before their real expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Assumed lifetime when the login response carries no usable expiry.
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(23 * 60 * 60);

/// A bearer token with its effective expiry.
#[derive(Debug, Clone)]
pub struct AuthToken {
    pub token: String,
    pub expires_at: Instant,
}

impl AuthToken {
    /// Whether the token is still safely usable.
    pub fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Mints fresh bearer tokens, behind a seam so the manager's caching and
/// invalidation logic is testable without network access.
#[async_trait]
pub trait LoginClient: Send + Sync {
    async fn login(&self) -> Result<AuthToken, String>;
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    /// Unix timestamp of token expiry, when the service provides one.
    #[serde(default)]
    expires: Option<i64>,
}

/// Production login: POST credentials to the service's login endpoint.
struct HttpLogin {
    client: reqwest::Client,
    config: SpamhausConfig,
}

#[async_trait]
impl LoginClient for HttpLogin {
    async fn login(&self) -> Result<AuthToken, String> {
        let (username, password) = match (&self.config.username, &self.config.password) {
            (Some(u), Some(p)) => (u.clone(), p.clone()),
            _ => return Err("Reputation service credentials are not configured".to_string()),
        };

        let url = format!("{}/login", self.config.base_url);
        let body = serde_json::json!({
            "username": username,
            "password": password,
            "realm": self.config.realm,
        });

        tracing::debug!(url = %url, "Logging in to reputation service");

        let response = send_with_retry("Reputation login", || {
            self.client
                .post(&url)
                .timeout(self.config.timeout)
                .json(&body)
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("Reputation login returned {status}"));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| format!("Reputation login response was not valid JSON: {e}"))?;

        Ok(AuthToken {
            token: login.token,
            expires_at: expiry_instant(login.expires),
        })
    }
}

/// Caches and refreshes the bearer token for the reputation service.
pub struct TokenManager {
    static_token: Option<String>,
    login: Arc<dyn LoginClient>,
    current: RwLock<Option<AuthToken>>,
}

impl TokenManager {
    pub fn new(client: reqwest::Client, config: SpamhausConfig) -> Self {
        let static_token = config.static_token.clone();
        Self::with_login(static_token, Arc::new(HttpLogin { client, config }))
    }

    pub fn with_login(static_token: Option<String>, login: Arc<dyn LoginClient>) -> Self {
        Self {
            static_token,
            login,
            current: RwLock::new(None),
        }
    }

    /// Return a usable bearer token, logging in when needed.
    ///
    /// A configured static token always wins. Otherwise the cached token is
    /// reused while valid; double-checked locking keeps concurrent callers
    /// from issuing duplicate logins.
    pub async fn bearer_token(&self) -> Result<String, String> {
        if let Some(token) = &self.static_token {
            return Ok(token.clone());
        }

        {
            let current = self.current.read().await;
            if let Some(token) = current.as_ref().filter(|t| t.is_valid()) {
                return Ok(token.token.clone());
            }
        }

        let mut current = self.current.write().await;
        if let Some(token) = current.as_ref().filter(|t| t.is_valid()) {
            return Ok(token.token.clone());
        }

        let fresh = self.login.login().await?;
        let token = fresh.token.clone();
        *current = Some(fresh);
        Ok(token)
    }

    /// Drop the cached token, forcing a login on the next request.
    pub async fn invalidate(&self) {
        let mut current = self.current.write().await;
        *current = None;
    }
}

/// Translate a Unix expiry timestamp into an Instant with the safety margin
/// applied, falling back to the default lifetime.
fn expiry_instant(expires: Option<i64>) -> Instant {
    let now = Instant::now();
    let lifetime = expires
        .map(|ts| {
            let remaining = ts - chrono::Utc::now().timestamp();
            Duration::from_secs(remaining.max(0) as u64)
        })
        .unwrap_or(DEFAULT_TOKEN_TTL);

    now + lifetime.saturating_sub(EXPIRY_MARGIN)
}
