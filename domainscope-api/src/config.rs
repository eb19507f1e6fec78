//! API Configuration Module
//!
//! Configuration for CORS and the two external verification services,
//! loaded from environment variables with development defaults. Database
//! configuration lives in the db module next to the pool it configures.

use std::time::Duration;

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration for CORS and production hardening.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(), // Empty = allow all
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `DOMAINSCOPE_CORS_ORIGINS`: Comma-separated allowed origins
    ///   (empty = allow all)
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("DOMAINSCOPE_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self { cors_origins }
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }
}

// ============================================================================
// VERIFICATION SERVICE CONFIGURATION
// ============================================================================

/// Configuration for the reputation-lookup service ("Spamhaus-like").
///
/// Missing credentials are not an error: the branch then reports itself as
/// unsupported instead of failing requests.
#[derive(Debug, Clone)]
pub struct SpamhausConfig {
    /// Base URL of the reputation API.
    pub base_url: String,
    /// Login username; required unless a static token is configured.
    pub username: Option<String>,
    /// Login password; required unless a static token is configured.
    pub password: Option<String>,
    /// Login realm.
    pub realm: String,
    /// Directly configured bearer token; preferred over login when present.
    pub static_token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for SpamhausConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.spamhaus.org/api/v1".to_string(),
            username: None,
            password: None,
            realm: "intel".to_string(),
            static_token: None,
            timeout: Duration::from_secs(8),
        }
    }
}

impl SpamhausConfig {
    /// Create configuration from environment variables.
    ///
    /// Environment variables:
    /// - `DOMAINSCOPE_SPAMHAUS_URL`: API base URL
    /// - `DOMAINSCOPE_SPAMHAUS_USERNAME` / `DOMAINSCOPE_SPAMHAUS_PASSWORD`
    /// - `DOMAINSCOPE_SPAMHAUS_REALM`: login realm (default "intel")
    /// - `DOMAINSCOPE_SPAMHAUS_TOKEN`: static bearer token (skips login)
    /// - `DOMAINSCOPE_SPAMHAUS_TIMEOUT`: per-request timeout in seconds
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("DOMAINSCOPE_SPAMHAUS_URL")
                .unwrap_or(defaults.base_url),
            username: std::env::var("DOMAINSCOPE_SPAMHAUS_USERNAME").ok(),
            password: std::env::var("DOMAINSCOPE_SPAMHAUS_PASSWORD").ok(),
            realm: std::env::var("DOMAINSCOPE_SPAMHAUS_REALM").unwrap_or(defaults.realm),
            static_token: std::env::var("DOMAINSCOPE_SPAMHAUS_TOKEN").ok(),
            timeout: Duration::from_secs(
                std::env::var("DOMAINSCOPE_SPAMHAUS_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8),
            ),
        }
    }

    /// Whether this configuration can authenticate at all.
    pub fn has_credentials(&self) -> bool {
        self.static_token.is_some() || (self.username.is_some() && self.password.is_some())
    }
}

/// Configuration for the archive-lookup service ("Wayback-like").
#[derive(Debug, Clone)]
pub struct WaybackConfig {
    /// Snapshot availability endpoint.
    pub availability_url: String,
    /// CDX-style snapshot count endpoint.
    pub cdx_url: String,
    /// Public web UI base, used to build browse links.
    pub web_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for WaybackConfig {
    fn default() -> Self {
        Self {
            availability_url: "https://archive.org/wayback/available".to_string(),
            cdx_url: "https://web.archive.org/cdx/search/cdx".to_string(),
            web_url: "https://web.archive.org".to_string(),
            timeout: Duration::from_secs(25),
        }
    }
}

impl WaybackConfig {
    /// Create configuration from environment variables.
    ///
    /// Environment variables:
    /// - `DOMAINSCOPE_WAYBACK_AVAILABILITY_URL`
    /// - `DOMAINSCOPE_WAYBACK_CDX_URL`
    /// - `DOMAINSCOPE_WAYBACK_WEB_URL`
    /// - `DOMAINSCOPE_WAYBACK_TIMEOUT`: per-request timeout in seconds
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            availability_url: std::env::var("DOMAINSCOPE_WAYBACK_AVAILABILITY_URL")
                .unwrap_or(defaults.availability_url),
            cdx_url: std::env::var("DOMAINSCOPE_WAYBACK_CDX_URL").unwrap_or(defaults.cdx_url),
            web_url: std::env::var("DOMAINSCOPE_WAYBACK_WEB_URL").unwrap_or(defaults.web_url),
            timeout: Duration::from_secs(
                std::env::var("DOMAINSCOPE_WAYBACK_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(25),
            ),
        }
    }
}

/// Combined verification configuration.
#[derive(Debug, Clone, Default)]
pub struct VerifyConfig {
    pub spamhaus: SpamhausConfig,
    pub wayback: WaybackConfig,
}

impl VerifyConfig {
    pub fn from_env() -> Self {
        Self {
            spamhaus: SpamhausConfig::from_env(),
            wayback: WaybackConfig::from_env(),
        }
    }
}
