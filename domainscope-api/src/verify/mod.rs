//! Verification Orchestrator
//!
//! Runs two independent remote checks for a domain — a reputation lookup and
//! an archive lookup — concurrently, merges the outcomes, and caches
//! error-free results for a short TTL. Each branch is tri-state: supported
//! success, supported-with-error (message surfaced, not retried further), or
//! definitively unsupported (missing credentials).
//!
//! Both remote clients sit behind async-trait seams so the orchestration and
//! cache policy are testable without network access.

pub mod spamhaus;
pub mod token;
pub mod wayback;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use domainscope_core::normalize_domain;

use crate::config::VerifyConfig;
use crate::error::{ApiError, ApiResult};

pub use spamhaus::SpamhausClient;
pub use token::{AuthToken, TokenManager};
pub use wayback::WaybackClient;

/// How long an error-free verification result stays cached.
pub const RESULT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Base delay for the exponential backoff between remote retries.
pub(crate) const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

/// Additional attempts after the first, per remote call.
pub(crate) const MAX_RETRIES: u32 = 2;

// ============================================================================
// OUTCOME TYPES
// ============================================================================

/// Outcome of the reputation-lookup branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpamhausOutcome {
    /// False when no credentials are configured.
    pub supported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listed: Option<bool>,
    /// Raw listing payload when the domain is listed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SpamhausOutcome {
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            listed: None,
            payload: None,
            error: None,
        }
    }

    pub fn not_listed() -> Self {
        Self {
            supported: true,
            listed: Some(false),
            payload: None,
            error: None,
        }
    }

    pub fn listed(payload: Option<serde_json::Value>) -> Self {
        Self {
            supported: true,
            listed: Some(true),
            payload,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            supported: true,
            listed: None,
            payload: None,
            error: Some(message.into()),
        }
    }
}

/// Outcome of the archive-lookup branch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaybackOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_snapshots: Option<bool>,
    /// Snapshot count as a number, or the string "10000+" past the cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_count: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_snapshot_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WaybackOutcome {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Merged result of both verification branches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub domain: String,
    /// True when served from the TTL cache.
    pub cached: bool,
    pub checked_at: DateTime<Utc>,
    pub spamhaus: SpamhausOutcome,
    pub wayback: WaybackOutcome,
}

impl VerificationResult {
    /// Whether either branch carries an error. Errored results are never
    /// cached, forcing a fresh attempt on the next request.
    pub fn has_error(&self) -> bool {
        self.spamhaus.error.is_some() || self.wayback.error.is_some()
    }
}

// ============================================================================
// LOOKUP SEAMS
// ============================================================================

/// Reputation-lookup branch ("Spamhaus-like").
#[async_trait]
pub trait ReputationLookup: Send + Sync {
    async fn check(&self, domain: &str) -> SpamhausOutcome;
}

/// Archive-lookup branch ("Wayback-like").
#[async_trait]
pub trait ArchiveLookup: Send + Sync {
    async fn check(&self, domain: &str) -> WaybackOutcome;
}

// ============================================================================
// RETRY HELPER
// ============================================================================

/// Send a request with bounded retries and exponential backoff.
///
/// Retries on transport failures and on 5xx/429 responses; any other status
/// is returned to the caller for interpretation. Backoff doubles from
/// 250ms per attempt.
pub(crate) async fn send_with_retry<F>(operation: &str, build: F) -> Result<reqwest::Response, String>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut delay = RETRY_BASE_DELAY;
    let mut last_error = format!("{operation} failed");

    for attempt in 0..=MAX_RETRIES {
        match build().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    last_error = format!("{operation} returned {status}");
                    tracing::warn!(operation, %status, attempt, "Retryable upstream status");
                } else {
                    return Ok(response);
                }
            }
            Err(err) => {
                last_error = format!("{operation} request failed: {err}");
                tracing::warn!(operation, error = %err, attempt, "Upstream request failed");
            }
        }

        if attempt < MAX_RETRIES {
            tokio::time::sleep(delay).await;
            delay *= 2; // Exponential backoff
        }
    }

    Err(last_error)
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

struct CacheEntry {
    stored_at: Instant,
    result: VerificationResult,
}

/// Orchestrates domain verification: normalize, consult the TTL cache, run
/// both branches concurrently on a miss, merge, and cache error-free
/// results.
pub struct Verifier {
    reputation: Arc<dyn ReputationLookup>,
    archive: Arc<dyn ArchiveLookup>,
    cache: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl Verifier {
    /// Build the production verifier from configuration.
    pub fn from_config(config: &VerifyConfig) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ApiError::internal_error(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self::new(
            Arc::new(SpamhausClient::new(client.clone(), config.spamhaus.clone())),
            Arc::new(WaybackClient::new(client, config.wayback.clone())),
        ))
    }

    pub fn new(reputation: Arc<dyn ReputationLookup>, archive: Arc<dyn ArchiveLookup>) -> Self {
        Self {
            reputation,
            archive,
            cache: RwLock::new(HashMap::new()),
            ttl: RESULT_CACHE_TTL,
        }
    }

    #[cfg(test)]
    fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Verify a domain, serving from the cache when possible.
    ///
    /// Invalid input is a client error; both remote branches must complete
    /// before the merged result is produced.
    pub async fn check(&self, raw: &str) -> ApiResult<VerificationResult> {
        let domain = normalize_domain(raw)?;

        if let Some(hit) = self.cache_lookup(&domain).await {
            tracing::debug!(%domain, "Verification served from cache");
            return Ok(hit);
        }

        let (spamhaus, wayback) =
            tokio::join!(self.reputation.check(&domain), self.archive.check(&domain));

        let result = VerificationResult {
            domain: domain.clone(),
            cached: false,
            checked_at: Utc::now(),
            spamhaus,
            wayback,
        };

        if result.has_error() {
            tracing::debug!(%domain, "Verification result carries an error, not caching");
        } else {
            let mut cache = self.cache.write().await;
            cache.insert(
                domain,
                CacheEntry {
                    stored_at: Instant::now(),
                    result: result.clone(),
                },
            );
        }

        Ok(result)
    }

    /// Look up a fresh cache entry, evicting it lazily when expired.
    async fn cache_lookup(&self, domain: &str) -> Option<VerificationResult> {
        {
            let cache = self.cache.read().await;
            match cache.get(domain) {
                Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                    let mut result = entry.result.clone();
                    result.cached = true;
                    return Some(result);
                }
                Some(_) => {} // expired, evict below
                None => return None,
            }
        }

        let mut cache = self.cache.write().await;
        if let Some(entry) = cache.get(domain) {
            if entry.stored_at.elapsed() >= self.ttl {
                cache.remove(domain);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeReputation {
        calls: AtomicUsize,
        outcome: SpamhausOutcome,
    }

    impl FakeReputation {
        fn new(outcome: SpamhausOutcome) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                outcome,
            })
        }
    }

    #[async_trait]
    impl ReputationLookup for FakeReputation {
        async fn check(&self, _domain: &str) -> SpamhausOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    struct FakeArchive {
        calls: AtomicUsize,
        outcome: WaybackOutcome,
    }

    impl FakeArchive {
        fn new(outcome: WaybackOutcome) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                outcome,
            })
        }
    }

    #[async_trait]
    impl ArchiveLookup for FakeArchive {
        async fn check(&self, _domain: &str) -> WaybackOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn clean_wayback() -> WaybackOutcome {
        WaybackOutcome {
            has_snapshots: Some(true),
            snapshot_count: Some(serde_json::json!(42)),
            last_snapshot_date: Some("2024-03-01".to_string()),
            link: Some("https://web.archive.org/web/*/example.com".to_string()),
            error: None,
        }
    }

    #[tokio::test]
    async fn test_clean_result_is_cached_and_skips_remote_calls() {
        let reputation = FakeReputation::new(SpamhausOutcome::not_listed());
        let archive = FakeArchive::new(clean_wayback());
        let verifier = Verifier::new(reputation.clone(), archive.clone());

        let first = verifier.check("example.com").await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.spamhaus.listed, Some(false));

        let second = verifier.check("example.com").await.unwrap();
        assert!(second.cached);
        assert_eq!(second.spamhaus, first.spamhaus);
        assert_eq!(second.wayback, first.wayback);

        // The second check issued no remote calls.
        assert_eq!(reputation.calls.load(Ordering::SeqCst), 1);
        assert_eq!(archive.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errored_result_is_never_cached() {
        let reputation = FakeReputation::new(SpamhausOutcome::error("spamhaus lookup failed"));
        let archive = FakeArchive::new(clean_wayback());
        let verifier = Verifier::new(reputation.clone(), archive.clone());

        let first = verifier.check("example.com").await.unwrap();
        assert!(first.has_error());
        assert!(!first.cached);

        let second = verifier.check("example.com").await.unwrap();
        assert!(!second.cached);
        assert_eq!(reputation.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unsupported_branch_is_not_an_error() {
        // Missing credentials degrade the branch, they do not poison the cache.
        let reputation = FakeReputation::new(SpamhausOutcome::unsupported());
        let archive = FakeArchive::new(clean_wayback());
        let verifier = Verifier::new(reputation.clone(), archive);

        let first = verifier.check("example.com").await.unwrap();
        assert!(!first.spamhaus.supported);
        assert!(!first.has_error());

        let second = verifier.check("example.com").await.unwrap();
        assert!(second.cached);
        assert_eq!(reputation.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_triggers_fresh_check() {
        let reputation = FakeReputation::new(SpamhausOutcome::not_listed());
        let archive = FakeArchive::new(clean_wayback());
        let verifier = Verifier::new(reputation.clone(), archive)
            .with_ttl(Duration::from_millis(0));

        verifier.check("example.com").await.unwrap();
        let second = verifier.check("example.com").await.unwrap();

        assert!(!second.cached);
        assert_eq!(reputation.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_input_is_normalized_before_cache_keying() {
        let reputation = FakeReputation::new(SpamhausOutcome::not_listed());
        let archive = FakeArchive::new(clean_wayback());
        let verifier = Verifier::new(reputation.clone(), archive);

        let first = verifier.check("https://Example.COM/path").await.unwrap();
        assert_eq!(first.domain, "example.com");

        let second = verifier.check("example.com").await.unwrap();
        assert!(second.cached);
        assert_eq!(reputation.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_domain_is_rejected() {
        let reputation = FakeReputation::new(SpamhausOutcome::not_listed());
        let archive = FakeArchive::new(clean_wayback());
        let verifier = Verifier::new(reputation, archive);

        let err = verifier.check("not a domain").await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidDomain);
    }
}
