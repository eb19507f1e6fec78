//! Reputation Lookup Client
//!
//! Queries the Spamhaus-style intelligence API for a domain listing. The
//! listing endpoint is authoritative: 404 means the domain is clean, 200
//! means listed with a payload describing why. Auth failures invalidate the
//! cached bearer token so the next request re-authenticates.

use async_trait::async_trait;

use crate::config::SpamhausConfig;
use crate::verify::token::TokenManager;
use crate::verify::{send_with_retry, ReputationLookup, SpamhausOutcome};

pub struct SpamhausClient {
    client: reqwest::Client,
    config: SpamhausConfig,
    tokens: TokenManager,
}

impl SpamhausClient {
    pub fn new(client: reqwest::Client, config: SpamhausConfig) -> Self {
        let tokens = TokenManager::new(client.clone(), config.clone());
        Self {
            client,
            config,
            tokens,
        }
    }

    async fn lookup(&self, domain: &str) -> SpamhausOutcome {
        let token = match self.tokens.bearer_token().await {
            Ok(token) => token,
            Err(err) => return SpamhausOutcome::error(err),
        };

        let url = format!("{}/byobject/domain/{}", self.config.base_url, domain);

        let response = match send_with_retry("Reputation lookup", || {
            self.client
                .get(&url)
                .timeout(self.config.timeout)
                .bearer_auth(&token)
        })
        .await
        {
            Ok(response) => response,
            Err(err) => return SpamhausOutcome::error(err),
        };

        match response.status() {
            reqwest::StatusCode::NOT_FOUND => SpamhausOutcome::not_listed(),
            status if status.is_success() => {
                let payload = response.json::<serde_json::Value>().await.ok();
                SpamhausOutcome::listed(payload)
            }
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                // Token went stale server-side; drop it for the next caller.
                self.tokens.invalidate().await;
                SpamhausOutcome::error(format!(
                    "Reputation lookup rejected credentials ({})",
                    response.status()
                ))
            }
            status => SpamhausOutcome::error(format!("Reputation lookup returned {status}")),
        }
    }
}

#[async_trait]
impl ReputationLookup for SpamhausClient {
    async fn check(&self, domain: &str) -> SpamhausOutcome {
        if !self.config.has_credentials() {
            tracing::debug!("Reputation lookup skipped, no credentials configured");
            return SpamhausOutcome::unsupported();
        }

        self.lookup(domain).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::ReputationLookup;

    #[tokio::test]
    async fn test_missing_credentials_report_unsupported() {
        let client = SpamhausClient::new(reqwest::Client::new(), SpamhausConfig::default());

        let outcome = client.check("example.com").await;
        assert!(!outcome.supported);
        assert!(outcome.error.is_none());
        assert!(outcome.listed.is_none());
    }
}
