//! Archive Lookup Client
//!
//! Queries a Wayback-style web archive with two calls issued concurrently:
//! the availability endpoint for the most recent snapshot, and the CDX
//! endpoint for a bounded snapshot count. The count is capped; past the cap
//! it is reported as the string "10000+". Requires no credentials.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::WaybackConfig;
use crate::verify::{send_with_retry, ArchiveLookup, WaybackOutcome};

/// Snapshot counts above this are reported as an open-ended string.
const SNAPSHOT_COUNT_CAP: usize = 10_000;

#[derive(Debug, Deserialize)]
struct AvailabilityResponse {
    #[serde(default)]
    archived_snapshots: ArchivedSnapshots,
}

#[derive(Debug, Default, Deserialize)]
struct ArchivedSnapshots {
    closest: Option<ClosestSnapshot>,
}

#[derive(Debug, Deserialize)]
struct ClosestSnapshot {
    #[serde(default)]
    available: bool,
    /// Snapshot time in compact `YYYYMMDDhhmmss` form.
    timestamp: Option<String>,
}

pub struct WaybackClient {
    client: reqwest::Client,
    config: WaybackConfig,
}

impl WaybackClient {
    pub fn new(client: reqwest::Client, config: WaybackConfig) -> Self {
        Self { client, config }
    }

    /// Latest snapshot info, or None when the archive has nothing.
    async fn fetch_availability(&self, domain: &str) -> Result<Option<ClosestSnapshot>, String> {
        let response = send_with_retry("Archive availability", || {
            self.client
                .get(&self.config.availability_url)
                .timeout(self.config.timeout)
                .query(&[("url", domain)])
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("Archive availability returned {status}"));
        }

        let body: AvailabilityResponse = response
            .json()
            .await
            .map_err(|e| format!("Archive availability response was not valid JSON: {e}"))?;

        Ok(body.archived_snapshots.closest.filter(|c| c.available))
    }

    /// Snapshot count, bounded at one past the cap so the cap is detectable.
    async fn fetch_snapshot_count(&self, domain: &str) -> Result<usize, String> {
        let limit = (SNAPSHOT_COUNT_CAP + 1).to_string();
        let response = send_with_retry("Archive snapshot count", || {
            self.client
                .get(&self.config.cdx_url)
                .timeout(self.config.timeout)
                .query(&[
                    ("url", domain),
                    ("output", "json"),
                    ("fl", "timestamp"),
                    ("limit", limit.as_str()),
                ])
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("Archive snapshot count returned {status}"));
        }

        let rows: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| format!("Archive snapshot count response was not valid JSON: {e}"))?;

        // First row is the column header.
        Ok(rows.len().saturating_sub(1))
    }
}

#[async_trait]
impl ArchiveLookup for WaybackClient {
    async fn check(&self, domain: &str) -> WaybackOutcome {
        let (availability, count) = tokio::join!(
            self.fetch_availability(domain),
            self.fetch_snapshot_count(domain)
        );

        let (availability, count) = match (availability, count) {
            (Ok(a), Ok(c)) => (a, c),
            (Err(e), _) | (_, Err(e)) => return WaybackOutcome::error(e),
        };

        WaybackOutcome {
            has_snapshots: Some(count > 0 || availability.is_some()),
            snapshot_count: Some(render_count(count)),
            last_snapshot_date: availability.and_then(|c| c.timestamp).map(format_timestamp),
            link: Some(format!("{}/web/*/{}", self.config.web_url, domain)),
            error: None,
        }
    }
}

fn render_count(count: usize) -> serde_json::Value {
    if count > SNAPSHOT_COUNT_CAP {
        serde_json::json!(format!("{SNAPSHOT_COUNT_CAP}+"))
    } else {
        serde_json::json!(count)
    }
}

/// Reformat a compact `YYYYMMDDhhmmss` timestamp as an ISO date.
fn format_timestamp(compact: String) -> String {
    if compact.len() >= 8 && compact.as_bytes().iter().take(8).all(|b| b.is_ascii_digit()) {
        format!("{}-{}-{}", &compact[..4], &compact[4..6], &compact[6..8])
    } else {
        compact
    }
}
