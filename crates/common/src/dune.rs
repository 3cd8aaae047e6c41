use crate::types::{
    ExecuteResponse, QueryResultResponse, WatchlistRow, QUERY_STATE_CANCELLED,
    QUERY_STATE_COMPLETED, QUERY_STATE_FAILED,
};
use anyhow::{anyhow, bail, Result};
use std::time::Duration;

/// Client for the analytics query service that hosts the saved watchlist
/// query. Supports execute-and-poll and the latest-result shortcut (the
/// free-tier path), both returning the same `{address, name}` rows.
pub struct AnalyticsClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
    poll_interval: Duration,
    max_polls: u32,
}

impl AnalyticsClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        http: reqwest::Client,
        poll_interval: Duration,
        max_polls: u32,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http,
            poll_interval,
            max_polls,
        }
    }

    pub fn execute_url(&self, query_id: u64) -> String {
        format!("{}/api/v1/query/{query_id}/execute", self.base_url)
    }

    pub fn results_url(&self, execution_id: &str) -> String {
        format!("{}/api/v1/execution/{execution_id}/results", self.base_url)
    }

    pub fn latest_result_url(&self, query_id: u64) -> String {
        format!("{}/api/v1/query/{query_id}/results", self.base_url)
    }

    /// Start an execution of the saved query and return its execution id.
    pub async fn execute_query(&self, query_id: u64) -> Result<String> {
        let resp: ExecuteResponse = self
            .http
            .post(self.execute_url(query_id))
            .header("X-DUNE-API-KEY", &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.execution_id)
    }

    async fn fetch_results(&self, execution_id: &str) -> Result<QueryResultResponse> {
        Ok(self
            .http
            .get(self.results_url(execution_id))
            .header("X-DUNE-API-KEY", &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    /// Execute the query and poll until it completes. Terminal failure
    /// states and poll exhaustion are errors — the caller gets rows or
    /// nothing, never a partial result.
    pub async fn fetch_watchlist(&self, query_id: u64) -> Result<Vec<WatchlistRow>> {
        let execution_id = self.execute_query(query_id).await?;
        tracing::debug!(execution_id = %execution_id, "watchlist query started");

        for _ in 0..self.max_polls {
            let resp = self.fetch_results(&execution_id).await?;
            match resp.state.as_deref() {
                Some(QUERY_STATE_COMPLETED) => {
                    let rows = resp
                        .result
                        .ok_or_else(|| anyhow!("completed query returned no result body"))?
                        .rows;
                    return Ok(rows);
                }
                Some(QUERY_STATE_FAILED) | Some(QUERY_STATE_CANCELLED) => {
                    bail!(
                        "watchlist query failed: {}",
                        resp.error.unwrap_or_else(|| "unknown error".to_string())
                    );
                }
                _ => tokio::time::sleep(self.poll_interval).await,
            }
        }
        bail!("watchlist query did not complete within {} polls", self.max_polls)
    }

    /// Fetch the stored result of the last execution without starting a new
    /// one.
    pub async fn fetch_latest_watchlist(&self, query_id: u64) -> Result<Vec<WatchlistRow>> {
        let resp: QueryResultResponse = self
            .http
            .get(self.latest_result_url(query_id))
            .header("X-DUNE-API-KEY", &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.result.map(|r| r.rows).unwrap_or_default())
    }
}
