use crate::types::{CoinHistory, ContractInfo};
use anyhow::Result;
use reqwest::StatusCode;

/// Client for the historical price service. Both lookups tolerate absence:
/// non-standard or rugged contracts resolve to `None` instead of failing
/// the pipeline.
pub struct PriceClient {
    base_url: String,
    http: reqwest::Client,
}

impl PriceClient {
    pub fn new(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn contract_url(&self, contract_address: &str) -> String {
        format!(
            "{}/api/v3/coins/ethereum/contract/{contract_address}",
            self.base_url
        )
    }

    pub fn history_url(&self, coin_id: &str, date: &str) -> String {
        format!(
            "{}/api/v3/coins/{coin_id}/history?date={date}&localization=false",
            self.base_url
        )
    }

    /// Resolve a token contract address to the price service's coin id.
    pub async fn fetch_coin_id(&self, contract_address: &str) -> Result<Option<String>> {
        if contract_address.is_empty() {
            return Ok(None);
        }
        let resp = self.http.get(self.contract_url(contract_address)).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let info: ContractInfo = resp.error_for_status()?.json().await?;
        Ok(info.id)
    }

    /// Historical USD price for a coin on a `dd-mm-yyyy` date. Missing
    /// market data for that day is absence, not an error.
    pub async fn fetch_history_price(&self, coin_id: &str, date: &str) -> Result<Option<f64>> {
        let resp = self.http.get(self.history_url(coin_id, date)).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let history: CoinHistory = resp.error_for_status()?.json().await?;
        Ok(history
            .market_data
            .and_then(|m| m.current_price)
            .and_then(|p| p.usd))
    }
}

/// Date key for historical price lookups (`dd-mm-yyyy`, the price
/// service's expected format).
pub fn history_date(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .format("%d-%m-%Y")
        .to_string()
}
