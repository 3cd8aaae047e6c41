use crate::types::{BalanceItem, BalancesResponse};
use anyhow::{bail, Result};

/// Client for the token balance service: one wallet address in, the
/// wallet's token positions with USD quotes out.
pub struct BalancesClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl BalancesClient {
    pub fn new(base_url: &str, api_key: &str, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http,
        }
    }

    pub fn balances_url(&self, address: &str) -> String {
        format!(
            "{}/v1/eth-mainnet/address/{address}/balances_v2/",
            self.base_url
        )
    }

    /// Fetch the raw balance items for one wallet. Unpriced items (null
    /// `quote`) are included — filtering is the caller's concern.
    pub async fn fetch_balances(&self, address: &str) -> Result<Vec<BalanceItem>> {
        let resp: BalancesResponse = self
            .http
            .get(self.balances_url(address))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if resp.error == Some(true) {
            bail!(
                "balance service error for {address}: {}",
                resp.error_message.unwrap_or_else(|| "unknown".to_string())
            );
        }
        Ok(resp.data.map(|d| d.items).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balances_url() {
        let c = BalancesClient::new("https://api.covalenthq.com", "k", reqwest::Client::new());
        assert_eq!(
            c.balances_url("0xabc"),
            "https://api.covalenthq.com/v1/eth-mainnet/address/0xabc/balances_v2/"
        );
    }

    #[test]
    fn test_parse_fixture_balances() {
        let json = include_str!("../../../tests/fixtures/balances_sample.json");
        let resp: BalancesResponse = serde_json::from_str(json).unwrap();
        let items = resp.data.unwrap().items;
        assert!(!items.is_empty());
        // Fixture contains one priced and one unpriced token.
        assert!(items.iter().any(|i| i.quote.unwrap_or(0.0) > 0.0));
        assert!(items.iter().any(|i| i.quote.is_none()));
    }
}
