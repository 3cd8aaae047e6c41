use crate::types::{TransferEvent, TransferRow, TransfersResponse};
use anyhow::{bail, Result};

/// Client for the transfer history service. Only the first page is ever
/// fetched, newest first — deep history is deliberately out of scope.
pub struct TransfersClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
    page_size: u32,
}

impl TransfersClient {
    pub fn new(base_url: &str, api_key: &str, http: reqwest::Client, page_size: u32) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http,
            page_size,
        }
    }

    pub fn tokentx_url(&self, address: &str) -> String {
        format!(
            "{}/api?module=account&action=tokentx&address={address}&page=1&offset={}&sort=desc&apikey={}",
            self.base_url, self.page_size, self.api_key
        )
    }

    /// Fetch the most recent ERC20 transfers for one wallet, newest first.
    ///
    /// The API reports "no transactions found" through its error status with
    /// a string `result`; that is an empty history, not a failure.
    pub async fn fetch_token_transfers(&self, address: &str) -> Result<Vec<TransferEvent>> {
        let resp: TransfersResponse = self
            .http
            .get(self.tokentx_url(address))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_transfers(resp)
    }
}

fn parse_transfers(resp: TransfersResponse) -> Result<Vec<TransferEvent>> {
    if let serde_json::Value::Array(rows) = resp.result {
        return rows
            .into_iter()
            .map(|v| {
                let row: TransferRow = serde_json::from_value(v)?;
                TransferEvent::try_from(row)
            })
            .collect();
    }

    let message = resp.message.unwrap_or_default();
    if message.eq_ignore_ascii_case("No transactions found") {
        return Ok(Vec::new());
    }
    bail!(
        "transfer service error: {} ({})",
        message,
        resp.result.as_str().unwrap_or("non-array result")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TransfersClient {
        TransfersClient::new("https://api.etherscan.io", "k", reqwest::Client::new(), 100)
    }

    #[test]
    fn test_tokentx_url_is_first_page_newest_first() {
        let url = client().tokentx_url("0xabc");
        assert!(url.contains("action=tokentx"));
        assert!(url.contains("address=0xabc"));
        assert!(url.contains("page=1"));
        assert!(url.contains("offset=100"));
        assert!(url.contains("sort=desc"));
    }

    #[test]
    fn test_parse_fixture_transfers() {
        let json = include_str!("../../../tests/fixtures/transfers_sample.json");
        let resp: TransfersResponse = serde_json::from_str(json).unwrap();
        let events = parse_transfers(resp).unwrap();
        assert!(!events.is_empty());
        assert!(events.iter().all(|e| e.timestamp > 0));
    }

    #[test]
    fn test_no_transactions_found_is_empty_not_error() {
        let json = r#"{"status":"0","message":"No transactions found","result":""}"#;
        let resp: TransfersResponse = serde_json::from_str(json).unwrap();
        assert!(parse_transfers(resp).unwrap().is_empty());
    }

    #[test]
    fn test_rate_limit_message_is_error() {
        let json = r#"{"status":"0","message":"NOTOK","result":"Max rate limit reached"}"#;
        let resp: TransfersResponse = serde_json::from_str(json).unwrap();
        assert!(parse_transfers(resp).is_err());
    }
}
