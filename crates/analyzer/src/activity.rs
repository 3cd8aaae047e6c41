use anyhow::Result;
use common::types::{TokenHolding, TransferEvent, WalletRecord};
use std::collections::HashMap;
use std::time::Duration;

use crate::watchlist::label_for_address;

/// Transfer history source for one wallet. Implemented by the real client
/// and by fakes in tests.
pub trait TransfersFetcher {
    #[allow(dead_code)]
    fn tokentx_url(&self, address: &str) -> String;
    fn fetch_token_transfers(
        &self,
        address: &str,
    ) -> impl std::future::Future<Output = Result<Vec<TransferEvent>>> + Send;
}

impl TransfersFetcher for common::etherscan::TransfersClient {
    fn tokentx_url(&self, address: &str) -> String {
        common::etherscan::TransfersClient::tokentx_url(self, address)
    }

    async fn fetch_token_transfers(&self, address: &str) -> Result<Vec<TransferEvent>> {
        common::etherscan::TransfersClient::fetch_token_transfers(self, address).await
    }
}

/// Fetch transfer histories for a set of wallets sequentially with a fixed
/// inter-request delay. A failing wallet contributes nothing; the batch
/// continues. Order within the combined list follows fetch order.
pub async fn fetch_transfers_for_wallets<F: TransfersFetcher + Sync>(
    fetcher: &F,
    addresses: &[String],
    delay: Duration,
    mut on_progress: impl FnMut(usize, usize),
) -> Vec<TransferEvent> {
    let mut all = Vec::new();
    for (i, address) in addresses.iter().enumerate() {
        on_progress(i + 1, addresses.len());
        match fetcher.fetch_token_transfers(address).await {
            Ok(events) => all.extend(events),
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "transfer fetch failed; skipping wallet");
            }
        }
        if i + 1 < addresses.len() {
            tokio::time::sleep(delay).await;
        }
    }
    all
}

/// symbol → current USD price, first-seen per symbol. Built from already
/// fetched holdings so transaction pricing needs no extra API calls.
/// Zero/absent rates are left out — an absent price stays absent downstream.
pub fn build_price_map(holdings: &[TokenHolding]) -> HashMap<String, f64> {
    let mut map = HashMap::new();
    for holding in holdings {
        if let Some(rate) = holding.usd_price {
            if rate > 0.0 {
                map.entry(holding.symbol.clone()).or_insert(rate);
            }
        }
    }
    map
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "In",
            Self::Out => "Out",
        }
    }
}

/// One row of the recent-activity view.
#[derive(Debug, Clone)]
pub struct ActivityRow {
    pub timestamp: i64,
    pub direction: Direction,
    pub token_symbol: String,
    pub amount_tokens: f64,
    /// Approximate value at the *current* price; absent when the symbol has
    /// no known price.
    pub usd_value: Option<f64>,
    pub counterparty: String,
    pub tx_hash: String,
}

/// Shape transfers into display rows for one wallet: direction relative to
/// the wallet, counterparty labeled via the master list, approximate USD
/// value from current prices. Sorted by USD value descending; rows without
/// a value sort as zero but keep their absent value.
pub fn activity_rows(
    transfers: &[TransferEvent],
    wallet_address: &str,
    price_map: &HashMap<String, f64>,
    records: &[WalletRecord],
) -> Vec<ActivityRow> {
    let mut rows: Vec<ActivityRow> = transfers
        .iter()
        .map(|tx| {
            let direction = if tx.from_address.eq_ignore_ascii_case(wallet_address) {
                Direction::Out
            } else {
                Direction::In
            };
            let counterparty_address = match direction {
                Direction::Out => &tx.to_address,
                Direction::In => &tx.from_address,
            };
            let amount_tokens = tx.amount_tokens();
            let usd_value = price_map
                .get(&tx.token_symbol)
                .map(|price| amount_tokens * price);
            ActivityRow {
                timestamp: tx.timestamp,
                direction,
                token_symbol: tx.token_symbol.clone(),
                amount_tokens,
                usd_value,
                counterparty: label_for_address(counterparty_address, records),
                tx_hash: tx.tx_hash.clone(),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.usd_value
            .unwrap_or(0.0)
            .total_cmp(&a.usd_value.unwrap_or(0.0))
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(from: &str, to: &str, symbol: &str, value: &str, decimals: u32, ts: i64) -> TransferEvent {
        TransferEvent {
            from_address: from.to_string(),
            to_address: to.to_string(),
            token_symbol: symbol.to_string(),
            token_contract_address: format!("0x{symbol}"),
            token_decimals: decimals,
            raw_amount: value.to_string(),
            timestamp: ts,
            tx_hash: format!("0xtx{ts}"),
        }
    }

    struct FakeTransfers {
        by_address: HashMap<String, Result<Vec<TransferEvent>, String>>,
    }

    impl TransfersFetcher for FakeTransfers {
        fn tokentx_url(&self, address: &str) -> String {
            format!("https://transfers.test/{address}")
        }

        async fn fetch_token_transfers(&self, address: &str) -> Result<Vec<TransferEvent>> {
            match self.by_address.get(address) {
                Some(Ok(events)) => Ok(events.clone()),
                Some(Err(msg)) => Err(anyhow::anyhow!(msg.clone())),
                None => Ok(Vec::new()),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_fetch_skips_failing_wallet() {
        let mut by_address = HashMap::new();
        by_address.insert(
            "0xa".to_string(),
            Ok(vec![transfer("0x1", "0xa", "USDC", "1000000", 6, 10)]),
        );
        by_address.insert("0xb".to_string(), Err("timeout".to_string()));
        let fetcher = FakeTransfers { by_address };

        let addresses = vec!["0xa".to_string(), "0xb".to_string()];
        let all =
            fetch_transfers_for_wallets(&fetcher, &addresses, Duration::from_millis(500), |_, _| {})
                .await;
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_price_map_keeps_first_seen_and_skips_zero() {
        let holdings = vec![
            TokenHolding {
                symbol: "UNI".to_string(),
                contract_address: "0xuni".to_string(),
                chain: None,
                usd_value: 700.0,
                usd_price: Some(7.0),
                firm: "a16z".to_string(),
            },
            TokenHolding {
                symbol: "UNI".to_string(),
                contract_address: "0xuni".to_string(),
                chain: None,
                usd_value: 71.0,
                usd_price: Some(7.1),
                firm: "a16z".to_string(),
            },
            TokenHolding {
                symbol: "DEAD".to_string(),
                contract_address: "0xdead".to_string(),
                chain: None,
                usd_value: 0.0,
                usd_price: Some(0.0),
                firm: "a16z".to_string(),
            },
        ];
        let map = build_price_map(&holdings);
        assert_eq!(map.get("UNI"), Some(&7.0));
        assert!(!map.contains_key("DEAD"));
    }

    #[test]
    fn test_activity_rows_direction_counterparty_and_sort() {
        let wallet = "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
        let transfers = vec![
            // outbound, priced: 2 UNI * $7 = $14
            transfer(wallet, "0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB", "UNI", "2000000000000000000", 18, 100),
            // inbound, priced: 500 USDC = $500
            transfer("0xCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCC", wallet, "USDC", "500000000", 6, 200),
            // inbound, unpriced
            transfer("0xDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDD", wallet, "RUG", "1", 0, 300),
        ];
        let price_map = HashMap::from([("UNI".to_string(), 7.0), ("USDC".to_string(), 1.0)]);
        let records = vec![WalletRecord {
            address: "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb".to_string(),
            display_name: "Paradigm Treasury".to_string(),
            firm: "Paradigm".to_string(),
        }];

        let rows = activity_rows(&transfers, wallet, &price_map, &records);
        assert_eq!(rows.len(), 3);

        // Sorted by approximate USD value descending, absent values last.
        assert_eq!(rows[0].token_symbol, "USDC");
        assert_eq!(rows[0].direction, Direction::In);
        assert_eq!(rows[1].token_symbol, "UNI");
        assert_eq!(rows[1].direction, Direction::Out);
        assert_eq!(rows[1].counterparty, "Paradigm Treasury");
        assert!(rows[2].usd_value.is_none());
        assert_eq!(rows[2].counterparty, "0xDDDD...DDDD");
    }
}
