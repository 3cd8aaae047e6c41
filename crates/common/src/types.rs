use serde::{Deserialize, Serialize};

// ── Analytics query service (watchlist) ──

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteResponse {
    pub execution_id: String,
}

/// Result envelope for both the execution poll and the latest-result path.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResultResponse {
    pub state: Option<String>,
    pub error: Option<String>,
    pub result: Option<QueryResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<WatchlistRow>,
}

/// One row of the saved watchlist query.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchlistRow {
    pub address: Option<String>,
    pub name: Option<String>,
}

pub const QUERY_STATE_COMPLETED: &str = "QUERY_STATE_COMPLETED";
pub const QUERY_STATE_FAILED: &str = "QUERY_STATE_FAILED";
pub const QUERY_STATE_CANCELLED: &str = "QUERY_STATE_CANCELLED";

// ── Token balance service ──

#[derive(Debug, Clone, Deserialize)]
pub struct BalancesResponse {
    pub data: Option<BalancesData>,
    pub error: Option<bool>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalancesData {
    #[serde(default)]
    pub items: Vec<BalanceItem>,
}

/// One token position from the balances endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceItem {
    pub contract_address: Option<String>,
    pub contract_ticker_symbol: Option<String>,
    pub contract_decimals: Option<u32>,
    pub balance: Option<String>,
    /// Position value in USD. Null for unpriced tokens.
    pub quote: Option<f64>,
    /// USD price per token.
    pub quote_rate: Option<f64>,
    pub chain_name: Option<String>,
}

// ── Transfer history service ──

#[derive(Debug, Clone, Deserialize)]
pub struct TransfersResponse {
    pub status: Option<String>,
    pub message: Option<String>,
    /// Array of transfers on success; the API puts an error *string* here on
    /// failure, so this stays raw until the client inspects `status`.
    pub result: serde_json::Value,
}

/// One ERC20 transfer event. Every field is a string on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferRow {
    pub from: Option<String>,
    pub to: Option<String>,
    pub value: Option<String>,
    #[serde(rename = "tokenSymbol")]
    pub token_symbol: Option<String>,
    #[serde(rename = "tokenDecimal")]
    pub token_decimal: Option<String>,
    #[serde(rename = "contractAddress")]
    pub contract_address: Option<String>,
    #[serde(rename = "timeStamp")]
    pub time_stamp: Option<String>,
    pub hash: Option<String>,
}

// ── Historical price service ──

#[derive(Debug, Clone, Deserialize)]
pub struct ContractInfo {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinHistory {
    pub market_data: Option<MarketData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketData {
    pub current_price: Option<CurrentPrice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentPrice {
    pub usd: Option<f64>,
}

// ── Domain types ──

/// Watchlist entry with its firm category resolved at load time.
/// Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletRecord {
    pub address: String,
    pub display_name: String,
    pub firm: String,
}

/// One (wallet, token) position at fetch time. Transient — never persisted.
#[derive(Debug, Clone)]
pub struct TokenHolding {
    pub symbol: String,
    pub contract_address: String,
    pub chain: Option<String>,
    pub usd_value: f64,
    pub usd_price: Option<f64>,
    pub firm: String,
}

/// Parsed transfer event, ordered newest-first as fetched.
#[derive(Debug, Clone)]
pub struct TransferEvent {
    pub from_address: String,
    pub to_address: String,
    pub token_symbol: String,
    pub token_contract_address: String,
    pub token_decimals: u32,
    /// Raw integer amount as a decimal string (can exceed u64).
    pub raw_amount: String,
    pub timestamp: i64,
    pub tx_hash: String,
}

impl TransferEvent {
    /// Token units: raw_amount / 10^decimals. Precision loss past f64 is
    /// acceptable — this feeds display values, not accounting.
    pub fn amount_tokens(&self) -> f64 {
        let raw: f64 = self.raw_amount.parse().unwrap_or(0.0);
        raw / 10f64.powi(self.token_decimals as i32)
    }
}

impl TryFrom<TransferRow> for TransferEvent {
    type Error = anyhow::Error;

    fn try_from(row: TransferRow) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            from_address: row.from.unwrap_or_default(),
            to_address: row.to.unwrap_or_default(),
            token_symbol: row.token_symbol.unwrap_or_else(|| "???".to_string()),
            token_contract_address: row.contract_address.unwrap_or_default(),
            token_decimals: row
                .token_decimal
                .as_deref()
                .and_then(|d| d.parse().ok())
                .unwrap_or(18),
            raw_amount: row.value.unwrap_or_else(|| "0".to_string()),
            timestamp: row
                .time_stamp
                .as_deref()
                .and_then(|t| t.parse().ok())
                .unwrap_or(0),
            tx_hash: row.hash.unwrap_or_default(),
        })
    }
}

/// Aggregated per-symbol row for a firm or wallet group.
///
/// `estimated_cost_basis` and `unrealized_pnl` are either both present or
/// both absent — absence means no current price, no qualifying inbound
/// transfer, or an unresolvable historical price. Never a fabricated zero.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedTokenRow {
    pub symbol: String,
    pub chain: Option<String>,
    pub total_usd_value: f64,
    pub current_usd_price: Option<f64>,
    pub estimated_cost_basis: Option<f64>,
    pub unrealized_pnl: Option<f64>,
}
