use anyhow::Result;
use common::types::{BalanceItem, TokenHolding, WalletRecord};
use std::collections::HashMap;
use std::time::Duration;

/// Token balance source for one wallet. Implemented by the real balances
/// client and by fakes in tests.
pub trait BalancesFetcher {
    #[allow(dead_code)]
    fn balances_url(&self, address: &str) -> String;
    fn fetch_balances(
        &self,
        address: &str,
    ) -> impl std::future::Future<Output = Result<Vec<BalanceItem>>> + Send;
}

impl BalancesFetcher for common::covalent::BalancesClient {
    fn balances_url(&self, address: &str) -> String {
        common::covalent::BalancesClient::balances_url(self, address)
    }

    async fn fetch_balances(&self, address: &str) -> Result<Vec<BalanceItem>> {
        common::covalent::BalancesClient::fetch_balances(self, address).await
    }
}

/// Per-wallet rollup produced by the sweep.
#[derive(Debug, Clone)]
pub struct WalletSummary {
    pub firm: String,
    pub display_name: String,
    pub address: String,
    pub total_usd: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PortfolioSweep {
    pub summaries: Vec<WalletSummary>,
    pub holdings: Vec<TokenHolding>,
}

/// Fetch balances for every wallet in sequence, with a fixed inter-request
/// delay for rate limits. One wallet's transport failure is logged and
/// skipped — it never aborts the batch. Only positively priced positions
/// make it into the holding list.
pub async fn run_portfolio_sweep<F: BalancesFetcher + Sync>(
    fetcher: &F,
    wallets: &[&WalletRecord],
    delay: Duration,
    mut on_progress: impl FnMut(usize, usize),
) -> PortfolioSweep {
    let mut sweep = PortfolioSweep::default();

    for (i, wallet) in wallets.iter().enumerate() {
        on_progress(i + 1, wallets.len());

        match fetcher.fetch_balances(&wallet.address).await {
            Ok(items) => {
                let priced: Vec<TokenHolding> = items
                    .into_iter()
                    .filter(|item| item.quote.unwrap_or(0.0) > 0.0)
                    .map(|item| holding_from_item(item, &wallet.firm))
                    .collect();
                let total_usd = priced.iter().map(|h| h.usd_value).sum();
                sweep.summaries.push(WalletSummary {
                    firm: wallet.firm.clone(),
                    display_name: wallet.display_name.clone(),
                    address: wallet.address.clone(),
                    total_usd,
                });
                sweep.holdings.extend(priced);
            }
            Err(e) => {
                tracing::warn!(address = %wallet.address, error = %e, "balance fetch failed; skipping wallet");
            }
        }

        if i + 1 < wallets.len() {
            tokio::time::sleep(delay).await;
        }
    }

    sweep
}

fn holding_from_item(item: BalanceItem, firm: &str) -> TokenHolding {
    TokenHolding {
        symbol: item
            .contract_ticker_symbol
            .unwrap_or_else(|| "???".to_string()),
        contract_address: item.contract_address.unwrap_or_default(),
        chain: item.chain_name,
        usd_value: item.quote.unwrap_or(0.0),
        usd_price: item.quote_rate,
        firm: firm.to_string(),
    }
}

/// Aggregated per-symbol position before P&L enrichment.
#[derive(Debug, Clone)]
pub struct AggregatedHolding {
    pub symbol: String,
    pub chain: Option<String>,
    pub total_usd_value: f64,
    /// First-seen price for the symbol, representative for the group.
    pub current_usd_price: Option<f64>,
}

/// Group holdings by symbol: totals summed, price and chain taken from the
/// first-seen holding. Rows at or below the dust threshold are dropped and
/// the rest sorted by value descending.
pub fn aggregate_holdings(holdings: &[TokenHolding], dust_threshold_usd: f64) -> Vec<AggregatedHolding> {
    let mut rows: Vec<AggregatedHolding> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for holding in holdings {
        match index.get(holding.symbol.as_str()) {
            Some(&i) => rows[i].total_usd_value += holding.usd_value,
            None => {
                index.insert(holding.symbol.as_str(), rows.len());
                rows.push(AggregatedHolding {
                    symbol: holding.symbol.clone(),
                    chain: holding.chain.clone(),
                    total_usd_value: holding.usd_value,
                    current_usd_price: holding.usd_price,
                });
            }
        }
    }

    rows.retain(|r| r.total_usd_value > dust_threshold_usd);
    rows.sort_by(|a, b| b.total_usd_value.total_cmp(&a.total_usd_value));
    rows
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationSlice {
    pub label: String,
    pub usd_value: f64,
    pub pct: f64,
}

/// Allocation percentages per symbol; slices under `min_pct` collapse into
/// a single "Other" bucket so small positions don't shred the chart.
pub fn allocation_slices(rows: &[AggregatedHolding], min_pct: f64) -> Vec<AllocationSlice> {
    let total: f64 = rows.iter().map(|r| r.total_usd_value).sum();
    if total <= 0.0 {
        return Vec::new();
    }

    let mut slices = Vec::new();
    let mut other_value = 0.0;
    for row in rows {
        let pct = row.total_usd_value / total * 100.0;
        if pct < min_pct {
            other_value += row.total_usd_value;
        } else {
            slices.push(AllocationSlice {
                label: row.symbol.clone(),
                usd_value: row.total_usd_value,
                pct,
            });
        }
    }
    if other_value > 0.0 {
        slices.push(AllocationSlice {
            label: format!("Other (<{min_pct}%)"),
            usd_value: other_value,
            pct: other_value / total * 100.0,
        });
    }
    slices
}

#[derive(Debug, Clone, PartialEq)]
pub struct FirmTotal {
    pub firm: String,
    pub total_usd: f64,
    pub wallet_count: usize,
}

/// Per-firm leaderboard: swept totals plus wallet counts from the master
/// list, sorted by value descending.
pub fn leaderboard(summaries: &[WalletSummary], records: &[WalletRecord]) -> Vec<FirmTotal> {
    let mut totals: Vec<FirmTotal> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for summary in summaries {
        match index.get(summary.firm.as_str()) {
            Some(&i) => totals[i].total_usd += summary.total_usd,
            None => {
                index.insert(summary.firm.as_str(), totals.len());
                totals.push(FirmTotal {
                    firm: summary.firm.clone(),
                    total_usd: summary.total_usd,
                    wallet_count: 0,
                });
            }
        }
    }

    for total in &mut totals {
        total.wallet_count = records.iter().filter(|r| r.firm == total.firm).count();
    }

    totals.sort_by(|a, b| b.total_usd.total_cmp(&a.total_usd));
    totals
}
