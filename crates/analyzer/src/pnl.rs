use common::coingecko::history_date;
use common::db::{CachedId, Database};
use common::types::{AggregatedTokenRow, TransferEvent};
use std::collections::HashSet;
use std::time::Duration;

use crate::portfolio::AggregatedHolding;

/// Two-step historical price lookup: contract address → price-service id,
/// then (id, dd-mm-yyyy date) → USD price. Absence at either step is a
/// `None`, never a pipeline failure.
// The resolver holds a borrow of the sync SQLite cache, so these futures
// are not Send; they only ever run on the main task.
pub trait HistoricalPriceSource {
    fn coin_id(
        &self,
        contract_address: &str,
    ) -> impl std::future::Future<Output = anyhow::Result<Option<String>>>;
    fn price_on(
        &self,
        coin_id: &str,
        date: &str,
    ) -> impl std::future::Future<Output = anyhow::Result<Option<f64>>>;
}

impl<T: HistoricalPriceSource> HistoricalPriceSource for &T {
    async fn coin_id(&self, contract_address: &str) -> anyhow::Result<Option<String>> {
        (**self).coin_id(contract_address).await
    }

    async fn price_on(&self, coin_id: &str, date: &str) -> anyhow::Result<Option<f64>> {
        (**self).price_on(coin_id, date).await
    }
}

impl HistoricalPriceSource for common::coingecko::PriceClient {
    async fn coin_id(&self, contract_address: &str) -> anyhow::Result<Option<String>> {
        self.fetch_coin_id(contract_address).await
    }

    async fn price_on(&self, coin_id: &str, date: &str) -> anyhow::Result<Option<f64>> {
        self.fetch_history_price(coin_id, date).await
    }
}

/// Price source wrapper backed by the SQLite cache: contract→id hits are
/// served forever (including cached negatives), daily prices within the
/// configured TTL.
pub struct CachingPriceResolver<'a, S> {
    inner: S,
    db: &'a Database,
    ttl_secs: i64,
}

impl<'a, S: HistoricalPriceSource> CachingPriceResolver<'a, S> {
    pub fn new(inner: S, db: &'a Database, ttl_secs: i64) -> Self {
        Self { inner, db, ttl_secs }
    }
}

impl<S: HistoricalPriceSource> HistoricalPriceSource for CachingPriceResolver<'_, S> {
    async fn coin_id(&self, contract_address: &str) -> anyhow::Result<Option<String>> {
        match self.db.get_coin_id(contract_address)? {
            CachedId::Id(id) => return Ok(Some(id)),
            CachedId::Unresolvable => return Ok(None),
            CachedId::Miss => {}
        }
        let resolved = self.inner.coin_id(contract_address).await?;
        self.db
            .put_coin_id(contract_address, resolved.as_deref(), now_epoch())?;
        Ok(resolved)
    }

    async fn price_on(&self, coin_id: &str, date: &str) -> anyhow::Result<Option<f64>> {
        let now = now_epoch();
        if let Some(price) = self.db.get_daily_price(coin_id, date, now, self.ttl_secs)? {
            return Ok(Some(price));
        }
        let fetched = self.inner.price_on(coin_id, date).await?;
        if let Some(price) = fetched {
            self.db.put_daily_price(coin_id, date, price, now)?;
        }
        Ok(fetched)
    }
}

fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Estimate unrealized P&L for each aggregated symbol row.
///
/// Cost basis comes from the *earliest inbound* transfer of the symbol into
/// any analyzed wallet: quantity is implied as total_value / current_price,
/// and the historical price on the first-acquisition date prices that
/// quantity. Ties on the earliest timestamp resolve to the first transfer
/// in fetched order (stable scan).
///
/// Known limitation, kept on purpose: this assumes FIFO-from-first-inflow
/// and ignores outflows and re-acquisitions between then and now. Rows
/// without a positive current price, without a qualifying inbound transfer,
/// or without a resolvable historical price keep both P&L fields absent.
///
/// Lookup errors degrade to absence for that row (the batch continues);
/// progress is reported once per symbol since this is the slow path.
pub async fn estimate_unrealized_pnl<S: HistoricalPriceSource>(
    rows: &[AggregatedHolding],
    transfers: &[TransferEvent],
    wallet_addresses: &[String],
    source: &S,
    lookup_delay: Duration,
    mut on_progress: impl FnMut(usize, usize, &str),
) -> Vec<AggregatedTokenRow> {
    let analyzed: HashSet<String> = wallet_addresses.iter().map(|a| a.to_lowercase()).collect();

    let mut out = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        on_progress(i + 1, rows.len(), &row.symbol);

        let mut result = AggregatedTokenRow {
            symbol: row.symbol.clone(),
            chain: row.chain.clone(),
            total_usd_value: row.total_usd_value,
            current_usd_price: row.current_usd_price,
            estimated_cost_basis: None,
            unrealized_pnl: None,
        };

        let current_price = row.current_usd_price.unwrap_or(0.0);
        if current_price > 0.0 {
            if let Some(first_in) = earliest_inbound(transfers, &row.symbol, &analyzed) {
                match resolve_acquisition_price(source, first_in).await {
                    Ok(Some(historical_price)) => {
                        let quantity = row.total_usd_value / current_price;
                        let cost_basis = quantity * historical_price;
                        result.estimated_cost_basis = Some(cost_basis);
                        result.unrealized_pnl = Some(row.total_usd_value - cost_basis);
                    }
                    Ok(None) => {
                        tracing::debug!(symbol = %row.symbol, "no historical price; leaving P&L absent");
                    }
                    Err(e) => {
                        tracing::warn!(symbol = %row.symbol, error = %e, "price lookup failed; leaving P&L absent");
                    }
                }
                tokio::time::sleep(lookup_delay).await;
            }
        }

        out.push(result);
    }
    out
}

/// Earliest inbound transfer of `symbol` into one of the analyzed wallets.
/// Strict `<` comparison keeps the first-in-fetched-order transfer when
/// timestamps tie.
fn earliest_inbound<'a>(
    transfers: &'a [TransferEvent],
    symbol: &str,
    analyzed_lower: &HashSet<String>,
) -> Option<&'a TransferEvent> {
    let mut earliest: Option<&TransferEvent> = None;
    for tx in transfers {
        if tx.token_symbol != symbol || !analyzed_lower.contains(&tx.to_address.to_lowercase()) {
            continue;
        }
        if earliest.is_none_or(|cur| tx.timestamp < cur.timestamp) {
            earliest = Some(tx);
        }
    }
    earliest
}

async fn resolve_acquisition_price<S: HistoricalPriceSource>(
    source: &S,
    transfer: &TransferEvent,
) -> anyhow::Result<Option<f64>> {
    let Some(coin_id) = source.coin_id(&transfer.token_contract_address).await? else {
        return Ok(None);
    };
    let date = history_date(transfer.timestamp);
    source.price_on(&coin_id, &date).await
}
