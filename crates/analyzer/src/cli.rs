use anyhow::{bail, Result};
use common::config::Config;
use common::db::Database;
use std::time::Duration;

use crate::activity;
use crate::graph;
use crate::pnl::{self, CachingPriceResolver};
use crate::portfolio;
use crate::session::{SessionState, Target};
use crate::watchlist;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Watchlist,
    Leaderboard,
    Firm { name: String },
    Pnl { name: String },
    Activity { address: String },
    Graph { address: String },
}

const USAGE: &str = "usage: analyzer <watchlist|leaderboard|firm <name>|pnl <name>|activity <address>|graph <address>>";

pub fn parse_args<I>(mut args: I) -> std::result::Result<Command, String>
where
    I: Iterator<Item = String>,
{
    // Drop argv[0].
    let _ = args.next();

    let Some(cmd) = args.next() else {
        return Ok(Command::Watchlist);
    };

    match cmd.as_str() {
        "watchlist" => Ok(Command::Watchlist),
        "leaderboard" => Ok(Command::Leaderboard),
        "firm" => {
            let name = args
                .next()
                .ok_or_else(|| "usage: analyzer firm <name>".to_string())?;
            Ok(Command::Firm { name })
        }
        "pnl" => {
            let name = args
                .next()
                .ok_or_else(|| "usage: analyzer pnl <name>".to_string())?;
            Ok(Command::Pnl { name })
        }
        "activity" => {
            let address = args
                .next()
                .ok_or_else(|| "usage: analyzer activity <address>".to_string())?;
            Ok(Command::Activity { address })
        }
        "graph" => {
            let address = args
                .next()
                .ok_or_else(|| "usage: analyzer graph <address>".to_string())?;
            Ok(Command::Graph { address })
        }
        other => Err(format!("unknown command: {other}\n{USAGE}")),
    }
}

/// Everything the command handlers need, built once in main.
pub struct AppContext<'a> {
    pub config: &'a Config,
    pub analytics: &'a common::dune::AnalyticsClient,
    pub balances: &'a common::covalent::BalancesClient,
    pub transfers: &'a common::etherscan::TransfersClient,
    pub prices: &'a common::coingecko::PriceClient,
    pub db: &'a Database,
}

impl AppContext<'_> {
    fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.config.fetch.rate_limit_delay_ms)
    }

    fn price_lookup_delay(&self) -> Duration {
        Duration::from_millis(self.config.pnl.price_lookup_delay_ms)
    }
}

pub async fn run_command(ctx: &AppContext<'_>, cmd: Command) -> Result<()> {
    match cmd {
        Command::Watchlist => show_watchlist(ctx).await,
        Command::Leaderboard => show_leaderboard(ctx).await,
        Command::Firm { name } => show_firm(ctx, &name).await,
        Command::Pnl { name } => show_pnl(ctx, &name).await,
        Command::Activity { address } => show_activity(ctx, &address).await,
        Command::Graph { address } => show_graph(ctx, &address).await,
    }
}

async fn load_records(ctx: &AppContext<'_>) -> Result<Vec<common::types::WalletRecord>> {
    watchlist::load_watchlist(ctx.analytics, ctx.config.watchlist.query_id).await
}

async fn show_watchlist(ctx: &AppContext<'_>) -> Result<()> {
    let records = load_records(ctx).await?;
    println!("Wallet watchlist ({} wallets):", records.len());
    for firm in watchlist::firm_names(&records) {
        println!("{firm}:");
        for wallet in watchlist::wallets_for_firm(&records, &firm) {
            println!("  {:<40} {}", wallet.display_name, wallet.address);
        }
    }
    let other = watchlist::wallets_for_firm(&records, watchlist::OTHER_FIRM);
    if !other.is_empty() {
        println!("{}:", watchlist::OTHER_FIRM);
        for wallet in other {
            println!("  {:<40} {}", wallet.display_name, wallet.address);
        }
    }
    Ok(())
}

async fn show_leaderboard(ctx: &AppContext<'_>) -> Result<()> {
    let records = load_records(ctx).await?;
    let wallets: Vec<&common::types::WalletRecord> = records.iter().collect();
    let sweep = portfolio::run_portfolio_sweep(
        ctx.balances,
        &wallets,
        ctx.rate_limit_delay(),
        progress("balances"),
    )
    .await;

    println!("Firm leaderboard (tracked value, USD):");
    for row in portfolio::leaderboard(&sweep.summaries, &records) {
        println!(
            "{:>16.2}  wallets={:<3}  {}",
            row.total_usd, row.wallet_count, row.firm
        );
    }
    Ok(())
}

/// Sweep one firm's wallets, driving the session through select → loaded.
async fn sweep_firm(
    ctx: &AppContext<'_>,
    session: &mut SessionState,
    records: &[common::types::WalletRecord],
    name: &str,
) -> Result<portfolio::PortfolioSweep> {
    session.select(Target::Firm(name.to_string()));
    let wallets = watchlist::wallets_for_firm(records, name);
    if wallets.is_empty() {
        let available = watchlist::firm_names(records).join(", ");
        session.fetch_failed(format!("unknown firm: {name}"));
        bail!("unknown firm: {name} (available: {available})");
    }
    let sweep = portfolio::run_portfolio_sweep(
        ctx.balances,
        &wallets,
        ctx.rate_limit_delay(),
        progress("balances"),
    )
    .await;
    session.data_ready();
    Ok(sweep)
}

async fn show_firm(ctx: &AppContext<'_>, name: &str) -> Result<()> {
    let records = load_records(ctx).await?;
    let mut session = SessionState::default();
    let sweep = sweep_firm(ctx, &mut session, &records, name).await?;

    println!("{name} wallets:");
    for summary in &sweep.summaries {
        println!(
            "{:>16.2}  {:<40} {}",
            summary.total_usd, summary.display_name, summary.address
        );
    }

    let rows = portfolio::aggregate_holdings(&sweep.holdings, ctx.config.fetch.dust_threshold_usd);
    println!("\nAggregated holdings:");
    for row in &rows {
        println!(
            "{:>16.2}  price={:<12}  {}",
            row.total_usd_value,
            row.current_usd_price
                .map_or_else(|| "-".to_string(), |p| format!("{p:.4}")),
            row.symbol
        );
    }

    println!("\nAllocation:");
    for slice in portfolio::allocation_slices(&rows, ctx.config.pnl.min_allocation_pct) {
        println!("{:>6.2}%  {:>16.2}  {}", slice.pct, slice.usd_value, slice.label);
    }
    Ok(())
}

async fn show_pnl(ctx: &AppContext<'_>, name: &str) -> Result<()> {
    let records = load_records(ctx).await?;
    let mut session = SessionState::default();
    let sweep = sweep_firm(ctx, &mut session, &records, name).await?;
    let rows = portfolio::aggregate_holdings(&sweep.holdings, ctx.config.fetch.dust_threshold_usd);

    let addresses: Vec<String> = watchlist::wallets_for_firm(&records, name)
        .iter()
        .map(|w| w.address.clone())
        .collect();
    let transfers = activity::fetch_transfers_for_wallets(
        ctx.transfers,
        &addresses,
        ctx.rate_limit_delay(),
        progress("transfers"),
    )
    .await;

    let resolver = CachingPriceResolver::new(
        ctx.prices,
        ctx.db,
        ctx.config.cache.daily_price_ttl_secs,
    );
    let estimated = pnl::estimate_unrealized_pnl(
        &rows,
        &transfers,
        &addresses,
        &resolver,
        ctx.price_lookup_delay(),
        |i, n, symbol| tracing::info!(step = i, of = n, symbol, "pricing first acquisition"),
    )
    .await;

    println!("{name} unrealized P&L (first-acquisition estimate):");
    for row in &estimated {
        println!(
            "{:>16.2}  cost={:<16}  pnl={:<16}  {}",
            row.total_usd_value,
            row.estimated_cost_basis
                .map_or_else(|| "-".to_string(), |c| format!("{c:.2}")),
            row.unrealized_pnl
                .map_or_else(|| "-".to_string(), |p| format!("{p:+.2}")),
            row.symbol
        );
    }
    Ok(())
}

/// Balances and transfers for a single wallet, shared by the activity and
/// graph commands.
async fn wallet_context(
    ctx: &AppContext<'_>,
    records: &[common::types::WalletRecord],
    address: &str,
) -> (
    Vec<common::types::TransferEvent>,
    std::collections::HashMap<String, f64>,
) {
    let record = common::types::WalletRecord {
        address: address.to_string(),
        display_name: watchlist::label_for_address(address, records),
        firm: watchlist::OTHER_FIRM.to_string(),
    };
    let sweep =
        portfolio::run_portfolio_sweep(ctx.balances, &[&record], Duration::ZERO, |_, _| {}).await;
    let transfers = match ctx.transfers.fetch_token_transfers(address).await {
        Ok(events) => events,
        Err(e) => {
            tracing::warn!(address, error = %e, "transfer fetch failed; showing empty history");
            Vec::new()
        }
    };
    (transfers, activity::build_price_map(&sweep.holdings))
}

async fn show_activity(ctx: &AppContext<'_>, address: &str) -> Result<()> {
    let records = load_records(ctx).await?;
    let (transfers, price_map) = wallet_context(ctx, &records, address).await;

    println!(
        "Recent activity for {} ({} transfers):",
        watchlist::label_for_address(address, &records),
        transfers.len()
    );
    for row in activity::activity_rows(&transfers, address, &price_map, &records) {
        println!(
            "{:<4} {:>18.4} {:<8} {:<16} {:<24} {}",
            row.direction.as_str(),
            row.amount_tokens,
            row.token_symbol,
            row.usd_value
                .map_or_else(|| "-".to_string(), |v| format!("~${v:.2}")),
            row.counterparty,
            row.tx_hash
        );
    }
    Ok(())
}

async fn show_graph(ctx: &AppContext<'_>, address: &str) -> Result<()> {
    let records = load_records(ctx).await?;
    let (transfers, price_map) = wallet_context(ctx, &records, address).await;

    let label = watchlist::label_for_address(address, &records);
    let network = graph::build_network_graph(address, &label, &transfers, &price_map, &records);
    println!("{}", serde_json::to_string_pretty(&network)?);
    Ok(())
}

fn progress(what: &'static str) -> impl FnMut(usize, usize) {
    move |i, n| tracing::info!(step = i, of = n, "fetching {what}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Command, String> {
        let mut argv = vec!["analyzer".to_string()];
        argv.extend(args.iter().map(|s| (*s).to_string()));
        parse_args(argv.into_iter())
    }

    #[test]
    fn test_parse_args_defaults_to_watchlist() {
        assert_eq!(parse(&[]).unwrap(), Command::Watchlist);
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse(&["watchlist"]).unwrap(), Command::Watchlist);
        assert_eq!(parse(&["leaderboard"]).unwrap(), Command::Leaderboard);
    }

    #[test]
    fn test_parse_firm_requires_name() {
        assert_eq!(
            parse(&["firm", "a16z"]).unwrap(),
            Command::Firm {
                name: "a16z".to_string()
            }
        );
        assert!(parse(&["firm"]).unwrap_err().contains("usage"));
    }

    #[test]
    fn test_parse_address_commands() {
        assert_eq!(
            parse(&["activity", "0xabc"]).unwrap(),
            Command::Activity {
                address: "0xabc".to_string()
            }
        );
        assert_eq!(
            parse(&["graph", "0xabc"]).unwrap(),
            Command::Graph {
                address: "0xabc".to_string()
            }
        );
        assert!(parse(&["graph"]).unwrap_err().contains("usage"));
    }

    #[test]
    fn test_parse_unknown_command_mentions_usage() {
        let err = parse(&["frobnicate"]).unwrap_err();
        assert!(err.contains("unknown command"));
        assert!(err.contains("usage"));
    }
}
