use anyhow::Result;
use std::time::Duration;

mod activity;
mod cli;
mod graph;
mod pnl;
mod portfolio;
mod session;
mod watchlist;

#[tokio::main]
async fn main() -> Result<()> {
    let config = common::config::Config::load()?;

    let dispatch = common::observability::build_dispatch("analyzer", &config.general.log_level);
    tracing::dispatcher::set_global_default(dispatch).map_err(anyhow::Error::msg)?;

    // Credentials are checked before any network call — there is no
    // degraded mode with a subset of keys.
    let credentials = common::config::Credentials::from_env()?;

    let cmd = cli::parse_args(std::env::args()).map_err(anyhow::Error::msg)?;

    tracing::info!("vc wallet analyzer starting");

    if let Some(parent) = std::path::Path::new(&config.cache.path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = common::db::Database::open(&config.cache.path)?;
    db.run_migrations()?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.fetch.request_timeout_secs))
        .build()?;

    let analytics = common::dune::AnalyticsClient::new(
        &config.apis.dune_api_url,
        &credentials.dune_api_key,
        http.clone(),
        Duration::from_secs(config.watchlist.poll_interval_secs),
        config.watchlist.max_polls,
    );
    let balances = common::covalent::BalancesClient::new(
        &config.apis.covalent_api_url,
        &credentials.covalent_api_key,
        http.clone(),
    );
    let transfers = common::etherscan::TransfersClient::new(
        &config.apis.etherscan_api_url,
        &credentials.etherscan_api_key,
        http.clone(),
        config.fetch.transfers_page_size,
    );
    let prices = common::coingecko::PriceClient::new(&config.apis.coingecko_api_url, http);

    let ctx = cli::AppContext {
        config: &config,
        analytics: &analytics,
        balances: &balances,
        transfers: &transfers,
        prices: &prices,
        db: &db,
    };
    cli::run_command(&ctx, cmd).await
}
