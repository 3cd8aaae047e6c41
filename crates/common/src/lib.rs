pub mod coingecko;
pub mod config;
pub mod covalent;
pub mod db;
pub mod dune;
pub mod etherscan;
pub mod observability;
pub mod types;
