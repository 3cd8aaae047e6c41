use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

/// SQLite-backed price lookup cache.
///
/// Contract→coin-id mappings live forever (an address never changes
/// identity) and cache negatives, so unresolvable contracts are not
/// re-queried every run. Daily historical prices carry a fetch timestamp
/// and are re-read only within the configured TTL.
pub struct Database {
    pub conn: Connection,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS contract_ids (
    contract_address TEXT PRIMARY KEY,
    coin_id          TEXT,
    resolved_at      INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS daily_prices (
    coin_id    TEXT NOT NULL,
    price_date TEXT NOT NULL,
    usd_price  REAL NOT NULL,
    fetched_at INTEGER NOT NULL,
    PRIMARY KEY (coin_id, price_date)
);
"#;

/// Cached contract→id resolution. `Miss` means the contract was never
/// looked up; `Unresolvable` is a cached negative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedId {
    Miss,
    Unresolvable,
    Id(String),
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(std::time::Duration::from_secs(30))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    pub fn run_migrations(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn get_coin_id(&self, contract_address: &str) -> Result<CachedId> {
        let row: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT coin_id FROM contract_ids WHERE contract_address = ?1",
                rusqlite::params![contract_address.to_lowercase()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(match row {
            None => CachedId::Miss,
            Some(None) => CachedId::Unresolvable,
            Some(Some(id)) => CachedId::Id(id),
        })
    }

    pub fn put_coin_id(
        &self,
        contract_address: &str,
        coin_id: Option<&str>,
        now_epoch: i64,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO contract_ids (contract_address, coin_id, resolved_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![contract_address.to_lowercase(), coin_id, now_epoch],
        )?;
        Ok(())
    }

    /// Cached price for (coin, date), honoring the TTL against `now_epoch`.
    pub fn get_daily_price(
        &self,
        coin_id: &str,
        price_date: &str,
        now_epoch: i64,
        ttl_secs: i64,
    ) -> Result<Option<f64>> {
        let row: Option<f64> = self
            .conn
            .query_row(
                "SELECT usd_price FROM daily_prices
                 WHERE coin_id = ?1 AND price_date = ?2 AND fetched_at > ?3",
                rusqlite::params![coin_id, price_date, now_epoch - ttl_secs],
                |row| row.get(0),
            )
            .optional()?;
        Ok(row)
    }

    pub fn put_daily_price(
        &self,
        coin_id: &str,
        price_date: &str,
        usd_price: f64,
        now_epoch: i64,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO daily_prices (coin_id, price_date, usd_price, fetched_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![coin_id, price_date, usd_price, now_epoch],
        )?;
        Ok(())
    }
}
