use anyhow::{bail, Result};
use common::dune::AnalyticsClient;
use common::types::{WalletRecord, WatchlistRow};

/// Firm signatures checked in priority order against the lowercased raw
/// name; first match wins. Alias sets (e.g. the a16z entry) come before
/// broader catch-alls so classification stays order-sensitive and
/// deterministic.
const FIRM_SIGNATURES: &[(&[&str], &str)] = &[
    (&["a16z", "andreessen"], "a16z"),
    (&["paradigm"], "Paradigm"),
    (&["dragonfly"], "Dragonfly Capital"),
    (&["coinbase"], "Coinbase Ventures"),
    (&["pantera"], "Pantera Capital"),
];

pub const OTHER_FIRM: &str = "Other";

/// Map a raw wallet name (e.g. "a16z.eth") to its firm category. Pure and
/// idempotent: same name in, same category out.
pub fn classify_firm(raw_name: &str) -> &'static str {
    let lower = raw_name.to_lowercase();
    for &(patterns, firm) in FIRM_SIGNATURES {
        if patterns.iter().any(|p| lower.contains(p)) {
            return firm;
        }
    }
    OTHER_FIRM
}

pub fn records_from_rows(rows: Vec<WatchlistRow>) -> Vec<WalletRecord> {
    rows.into_iter()
        .filter_map(|row| {
            let address = row.address?;
            let display_name = row.name.unwrap_or_default();
            let firm = classify_firm(&display_name).to_string();
            Some(WalletRecord {
                address,
                display_name,
                firm,
            })
        })
        .collect()
}

/// Load and classify the master watchlist. Query failure, timeout, or an
/// empty result set is an error — callers never see partial records, and a
/// missing watchlist is fatal for the whole run.
pub async fn load_watchlist(client: &AnalyticsClient, query_id: u64) -> Result<Vec<WalletRecord>> {
    let rows = client.fetch_watchlist(query_id).await?;
    let records = records_from_rows(rows);
    if records.is_empty() {
        bail!("watchlist query {query_id} returned no usable rows");
    }
    tracing::info!(wallets = records.len(), "watchlist loaded");
    Ok(records)
}

/// Distinct firm names for target selection, sorted, excluding "Other".
pub fn firm_names(records: &[WalletRecord]) -> Vec<String> {
    let mut firms: Vec<String> = records
        .iter()
        .map(|r| r.firm.clone())
        .filter(|f| f != OTHER_FIRM)
        .collect();
    firms.sort();
    firms.dedup();
    firms
}

/// Wallets belonging to one firm.
pub fn wallets_for_firm<'a>(records: &'a [WalletRecord], firm: &str) -> Vec<&'a WalletRecord> {
    records.iter().filter(|r| r.firm == firm).collect()
}

/// Display label for a counterparty: the known name when the address is in
/// the master list (case-insensitive), else a truncated `0x1234...abcd`.
pub fn label_for_address(address: &str, records: &[WalletRecord]) -> String {
    if let Some(known) = records
        .iter()
        .find(|r| r.address.eq_ignore_ascii_case(address))
    {
        return known.display_name.clone();
    }
    shorten_address(address)
}

pub fn shorten_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_firm_matches_known_signatures() {
        assert_eq!(classify_firm("a16z.eth"), "a16z");
        assert_eq!(classify_firm("Andreessen Horowitz Fund IV"), "a16z");
        assert_eq!(classify_firm("Paradigm Ops"), "Paradigm");
        assert_eq!(classify_firm("Dragonfly Capital Fund II"), "Dragonfly Capital");
        assert_eq!(classify_firm("coinbase ventures 2"), "Coinbase Ventures");
        assert_eq!(classify_firm("PANTERA"), "Pantera Capital");
    }

    #[test]
    fn test_classify_firm_is_case_insensitive() {
        assert_eq!(classify_firm("A16Z.ETH"), "a16z");
        assert_eq!(classify_firm("dRaGoNfLy"), "Dragonfly Capital");
    }

    #[test]
    fn test_classify_firm_unknown_is_other() {
        assert_eq!(classify_firm("RandomDAO"), OTHER_FIRM);
        assert_eq!(classify_firm(""), OTHER_FIRM);
    }

    #[test]
    fn test_classify_firm_is_idempotent() {
        for name in ["a16z.eth", "RandomDAO", "Pantera Early Stage"] {
            assert_eq!(classify_firm(name), classify_firm(name));
        }
    }

    #[test]
    fn test_records_from_rows_skips_addressless_rows() {
        let rows = vec![
            common::types::WatchlistRow {
                address: Some("0x1".to_string()),
                name: Some("a16z.eth".to_string()),
            },
            common::types::WatchlistRow {
                address: None,
                name: Some("ghost".to_string()),
            },
        ];
        let records = records_from_rows(rows);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].firm, "a16z");
    }

    #[test]
    fn test_firm_names_sorted_distinct_without_other() {
        let records = vec![
            rec("0x1", "pantera fund", "Pantera Capital"),
            rec("0x2", "a16z.eth", "a16z"),
            rec("0x3", "a16z 2", "a16z"),
            rec("0x4", "RandomDAO", OTHER_FIRM),
        ];
        assert_eq!(firm_names(&records), vec!["Pantera Capital", "a16z"]);
    }

    #[test]
    fn test_label_for_address_prefers_known_name() {
        let records = vec![rec("0xAbCd00000000000000000000000000000000beEf", "a16z.eth", "a16z")];
        assert_eq!(
            label_for_address("0xabcd00000000000000000000000000000000beef", &records),
            "a16z.eth"
        );
    }

    #[test]
    fn test_label_for_address_truncates_unknown() {
        let label = label_for_address("0x1234567890abcdef1234567890abcdef12345678", &[]);
        assert_eq!(label, "0x1234...5678");
    }

    fn rec(address: &str, name: &str, firm: &str) -> WalletRecord {
        WalletRecord {
            address: address.to_string(),
            display_name: name.to_string(),
            firm: firm.to_string(),
        }
    }
}
