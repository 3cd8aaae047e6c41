use common::types::{TransferEvent, WalletRecord};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::watchlist::label_for_address;

const CENTER_COLOR: &str = "#FF4B4B";
const COUNTERPARTY_COLOR: &str = "#00A0E5";
const OUTBOUND_COLOR: &str = "#FF6347";
const INBOUND_COLOR: &str = "#32CD32";

const CENTER_SIZE: u32 = 25;
const COUNTERPARTY_SIZE: u32 = 15;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub title: String,
    pub color: &'static str,
    pub size: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub title: String,
    pub width: u32,
    pub color: &'static str,
    pub usd_value: Option<f64>,
}

/// Transaction network around one wallet: the wallet at the center, one
/// node per distinct counterparty, one edge per transfer. Parallel edges
/// between the same pair are kept, one per transfer.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NetworkGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Edge width bucket by approximate USD value, strictly-greater boundaries.
pub fn edge_width(usd_value: f64) -> u32 {
    if usd_value > 500_000.0 {
        8
    } else if usd_value > 100_000.0 {
        5
    } else if usd_value > 10_000.0 {
        2
    } else {
        1
    }
}

pub fn build_network_graph(
    center_address: &str,
    center_label: &str,
    transfers: &[TransferEvent],
    price_map: &HashMap<String, f64>,
    records: &[WalletRecord],
) -> NetworkGraph {
    let center_id = center_address.to_lowercase();
    let mut nodes = vec![GraphNode {
        id: center_id.clone(),
        label: center_label.to_string(),
        title: center_address.to_string(),
        color: CENTER_COLOR,
        size: CENTER_SIZE,
    }];
    let mut seen: HashSet<String> = HashSet::from([center_id.clone()]);
    let mut edges = Vec::with_capacity(transfers.len());

    for tx in transfers {
        let outbound = tx.from_address.eq_ignore_ascii_case(center_address);
        let counterparty = if outbound {
            &tx.to_address
        } else {
            &tx.from_address
        };
        let counterparty_id = counterparty.to_lowercase();

        if seen.insert(counterparty_id.clone()) {
            nodes.push(GraphNode {
                id: counterparty_id.clone(),
                label: label_for_address(counterparty, records),
                title: counterparty.clone(),
                color: COUNTERPARTY_COLOR,
                size: COUNTERPARTY_SIZE,
            });
        }

        let amount = tx.amount_tokens();
        let usd_value = price_map.get(&tx.token_symbol).map(|price| amount * price);
        let title = match usd_value {
            Some(usd) => format!("{amount:.2} ${} (~${usd:.2})", tx.token_symbol),
            None => format!("{amount:.2} ${}", tx.token_symbol),
        };
        let (from, to, color) = if outbound {
            (center_id.clone(), counterparty_id, OUTBOUND_COLOR)
        } else {
            (counterparty_id, center_id.clone(), INBOUND_COLOR)
        };
        edges.push(GraphEdge {
            from,
            to,
            title,
            width: edge_width(usd_value.unwrap_or(0.0)),
            color,
            usd_value,
        });
    }

    NetworkGraph { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(from: &str, to: &str, symbol: &str, raw: &str, decimals: u32, ts: i64) -> TransferEvent {
        TransferEvent {
            from_address: from.to_string(),
            to_address: to.to_string(),
            token_symbol: symbol.to_string(),
            token_contract_address: format!("0x{symbol}"),
            token_decimals: decimals,
            raw_amount: raw.to_string(),
            timestamp: ts,
            tx_hash: format!("0xtx{ts}"),
        }
    }

    #[test]
    fn test_edge_width_buckets_are_strictly_greater() {
        assert_eq!(edge_width(0.0), 1);
        assert_eq!(edge_width(10_000.0), 1);
        assert_eq!(edge_width(10_000.01), 2);
        assert_eq!(edge_width(100_000.0), 2);
        assert_eq!(edge_width(100_000.01), 5);
        assert_eq!(edge_width(500_000.0), 5);
        assert_eq!(edge_width(500_000.01), 8);
    }

    #[test]
    fn test_empty_transfers_yield_center_only() {
        let graph = build_network_graph("0xAAAA", "a16z.eth", &[], &HashMap::new(), &[]);
        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.edges.is_empty());
        assert_eq!(graph.nodes[0].color, CENTER_COLOR);
        assert_eq!(graph.nodes[0].size, CENTER_SIZE);
        assert_eq!(graph.nodes[0].label, "a16z.eth");
    }

    #[test]
    fn test_direction_colors_and_counterparty_dedup() {
        let wallet = "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
        let other = "0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB";
        // Mixed casing of the same counterparty must not create two nodes.
        let transfers = vec![
            transfer(wallet, other, "UNI", "1000000000000000000", 18, 1),
            transfer(&other.to_lowercase(), wallet, "UNI", "2000000000000000000", 18, 2),
        ];
        let price_map = HashMap::from([("UNI".to_string(), 7.0)]);

        let graph = build_network_graph(wallet, "me", &transfers, &price_map, &[]);
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[1].size, COUNTERPARTY_SIZE);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.edges[0].color, OUTBOUND_COLOR);
        assert_eq!(graph.edges[0].from, wallet.to_lowercase());
        assert_eq!(graph.edges[1].color, INBOUND_COLOR);
        assert_eq!(graph.edges[1].to, wallet.to_lowercase());
    }

    #[test]
    fn test_parallel_edges_are_kept_per_transfer() {
        let wallet = "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
        let other = "0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB";
        let transfers = vec![
            transfer(wallet, other, "USDC", "500000000", 6, 1),
            transfer(wallet, other, "USDC", "500000000", 6, 2),
        ];
        let price_map = HashMap::from([("USDC".to_string(), 1.0)]);

        let graph = build_network_graph(wallet, "me", &transfers, &price_map, &[]);
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 2);
    }

    #[test]
    fn test_counterparty_labels_resolve_from_master_list() {
        let wallet = "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
        let known = "0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB";
        let unknown = "0x1234567890abcdef1234567890abcdef12345678";
        let transfers = vec![
            transfer(wallet, known, "UNI", "1000000000000000000", 18, 1),
            transfer(unknown, wallet, "UNI", "1000000000000000000", 18, 2),
        ];
        let records = vec![WalletRecord {
            address: known.to_lowercase(),
            display_name: "Paradigm Treasury".to_string(),
            firm: "Paradigm".to_string(),
        }];

        let graph = build_network_graph(wallet, "me", &transfers, &HashMap::new(), &records);
        assert_eq!(graph.nodes[1].label, "Paradigm Treasury");
        assert_eq!(graph.nodes[2].label, "0x1234...5678");
        // No price known: width falls back to the smallest bucket.
        assert!(graph.edges.iter().all(|e| e.width == 1));
        assert!(graph.edges.iter().all(|e| e.usd_value.is_none()));
    }
}
