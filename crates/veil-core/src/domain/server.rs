//! Server catalog entries and the connection status state machine's states.
//!
//! The catalog is a snapshot: the full list returned by the last successful
//! fetch, replaced wholesale.  Entries are immutable values once fetched and
//! are never patched individually.

use serde::{Deserialize, Serialize};

/// Tunnel/proxy protocol spoken by a catalog server.
///
/// Serialized lowercase to match the backend wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolKind {
    Http,
    Https,
    Socks5,
    Openvpn,
    Wireguard,
}

/// A single remote access endpoint in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEntry {
    pub id: String,
    pub name: String,
    pub country: String,
    pub country_code: String,
    pub city: String,
    /// Wire name kept from the backend schema.
    #[serde(rename = "proxy_type")]
    pub protocol: ProtocolKind,
    pub host: String,
    pub port: u16,
    pub is_premium: bool,
    pub is_online: bool,
    /// Current load, 0–100.
    pub load_percentage: u8,
    pub ping_ms: u32,
}

/// The four-state machine governing the logical connect/disconnect lifecycle.
///
/// ```text
/// Disconnected ──connect()──► Connecting ──[delay]──► Connected
///      ▲                                                  │
///      └──[delay]── Disconnecting ◄────disconnect()───────┘
/// ```
///
/// `Connecting` and `Disconnecting` are transitional: operations issued while
/// in them are ignored rather than queued, with the single exception of a
/// disconnect cancelling a pending connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl ConnectionStatus {
    /// Whether the status is one of the two in-flight transition states.
    pub fn is_transitional(self) -> bool {
        matches!(self, ConnectionStatus::Connecting | ConnectionStatus::Disconnecting)
    }
}

/// Premium/free filter applied to catalog views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogFilter {
    All,
    Free,
    Premium,
}

/// Filters a catalog snapshot for display.
///
/// `search` is matched case-insensitively against the server name and
/// country; an empty search matches everything.  The tier filter keeps
/// premium-only, free-only, or all entries.  The catalog itself is not
/// modified; the result borrows from it in catalog order.
pub fn filter_catalog<'a>(
    servers: &'a [ServerEntry],
    search: &str,
    filter: CatalogFilter,
) -> Vec<&'a ServerEntry> {
    let needle = search.trim().to_lowercase();
    servers
        .iter()
        .filter(|s| {
            needle.is_empty()
                || s.name.to_lowercase().contains(&needle)
                || s.country.to_lowercase().contains(&needle)
        })
        .filter(|s| match filter {
            CatalogFilter::All => true,
            CatalogFilter::Free => !s.is_premium,
            CatalogFilter::Premium => s.is_premium,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_server(id: &str, name: &str, country: &str, premium: bool) -> ServerEntry {
        ServerEntry {
            id: id.to_string(),
            name: name.to_string(),
            country: country.to_string(),
            country_code: "XX".to_string(),
            city: "City".to_string(),
            protocol: ProtocolKind::Wireguard,
            host: format!("{id}.veil.example"),
            port: 51820,
            is_premium: premium,
            is_online: true,
            load_percentage: 40,
            ping_ms: 25,
        }
    }

    fn make_catalog() -> Vec<ServerEntry> {
        vec![
            make_server("s1", "Istanbul Fast", "Turkey", false),
            make_server("s2", "Istanbul Pro", "Turkey", true),
            make_server("s3", "Frankfurt Secure", "Germany", true),
            make_server("s4", "New York Free", "United States", false),
        ]
    }

    #[test]
    fn test_filter_catalog_empty_search_and_all_returns_everything() {
        let catalog = make_catalog();
        let result = filter_catalog(&catalog, "", CatalogFilter::All);
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn test_filter_catalog_matches_name_case_insensitively() {
        let catalog = make_catalog();
        let result = filter_catalog(&catalog, "ISTANBUL", CatalogFilter::All);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|s| s.name.contains("Istanbul")));
    }

    #[test]
    fn test_filter_catalog_matches_country() {
        let catalog = make_catalog();
        let result = filter_catalog(&catalog, "germany", CatalogFilter::All);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "s3");
    }

    #[test]
    fn test_filter_catalog_free_excludes_premium() {
        let catalog = make_catalog();
        let result = filter_catalog(&catalog, "", CatalogFilter::Free);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|s| !s.is_premium));
    }

    #[test]
    fn test_filter_catalog_premium_with_search_combines_both() {
        let catalog = make_catalog();
        let result = filter_catalog(&catalog, "istanbul", CatalogFilter::Premium);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "s2");
    }

    #[test]
    fn test_filter_catalog_preserves_catalog_order() {
        let catalog = make_catalog();
        let result = filter_catalog(&catalog, "", CatalogFilter::All);
        let ids: Vec<_> = result.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2", "s3", "s4"]);
    }

    #[test]
    fn test_connection_status_transitional_states() {
        assert!(ConnectionStatus::Connecting.is_transitional());
        assert!(ConnectionStatus::Disconnecting.is_transitional());
        assert!(!ConnectionStatus::Disconnected.is_transitional());
        assert!(!ConnectionStatus::Connected.is_transitional());
    }

    #[test]
    fn test_server_entry_deserializes_backend_schema() {
        // Wire shape as produced by the backend catalog endpoint.
        let json = r#"{
            "id": "p1",
            "name": "Istanbul Premium",
            "country": "Turkey",
            "country_code": "TR",
            "city": "Istanbul",
            "proxy_type": "socks5",
            "host": "tr1.veil.example",
            "port": 1080,
            "is_premium": true,
            "is_online": true,
            "load_percentage": 20,
            "ping_ms": 15
        }"#;
        let entry: ServerEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.protocol, ProtocolKind::Socks5);
        assert_eq!(entry.port, 1080);
        assert!(entry.is_premium);
    }
}
