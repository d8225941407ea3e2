//! Control-plane wire types
//!
//! The local control plane exposes a Clash-compatible surface:
//! `PUT /proxies/<group>` selects a route, `GET /proxies/<group>` reads
//! the group back as `{now, all}`.

use serde::{Deserialize, Serialize};

/// Body of a route-selection write
#[derive(Debug, Clone, Serialize)]
pub struct RouteSelection<'a> {
    /// Route name to activate within the group
    pub name: &'a str,
}

/// Snapshot of a routing group as read from the control plane
#[derive(Debug, Clone, Deserialize)]
pub struct GroupSnapshot {
    /// Currently active route name; absent on a failed switch
    #[serde(default)]
    pub now: Option<String>,

    /// All route names selectable in this group
    #[serde(default)]
    pub all: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_snapshot_parse() {
        let snapshot: GroupSnapshot = serde_json::from_str(
            r#"{"now": "HK_061", "all": ["HK_061", "HK_091"], "type": "Selector"}"#,
        )
        .unwrap();
        assert_eq!(snapshot.now.as_deref(), Some("HK_061"));
        assert_eq!(snapshot.all.len(), 2);
    }

    #[test]
    fn test_group_snapshot_tolerates_missing_fields() {
        let snapshot: GroupSnapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.now.is_none());
        assert!(snapshot.all.is_empty());
    }

    #[test]
    fn test_route_selection_serializes() {
        let body = serde_json::to_string(&RouteSelection { name: "GB_007" }).unwrap();
        assert_eq!(body, r#"{"name":"GB_007"}"#);
    }
}
