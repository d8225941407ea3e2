//! Backup pool service wire types
//!
//! The pool speaks a small request/response surface:
//! `GET available-backup?region=<code>&caller=<id>` hands out a free
//! route, `POST occupancy` records or clears a lease.

use serde::{Deserialize, Serialize};

/// Response to an `available-backup` query
#[derive(Debug, Clone, Deserialize)]
pub struct AvailableBackupResponse {
    /// Whether a route was handed out
    pub success: bool,

    /// Name of the granted route, present on success
    #[serde(default)]
    pub line_name: Option<String>,

    /// Server-side failure description, present on refusal
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of an occupancy report
///
/// `status: true` records a lease, `status: false` clears one. Clearing
/// a route with no lease is a pool-side no-op, never an error.
#[derive(Debug, Clone, Serialize)]
pub struct OccupancyRequest<'a> {
    /// Caller holding or releasing the route
    pub caller: &'a str,

    /// Route the report is about
    pub line_name: &'a str,

    /// true = occupied, false = released
    pub status: bool,

    /// Region the route belongs to
    pub region: &'a str,
}

/// Response to an occupancy report
#[derive(Debug, Clone, Deserialize)]
pub struct OccupancyResponse {
    /// Whether the report was recorded
    pub success: bool,

    /// Server-side failure description, present on refusal
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_backup_success_parse() {
        let resp: AvailableBackupResponse =
            serde_json::from_str(r#"{"success": true, "line_name": "HK_091"}"#).unwrap();
        assert!(resp.success);
        assert_eq!(resp.line_name.as_deref(), Some("HK_091"));
        assert!(resp.error.is_none());
    }

    #[test]
    fn test_available_backup_refusal_parse() {
        let resp: AvailableBackupResponse =
            serde_json::from_str(r#"{"success": false, "error": "no free line in HK"}"#).unwrap();
        assert!(!resp.success);
        assert!(resp.line_name.is_none());
        assert_eq!(resp.error.as_deref(), Some("no free line in HK"));
    }

    #[test]
    fn test_occupancy_request_serializes() {
        let body = serde_json::to_string(&OccupancyRequest {
            caller: "device-17",
            line_name: "HK_091",
            status: true,
            region: "HK",
        })
        .unwrap();
        assert!(body.contains(r#""caller":"device-17""#));
        assert!(body.contains(r#""status":true"#));
    }

    #[test]
    fn test_occupancy_response_parse() {
        let resp: OccupancyResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(resp.success);
    }
}
