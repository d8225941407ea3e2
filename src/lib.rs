//! exitline: Exit-line allocation and failover verification
//!
//! This crate provisions verified outbound network identities for a
//! fleet of client devices. Each device must appear to originate
//! traffic from a specific target region; exitline selects an egress
//! route, confirms through independent external observers that the
//! route really egresses from the claimed region, and transparently
//! fails over to a pooled backup route when it does not.
//!
//! # Architecture
//!
//! ```text
//! Device Identity Manager
//!          │ allocate(region, primary route)
//!          ▼
//! ┌─────────────────────────────────────────────────────┐
//! │                FailoverOrchestrator                 │
//! │   switch ──► verify ──► (fail over ──► verify)*     │
//! └───────┬───────────────┬───────────────┬─────────────┘
//!         │               │               │
//!         ▼               ▼               ▼
//!  RouteController  GeoConsensus     BackupPool
//!  (local control   Verifier         Client
//!   plane)          (observers)      (fleet-shared pool)
//! ```
//!
//! Concurrent callers coordinate only through the Backup Pool Service,
//! the sole arbiter of backup-route occupancy; the orchestrator itself
//! holds no shared mutable state.
//!
//! # Quick Start
//!
//! ```no_run
//! use exitline::config::load_config;
//! use exitline::{AllocationRequest, FailoverOrchestrator, Region};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("/etc/exitline/config.json")?;
//! let orchestrator = FailoverOrchestrator::from_config(&config)?;
//!
//! let allocation = orchestrator
//!     .allocate(&AllocationRequest {
//!         region: Region::new("HK")?,
//!         primary_route: "HK_061".into(),
//!         group: "relay".into(),
//!         caller_id: "device-17".into(),
//!     })
//!     .await?;
//!
//! println!("active route: {}", allocation.route);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration types and loading
//! - [`controller`]: Route-controller (local control plane) client
//! - [`error`]: Error types
//! - [`failover`]: The failover orchestrator state machine
//! - [`pool`]: Backup pool service client
//! - [`region`]: Normalized region codes
//! - [`verify`]: Egress region verification via external observers

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod controller;
pub mod error;
pub mod failover;
mod http;
pub mod pool;
pub mod region;
pub mod verify;

// Re-export commonly used types at the crate root
pub use config::{load_config, Config};
pub use controller::{RouteControl, RouteController};
pub use error::{ConfigError, ControlError, ExitLineError, ObserverError, PoolError};
pub use failover::{
    Allocation, AllocationRequest, AttemptResult, AttemptStage, FailoverError,
    FailoverOrchestrator, FailoverSettings,
};
pub use pool::{BackupPool, PoolClient};
pub use region::{InvalidRegion, Region};
pub use verify::{GeoConsensusVerifier, HttpObserver, Observation, Observer, VerificationOutcome};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
