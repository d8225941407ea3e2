//! Backup pool client module
//!
//! Client side of the fleet-shared backup route inventory. Occupancy
//! bookkeeping lives entirely in the pool service; this module only
//! acquires, records, and clears leases on the orchestrator's behalf.

mod api;
mod client;

pub use api::{AvailableBackupResponse, OccupancyRequest, OccupancyResponse};
pub use client::{BackupPool, PoolClient};
