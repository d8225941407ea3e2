//! Route-controller client module
//!
//! Client side of the local control plane that owns route groups. Only
//! two operations exist: apply a route selection to a group and read the
//! group's active route back.

mod api;
mod client;

pub use api::{GroupSnapshot, RouteSelection};
pub use client::{RouteControl, RouteController, MIN_ROUTE_NAME_LEN};
