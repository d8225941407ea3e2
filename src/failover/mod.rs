//! Failover orchestration module
//!
//! Composes the route controller, the geo-consensus verifier, and the
//! backup pool client into the bounded switch-verify-failover state
//! machine that callers invoke per device-provisioning request.

mod attempt;
mod error;
mod orchestrator;

pub use attempt::{Allocation, AttemptResult, AttemptStage};
pub use error::{FailoverError, FailoverResult};
pub use orchestrator::{AllocationRequest, FailoverOrchestrator, FailoverSettings};
