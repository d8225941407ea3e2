//! Egress region verification module
//!
//! Queries independent geolocation observers and decides whether the
//! active route really egresses from the claimed region. The pass rule
//! is first-confirmation-wins; zero confirmations fails closed.

mod consensus;
mod observer;

pub use consensus::{GeoConsensusVerifier, VerificationOutcome};
pub use observer::{HttpObserver, Observation, Observer};
