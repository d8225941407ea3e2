//! Region codes
//!
//! A region identifies the country a route is expected to egress from,
//! using the two-letter codes the fleet configuration already carries
//! (e.g. `GB`, `SG`, `HK`). Codes are normalized to uppercase at
//! construction so every comparison in the crate is effectively
//! case-insensitive without repeated `to_uppercase` calls on hot paths.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error returned when a region code cannot be constructed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid region code {code:?}: {reason}")]
pub struct InvalidRegion {
    /// The rejected input, as given
    pub code: String,
    /// Why it was rejected
    pub reason: &'static str,
}

/// A normalized egress region code
///
/// Construction trims and uppercases the input; two `Region`s compare
/// equal whenever their codes match case-insensitively.
///
/// # Example
///
/// ```
/// use exitline::Region;
///
/// let a = Region::new("hk").unwrap();
/// let b = Region::new("HK").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "HK");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region(String);

impl Region {
    /// Create a region from a raw code
    ///
    /// # Errors
    ///
    /// Returns `InvalidRegion` if the code is empty after trimming or
    /// contains non-alphanumeric characters.
    pub fn new(code: &str) -> Result<Self, InvalidRegion> {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(InvalidRegion {
                code: code.to_string(),
                reason: "empty",
            });
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(InvalidRegion {
                code: code.to_string(),
                reason: "must be ASCII alphanumeric",
            });
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// The normalized (uppercase) code
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a raw code
    #[must_use]
    pub fn matches(&self, code: &str) -> bool {
        self.0.eq_ignore_ascii_case(code.trim())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Region {
    type Err = InvalidRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for Region {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Region {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(&raw).map_err(D::Error::custom)
    }
}
