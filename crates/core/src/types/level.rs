//! Compression effort levels

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

/// A validated deflate effort level in `0..=9`
///
/// The four named tiers are associated constants; any other value in range
/// is accepted as well and is persisted as its integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct CompressionLevel(u32);

impl CompressionLevel {
    /// Store without compressing
    pub const NONE: Self = Self(0);
    /// Fastest compression
    pub const FAST: Self = Self(1);
    /// Default trade-off between speed and ratio
    pub const BALANCED: Self = Self(6);
    /// Best ratio
    pub const MAX: Self = Self(9);

    /// Create a level, rejecting anything outside `0..=9`
    pub fn new(level: i64) -> Result<Self> {
        if (0..=9).contains(&level) {
            Ok(Self(level as u32))
        } else {
            Err(Error::InvalidLevel { level })
        }
    }

    /// The numeric level handed to the deflate encoder
    pub fn value(self) -> u32 {
        self.0
    }

    /// Name of the tier this level corresponds to, if any
    pub fn tier_name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("NONE"),
            1 => Some("FAST"),
            6 => Some("BALANCED"),
            9 => Some("MAX"),
            _ => None,
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::BALANCED
    }
}

impl Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tier_name() {
            Some(name) => write!(f, "{} ({})", name, self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

impl TryFrom<u32> for CompressionLevel {
    type Error = Error;

    fn try_from(level: u32) -> Result<Self> {
        Self::new(i64::from(level))
    }
}

impl From<CompressionLevel> for u32 {
    fn from(level: CompressionLevel) -> Self {
        level.0
    }
}

impl FromStr for CompressionLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Ok(Self::NONE),
            "FAST" => Ok(Self::FAST),
            "BALANCED" => Ok(Self::BALANCED),
            "MAX" => Ok(Self::MAX),
            other => other
                .parse::<i64>()
                .map_err(|_| Error::configuration(format!("unknown compression level '{s}'")))
                .and_then(Self::new),
        }
    }
}
