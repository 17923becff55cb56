//! Encoder quality parameter.
//!
//! Perceptual encoding is only beneficial from quality 84 upward; below that
//! the encoder would spend its search budget producing ordinary JPEGs. Values
//! are validated once per invocation and never clamped.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CrunchError;

/// A validated encoder quality in `Quality::MIN..=Quality::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Quality(u8);

impl Quality {
    /// Lowest accepted quality.
    pub const MIN: u8 = 84;
    /// Highest accepted quality.
    pub const MAX: u8 = 110;
    /// Quality used when none is configured.
    pub const DEFAULT: Quality = Quality(Self::MIN);

    /// Validate a raw quality value.
    pub fn new(value: i64) -> Result<Self, CrunchError> {
        if value < i64::from(Self::MIN) || value > i64::from(Self::MAX) {
            return Err(CrunchError::InvalidQuality {
                value,
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        Ok(Self(value as u8))
    }

    /// The raw quality value.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for Quality {
    type Error = CrunchError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> u8 {
        q.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Quality {
    type Err = CrunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| CrunchError::QualityNotInteger(s.to_string()))?;
        Self::new(value)
    }
}
