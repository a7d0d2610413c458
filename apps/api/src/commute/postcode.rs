use std::fmt;

use serde::{Deserialize, Serialize};

/// Uppercases and removes every whitespace character. No postal-format validation:
/// the distance provider is the only judge of whether a postcode exists.
pub fn normalize_postcode(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Ordered (origin, destination) key used for commute lookups and caching.
///
/// Both sides are normalized on construction, so equality and hashing are defined on
/// the normalized strings: `"sw1a 1aa"` and `"SW1A1AA"` are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PostcodePair {
    origin: String,
    destination: String,
}

impl PostcodePair {
    pub fn new(origin: &str, destination: &str) -> Self {
        Self {
            origin: normalize_postcode(origin),
            destination: normalize_postcode(destination),
        }
    }

    /// `None` when either side is blank after normalization.
    pub fn try_new(origin: &str, destination: &str) -> Option<Self> {
        let pair = Self::new(origin, destination);
        (!pair.origin.is_empty() && !pair.destination.is_empty()).then_some(pair)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }
}

impl fmt::Display for PostcodePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.origin, self.destination)
    }
}
