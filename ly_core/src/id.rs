use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Unique identifier backed by ULID
///
/// Stored as its 26-character string form in every table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Id(ulid::Ulid);

impl Id {
    /// Generate a new ID
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Parse an ID coming from a request path or body
    ///
    /// Malformed IDs can never match a stored row, so they surface as `NotFound`
    /// with the caller-supplied entity name.
    pub fn parse_for(entity: &str, raw: &str) -> Result<Self> {
        raw.trim()
            .parse()
            .map_err(|_| Error::NotFound(format!("{} not found", entity)))
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Id {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}
