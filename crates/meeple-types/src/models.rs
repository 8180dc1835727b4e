use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What the owner wants to do with the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Offering,
    Selling,
    Wanting,
}

impl ListingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offering => "offering",
            Self::Selling => "selling",
            Self::Wanting => "wanting",
        }
    }
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingKind {
    type Err = UnknownListingKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offering" => Ok(Self::Offering),
            "selling" => Ok(Self::Selling),
            "wanting" => Ok(Self::Wanting),
            other => Err(UnknownListingKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnknownListingKind(pub String);

impl fmt::Display for UnknownListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown listing kind: {}", self.0)
    }
}

impl std::error::Error for UnknownListingKind {}
