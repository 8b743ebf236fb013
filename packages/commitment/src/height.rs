//! Revision-aware block heights

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// A block height on a counterparty chain.
///
/// Ordered lexicographically by `(revision_number, revision_height)`, which the derived
/// `Ord` gives us through field order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Height {
    /// Chain revision, bumped on upgrades that reset block numbers
    pub revision_number: u64,
    /// Block number within the revision
    pub revision_height: u64,
}

impl Height {
    /// Create a new height
    #[must_use]
    pub const fn new(revision_number: u64, revision_height: u64) -> Self {
        Self {
            revision_number,
            revision_height,
        }
    }

    /// The zero height, used as "not frozen"
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    /// Whether this is the zero height
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.revision_number == 0 && self.revision_height == 0
    }

    /// The height `delta` blocks later in the same revision
    #[must_use]
    pub const fn increment_by(&self, delta: u64) -> Self {
        Self::new(self.revision_number, self.revision_height + delta)
    }

    /// The previous height in the same revision, if any
    #[must_use]
    pub const fn decrement(&self) -> Option<Self> {
        match self.revision_height.checked_sub(1) {
            Some(h) => Some(Self::new(self.revision_number, h)),
            None => None,
        }
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.revision_number, self.revision_height)
    }
}

impl FromStr for Height {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (number, height) = s
            .split_once('-')
            .ok_or_else(|| CodecError::InvalidHeight(s.to_string()))?;
        let parse = |part: &str| {
            part.parse::<u64>()
                .map_err(|_| CodecError::InvalidHeight(s.to_string()))
        };
        Ok(Self::new(parse(number)?, parse(height)?))
    }
}
