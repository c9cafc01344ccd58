//! Dense integer handles.
//!
//! A [`Handle`] is the insertion position of a vector in a vector index.
//! The chunk store is keyed by the same handles, so the two containers
//! stay aligned without parallel-array bookkeeping.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Opaque position of an entry in a vector index / chunk store pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(u32);

impl Handle {
    /// Create a handle from its raw value.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw value.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// The position as a slice index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<usize> for Handle {
    type Error = Error;

    fn try_from(position: usize) -> Result<Self> {
        u32::try_from(position)
            .map(Self)
            .map_err(|_| Error::invalid_data(format!("position {position} exceeds handle range")))
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
