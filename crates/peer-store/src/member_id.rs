//! Member identity type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity of a member (its hostname).
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    /// Creates a new member id.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the member id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for MemberId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for MemberId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
