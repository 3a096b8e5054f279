//! Identity type.
//!
//! This module defines [`Identity`], the opaque token that identifies both a
//! tenant (the owner of a collection) and an actor (an owner or a friend
//! acting on a document).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An opaque identity token, typically a URN such as `urn:github:1234`.
///
/// The store never interprets the internal structure of an identity; two
/// identities are the same principal if and only if their strings are equal.
///
/// # Examples
///
/// ```
/// use nerodesk_store::Identity;
///
/// let owner = Identity::new("urn:test:1");
/// assert_eq!(owner.as_str(), "urn:test:1");
/// assert_eq!(owner, Identity::from("urn:test:1"));
/// assert_ne!(owner, Identity::from("URN:TEST:1"));
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Creates a new identity from the given string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the identity and returns the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.0)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Identity {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&Identity> for Identity {
    fn from(id: &Identity) -> Self {
        id.clone()
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
