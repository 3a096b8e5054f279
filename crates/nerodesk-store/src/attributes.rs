//! Per-document access-control metadata.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// Access-control metadata attached to a document.
///
/// Attributes live in the backend's metadata channel, independently of the
/// document content: friends may be added before the first write, and a
/// document that was never touched by a management operation simply has the
/// default attributes (private, no friends).
///
/// The owner is never a member of `friends`; owner access is implicit.
///
/// # Examples
///
/// ```
/// use nerodesk_store::{Attributes, Identity};
///
/// let mut attrs = Attributes::default();
/// assert!(!attrs.visible());
///
/// attrs.add_friend(Identity::new("urn:test:2"));
/// assert!(attrs.is_friend(&Identity::new("urn:test:2")));
///
/// attrs.show(true);
/// assert!(attrs.visible());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    /// Anyone may read the document when set.
    #[serde(default)]
    visible: bool,

    /// Identities explicitly allowed to read.
    #[serde(default)]
    friends: BTreeSet<Identity>,
}

impl Attributes {
    /// Creates attributes with the given visibility and friend set.
    pub fn new(visible: bool, friends: impl IntoIterator<Item = Identity>) -> Self {
        Self {
            visible,
            friends: friends.into_iter().collect(),
        }
    }

    /// Returns the visibility flag.
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Sets the visibility flag.
    pub fn show(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Returns the friend set in sorted order.
    pub fn friends(&self) -> &BTreeSet<Identity> {
        &self.friends
    }

    /// Returns `true` if the identity is in the friend set.
    pub fn is_friend(&self, identity: &Identity) -> bool {
        self.friends.contains(identity)
    }

    /// Adds a friend. Returns `false` if it was already present.
    pub fn add_friend(&mut self, friend: Identity) -> bool {
        self.friends.insert(friend)
    }

    /// Removes a friend. Returns `false` if it was not present.
    pub fn eject_friend(&mut self, friend: &Identity) -> bool {
        self.friends.remove(friend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_private_without_friends() {
        let attrs = Attributes::default();
        assert!(!attrs.visible());
        assert!(attrs.friends().is_empty());
    }

    #[test]
    fn test_friend_operations_are_idempotent() {
        let friend = Identity::new("urn:test:2");
        let mut attrs = Attributes::default();

        assert!(attrs.add_friend(friend.clone()));
        assert!(!attrs.add_friend(friend.clone()));
        assert_eq!(attrs.friends().len(), 1);

        assert!(attrs.eject_friend(&friend));
        assert!(!attrs.eject_friend(&friend));
        assert_eq!(attrs, Attributes::default());
    }

    #[test]
    fn test_friends_sorted() {
        let attrs = Attributes::new(
            false,
            vec![Identity::new("c"), Identity::new("a"), Identity::new("b")],
        );
        let names: Vec<&str> = attrs.friends().iter().map(Identity::as_str).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_serde_defaults_missing_fields() {
        let attrs: Attributes = serde_json::from_str("{}").unwrap();
        assert_eq!(attrs, Attributes::default());

        let attrs: Attributes =
            serde_json::from_str(r#"{"visible":true,"friends":["urn:test:3"]}"#).unwrap();
        assert!(attrs.visible());
        assert!(attrs.is_friend(&Identity::new("urn:test:3")));
    }
}
