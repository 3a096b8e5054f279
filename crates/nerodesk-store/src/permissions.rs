//! Permission decisions for document operations.
//!
//! This module defines the access-control model: what an acting identity may
//! do with a document, given its owner and its [`Attributes`].
//!
//! Decisions are pure and are evaluated fresh on every call, since friend
//! lists and visibility may change between two requests.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attributes::Attributes;
use crate::identity::Identity;

/// Actions that can be requested on a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Read content (whole or ranged).
    Read,
    /// Create, replace or delete content.
    Write,
    /// Change visibility or the friend set.
    Manage,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Read => write!(f, "read"),
            Action::Write => write!(f, "write"),
            Action::Manage => write!(f, "manage"),
        }
    }
}

/// Why a decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// The acting identity owns the document.
    Owner,
    /// The document is visible to everyone.
    Visible,
    /// The acting identity is in the friend set.
    Friend,
    /// Only the owner may write or manage.
    NotOwner,
    /// The document is private and the identity is not a friend.
    NotShared,
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDecision {
    /// Whether the action may proceed.
    pub allowed: bool,
    /// Why.
    pub reason: DecisionReason,
}

impl PermissionDecision {
    fn allow(reason: DecisionReason) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    fn deny(reason: DecisionReason) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

/// Stateless decision logic for document access.
///
/// # Rules
///
/// 1. The owner may do everything.
/// 2. Nobody else may write or manage.
/// 3. Anyone may read a visible document; friends may read a private one.
///
/// # Examples
///
/// ```
/// use nerodesk_store::{Action, Attributes, Identity, PermissionEngine};
///
/// let owner = Identity::new("urn:test:1");
/// let friend = Identity::new("urn:test:2");
/// let attrs = Attributes::new(false, vec![friend.clone()]);
///
/// assert!(PermissionEngine::authorize(&friend, Some(&attrs), &owner, Action::Read).allowed);
/// assert!(!PermissionEngine::authorize(&friend, Some(&attrs), &owner, Action::Write).allowed);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionEngine;

impl PermissionEngine {
    /// Decides whether `identity` may perform `action` on a document owned by
    /// `owner`. Absent attributes are the defaults: private, no friends.
    pub fn authorize(
        identity: &Identity,
        attributes: Option<&Attributes>,
        owner: &Identity,
        action: Action,
    ) -> PermissionDecision {
        if identity == owner {
            return PermissionDecision::allow(DecisionReason::Owner);
        }

        match action {
            Action::Write | Action::Manage => PermissionDecision::deny(DecisionReason::NotOwner),
            Action::Read => match attributes {
                Some(attrs) if attrs.visible() => PermissionDecision::allow(DecisionReason::Visible),
                Some(attrs) if attrs.is_friend(identity) => {
                    PermissionDecision::allow(DecisionReason::Friend)
                }
                _ => PermissionDecision::deny(DecisionReason::NotShared),
            },
        }
    }
}
