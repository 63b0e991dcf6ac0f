//! The observed identity of the current session.

use mandap_core::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who the session source says is currently authenticated.
///
/// The engine never creates identities on its own; they come from
/// [`AuthEvent`](crate::AuthEvent)s emitted by the session source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "user", rename_all = "snake_case")]
pub enum Identity {
    /// No session.
    #[default]
    Anonymous,
    /// A session for the given user.
    SignedIn(UserId),
}

impl Identity {
    /// Returns the signed-in user, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Anonymous => None,
            Self::SignedIn(user) => Some(*user),
        }
    }

    /// Returns true if there is a session.
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        matches!(self, Self::SignedIn(_))
    }
}

impl From<Option<UserId>> for Identity {
    fn from(user: Option<UserId>) -> Self {
        user.map_or(Self::Anonymous, Self::SignedIn)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "anonymous"),
            Self::SignedIn(user) => write!(f, "{user}"),
        }
    }
}
