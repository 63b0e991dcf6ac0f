//! Session observation.
//!
//! The session source (the authentication subsystem) emits [`AuthEvent`]s.
//! The [`SessionObserver`] folds them into the current [`Identity`] and
//! classifies each one as a [`SessionTransition`], which tells the engine
//! whether the role has to be resolved again.
//!
//! The observer is the only place that decides whether a session exists.
//! Nothing downstream infers session state from lookup results.

use crate::identity::Identity;
use mandap_core::UserId;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

/// An event emitted by the session source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "user", rename_all = "snake_case")]
pub enum AuthEvent {
    /// The stored session (if any) was loaded at startup.
    InitialSession(Option<UserId>),
    /// A user signed in (or signed up and was signed in).
    SignedIn(UserId),
    /// The session ended.
    SignedOut,
    /// The session's tokens were refreshed.
    TokenRefreshed(UserId),
    /// The user's profile changed (email, metadata).
    UserUpdated(UserId),
}

impl AuthEvent {
    /// The identity the session holds after this event.
    #[must_use]
    pub fn identity(&self) -> Identity {
        match self {
            Self::InitialSession(user) => Identity::from(*user),
            Self::SignedOut => Identity::Anonymous,
            Self::SignedIn(user) | Self::TokenRefreshed(user) | Self::UserUpdated(user) => {
                Identity::SignedIn(*user)
            }
        }
    }
}

/// Snapshot of the observed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    /// The current identity.
    pub identity: Identity,
    /// True until the session source has reported for the first time.
    pub loading: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            identity: Identity::Anonymous,
            loading: true,
        }
    }
}

/// How an event changed the observed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransition {
    /// The first report from the session source.
    Bootstrapped(Identity),
    /// anonymous → signed in.
    SignedIn(UserId),
    /// signed in → anonymous.
    SignedOut(UserId),
    /// signed in as one user → signed in as another.
    Switched { from: UserId, to: UserId },
    /// Same user, new tokens or profile data.
    Refreshed(UserId),
    /// Nothing changed, e.g. a sign-out while already anonymous.
    Unchanged,
}

impl SessionTransition {
    /// Returns true if the role of the new identity must be resolved.
    #[must_use]
    pub fn requires_resolution(&self) -> bool {
        match self {
            Self::Bootstrapped(_) | Self::SignedIn(_) | Self::SignedOut(_) | Self::Switched { .. } => {
                true
            }
            Self::Refreshed(_) | Self::Unchanged => false,
        }
    }

    fn classify(previous: SessionState, next: Identity) -> Self {
        if previous.loading {
            return Self::Bootstrapped(next);
        }
        match (previous.identity, next) {
            (Identity::Anonymous, Identity::Anonymous) => Self::Unchanged,
            (Identity::Anonymous, Identity::SignedIn(user)) => Self::SignedIn(user),
            (Identity::SignedIn(user), Identity::Anonymous) => Self::SignedOut(user),
            (Identity::SignedIn(from), Identity::SignedIn(to)) if from == to => Self::Refreshed(to),
            (Identity::SignedIn(from), Identity::SignedIn(to)) => Self::Switched { from, to },
        }
    }
}

/// Tracks the current identity reported by the session source.
#[derive(Debug)]
pub struct SessionObserver {
    state: watch::Sender<SessionState>,
}

impl SessionObserver {
    /// Creates an observer that is still bootstrapping.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self { state }
    }

    /// Applies an event and returns how it changed the session.
    ///
    /// Events must be observed in the order the session source emitted them.
    pub fn observe(&self, event: AuthEvent) -> SessionTransition {
        let next = event.identity();
        let mut transition = SessionTransition::Unchanged;
        self.state.send_if_modified(|state| {
            transition = SessionTransition::classify(*state, next);
            let modified = state.loading || state.identity != next;
            *state = SessionState {
                identity: next,
                loading: false,
            };
            modified
        });
        debug!(?event, ?transition, "session event observed");
        transition
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Returns the current identity.
    #[must_use]
    pub fn identity(&self) -> Identity {
        self.state.borrow().identity
    }

    /// Returns true while waiting for the session source's first report.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Subscribes to identity and loading changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

impl Default for SessionObserver {
    fn default() -> Self {
        Self::new()
    }
}
