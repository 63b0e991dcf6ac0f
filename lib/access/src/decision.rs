//! Role decisions and the cell that publishes them.
//!
//! A [`RoleDecision`] is produced once per resolution and never mutated.
//! The [`DecisionCell`] holds the per-identity state machine
//! (`Unresolved → Resolving → Resolved`) as one value; the writer replaces
//! the whole value, so readers never observe a role assembled from two
//! different resolutions.
//!
//! Every resolution is stamped with a [`ResolutionTicket`]. A result is
//! committed only while its ticket is still the current one, which drops
//! late results for identities that are no longer current.

use crate::identity::Identity;
use crate::lookup::LookupKind;
use crate::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::debug;

/// The resolved role of one identity at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDecision {
    role: Role,
    resolved_at: DateTime<Utc>,
    source: Identity,
    /// Lookups that failed while producing this decision.
    degraded_by: Vec<LookupKind>,
}

impl RoleDecision {
    /// Creates a decision for `source`, stamped now.
    #[must_use]
    pub fn new(role: Role, source: Identity) -> Self {
        Self {
            role,
            resolved_at: Utc::now(),
            source,
            degraded_by: Vec::new(),
        }
    }

    /// The decision for a session-less identity.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(Role::Anonymous, Identity::Anonymous)
    }

    /// Records the lookups that failed while producing this decision.
    #[must_use]
    pub fn with_failed_lookups(mut self, failed: Vec<LookupKind>) -> Self {
        self.degraded_by = failed;
        self
    }

    /// Returns the role.
    #[must_use]
    pub fn role(&self) -> &Role {
        &self.role
    }

    /// Returns when the decision was made.
    #[must_use]
    pub fn resolved_at(&self) -> DateTime<Utc> {
        self.resolved_at
    }

    /// Returns the identity the decision was made for.
    #[must_use]
    pub fn source(&self) -> Identity {
        self.source
    }

    /// Returns the lookups that failed while producing this decision.
    #[must_use]
    pub fn degraded_by(&self) -> &[LookupKind] {
        &self.degraded_by
    }

    /// Returns true if the role was decided without a complete set of
    /// lookup answers.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.degraded_by.is_empty()
    }

    /// Returns true if this decision may be trusted for `identity`.
    #[must_use]
    pub fn is_for(&self, identity: Identity) -> bool {
        self.source == identity
    }
}

/// Stamp identifying one resolution attempt.
///
/// The generation increases on every identity change, so even a sign-out
/// followed by a sign-in as the same user supersedes the older attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolutionTicket {
    identity: Identity,
    generation: u64,
}

impl ResolutionTicket {
    /// The identity being resolved.
    #[must_use]
    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// The attempt's position in the sequence of identity changes.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Where the role of the current identity stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionState {
    /// No identity has been observed yet.
    Unresolved,
    /// Lookups for the ticket's identity are in flight.
    Resolving(ResolutionTicket),
    /// The ticket's resolution finished.
    Resolved {
        ticket: ResolutionTicket,
        decision: RoleDecision,
    },
}

impl ResolutionState {
    /// Returns the decision, if resolution finished.
    #[must_use]
    pub fn decision(&self) -> Option<&RoleDecision> {
        match self {
            Self::Resolved { decision, .. } => Some(decision),
            Self::Unresolved | Self::Resolving(_) => None,
        }
    }

    /// Returns the ticket of the current attempt.
    #[must_use]
    pub fn ticket(&self) -> Option<ResolutionTicket> {
        match self {
            Self::Unresolved => None,
            Self::Resolving(ticket) | Self::Resolved { ticket, .. } => Some(*ticket),
        }
    }
}

/// Single-writer, multi-reader holder of the current [`ResolutionState`].
#[derive(Debug)]
pub struct DecisionCell {
    state: watch::Sender<ResolutionState>,
    generation: AtomicU64,
}

impl DecisionCell {
    /// Creates an unresolved cell.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(ResolutionState::Unresolved);
        Self {
            state,
            generation: AtomicU64::new(0),
        }
    }

    fn next_ticket(&self, identity: Identity) -> ResolutionTicket {
        ResolutionTicket {
            identity,
            generation: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
        }
    }

    /// Starts a resolution for `identity`, superseding any attempt in flight.
    pub fn begin(&self, identity: Identity) -> ResolutionTicket {
        let ticket = self.next_ticket(identity);
        self.state.send_replace(ResolutionState::Resolving(ticket));
        ticket
    }

    /// Publishes a decision that needed no lookups, superseding any attempt
    /// in flight.
    pub fn settle(&self, decision: RoleDecision) -> ResolutionTicket {
        let ticket = self.next_ticket(decision.source());
        self.state
            .send_replace(ResolutionState::Resolved { ticket, decision });
        ticket
    }

    /// Commits the result of the attempt identified by `ticket`.
    ///
    /// Returns false, dropping the decision, if a newer attempt has started
    /// since or the decision was made for a different identity.
    pub fn complete(&self, ticket: ResolutionTicket, decision: RoleDecision) -> bool {
        let committed = self.state.send_if_modified(|state| {
            let current = matches!(state, ResolutionState::Resolving(t) if *t == ticket);
            if !current || !decision.is_for(ticket.identity) {
                return false;
            }
            *state = ResolutionState::Resolved {
                ticket,
                decision: decision.clone(),
            };
            true
        });
        if !committed {
            debug!(
                identity = %ticket.identity,
                generation = ticket.generation,
                "discarding stale role decision"
            );
        }
        committed
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> ResolutionState {
        self.state.borrow().clone()
    }

    /// Returns the committed decision if it was made for `identity`.
    #[must_use]
    pub fn decision_for(&self, identity: Identity) -> Option<RoleDecision> {
        self.state
            .borrow()
            .decision()
            .filter(|decision| decision.is_for(identity))
            .cloned()
    }

    /// Subscribes to state replacements.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ResolutionState> {
        self.state.subscribe()
    }
}

impl Default for DecisionCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mandap_core::UserId;

    fn signed_in() -> Identity {
        Identity::SignedIn(UserId::new())
    }

    #[test]
    fn new_cell_is_unresolved() {
        let cell = DecisionCell::new();
        assert_eq!(cell.snapshot(), ResolutionState::Unresolved);
        assert!(cell.decision_for(Identity::Anonymous).is_none());
    }

    #[test]
    fn begin_then_complete_commits() {
        let cell = DecisionCell::new();
        let identity = signed_in();

        let ticket = cell.begin(identity);
        assert_eq!(cell.snapshot(), ResolutionState::Resolving(ticket));
        assert!(cell.decision_for(identity).is_none());

        assert!(cell.complete(ticket, RoleDecision::new(Role::RegularUser, identity)));
        let decision = cell.decision_for(identity).expect("committed");
        assert_eq!(decision.role(), &Role::RegularUser);
        assert_eq!(decision.source(), identity);
    }

    #[test]
    fn superseded_ticket_is_discarded() {
        let cell = DecisionCell::new();
        let first = signed_in();
        let second = signed_in();

        let stale = cell.begin(first);
        let fresh = cell.begin(second);

        assert!(!cell.complete(stale, RoleDecision::new(Role::Admin, first)));
        assert_eq!(cell.snapshot(), ResolutionState::Resolving(fresh));

        assert!(cell.complete(fresh, RoleDecision::new(Role::RegularUser, second)));
        assert!(!cell.complete(stale, RoleDecision::new(Role::Admin, first)));
        assert!(cell.decision_for(first).is_none());
        assert_eq!(
            cell.decision_for(second).map(|d| *d.role()),
            Some(Role::RegularUser)
        );
    }

    #[test]
    fn same_identity_after_sign_out_gets_a_new_ticket() {
        let cell = DecisionCell::new();
        let identity = signed_in();

        let before = cell.begin(identity);
        cell.settle(RoleDecision::anonymous());
        let after = cell.begin(identity);

        assert_eq!(before.identity(), after.identity());
        assert!(after.generation() > before.generation());
        assert!(!cell.complete(before, RoleDecision::new(Role::Admin, identity)));
        assert!(cell.complete(after, RoleDecision::new(Role::RegularUser, identity)));
    }

    #[test]
    fn decision_for_wrong_identity_is_rejected() {
        let cell = DecisionCell::new();
        let identity = signed_in();
        let ticket = cell.begin(identity);

        assert!(!cell.complete(ticket, RoleDecision::new(Role::Admin, signed_in())));
        assert_eq!(cell.snapshot(), ResolutionState::Resolving(ticket));
    }

    #[test]
    fn settle_supersedes_in_flight_attempt() {
        let cell = DecisionCell::new();
        let identity = signed_in();
        let ticket = cell.begin(identity);

        cell.settle(RoleDecision::anonymous());

        assert!(!cell.complete(ticket, RoleDecision::new(Role::Admin, identity)));
        assert_eq!(
            cell.decision_for(Identity::Anonymous).map(|d| *d.role()),
            Some(Role::Anonymous)
        );
    }

    #[test]
    fn degraded_decisions_report_failed_lookups() {
        let decision = RoleDecision::new(Role::RegularUser, signed_in())
            .with_failed_lookups(vec![LookupKind::Admin]);
        assert!(decision.is_degraded());
        assert_eq!(decision.degraded_by(), &[LookupKind::Admin]);
        assert!(!RoleDecision::anonymous().is_degraded());
    }

    #[test]
    fn decision_serialization_roundtrip() {
        let decision = RoleDecision::new(Role::Admin, signed_in());
        let json = serde_json::to_string(&decision).expect("serialize");
        let parsed: RoleDecision = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decision, parsed);
    }
}
