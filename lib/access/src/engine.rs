//! The access engine.
//!
//! Wires the pieces together: session events go through the
//! [`SessionObserver`], identity changes start a ticketed resolution in the
//! [`DecisionCell`], the [`RoleResolver`] produces the decision, and the
//! [`AccessGate`] turns the committed decision into admission results and
//! landing pages.
//!
//! Events are observed synchronously and in call order; only the lookups
//! suspend. When a newer identity is observed while an older resolution is
//! still in flight, the older result is dropped on commit, so the last
//! observed identity always wins.

use crate::config::Destination;
use crate::decision::{DecisionCell, ResolutionTicket, RoleDecision};
use crate::gate::{AccessGate, AdmissionRequirement, AdmissionResult};
use crate::identity::Identity;
use crate::resolver::{LookupFailure, RoleResolver};
use crate::session::{AuthEvent, SessionObserver};
use futures::{Stream, StreamExt};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

struct EngineInner {
    session: SessionObserver,
    resolver: RoleResolver,
    decisions: DecisionCell,
    gate: AccessGate,
}

/// Role resolution and access gating for one session.
///
/// Cloning is cheap; clones share the same session and decision state.
#[derive(Clone)]
pub struct AccessEngine {
    inner: Arc<EngineInner>,
}

/// A resolution that has been started but whose lookups have not run yet.
///
/// Drive it with [`PendingResolution::run`], inline or on a spawned task.
#[must_use = "the role stays pending until the resolution is run"]
pub struct PendingResolution {
    inner: Arc<EngineInner>,
    ticket: ResolutionTicket,
}

impl PendingResolution {
    /// The ticket this resolution will commit under.
    pub fn ticket(&self) -> ResolutionTicket {
        self.ticket
    }

    /// Runs the lookups and commits the decision.
    ///
    /// Returns false if a newer identity change superseded this resolution
    /// and its decision was dropped.
    pub async fn run(self) -> bool {
        let decision = self.inner.resolver.resolve(self.ticket.identity()).await;
        self.inner.decisions.complete(self.ticket, decision)
    }
}

impl AccessEngine {
    /// Creates an engine that is waiting for the session source's first event.
    #[must_use]
    pub fn new(resolver: RoleResolver, gate: AccessGate) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                session: SessionObserver::new(),
                resolver,
                decisions: DecisionCell::new(),
                gate,
            }),
        }
    }

    /// Returns the session observer.
    #[must_use]
    pub fn session(&self) -> &SessionObserver {
        &self.inner.session
    }

    /// Returns the decision cell.
    #[must_use]
    pub fn decisions(&self) -> &DecisionCell {
        &self.inner.decisions
    }

    /// Returns the gate.
    #[must_use]
    pub fn gate(&self) -> &AccessGate {
        &self.inner.gate
    }

    /// Subscribes to lookup failures.
    #[must_use]
    pub fn failures(&self) -> broadcast::Receiver<LookupFailure> {
        self.inner.resolver.failures()
    }

    /// Observes an event without suspending.
    ///
    /// Sign-outs settle to the anonymous decision right away. A new
    /// signed-in identity marks the role as resolving and returns the
    /// resolution to run; token refreshes change nothing.
    pub fn observe(&self, event: AuthEvent) -> Option<PendingResolution> {
        let transition = self.inner.session.observe(event);
        if !transition.requires_resolution() {
            return None;
        }
        info!(?transition, "identity changed");

        let identity = event.identity();
        if let Some(decision) = self.inner.resolver.resolve_immediate(identity) {
            self.inner.decisions.settle(decision);
            return None;
        }

        let ticket = self.inner.decisions.begin(identity);
        debug!(%identity, generation = ticket.generation(), "role resolution started");
        Some(PendingResolution {
            inner: self.inner.clone(),
            ticket,
        })
    }

    /// Observes an event and runs any resolution it starts to completion.
    pub async fn handle(&self, event: AuthEvent) {
        if let Some(pending) = self.observe(event) {
            pending.run().await;
        }
    }

    /// Consumes session events in order until the stream ends.
    ///
    /// Resolutions run on spawned tasks so a slow lookup never holds back
    /// later events. Must be called within a Tokio runtime.
    pub async fn run<S>(&self, mut events: S)
    where
        S: Stream<Item = AuthEvent> + Unpin,
    {
        while let Some(event) = events.next().await {
            if let Some(pending) = self.observe(event) {
                tokio::spawn(pending.run());
            }
        }
        debug!("session event stream ended");
    }

    /// Returns the committed decision for the current identity, if any.
    #[must_use]
    pub fn current_decision(&self) -> Option<RoleDecision> {
        let session = self.inner.session.snapshot();
        if session.loading {
            return None;
        }
        self.inner.decisions.decision_for(session.identity)
    }

    /// Decides admission for the current identity.
    ///
    /// Pending while the session is bootstrapping or the role is resolving.
    #[must_use]
    pub fn admission(&self, requirement: AdmissionRequirement) -> AdmissionResult {
        let decision = self.current_decision();
        self.inner
            .gate
            .check(decision.as_ref().map(RoleDecision::role), requirement)
    }

    /// Waits until admission for the current identity is no longer pending.
    ///
    /// There is no timeout: a hung lookup keeps this pending.
    pub async fn wait_for_admission(&self, requirement: AdmissionRequirement) -> AdmissionResult {
        let mut session = self.inner.session.subscribe();
        let mut decisions = self.inner.decisions.subscribe();
        loop {
            let result = self.admission(requirement);
            if !result.is_pending() {
                return result;
            }
            let changed = tokio::select! {
                changed = session.changed() => changed,
                changed = decisions.changed() => changed,
            };
            if changed.is_err() {
                return result;
            }
        }
    }

    /// Picks the landing page once `identity`'s role is resolved.
    ///
    /// Used right after sign-in or sign-up. Returns `None` if the session
    /// moves to a different identity before the role is known.
    pub async fn landing_after_sign_in(&self, identity: Identity) -> Option<Destination> {
        let mut decisions = self.inner.decisions.subscribe();
        loop {
            if self.inner.session.identity() != identity {
                debug!(%identity, "identity changed before landing was decided");
                return None;
            }
            if let Some(decision) = self.inner.decisions.decision_for(identity) {
                return Some(self.inner.gate.landing_for(decision.role()));
            }
            if decisions.changed().await.is_err() {
                return None;
            }
        }
    }
}

impl fmt::Debug for AccessEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessEngine")
            .field("session", &self.inner.session.snapshot())
            .field("decisions", &self.inner.decisions.snapshot())
            .finish_non_exhaustive()
    }
}
