//! Access gating.
//!
//! The gate never suspends and never does I/O. Given a role (or `None` while
//! the role is still being resolved) and a route's requirement it answers
//! allow, wait, or redirect. It also picks the landing page after sign-in
//! and sign-up.

use crate::config::{AccessConfig, Destination, Destinations};
use crate::role::Role;
use serde::{Deserialize, Serialize};

/// What a protected route demands of the current role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionRequirement {
    /// Anyone, signed in or not.
    Public,
    /// Any signed-in identity.
    SignedIn,
    /// Only identities without a session (sign-in and sign-up pages).
    SignedOut,
    /// Registered service providers.
    ServiceProvider,
    /// Admins.
    Admin,
}

impl AdmissionRequirement {
    /// Returns true if `role` may enter.
    #[must_use]
    pub fn is_satisfied_by(&self, role: &Role) -> bool {
        match self {
            Self::Public => true,
            Self::SignedIn => role.is_signed_in(),
            Self::SignedOut => !role.is_signed_in(),
            Self::ServiceProvider => matches!(role, Role::ServiceProvider(_)),
            Self::Admin => role.is_admin(),
        }
    }
}

/// Why a route turned the caller away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// The route needs a session.
    NotSignedIn,
    /// The route is admin-only.
    NotAdmin,
    /// The route is for registered providers.
    NotProvider,
    /// The route is for visitors without a session.
    AlreadySignedIn,
}

/// A refused admission and where to send the caller instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Denial {
    /// Where the caller should navigate.
    pub target: Destination,
    /// Why admission was refused.
    pub reason: DenialReason,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AdmissionResult {
    /// Enter.
    Allow,
    /// The role is not resolved yet. Show a waiting state; neither allow
    /// nor deny.
    Pending,
    /// Navigate elsewhere.
    DenyRedirect(Denial),
}

impl AdmissionResult {
    /// Returns true for [`AdmissionResult::Pending`].
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Maps roles and requirements to admission results and landing pages.
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    destinations: Destinations,
}

impl AccessGate {
    /// Creates a gate that redirects to `destinations`.
    #[must_use]
    pub fn new(destinations: Destinations) -> Self {
        Self { destinations }
    }

    /// Creates a gate from loaded configuration.
    #[must_use]
    pub fn from_config(config: &AccessConfig) -> Self {
        Self::new(config.destinations.clone())
    }

    /// Returns the configured destinations.
    #[must_use]
    pub fn destinations(&self) -> &Destinations {
        &self.destinations
    }

    /// Decides admission for `requirement`.
    ///
    /// `role` must be the resolved role of the current identity, or `None`
    /// while that resolution is still in flight.
    #[must_use]
    pub fn check(&self, role: Option<&Role>, requirement: AdmissionRequirement) -> AdmissionResult {
        let Some(role) = role else {
            return AdmissionResult::Pending;
        };
        if requirement.is_satisfied_by(role) {
            return AdmissionResult::Allow;
        }
        AdmissionResult::DenyRedirect(Denial {
            target: self.deny_target(requirement).clone(),
            reason: denial_reason(role, requirement),
        })
    }

    /// Picks where to send a freshly signed-in or signed-up identity.
    ///
    /// Admin is checked before provider, matching role reconciliation.
    #[must_use]
    pub fn landing_for(&self, role: &Role) -> Destination {
        match role {
            Role::Admin => self.destinations.admin.clone(),
            Role::ServiceProvider(_) => self.destinations.provider_dashboard.clone(),
            Role::RegularUser | Role::Anonymous => self.destinations.home.clone(),
        }
    }

    fn deny_target(&self, requirement: AdmissionRequirement) -> &Destination {
        match requirement {
            AdmissionRequirement::SignedIn | AdmissionRequirement::Admin => {
                &self.destinations.sign_in
            }
            AdmissionRequirement::ServiceProvider => &self.destinations.provider_onboarding,
            AdmissionRequirement::SignedOut | AdmissionRequirement::Public => {
                &self.destinations.home
            }
        }
    }
}

fn denial_reason(role: &Role, requirement: AdmissionRequirement) -> DenialReason {
    match requirement {
        AdmissionRequirement::SignedOut => DenialReason::AlreadySignedIn,
        _ if !role.is_signed_in() => DenialReason::NotSignedIn,
        AdmissionRequirement::Admin => DenialReason::NotAdmin,
        AdmissionRequirement::ServiceProvider => DenialReason::NotProvider,
        AdmissionRequirement::Public | AdmissionRequirement::SignedIn => DenialReason::NotSignedIn,
    }
}
