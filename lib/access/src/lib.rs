//! Role resolution and access gating for the mandap marketplace.
//!
//! This crate provides:
//! - Session observation (`SessionObserver`, `AuthEvent`)
//! - Role resolution from the admin-flag and provider lookups (`RoleResolver`)
//! - Identity-stamped decisions (`RoleDecision`, `DecisionCell`)
//! - Route admission and post-sign-in landing (`AccessGate`)
//! - An engine wiring them together (`AccessEngine`)
//!
//! # Roles
//!
//! Every identity resolves to exactly one of `Anonymous`, `RegularUser`,
//! `ServiceProvider` or `Admin`. Admin wins over provider. Failed lookups
//! never elevate: a signed-in identity whose lookups fail is a
//! `RegularUser`.
//!
//! # Example
//!
//! ```
//! use mandap_access::{AccessGate, AdmissionRequirement, AdmissionResult, Role};
//! use mandap_access::role::{LookupOutcome, reconcile};
//! use mandap_core::ProviderId;
//!
//! // Flagged admin and registered provider at the same time
//! let role = reconcile(
//!     LookupOutcome::Settled(true),
//!     LookupOutcome::Settled(Some(ProviderId::new())),
//! );
//! assert_eq!(role, Role::Admin);
//!
//! let gate = AccessGate::default();
//! assert_eq!(gate.check(Some(&role), AdmissionRequirement::Admin), AdmissionResult::Allow);
//! assert_eq!(gate.check(None, AdmissionRequirement::Admin), AdmissionResult::Pending);
//! assert_eq!(gate.landing_for(&role).as_str(), "/admin");
//! ```

pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod gate;
pub mod identity;
pub mod lookup;
pub mod resolver;
pub mod role;
pub mod session;

// Re-export main types at crate root
pub use config::{AccessConfig, Destination, Destinations};
pub use decision::{DecisionCell, ResolutionState, ResolutionTicket, RoleDecision};
pub use engine::{AccessEngine, PendingResolution};
pub use error::{ConfigError, LookupError};
pub use gate::{AccessGate, AdmissionRequirement, AdmissionResult, Denial, DenialReason};
pub use identity::Identity;
pub use lookup::{AdminLookup, LookupKind, ProviderLookup, StaticDirectory};
pub use resolver::{LookupFailure, RoleResolver};
pub use role::Role;
pub use session::{AuthEvent, SessionObserver, SessionState, SessionTransition};
