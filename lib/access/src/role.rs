//! Coarse marketplace roles and the rule that reconciles lookups into one.
//!
//! The marketplace distinguishes four mutually exclusive roles. The admin
//! flag and the provider registration live in different stores and may both
//! be set for the same user; [`reconcile`] always reduces them to one role,
//! with admin taking precedence.

use mandap_core::ProviderId;
use serde::{Deserialize, Serialize};

/// The resolved role of an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "provider_id", rename_all = "snake_case")]
pub enum Role {
    /// No session.
    Anonymous,
    /// Signed in, neither admin nor registered provider.
    RegularUser,
    /// Signed in and registered as a ceremony service provider.
    ServiceProvider(ProviderId),
    /// Signed in with the admin flag set.
    Admin,
}

impl Role {
    /// Returns true if this role belongs to a signed-in identity.
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        !matches!(self, Self::Anonymous)
    }

    /// Returns true if this role has admin privileges.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Returns the provider registration, if this is a provider role.
    #[must_use]
    pub fn provider_id(&self) -> Option<ProviderId> {
        match self {
            Self::ServiceProvider(id) => Some(*id),
            _ => None,
        }
    }
}

/// How a single lookup settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome<T> {
    /// The lookup answered.
    Settled(T),
    /// The lookup failed; its answer is unknown.
    Failed,
}

impl<T, E> From<Result<T, E>> for LookupOutcome<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Settled(value),
            Err(_) => Self::Failed,
        }
    }
}

/// Reduces the two lookup outcomes of a signed-in identity to one role.
///
/// Admin wins over provider. Anything unknown falls back to `RegularUser`:
/// a signed-in identity is never anonymous and is never elevated on a failed
/// lookup.
#[must_use]
pub fn reconcile(
    admin: LookupOutcome<bool>,
    provider: LookupOutcome<Option<ProviderId>>,
) -> Role {
    match (admin, provider) {
        (LookupOutcome::Settled(true), _) => Role::Admin,
        (_, LookupOutcome::Settled(Some(provider_id))) => Role::ServiceProvider(provider_id),
        _ => Role::RegularUser,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LookupOutcome::{Failed, Settled};

    #[test]
    fn admin_wins_regardless_of_provider() {
        let provider = ProviderId::new();
        assert_eq!(reconcile(Settled(true), Settled(None)), Role::Admin);
        assert_eq!(reconcile(Settled(true), Settled(Some(provider))), Role::Admin);
        assert_eq!(reconcile(Settled(true), Failed), Role::Admin);
    }

    #[test]
    fn registered_provider_without_admin_flag() {
        let provider = ProviderId::new();
        assert_eq!(
            reconcile(Settled(false), Settled(Some(provider))),
            Role::ServiceProvider(provider)
        );
    }

    #[test]
    fn provider_survives_failed_admin_check() {
        let provider = ProviderId::new();
        assert_eq!(
            reconcile(Failed, Settled(Some(provider))),
            Role::ServiceProvider(provider)
        );
    }

    #[test]
    fn negative_answers_yield_regular_user() {
        assert_eq!(reconcile(Settled(false), Settled(None)), Role::RegularUser);
    }

    #[test]
    fn failures_fall_back_to_regular_user() {
        assert_eq!(reconcile(Failed, Settled(None)), Role::RegularUser);
        assert_eq!(reconcile(Settled(false), Failed), Role::RegularUser);
        assert_eq!(reconcile(Failed, Failed), Role::RegularUser);
    }

    #[test]
    fn outcome_from_result() {
        let ok: Result<bool, ()> = Ok(true);
        let err: Result<bool, ()> = Err(());
        assert_eq!(LookupOutcome::from(ok), Settled(true));
        assert_eq!(LookupOutcome::from(err), Failed);
    }

    #[test]
    fn role_predicates() {
        assert!(!Role::Anonymous.is_signed_in());
        assert!(Role::RegularUser.is_signed_in());
        assert!(Role::Admin.is_admin());
        assert!(!Role::RegularUser.is_admin());

        let provider = ProviderId::new();
        assert_eq!(Role::ServiceProvider(provider).provider_id(), Some(provider));
        assert_eq!(Role::Admin.provider_id(), None);
    }

    #[test]
    fn role_serialization_format() {
        let json = serde_json::to_string(&Role::Admin).expect("serialize");
        assert_eq!(json, r#"{"role":"admin"}"#);

        let json = serde_json::to_string(&Role::RegularUser).expect("serialize");
        assert_eq!(json, r#"{"role":"regular_user"}"#);
    }
}
