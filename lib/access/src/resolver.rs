//! Role resolution.
//!
//! The resolver asks both stores about a signed-in user at the same time,
//! waits for both answers, and reduces them with [`reconcile`]. Lookup
//! failures never escape: they are logged, published on the failure channel,
//! and folded into a least-privilege decision. Nothing is retried.

use crate::decision::RoleDecision;
use crate::error::LookupError;
use crate::identity::Identity;
use crate::lookup::{AdminLookup, LookupKind, ProviderLookup};
use crate::role::{LookupOutcome, reconcile};
use chrono::{DateTime, Utc};
use mandap_core::UserId;
use rootcause::prelude::Report;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

/// Capacity of the failure channel; slow subscribers lose the oldest events.
const FAILURE_CHANNEL_CAPACITY: usize = 64;

/// A lookup that failed during resolution.
///
/// Published for observability only; the decision itself has already fallen
/// back to least privilege.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupFailure {
    /// The user being resolved.
    pub user: UserId,
    /// The lookup that failed.
    pub lookup: LookupKind,
    /// The rendered error report.
    pub details: String,
    /// When the failure was observed.
    pub at: DateTime<Utc>,
}

/// Resolves identities to roles.
pub struct RoleResolver {
    admin: Arc<dyn AdminLookup>,
    provider: Arc<dyn ProviderLookup>,
    failures: broadcast::Sender<LookupFailure>,
}

impl RoleResolver {
    /// Creates a resolver over the two lookups.
    #[must_use]
    pub fn new(admin: Arc<dyn AdminLookup>, provider: Arc<dyn ProviderLookup>) -> Self {
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);
        Self {
            admin,
            provider,
            failures,
        }
    }

    /// Creates a resolver over a single store that answers both lookups.
    #[must_use]
    pub fn with_directory<D>(directory: Arc<D>) -> Self
    where
        D: AdminLookup + ProviderLookup + 'static,
    {
        Self::new(directory.clone(), directory)
    }

    /// Subscribes to lookup failures.
    #[must_use]
    pub fn failures(&self) -> broadcast::Receiver<LookupFailure> {
        self.failures.subscribe()
    }

    /// Resolves without suspending when no lookup is needed.
    ///
    /// Returns the anonymous decision for [`Identity::Anonymous`] and `None`
    /// for signed-in identities.
    #[must_use]
    pub fn resolve_immediate(&self, identity: Identity) -> Option<RoleDecision> {
        match identity {
            Identity::Anonymous => Some(RoleDecision::anonymous()),
            Identity::SignedIn(_) => None,
        }
    }

    /// Resolves the role of `identity`.
    ///
    /// Always yields a decision whose source is `identity`.
    pub async fn resolve(&self, identity: Identity) -> RoleDecision {
        match identity {
            Identity::Anonymous => RoleDecision::anonymous(),
            Identity::SignedIn(user) => self.resolve_user(user).await,
        }
    }

    #[instrument(skip(self), fields(user = %user))]
    async fn resolve_user(&self, user: UserId) -> RoleDecision {
        let (admin, provider) = tokio::join!(
            self.admin.is_admin(user),
            self.provider.find_provider(user)
        );

        let mut failed = Vec::new();
        let admin = self.settle(user, LookupKind::Admin, admin, &mut failed);
        let provider = self.settle(user, LookupKind::Provider, provider, &mut failed);

        let role = reconcile(admin, provider);
        info!(?role, degraded = !failed.is_empty(), "role resolved");

        RoleDecision::new(role, Identity::SignedIn(user)).with_failed_lookups(failed)
    }

    fn settle<T>(
        &self,
        user: UserId,
        lookup: LookupKind,
        result: Result<T, Report<LookupError>>,
        failed: &mut Vec<LookupKind>,
    ) -> LookupOutcome<T> {
        if let Err(report) = &result {
            warn!(%user, %lookup, error = %report, "role lookup failed");
            failed.push(lookup);
            // No subscribers is fine; the warning above is the record.
            let _ = self.failures.send(LookupFailure {
                user,
                lookup,
                details: report.to_string(),
                at: Utc::now(),
            });
        }
        LookupOutcome::from(result)
    }
}

impl std::fmt::Debug for RoleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleResolver")
            .field("failure_subscribers", &self.failures.receiver_count())
            .finish_non_exhaustive()
    }
}
