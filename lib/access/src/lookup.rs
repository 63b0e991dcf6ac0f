//! Read-only lookups against the admin-flag and provider-registration stores.
//!
//! The stores themselves belong to other subsystems. The engine only needs
//! two idempotent, side-effect-free queries keyed by user id; these traits
//! keep the resolver testable without a database.

use crate::error::LookupError;
use async_trait::async_trait;
use mandap_core::{ProviderId, UserId};
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Query for the admin flag of a user.
#[async_trait]
pub trait AdminLookup: Send + Sync {
    /// Returns whether the user carries the admin flag.
    async fn is_admin(&self, user: UserId) -> Result<bool, Report<LookupError>>;
}

/// Query for the provider registration of a user.
#[async_trait]
pub trait ProviderLookup: Send + Sync {
    /// Returns the user's provider registration, or `None` if the user has
    /// not registered as a provider.
    async fn find_provider(&self, user: UserId) -> Result<Option<ProviderId>, Report<LookupError>>;
}

/// Which of the two lookups a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupKind {
    /// The admin-flag lookup.
    Admin,
    /// The provider-registration lookup.
    Provider,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Provider => write!(f, "provider"),
        }
    }
}

#[derive(Debug, Default)]
struct DirectoryState {
    admins: HashSet<UserId>,
    providers: HashMap<UserId, ProviderId>,
    admin_failure: Option<LookupError>,
    provider_failure: Option<LookupError>,
}

/// In-memory implementation of both lookups.
///
/// Useful for embedding the engine where role data is already in memory,
/// and for tests: failures can be injected per lookup and every call is
/// counted.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    state: Mutex<DirectoryState>,
    admin_calls: AtomicUsize,
    provider_calls: AtomicUsize,
}

impl StaticDirectory {
    /// Creates an empty directory: nobody is admin, nobody is a provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the admin flag for a user.
    pub fn grant_admin(&self, user: UserId) {
        self.state().admins.insert(user);
    }

    /// Clears the admin flag for a user.
    pub fn revoke_admin(&self, user: UserId) {
        self.state().admins.remove(&user);
    }

    /// Registers a user as a provider.
    pub fn register_provider(&self, user: UserId, provider: ProviderId) {
        self.state().providers.insert(user, provider);
    }

    /// Makes every admin lookup fail with `error` until cleared with `None`.
    pub fn fail_admin_lookups(&self, error: Option<LookupError>) {
        self.state().admin_failure = error;
    }

    /// Makes every provider lookup fail with `error` until cleared with `None`.
    pub fn fail_provider_lookups(&self, error: Option<LookupError>) {
        self.state().provider_failure = error;
    }

    /// Number of admin lookups served so far.
    #[must_use]
    pub fn admin_calls(&self) -> usize {
        self.admin_calls.load(Ordering::SeqCst)
    }

    /// Number of provider lookups served so far.
    #[must_use]
    pub fn provider_calls(&self) -> usize {
        self.provider_calls.load(Ordering::SeqCst)
    }

    fn state(&self) -> MutexGuard<'_, DirectoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl AdminLookup for StaticDirectory {
    async fn is_admin(&self, user: UserId) -> Result<bool, Report<LookupError>> {
        self.admin_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        match &state.admin_failure {
            Some(error) => Err(error.clone().into()),
            None => Ok(state.admins.contains(&user)),
        }
    }
}

#[async_trait]
impl ProviderLookup for StaticDirectory {
    async fn find_provider(&self, user: UserId) -> Result<Option<ProviderId>, Report<LookupError>> {
        self.provider_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        match &state.provider_failure {
            Some(error) => Err(error.clone().into()),
            None => Ok(state.providers.get(&user).copied()),
        }
    }
}
