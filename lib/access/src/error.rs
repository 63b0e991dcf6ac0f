//! Error types for the access crate.
//!
//! Errors are reported through rootcause:
//! - `LookupError`: failures of the admin and provider lookups
//! - `ConfigError`: failures while loading destination configuration
//!
//! Lookup errors never escape role resolution; they are absorbed into a
//! least-privilege decision and published as [`LookupFailure`](crate::LookupFailure)s.

use std::fmt;

/// Errors from the admin-flag and provider-registration lookups.
///
/// A provider that is simply not registered is not an error; lookups report
/// that case as `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The backing store could not be reached.
    Unavailable { reason: String },
    /// The lookup did not answer in time.
    Timeout,
    /// The store refused the query (permissions, row-level policy).
    Rejected { reason: String },
    /// The store answered with data the lookup could not interpret.
    Malformed { reason: String },
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { reason } => write!(f, "lookup store unavailable: {reason}"),
            Self::Timeout => write!(f, "lookup timed out"),
            Self::Rejected { reason } => write!(f, "lookup rejected: {reason}"),
            Self::Malformed { reason } => write!(f, "malformed lookup response: {reason}"),
        }
    }
}

impl std::error::Error for LookupError {}

/// Errors from loading [`AccessConfig`](crate::AccessConfig).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration sources could not be read or deserialized.
    Load { details: String },
    /// A destination is not an absolute route path.
    InvalidDestination { field: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load { details } => write!(f, "failed to load access config: {details}"),
            Self::InvalidDestination { field, value } => {
                write!(f, "destination '{field}' must start with '/', got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
