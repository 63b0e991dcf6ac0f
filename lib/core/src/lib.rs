//! Core domain types shared by the mandap marketplace crates.
//!
//! This crate provides the strongly-typed identifiers and the error handling
//! foundation used by the access engine and its callers.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, ProviderId, UserId};
