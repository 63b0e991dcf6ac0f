//! Destination configuration.
//!
//! The gate redirects to a handful of fixed routes. They default to the
//! marketplace's routes and can be overridden from the environment, e.g.
//! `MANDAP__DESTINATIONS__ADMIN=/ops`.

use crate::error::ConfigError;
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A route the caller should navigate to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Destination(String);

impl Destination {
    /// Creates a destination from a route path.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Returns the route path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Destination {
    fn from(path: &str) -> Self {
        Self(path.to_string())
    }
}

/// The fixed routes the gate redirects to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destinations {
    /// Sign-in page; deny target for signed-in and admin-only routes.
    #[serde(default = "default_sign_in")]
    pub sign_in: Destination,

    /// Landing page for admins.
    #[serde(default = "default_admin")]
    pub admin: Destination,

    /// Landing page for registered service providers.
    #[serde(default = "default_provider_dashboard")]
    pub provider_dashboard: Destination,

    /// Landing page for everyone else; deny target for signed-out-only routes.
    #[serde(default = "default_home")]
    pub home: Destination,

    /// Registration page; deny target for provider-only routes.
    #[serde(default = "default_provider_onboarding")]
    pub provider_onboarding: Destination,
}

fn default_sign_in() -> Destination {
    Destination::from("/login")
}

fn default_admin() -> Destination {
    Destination::from("/admin")
}

fn default_provider_dashboard() -> Destination {
    Destination::from("/dashboard")
}

fn default_home() -> Destination {
    Destination::from("/")
}

fn default_provider_onboarding() -> Destination {
    Destination::from("/register")
}

impl Default for Destinations {
    fn default() -> Self {
        Self {
            sign_in: default_sign_in(),
            admin: default_admin(),
            provider_dashboard: default_provider_dashboard(),
            home: default_home(),
            provider_onboarding: default_provider_onboarding(),
        }
    }
}

impl Destinations {
    fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("sign_in", &self.sign_in),
            ("admin", &self.admin),
            ("provider_dashboard", &self.provider_dashboard),
            ("home", &self.home),
            ("provider_onboarding", &self.provider_onboarding),
        ];
        for (field, destination) in fields {
            if !destination.as_str().starts_with('/') {
                return Err(ConfigError::InvalidDestination {
                    field,
                    value: destination.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Configuration of the access engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AccessConfig {
    /// Redirect and landing routes.
    #[serde(default)]
    pub destinations: Destinations,
}

impl AccessConfig {
    /// Loads configuration from `MANDAP__`-prefixed environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be deserialized or a
    /// destination is not an absolute route path.
    pub fn from_env() -> Result<Self, Report<ConfigError>> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("MANDAP")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(|e| ConfigError::Load {
                details: e.to_string(),
            })?;
        Self::from_config(config)
    }

    /// Deserializes and validates an already-built configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or a destination is not an
    /// absolute route path.
    pub fn from_config(config: config::Config) -> Result<Self, Report<ConfigError>> {
        let access: Self = config.try_deserialize().map_err(|e| ConfigError::Load {
            details: e.to_string(),
        })?;
        access.destinations.validate()?;
        Ok(access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destinations_have_marketplace_defaults() {
        let destinations = Destinations::default();
        assert_eq!(destinations.sign_in.as_str(), "/login");
        assert_eq!(destinations.admin.as_str(), "/admin");
        assert_eq!(destinations.provider_dashboard.as_str(), "/dashboard");
        assert_eq!(destinations.home.as_str(), "/");
        assert_eq!(destinations.provider_onboarding.as_str(), "/register");
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = config::Config::builder().build().expect("build");
        let access = AccessConfig::from_config(config).expect("load");
        assert_eq!(access, AccessConfig::default());
    }

    #[test]
    fn overrides_replace_single_destinations() {
        let config = config::Config::builder()
            .set_override("destinations.admin", "/ops")
            .expect("override")
            .build()
            .expect("build");

        let access = AccessConfig::from_config(config).expect("load");

        assert_eq!(access.destinations.admin.as_str(), "/ops");
        assert_eq!(access.destinations.sign_in.as_str(), "/login");
    }

    #[test]
    fn relative_destination_is_rejected() {
        let config = config::Config::builder()
            .set_override("destinations.home", "home")
            .expect("override")
            .build()
            .expect("build");

        assert!(AccessConfig::from_config(config).is_err());
    }

    #[test]
    fn destination_serializes_as_plain_path() {
        let json = serde_json::to_string(&Destination::from("/dashboard")).expect("serialize");
        assert_eq!(json, "\"/dashboard\"");
    }
}
