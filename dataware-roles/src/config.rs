//! Service configuration.
//!
//! Listing limits and evaluation policy for the permission service. Loaded
//! from environment variables with defaults matching the public API.

use dataware_rbac::ActionPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Environment variable for the default page size.
pub const ENV_DEFAULT_PER_PAGE: &str = "PERMISSION_DEFAULT_PER_PAGE";
/// Environment variable for the largest page size a caller may request.
pub const ENV_MAX_PER_PAGE: &str = "PERMISSION_MAX_PER_PAGE";
/// Environment variable selecting the action policy.
pub const ENV_ACTION_POLICY: &str = "PERMISSION_ACTION_POLICY";
/// Environment variable toggling case-sensitive role search.
pub const ENV_SEARCH_CASE_SENSITIVE: &str = "PERMISSION_SEARCH_CASE_SENSITIVE";

/// Permission service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Page size used when a listing request doesn't give one.
    pub default_per_page: usize,

    /// Largest page size a listing request may ask for.
    pub max_per_page: usize,

    /// How granted actions relate to nested actions.
    pub action_policy: ActionPolicy,

    /// Whether role search matches case-sensitively.
    pub search_case_sensitive: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_per_page: 25,
            max_per_page: 100,
            action_policy: ActionPolicy::Exact,
            search_case_sensitive: false,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PERMISSION_DEFAULT_PER_PAGE`: default page size (default: 25)
    /// - `PERMISSION_MAX_PER_PAGE`: maximum page size (default: 100)
    /// - `PERMISSION_ACTION_POLICY`: `exact` or `hierarchical` (default: exact)
    /// - `PERMISSION_SEARCH_CASE_SENSITIVE`: case-sensitive search (default: false)
    ///
    /// Unparseable values fall back to their defaults, as do page limits
    /// that contradict each other. Use [`ServiceConfig::try_from_env`] to
    /// surface them as errors instead.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from environment variables, rejecting bad values.
    pub fn try_from_env() -> Result<Self, ConfigError> {
        Self::try_from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        let config = Self {
            default_per_page: lookup(ENV_DEFAULT_PER_PAGE)
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.default_per_page),
            max_per_page: lookup(ENV_MAX_PER_PAGE)
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_per_page),
            action_policy: lookup(ENV_ACTION_POLICY)
                .and_then(|s| ActionPolicy::parse(&s))
                .unwrap_or(default.action_policy),
            search_case_sensitive: lookup(ENV_SEARCH_CASE_SENSITIVE)
                .map(|s| parse_flag(&s))
                .unwrap_or(default.search_case_sensitive),
        };

        config.normalized()
    }

    /// Load configuration through a key lookup, rejecting bad values.
    pub fn try_from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        let config = Self {
            default_per_page: match lookup(ENV_DEFAULT_PER_PAGE) {
                Some(s) => parse_usize(ENV_DEFAULT_PER_PAGE, &s)?,
                None => default.default_per_page,
            },
            max_per_page: match lookup(ENV_MAX_PER_PAGE) {
                Some(s) => parse_usize(ENV_MAX_PER_PAGE, &s)?,
                None => default.max_per_page,
            },
            action_policy: match lookup(ENV_ACTION_POLICY) {
                Some(s) => ActionPolicy::parse(&s).ok_or_else(|| ConfigError::InvalidValue {
                    key: ENV_ACTION_POLICY.to_string(),
                    message: format!("unknown policy '{}', expected exact or hierarchical", s),
                })?,
                None => default.action_policy,
            },
            search_case_sensitive: lookup(ENV_SEARCH_CASE_SENSITIVE)
                .map(|s| parse_flag(&s))
                .unwrap_or(default.search_case_sensitive),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check that the limits are consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_per_page == 0 {
            return Err(ConfigError::InvalidValue {
                key: ENV_MAX_PER_PAGE.to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.default_per_page > self.max_per_page {
            return Err(ConfigError::InvalidValue {
                key: ENV_DEFAULT_PER_PAGE.to_string(),
                message: format!(
                    "{} exceeds the maximum page size {}",
                    self.default_per_page, self.max_per_page
                ),
            });
        }
        Ok(())
    }

    /// Reset page limits that fail [`ServiceConfig::validate`].
    ///
    /// A zero maximum takes the default maximum. A default above the
    /// maximum takes the default page size, capped at the maximum.
    pub fn normalized(mut self) -> Self {
        let default = Self::default();

        if self.max_per_page == 0 {
            warn!(
                key = ENV_MAX_PER_PAGE,
                fallback = default.max_per_page,
                "Maximum page size must be greater than zero"
            );
            self.max_per_page = default.max_per_page;
        }
        if self.default_per_page > self.max_per_page {
            let fallback = default.default_per_page.min(self.max_per_page);
            warn!(
                key = ENV_DEFAULT_PER_PAGE,
                value = self.default_per_page,
                max = self.max_per_page,
                fallback,
                "Default page size exceeds the maximum"
            );
            self.default_per_page = fallback;
        }
        self
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{}' is not a non-negative integer", value),
    })
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.default_per_page, 25);
        assert_eq!(config.max_per_page, 100);
        assert_eq!(config.action_policy, ActionPolicy::Exact);
        assert!(!config.search_case_sensitive);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_reads_values() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            (ENV_DEFAULT_PER_PAGE, "10"),
            (ENV_MAX_PER_PAGE, "50"),
            (ENV_ACTION_POLICY, "hierarchical"),
            (ENV_SEARCH_CASE_SENSITIVE, "TRUE"),
        ]));
        assert_eq!(config.default_per_page, 10);
        assert_eq!(config.max_per_page, 50);
        assert_eq!(config.action_policy, ActionPolicy::Hierarchical);
        assert!(config.search_case_sensitive);
    }

    #[test]
    fn test_from_lookup_falls_back_on_bad_values() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            (ENV_DEFAULT_PER_PAGE, "many"),
            (ENV_ACTION_POLICY, "loose"),
            (ENV_SEARCH_CASE_SENSITIVE, "nah"),
        ]));
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn test_try_from_lookup_rejects_bad_values() {
        let err = ServiceConfig::try_from_lookup(lookup_from(&[(ENV_ACTION_POLICY, "loose")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == ENV_ACTION_POLICY));

        let err = ServiceConfig::try_from_lookup(lookup_from(&[(ENV_MAX_PER_PAGE, "-1")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == ENV_MAX_PER_PAGE));

        assert!(ServiceConfig::try_from_lookup(lookup_from(&[])).is_ok());
    }

    #[test]
    fn test_validate_limits() {
        let mut config = ServiceConfig::default();
        config.default_per_page = 200;
        assert!(config.validate().is_err());

        config.default_per_page = 0;
        config.max_per_page = 0;
        assert!(config.validate().is_err());

        config.max_per_page = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_resets_default_above_max() {
        let config = ServiceConfig::from_lookup(lookup_from(&[(ENV_DEFAULT_PER_PAGE, "200")]));
        assert_eq!(config.default_per_page, 25);
        assert_eq!(config.max_per_page, 100);
        assert!(config.validate().is_ok());

        let config = ServiceConfig::from_lookup(lookup_from(&[(ENV_MAX_PER_PAGE, "10")]));
        assert_eq!(config.default_per_page, 10);
        assert_eq!(config.max_per_page, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_resets_zero_max() {
        let config = ServiceConfig::from_lookup(lookup_from(&[(ENV_MAX_PER_PAGE, "0")]));
        assert_eq!(config.max_per_page, 100);
        assert_eq!(config.default_per_page, 25);
        assert!(config.validate().is_ok());

        let err = ServiceConfig::try_from_lookup(lookup_from(&[(ENV_MAX_PER_PAGE, "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == ENV_MAX_PER_PAGE));
    }

    #[test]
    fn test_normalized_keeps_valid_config() {
        let config = ServiceConfig {
            default_per_page: 0,
            max_per_page: 5,
            ..ServiceConfig::default()
        };
        assert_eq!(config.clone().normalized(), config);
    }
}
