//! Admin configuration.
//!
//! Loaded from environment variables with defaults suitable for local
//! development, then checked with [`AdminConfig::validate`].

use backoffice_search::{PageDefaults, SearchSettings, DEFAULT_PAGE_COUNT, PER_PAGE_ALL_LIMIT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Admin-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Whether group permissions start switched on.
    pub group_enabled: bool,

    /// Default index page size.
    pub page_count: u64,

    /// Page size standing in for `per_page=all`.
    pub per_page_all: u64,

    /// Prefix joined in front of menu relative paths, e.g. `/admin`.
    pub route_prefix: String,

    /// chrono formats accepted for time keywords, after RFC 3339.
    pub time_formats: Vec<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        let search = SearchSettings::default();
        Self {
            group_enabled: false,
            page_count: DEFAULT_PAGE_COUNT,
            per_page_all: PER_PAGE_ALL_LIMIT,
            route_prefix: "/admin".to_string(),
            time_formats: search.time_formats,
        }
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `ADMIN_GROUP_ENABLED`: start with group permissions on (default: false)
    /// - `ADMIN_PAGE_COUNT`: default page size (default: 20)
    /// - `ADMIN_PER_PAGE_ALL`: page size for `per_page=all` (default: 1000000)
    /// - `ADMIN_ROUTE_PREFIX`: route prefix (default: /admin)
    /// - `ADMIN_TIME_FORMATS`: `;`-separated chrono formats
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            group_enabled: std::env::var("ADMIN_GROUP_ENABLED")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(default.group_enabled),
            page_count: std::env::var("ADMIN_PAGE_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.page_count),
            per_page_all: std::env::var("ADMIN_PER_PAGE_ALL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.per_page_all),
            route_prefix: std::env::var("ADMIN_ROUTE_PREFIX").unwrap_or(default.route_prefix),
            time_formats: std::env::var("ADMIN_TIME_FORMATS")
                .map(|s| {
                    s.split(';')
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or(default.time_formats),
        }
    }

    /// Check the values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_count == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ADMIN_PAGE_COUNT".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if self.per_page_all < self.page_count {
            return Err(ConfigError::InvalidValue {
                key: "ADMIN_PER_PAGE_ALL".to_string(),
                message: format!("must be at least the page count ({})", self.page_count),
            });
        }
        if !self.route_prefix.is_empty() && !self.route_prefix.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                key: "ADMIN_ROUTE_PREFIX".to_string(),
                message: "must be empty or start with '/'".to_string(),
            });
        }
        if self.time_formats.is_empty() {
            return Err(ConfigError::MissingEnvVar("ADMIN_TIME_FORMATS".to_string()));
        }
        Ok(())
    }

    /// Settings for the searcher.
    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            page: PageDefaults {
                page_count: self.page_count,
                per_page_all: self.per_page_all,
            },
            time_formats: self.time_formats.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AdminConfig::default();
        assert!(!config.group_enabled);
        assert_eq!(config.page_count, 20);
        assert_eq!(config.route_prefix, "/admin");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let config = AdminConfig {
            page_count: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));

        let config = AdminConfig {
            route_prefix: "admin".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AdminConfig {
            route_prefix: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_search_settings() {
        let config = AdminConfig {
            page_count: 50,
            ..Default::default()
        };
        let settings = config.search_settings();
        assert_eq!(settings.page.page_count, 50);
        assert_eq!(settings.time_formats, config.time_formats);
    }
}
