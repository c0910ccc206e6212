//! Audit configuration.
//!
//! The excluded-path list is sourced from the environment: the
//! `LOGGING_EXCLUDED_PATHS` variable holds a comma-separated list of path
//! prefixes. A `.env` file is honored in development via dotenvy.

use crate::exclude::ExcludedPaths;

/// Environment variable naming the comma-separated excluded-path prefixes.
pub const EXCLUDED_PATHS_VAR: &str = "LOGGING_EXCLUDED_PATHS";

/// Configuration consumed by the audit interceptors.
#[derive(Debug, Clone, Default)]
pub struct AuditConfig {
    pub excluded_paths: ExcludedPaths,
}

impl AuditConfig {
    /// Read configuration from the process environment, loading `.env` first
    /// when present. An absent or blank variable means no exclusions.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let spec = std::env::var(EXCLUDED_PATHS_VAR).ok();
        tracing::debug!(excluded = ?spec, "Audit configuration loaded");
        Self {
            excluded_paths: ExcludedPaths::parse(spec.as_deref()),
        }
    }

    /// Build configuration from an explicit comma-separated prefix list.
    pub fn with_excluded_paths(spec: &str) -> Self {
        Self {
            excluded_paths: ExcludedPaths::parse(Some(spec)),
        }
    }
}
