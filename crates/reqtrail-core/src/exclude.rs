//! Excluded-path policy.
//!
//! Decides whether audit logging is suppressed for a request path. Both the
//! request-side and response-side emission points consult the same parsed
//! prefix list.

/// Ordered set of path prefixes for which audit lines are not emitted.
#[derive(Debug, Clone, Default)]
pub struct ExcludedPaths {
    prefixes: Vec<String>,
}

impl ExcludedPaths {
    /// Parse a comma-separated prefix list; blank or unset means nothing is
    /// excluded. Surrounding whitespace and empty segments are dropped.
    pub fn parse(spec: Option<&str>) -> Self {
        let prefixes = spec
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|prefix| !prefix.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        Self { prefixes }
    }

    /// True when the path starts with any configured prefix.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| path.starts_with(prefix))
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}
