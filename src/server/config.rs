//! Scheme configuration.
//!
//! # Example
//!
//! ```
//! use scheme_router::SchemeConfig;
//!
//! let config = SchemeConfig::builder().scheme("app-data").build().unwrap();
//! assert_eq!(config.prefix(), "app-data:");
//! ```

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Scheme used when none is configured.
pub const DEFAULT_SCHEME: &str = "backend";

// ============================================================================
// SchemeConfig
// ============================================================================

/// Validated configuration for one router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeConfig {
    /// Scheme name, without the trailing `:`.
    scheme: String,
}

impl SchemeConfig {
    /// Returns a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> SchemeConfigBuilder {
        SchemeConfigBuilder::new()
    }

    /// Returns the scheme name.
    #[inline]
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Returns the URL prefix, `<scheme>:`.
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> String {
        format!("{}:", self.scheme)
    }
}

impl Default for SchemeConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
        }
    }
}

// ============================================================================
// SchemeConfigBuilder
// ============================================================================

/// Builder for [`SchemeConfig`].
#[derive(Debug, Default, Clone)]
pub struct SchemeConfigBuilder {
    /// Scheme name.
    scheme: Option<String>,
}

impl SchemeConfigBuilder {
    /// Creates a builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the scheme name.
    ///
    /// # Arguments
    ///
    /// * `scheme` - Scheme name without `:` (e.g., "backend")
    #[inline]
    #[must_use]
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Builds the configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the scheme name is not a valid URL scheme.
    pub fn build(self) -> Result<SchemeConfig> {
        let scheme = self
            .scheme
            .unwrap_or_else(|| DEFAULT_SCHEME.to_string());

        validate_scheme(&scheme)?;

        Ok(SchemeConfig { scheme })
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Checks `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`.
fn validate_scheme(scheme: &str) -> Result<()> {
    let mut chars = scheme.chars();

    let Some(first) = chars.next() else {
        return Err(Error::config("Scheme name must not be empty"));
    };

    if !first.is_ascii_alphabetic() {
        return Err(Error::config(format!(
            "Scheme {scheme:?} must start with an ASCII letter"
        )));
    }

    if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')))
    {
        return Err(Error::config(format!(
            "Scheme {scheme:?} contains invalid character {bad:?}"
        )));
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scheme() {
        let config = SchemeConfig::default();
        assert_eq!(config.scheme(), "backend");
        assert_eq!(config.prefix(), "backend:");
    }

    #[test]
    fn test_builder_without_scheme_uses_default() {
        let config = SchemeConfig::builder().build().expect("build");
        assert_eq!(config, SchemeConfig::default());
    }

    #[test]
    fn test_builder_sets_scheme() {
        let config = SchemeConfig::builder()
            .scheme("app.data-v2")
            .build()
            .expect("build");
        assert_eq!(config.scheme(), "app.data-v2");
    }

    #[test]
    fn test_empty_scheme_rejected() {
        let err = SchemeConfig::builder().scheme("").build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_scheme_must_start_with_letter() {
        let err = SchemeConfig::builder().scheme("1app").build().unwrap_err();
        assert!(err.to_string().contains("ASCII letter"));
    }

    #[test]
    fn test_scheme_rejects_colon() {
        let err = SchemeConfig::builder().scheme("backend:").build().unwrap_err();
        assert!(err.to_string().contains("invalid character"));
    }
}
