//! Error types for evocache.
//!
//! Cache operations themselves never fail: absence is reported through
//! `None`, `false` or `0`. Errors only arise while loading settings.

use thiserror::Error;

/// Errors raised while loading or validating [`CacheSettings`](crate::CacheSettings).
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The configuration sources could not be read or deserialized.
    #[error("failed to load cache settings: {0}")]
    Load(#[from] config::ConfigError),

    /// A field holds a value the cache cannot work with.
    #[error("invalid cache setting '{field}': {reason}")]
    Invalid {
        /// Field that failed validation
        field: &'static str,
        /// Why it's invalid
        reason: String,
    },
}

impl SettingsError {
    /// Creates an Invalid error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }

    /// Returns true if this is a validation error.
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid { .. })
    }
}

/// Type alias for settings results.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_display() {
        let err = SettingsError::invalid("sweep_interval_ms", "must be greater than zero");
        assert_eq!(
            err.to_string(),
            "invalid cache setting 'sweep_interval_ms': must be greater than zero"
        );
        assert!(err.is_invalid());
    }

    #[test]
    fn test_config_error_conversion() {
        let err: SettingsError = config::ConfigError::Message("boom".to_string()).into();
        assert!(matches!(err, SettingsError::Load(_)));
        assert!(!err.is_invalid());
        assert!(err.to_string().contains("boom"));
    }
}
