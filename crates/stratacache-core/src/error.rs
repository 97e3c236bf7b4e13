//! Error types for the caching subsystem.
//!
//! Tier-level failures (transport, serialization) are recovered inside the
//! tiers themselves and surface to callers only as misses plus an `errors`
//! counter increment. The variants here exist so tiers and backends have a
//! common vocabulary; the only error callers of the engine ever receive is
//! `InvalidConfig` from `configure`.

use std::fmt;

/// Errors that can occur inside the caching subsystem.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A network call to the remote key-value store failed.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// A cached payload could not be serialized or deserialized.
    #[error("Serialization error for key '{key}': {message}")]
    Serialization {
        /// The full cache key whose payload was unreadable.
        key: String,
        /// Description of the serialization failure.
        message: String,
    },

    /// A namespace configuration failed validation.
    #[error("Invalid cache configuration: {message}")]
    InvalidConfig {
        /// Description of the validation failure.
        message: String,
    },

    /// A cache-warming loader failed.
    #[error("Cache loader error: {message}")]
    Loader {
        /// Description of the loader failure.
        message: String,
    },
}

impl CacheError {
    /// Creates a new `Transport` error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a new `Serialization` error.
    #[must_use]
    pub fn serialization(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Serialization {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a new `InvalidConfig` error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates a new `Loader` error.
    #[must_use]
    pub fn loader(message: impl Into<String>) -> Self {
        Self::Loader {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a transport error.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Returns `true` if this is a serialization error.
    #[must_use]
    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }

    /// Returns the error category for logging and stats attribution.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport { .. } => ErrorCategory::Transport,
            Self::Serialization { .. } => ErrorCategory::Serialization,
            Self::InvalidConfig { .. } => ErrorCategory::Configuration,
            Self::Loader { .. } => ErrorCategory::Loader,
        }
    }
}

/// Categories of cache errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Remote store transport failure.
    Transport,
    /// Payload serialization failure.
    Serialization,
    /// Namespace configuration failure.
    Configuration,
    /// Warming loader failure.
    Loader,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::Serialization => write!(f, "serialization"),
            Self::Configuration => write!(f, "configuration"),
            Self::Loader => write!(f, "loader"),
        }
    }
}
