use thiserror::Error;

/// Error type shared by every tier of the cache broker.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("remote cache unavailable: {0}")]
    L2Unavailable(String),

    #[error("invalidation channel unavailable: {0}")]
    ChannelUnavailable(String),

    #[error("loader failed for key '{key}': {message}")]
    Loader { key: String, message: String },

    #[error("invalid region name: {0}")]
    BadRegion(String),

    #[error("cache manager is shutting down")]
    ShuttingDown,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl CacheError {
    /// Create a new Serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Create a new L2Unavailable error
    pub fn l2_unavailable(message: impl Into<String>) -> Self {
        Self::L2Unavailable(message.into())
    }

    /// Create a new ChannelUnavailable error
    pub fn channel_unavailable(message: impl Into<String>) -> Self {
        Self::ChannelUnavailable(message.into())
    }

    /// Create a new Loader error
    pub fn loader(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Loader {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a new BadRegion error
    pub fn bad_region(message: impl Into<String>) -> Self {
        Self::BadRegion(message.into())
    }

    /// Create a new Configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether a read may degrade to a miss instead of surfacing this error.
    ///
    /// Transport failures on the read path are availability problems, not
    /// correctness problems: the caller falls back to the loader or the
    /// source of truth. Everything else surfaces.
    pub fn is_degradable_read(&self) -> bool {
        matches!(self, Self::L2Unavailable(_) | Self::Serialization(_))
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::L2Unavailable(_) => ErrorCategory::Remote,
            Self::ChannelUnavailable(_) => ErrorCategory::Channel,
            Self::Loader { .. } => ErrorCategory::Loader,
            Self::BadRegion(_) => ErrorCategory::Validation,
            Self::ShuttingDown => ErrorCategory::Lifecycle,
            Self::Configuration(_) => ErrorCategory::Configuration,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Serialization,
    Remote,
    Channel,
    Loader,
    Validation,
    Lifecycle,
    Configuration,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialization => write!(f, "serialization"),
            Self::Remote => write!(f, "remote"),
            Self::Channel => write!(f, "channel"),
            Self::Loader => write!(f, "loader"),
            Self::Validation => write!(f, "validation"),
            Self::Lifecycle => write!(f, "lifecycle"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

/// Convenience result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = CacheError::l2_unavailable("connection refused");
        assert_eq!(
            err.to_string(),
            "remote cache unavailable: connection refused"
        );
        assert_eq!(err.category(), ErrorCategory::Remote);
        assert!(err.is_degradable_read());
    }

    #[test]
    fn test_loader_error_format() {
        let err = CacheError::loader("user:42", "backend timed out");
        assert_eq!(
            err.to_string(),
            "loader failed for key 'user:42': backend timed out"
        );
        assert_eq!(err.category(), ErrorCategory::Loader);
        assert!(!err.is_degradable_read());
    }

    #[test]
    fn test_degradable_classification() {
        assert!(CacheError::serialization("bad tag").is_degradable_read());
        assert!(!CacheError::channel_unavailable("gone").is_degradable_read());
        assert!(!CacheError::bad_region("").is_degradable_read());
        assert!(!CacheError::ShuttingDown.is_degradable_read());
    }

    #[test]
    fn test_categories_display() {
        assert_eq!(ErrorCategory::Serialization.to_string(), "serialization");
        assert_eq!(ErrorCategory::Remote.to_string(), "remote");
        assert_eq!(ErrorCategory::Channel.to_string(), "channel");
        assert_eq!(ErrorCategory::Lifecycle.to_string(), "lifecycle");
    }

    #[test]
    fn test_shutting_down_message() {
        assert_eq!(
            CacheError::ShuttingDown.to_string(),
            "cache manager is shutting down"
        );
        assert_eq!(CacheError::ShuttingDown.category(), ErrorCategory::Lifecycle);
    }
}
