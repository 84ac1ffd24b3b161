//! Error handling types shared by every layer of the state machine.

use thiserror::Error;

/// Result type alias for operations that can fail.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the codebase state machine.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error.
    #[error("I/O error: {message}")]
    Io {
        /// Description of what failed.
        message: String,
        /// Optional source error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON parsing or serialization error.
    #[error("JSON error: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// Input rejected at the tool surface before reaching the core.
    #[error("validation failed: {message}")]
    Validation {
        /// Description of why the input was rejected.
        message: String,
    },

    /// A requested resource does not exist.
    #[error("not found: {resource}")]
    NotFound {
        /// The resource that was not found.
        resource: String,
    },

    /// An argument is structurally invalid (not a sanitization failure).
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// The state machine has not been initialized (genesis not called).
    #[error("state manager not initialized: {message}")]
    NotInitialized {
        /// Extra context.
        message: String,
    },

    /// A requested state/transition violates the transition invariants.
    #[error("invalid transition: {message}")]
    InvalidTransition {
        /// Description of why the transition is invalid.
        message: String,
    },

    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
        /// Optional source error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage contention that callers may retry (e.g. "database is locked").
    #[error("storage contention: {message}")]
    StorageContention {
        /// Description of the contention.
        message: String,
    },

    /// Storage failure that is not recoverable within the request.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
        /// Optional source error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The external VCS tool failed (non-zero exit).
    #[error("vcs operation failed: {message}")]
    Vcs {
        /// Description of the failure.
        message: String,
    },

    /// The external VCS tool did not finish within its timeout.
    #[error("vcs operation timed out after {seconds}s")]
    VcsTimeout {
        /// The timeout that was exceeded.
        seconds: u64,
    },

    /// Caller exceeded its rate limit.
    #[error("rate limit exceeded for {client_id} on {endpoint}")]
    RateLimitExceeded {
        /// Client identifier.
        client_id: String,
        /// Endpoint/tool name.
        endpoint: String,
    },

    /// Internal invariant violation; should not normally be reachable.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Create an I/O error.
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// Create an I/O error with a source.
    pub fn io_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Io {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a not-initialized error.
    pub fn not_initialized<S: Into<String>>(message: S) -> Self {
        Self::NotInitialized {
            message: message.into(),
        }
    }

    /// Create an invalid-transition error.
    pub fn invalid_transition<S: Into<String>>(message: S) -> Self {
        Self::InvalidTransition {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with a source.
    pub fn configuration_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Configuration {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a storage-contention error.
    pub fn storage_contention<S: Into<String>>(message: S) -> Self {
        Self::StorageContention {
            message: message.into(),
        }
    }

    /// Create a fatal storage error.
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Create a fatal storage error with a source.
    pub fn storage_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a VCS operation error.
    pub fn vcs<S: Into<String>>(message: S) -> Self {
        Self::Vcs {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable category, matching the tool surface's error
    /// taxonomy (kinds, not types) for inclusion in `{success, message,
    /// error}` tool responses.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Io { .. } => "filesystem_error",
            Self::Json { .. } => "internal_error",
            Self::Validation { .. } => "validation_failure",
            Self::NotFound { .. } => "state_not_found",
            Self::InvalidArgument { .. } => "validation_failure",
            Self::NotInitialized { .. } => "not_initialized",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Configuration { .. } => "configuration_error",
            Self::StorageContention { .. } => "storage_contention",
            Self::Storage { .. } => "storage_fatal",
            Self::Vcs { .. } => "vcs_error",
            Self::VcsTimeout { .. } => "vcs_timeout",
            Self::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Self::Internal { .. } => "internal_error",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }
}
