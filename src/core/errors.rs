use thiserror::Error;

use crate::flags::FlagError;

/// Unified error type for the entire flagdag library
#[derive(Debug, Error)]
pub enum FlagDagError {
    /// Registration-time mistakes: unusable constructors, duplicate providers, bad config
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// A value type is already provided by another constructor
    #[error("Duplicate provider for {key}: already provided by {existing}, cannot add {incoming}")]
    DuplicateProvider {
        key: String,
        existing: String,
        incoming: String,
    },

    /// A constructor needs a value nothing provides
    #[error("Missing provider for {key} (needed by {needed_by})")]
    MissingProvider { key: String, needed_by: String },

    /// Providers depend on each other in a loop
    #[error("Dependency cycle detected involving {provider}")]
    Cycle { provider: String },

    /// The barrier's flag parse rejected the arguments
    #[error("Failed to parse flags: {message}")]
    Parse {
        message: String,
        #[source]
        source: Option<FlagError>,
    },

    /// A fallible constructor returned an error
    #[error("Constructor {provider} failed: {message}")]
    Constructor {
        provider: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A provider failed earlier in this resolution and is not retried
    #[error("Provider {provider} failed earlier: {message}")]
    ProviderFailed { provider: String, message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl FlagDagError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            field: None,
        }
    }

    /// Create a configuration error pointing at a field
    pub fn configuration_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Configuration {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn duplicate_provider<K, E, I>(key: K, existing: E, incoming: I) -> Self
    where
        K: Into<String>,
        E: Into<String>,
        I: Into<String>,
    {
        Self::DuplicateProvider {
            key: key.into(),
            existing: existing.into(),
            incoming: incoming.into(),
        }
    }

    pub fn missing_provider<K: Into<String>, N: Into<String>>(key: K, needed_by: N) -> Self {
        Self::MissingProvider {
            key: key.into(),
            needed_by: needed_by.into(),
        }
    }

    pub fn cycle<S: Into<String>>(provider: S) -> Self {
        Self::Cycle {
            provider: provider.into(),
        }
    }

    /// Create a parse error from the flag set's own error
    pub fn parse(source: FlagError) -> Self {
        Self::Parse {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a constructor error with source
    pub fn constructor<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        provider: S,
        source: E,
    ) -> Self {
        Self::Constructor {
            provider: provider.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    pub fn provider_failed<S: Into<String>, M: Into<String>>(provider: S, message: M) -> Self {
        Self::ProviderFailed {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if error is recoverable
    ///
    /// Nothing in a single resolution pass is retried; a parse failure can be
    /// fixed by the operator and the process restarted.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Parse { .. } => true,
            Self::Constructor { .. } => true,
            Self::Configuration { .. }
            | Self::DuplicateProvider { .. }
            | Self::MissingProvider { .. }
            | Self::Cycle { .. } => false,
            Self::ProviderFailed { .. } | Self::Internal { .. } => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration { .. } | Self::DuplicateProvider { .. } => "configuration",
            Self::MissingProvider { .. } | Self::Cycle { .. } => "resolution",
            Self::Parse { .. } => "parse",
            Self::Constructor { .. } | Self::ProviderFailed { .. } => "execution",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, FlagDagError>;

impl From<FlagError> for FlagDagError {
    fn from(err: FlagError) -> Self {
        Self::parse(err)
    }
}

impl From<anyhow::Error> for FlagDagError {
    fn from(err: anyhow::Error) -> Self {
        Self::Constructor {
            provider: "anyhow".to_string(),
            message: format!("{:#}", err),
            source: Some(err.into()),
        }
    }
}

impl From<serde_yaml::Error> for FlagDagError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::configuration(format!("invalid yaml: {}", err))
    }
}
