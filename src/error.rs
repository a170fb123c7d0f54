use thiserror::Error;

/// Federation error types
///
/// Planning, rendering, validation and configuration failures surface as
/// query-preparation failures before any source is contacted. Execution
/// failures identify the failing source binding. None of them are retried.
#[derive(Debug, Error)]
pub enum FederationError {
    #[error("Planning error for model '{model}': {message}")]
    Planning { model: String, message: String },

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Unsupported by {dialect} dialect: {feature}")]
    Unsupported { dialect: String, feature: String },

    #[error("Execution failed on source '{binding}': {message}")]
    Execution { binding: String, message: String },

    #[error("Source '{binding}' timed out after {secs} seconds")]
    Timeout { binding: String, secs: u64 },

    #[error("Invalid SQL: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T, E = FederationError> = std::result::Result<T, E>;

impl FederationError {
    pub fn planning(model: impl Into<String>, message: impl Into<String>) -> Self {
        FederationError::Planning {
            model: model.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        FederationError::Internal(message.into())
    }

    pub fn unsupported(dialect: impl Into<String>, feature: impl Into<String>) -> Self {
        FederationError::Unsupported {
            dialect: dialect.into(),
            feature: feature.into(),
        }
    }

    pub fn execution(binding: impl Into<String>, message: impl Into<String>) -> Self {
        FederationError::Execution {
            binding: binding.into(),
            message: message.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            FederationError::Planning { .. } => "PLANNING_ERROR",
            FederationError::Metadata(_) => "METADATA_ERROR",
            FederationError::Internal(_) => "INTERNAL_ERROR",
            FederationError::Unsupported { .. } => "UNSUPPORTED_FEATURE",
            FederationError::Execution { .. } => "EXECUTION_ERROR",
            FederationError::Timeout { .. } => "SOURCE_TIMEOUT",
            FederationError::Validation(_) => "INVALID_SQL",
            FederationError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// True when the failure happened while preparing the query, before any
    /// backend I/O.
    pub fn is_preparation_failure(&self) -> bool {
        !matches!(
            self,
            FederationError::Execution { .. } | FederationError::Timeout { .. }
        )
    }

    /// Source binding that caused the failure, if known
    pub fn binding(&self) -> Option<&str> {
        match self {
            FederationError::Execution { binding, .. } | FederationError::Timeout { binding, .. } => {
                Some(binding)
            }
            _ => None,
        }
    }
}

impl From<config::ConfigError> for FederationError {
    fn from(err: config::ConfigError) -> Self {
        FederationError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for FederationError {
    fn from(err: serde_json::Error) -> Self {
        FederationError::Internal(format!("Serialization failed: {}", err))
    }
}
