use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A layer (defaults, file or environment) could not be read
    #[error("could not read configuration from {layer}: {reason}")]
    Unreadable { layer: String, reason: String },

    /// The merged layers do not fit [`ReviewConfig`](super::ReviewConfig)
    #[error("configuration has the wrong shape: {0}")]
    Shape(#[from] config::ConfigError),

    #[error("configuration rejected: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

impl ConfigurationError {
    pub fn unreadable(layer: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Unreadable {
            layer: layer.into(),
            reason: reason.to_string(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;
