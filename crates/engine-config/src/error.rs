use thiserror::Error;

/// Errors raised while reading or validating the source configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required key is absent or blank.
    #[error("Missing required config key: {0}")]
    MissingKey(&'static str),

    /// A key is present but its value cannot be used.
    #[error("Invalid value for `{key}`: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not a flat JSON object of strings.
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}
