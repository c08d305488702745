#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Build(#[from] config::ConfigError),

    #[error("Missing required configuration value: {0}")]
    MissingValue(&'static str),
}
