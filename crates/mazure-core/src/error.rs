use thiserror::Error;

/// Top-level error type for the Mazure platform.
#[derive(Error, Debug)]
pub enum MazureError {
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for MazureError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
