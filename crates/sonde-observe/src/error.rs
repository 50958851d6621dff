use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("invalid log format: {0} (expected: text|json)")]
    InvalidFormat(String),

    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    #[error("logger has already been initialized")]
    AlreadyInitialized,

    #[error("failed to initialize logger: {0}")]
    InitializationFailed(String),
}
