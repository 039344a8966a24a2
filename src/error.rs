use thiserror::Error;

#[derive(Error, Debug)]
pub enum PinpadError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Config error: {0}")]
    ConfigError(#[from] serde_json::Error),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("PIN channel protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("Engine error: {0}")]
    Engine(String),
    #[error("Interaction surface failed: {0}")]
    InteractionFailed(String),
    #[error("Timed out waiting for PIN entry")]
    InteractionTimeout,
    #[error("Random source error: {0}")]
    Random(String),
    #[error("Coordinator is not initialized")]
    NotInitialized,
}

pub type Result<T> = std::result::Result<T, PinpadError>;
