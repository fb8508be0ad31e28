use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatPulseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Data inconsistency in {room}: {detail}")]
    DataInconsistency { room: String, detail: String },

    #[error("Empty batch: no rooms matched the configuration")]
    EmptyBatch,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Stale revision: {0}")]
    StaleRevision(String),

    #[error("External service error: {0}")]
    External(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ChatPulseError>;
