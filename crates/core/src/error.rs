// crates/core/src/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipaError {
    #[error("NLU error: {0}")]
    Nlu(String),

    #[error("Route error: {0}")]
    Route(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type PipaResult<T> = Result<T, PipaError>;
