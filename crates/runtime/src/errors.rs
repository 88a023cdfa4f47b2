//! Error types for the host runtime: configuration loading, move-file
//! parsing, and the handful of ways the underlying planner/torch crates can
//! report back-pressure or a busy sequencer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("failed to load configuration file {path}: {source}")]
    ConfigLoad { path: String, source: String },
    #[error("config section [{section}] is missing required key '{key}'")]
    MissingKey { section: String, key: String },
    #[error("config section [{section}] key '{key}' has an invalid value: {message}")]
    InvalidValue {
        section: String,
        key: String,
        message: String,
    },
    #[error("move queue is full; move was rejected, caller should retry")]
    QueueFull,
    #[error("failed to read move file {path}: {source}")]
    MoveFileRead { path: String, source: String },
    #[error("failed to parse move file {path}: {source}")]
    MoveFileParse { path: String, source: String },
    #[error(transparent)]
    Torch(#[from] torch::errors::TorchError),
    #[error("motion timer failed to install")]
    TimerInitFailed,
}
