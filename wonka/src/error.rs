use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WonkaError {
    #[error(transparent)]
    Accounts(#[from] accounts::AccountsError),
    #[error(transparent)]
    HostSpec(#[from] hostspec::HostSpecError),
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("No password given on stdin")]
    EmptyPassword,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type WonkaResult<T> = Result<T, WonkaError>;
