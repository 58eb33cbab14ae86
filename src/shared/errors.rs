//! Error handling for the application

use thiserror::Error;

/// Listing fetch errors. Never escape the adapter: the fetcher logs them and
/// degrades to an empty listing set.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("P2P API returned status {0}")]
    Status(u16),

    #[error("Malformed response body: {0}")]
    MalformedBody(String),
}

/// Snapshot persistence errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Chat delivery errors
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Telegram request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Telegram rejected the request: {0}")]
    Rejected(String),
}

/// Startup configuration errors. Always fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required environment variable {0}")]
    MissingSecret(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Chat command errors, rendered back to the user as a reply
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Argumento inválido: {0}")]
    InvalidArgument(String),

    #[error("Comando no autorizado")]
    Unauthorized,
}

/// General application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
}
