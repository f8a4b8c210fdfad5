use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid size format '{0}'. Use formats like: 100MB, 1.5GB, 500KB, or raw bytes")]
    InvalidSize(String),

    #[error("Downloads folder not found at {}", .0.display())]
    DownloadsDirMissing(PathBuf),

    #[error("{0}")]
    Other(String),
}
