use std::path::PathBuf;
use thiserror::Error;

/// Failures that stop a whole run. Per-file problems never end up here.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Cannot list folder {}: {source}", path.display())]
    ListFolder {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Cannot read checksum ledger {}: {source}", path.display())]
    LoadLedger {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write checksum ledger {}: {source}", path.display())]
    SaveLedger {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot resolve path {}: {source}", path.display())]
    ResolvePath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, FetchError>;
