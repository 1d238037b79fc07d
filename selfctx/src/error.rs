//! Error type for self-context gathering

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SelfCtxError {
    #[error("log file not found: {0}")]
    LogNotFound(String),

    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
