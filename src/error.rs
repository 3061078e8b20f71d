use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum FdError {
    #[error("invalid bank identifier: {0:?}")]
    InvalidBankId(String),

    #[error("unknown bank: {0}")]
    UnknownBank(String),

    #[error("no banks selected")]
    #[diagnostic(help("select at least one bank before fetching"))]
    EmptySelection,

    #[error("a fetch pass is already running")]
    PassInProgress,

    #[error("no fetched data to export")]
    NothingToExport,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("backend request failed: {0}")]
    Http(String),

    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed backend response: {0}")]
    Decode(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl FdError {
    pub fn is_transport(&self) -> bool {
        matches!(self, FdError::Http(_) | FdError::Decode(_))
    }
}
