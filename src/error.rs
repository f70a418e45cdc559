use std::path::PathBuf;
use thiserror::Error;

use crate::pgn::PgnParseError;

pub type Result<T> = std::result::Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PGN parse error: {0}")]
    Pgn(#[from] PgnParseError),

    #[error("cannot resolve move '{san}' in position {fen}: {reason}")]
    San {
        san: String,
        fen: String,
        reason: String,
    },

    #[error("invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("invalid EPD line '{line}': {reason}")]
    InvalidEpd { line: String, reason: String },

    #[error("unknown game result '{0}'")]
    UnknownResult(String),

    #[error("tensor cache error for {path}: {reason}")]
    Cache { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unknown generator '{0}'")]
    UnknownGenerator(String),

    #[error("generator '{0}' cannot be cached")]
    UnsupportedGenerator(String),
}

impl DatasetError {
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DatasetError::Open {
            path: path.into(),
            source,
        }
    }
}
