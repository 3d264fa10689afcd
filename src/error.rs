use thiserror::Error;

/// All failure modes of the engine, from tokenization through persistence.
///
/// Lexical and parse errors carry the 1-based source position of the
/// offending token; storage errors carry the line inside the snapshot file.
/// Database and table errors have no position of their own; the driver
/// reports them together with the statement's starting line.
#[derive(Debug, Error)]
pub enum Error {
    #[error("lexical error at line {line}, column {column}: {message}")]
    Lexical {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("parse error at line {line}: {message}")]
    Parse { message: String, line: usize },

    #[error("database error: {message}")]
    Database { message: String },

    #[error("table error: {message}")]
    Table { message: String },

    #[error("storage error at line {line}: {message}")]
    Storage { message: String, line: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The 1-based source line the error points at, if it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Lexical { line, .. } | Self::Parse { line, .. } | Self::Storage { line, .. } => {
                Some(*line)
            }
            Self::Database { .. } | Self::Table { .. } | Self::Io(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
