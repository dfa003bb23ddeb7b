//! Error types for stmtbench.

use thiserror::Error;

/// The main error type for benchmark operations.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Could not open (or cleanly close) a database session.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The driver refused to prepare the statement.
    #[error("Statement prepare error: {0}")]
    StatementPrepare(String),

    /// Executing a prepared statement or draining its rows failed.
    #[error("Execution error: {0}")]
    Execution(String),

    /// The server status counter could not be read.
    #[error("Status query error: {0}")]
    StatusQuery(String),

    /// Invalid configuration (file, flags or variant properties).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to parse a SQL template or a property string.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Whether this error stops the whole benchmark instead of a single variant.
    pub fn aborts_benchmark(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Config(_) | Self::Io(_))
    }

    /// Short taxonomy label used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::StatementPrepare(_) => "prepare",
            Self::Execution(_) => "execution",
            Self::StatusQuery(_) => "status",
            Self::Config(_) => "config",
            Self::Parse { .. } => "parse",
            Self::Io(_) => "io",
        }
    }
}

/// Result type alias for benchmark operations.
pub type BenchResult<T> = Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BenchError::parse(5, "unterminated quoted section");
        assert_eq!(
            err.to_string(),
            "Parse error at position 5: unterminated quoted section"
        );
    }

    #[test]
    fn test_only_connection_level_errors_abort() {
        assert!(BenchError::Connection("refused".into()).aborts_benchmark());
        assert!(!BenchError::StatementPrepare("bad sql".into()).aborts_benchmark());
        assert!(!BenchError::Execution("lost row".into()).aborts_benchmark());
        assert!(!BenchError::StatusQuery("denied".into()).aborts_benchmark());
    }
}
