//! Tool errors.

use thiserror::Error;

use tactics_core::error::GameError;

/// Errors raised by the command-line tools.
#[derive(Debug, Error)]
pub enum ToolsError {
    /// A catalog failed to parse or validate.
    #[error(transparent)]
    Game(#[from] GameError),

    /// A file or directory could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File or directory path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON output could not be produced.
    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The catalog has no blueprint flagged as mothership.
    #[error("Team '{team}' has no mothership")]
    NoMothership {
        /// Team name.
        team: String,
    },
}

/// Result type for tool operations.
pub type Result<T> = std::result::Result<T, ToolsError>;
