//! Server and game flow errors.

use thiserror::Error;

use tactics_core::error::GameError;
use tactics_core::ids::PlayerNumber;

/// Errors raised while handling protocol requests or driving a game.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The core rejected an operation.
    #[error(transparent)]
    Game(#[from] GameError),

    /// Every player slot is taken.
    #[error("Lobby is full ({max} players)")]
    LobbyFull {
        /// Configured maximum.
        max: u32,
    },

    /// Registration after the starting state was built.
    #[error("Game already started")]
    AlreadyStarted,

    /// The game cannot start with nobody registered.
    #[error("No players registered")]
    NoPlayers,

    /// A turn was reported before the game started.
    #[error("Turn {turn_index} reported before the game started")]
    NotStarted {
        /// Index of the rejected turn.
        turn_index: u64,
    },

    /// A reported turn names a player the server never welcomed.
    #[error("Player {0} is not registered")]
    UnregisteredPlayer(PlayerNumber),

    /// The other end of a channel has gone away.
    #[error("Channel closed")]
    ChannelClosed,

    /// The server answered with an error.
    #[error("Server rejected request: {0}")]
    Rejected(String),

    /// A config file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A config file is not valid RON.
    #[error("Config parse error in {source_name}: {message}")]
    ConfigParse {
        /// File path or label.
        source_name: String,
        /// Parser message.
        message: String,
    },
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
