//! Error types for turn resolution and world construction.

use thiserror::Error;

use crate::grid::Coord;
use crate::ids::{EntityId, PlayerNumber};

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
///
/// Only recoverable conditions live here. Broken internal invariants
/// (a spatial index that lost track of an entity, two units left on one
/// cell after movement) panic instead.
#[derive(Debug, Error)]
pub enum GameError {
    /// A turn or request named a player the world does not contain.
    #[error("Unknown player: {0}")]
    UnknownPlayer(PlayerNumber),

    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// An entity with this identity is already on the board.
    #[error("Entity already placed: {0}")]
    DuplicateEntity(EntityId),

    /// A footprint does not fit inside the board.
    #[error("Footprint of size {size} at {origin} is out of bounds")]
    OutOfBounds {
        /// Requested origin.
        origin: Coord,
        /// Requested footprint size.
        size: i32,
    },

    /// A footprint would cover a cell already held by a unit or wall.
    #[error("Footprint of size {size} at {origin} overlaps {occupant}")]
    Overlap {
        /// Requested origin.
        origin: Coord,
        /// Requested footprint size.
        size: i32,
        /// Entity already holding one of the cells.
        occupant: EntityId,
    },

    /// A blueprint name is not in the player's catalog.
    #[error("Unknown blueprint '{0}'")]
    UnknownBlueprint(String),

    /// Data file parsing error.
    #[error("Failed to parse data '{source_name}': {message}")]
    DataParseError {
        /// File name or other label for the data that failed to parse.
        source_name: String,
        /// Error message.
        message: String,
    },

    /// A catalog parsed but breaks one or more catalog rules.
    #[error("Invalid catalog '{name}': {}", .errors.join("; "))]
    InvalidCatalog {
        /// Catalog (team) name.
        name: String,
        /// Every rule violation found.
        errors: Vec<String>,
    },

    /// Serialization or deserialization of game state failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}
