//! # Tactics Core
//!
//! Deterministic turn resolution for a grid strategy game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO beyond parsing data passed in as text
//! - No wall-clock randomness
//! - No floating-point math (uses fixed-point)
//!
//! Peers exchange [`turn::Turn`]s and each resolves them locally with
//! [`simulation::advance`]; identical inputs always give identical worlds.
//!
//! ## Crate Structure
//!
//! - [`grid`] - Coordinates, footprints and the occupancy index
//! - [`shape`] - Move and blast geometry
//! - [`parts`] - Unit parts and their derived statistics
//! - [`entity`] - Units, resource piles and walls
//! - [`player`] - Stockpiles, research and blueprint unlocks
//! - [`world`] - The full game state
//! - [`turn`] - Player orders, merging and default carry-over
//! - [`simulation`] - Turn resolution and its phases
//! - [`data`] - Unit blueprints and catalogs loaded from RON
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod combat;
pub mod config;
pub mod data;
pub mod economy;
pub mod entity;
pub mod error;
pub mod grid;
pub mod ids;
pub mod math;
pub mod movement;
pub mod parts;
pub mod player;
pub mod production;
pub mod shape;
pub mod simulation;
pub mod turn;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::RulesConfig;
    pub use crate::data::{Catalog, PartSpec, PartSpecKind, UnitBlueprint};
    pub use crate::entity::{Entity, EntityKind, ResourcePile, Unit};
    pub use crate::error::{GameError, Result};
    pub use crate::grid::{Board, Bounds, Coord};
    pub use crate::ids::{DerivedIds, EntityId, IdSource, PartId, PlayerNumber, ProcessIds, TeamNumber};
    pub use crate::math::{fixed, Fixed};
    pub use crate::parts::{Part, PartKind, ProducerState};
    pub use crate::player::Player;
    pub use crate::shape::ShapeKind;
    pub use crate::simulation::{advance, TurnReport};
    pub use crate::turn::{default_next_turn, merge_turns, Action, Turn};
    pub use crate::world::WorldState;
}
