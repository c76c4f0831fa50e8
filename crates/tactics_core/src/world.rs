//! World state: the board plus every player.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::config::RulesConfig;
use crate::entity::{Entity, EntityKind, ResourcePile};
use crate::error::{GameError, Result};
use crate::grid::{Board, Coord};
use crate::ids::{EntityId, IdSource, PlayerNumber};
use crate::math::Fixed;
use crate::parts::PartKind;
use crate::player::Player;

/// Everything a turn resolves against.
///
/// Cloning produces a fully independent snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldState {
    /// Entities and the occupancy index.
    pub board: Board,
    players: BTreeMap<PlayerNumber, Player>,
}

impl WorldState {
    /// Create a world from a board and players.
    ///
    /// A later player with a repeated number replaces an earlier one.
    #[must_use]
    pub fn new(board: Board, players: impl IntoIterator<Item = Player>) -> Self {
        Self {
            board,
            players: players.into_iter().map(|p| (p.number, p)).collect(),
        }
    }

    /// Build the starting state of a match.
    ///
    /// Every player receives the starting stockpile and its mothership at a
    /// start slot: the four corners first, then the four edge midpoints, in
    /// player-number order. A resource pile sits under each mothership's
    /// origin.
    ///
    /// # Errors
    ///
    /// Fails if there are more players than start slots, a player has no
    /// mothership blueprint, or a mothership does not fit on the board.
    pub fn starting(
        rules: &RulesConfig,
        players: Vec<Player>,
        ids: &mut impl IdSource,
    ) -> Result<Self> {
        let mut world = Self::new(Board::new(rules.width, rules.height), players);
        let numbers: Vec<_> = world.players.keys().copied().collect();
        if numbers.len() > START_SLOTS {
            return Err(GameError::InvalidState(format!(
                "{} players but only {START_SLOTS} start slots",
                numbers.len()
            )));
        }

        for (slot, number) in numbers.into_iter().enumerate() {
            let player = world.player_mut(number)?;
            player.resources = rules.starting_resources();
            let mothership = player
                .mothership()
                .ok_or_else(|| GameError::UnknownBlueprint(format!("mothership of player {number}")))?
                .name
                .clone();
            let size = player.mothership().map_or(1, |b| b.size);

            let origin = start_slot(rules.width, rules.height, size, slot);
            world.place_blueprint(number, &mothership, origin, ids)?;
            world.add_resource_pile(origin, rules.starting_pile(), ids)?;
            tracing::info!(player = number, %origin, blueprint = %mothership, "Placed mothership");
        }
        Ok(world)
    }

    /// Get a player.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownPlayer`] if there is no such player.
    pub fn player(&self, number: PlayerNumber) -> Result<&Player> {
        self.players.get(&number).ok_or(GameError::UnknownPlayer(number))
    }

    /// Get a player mutably.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownPlayer`] if there is no such player.
    pub fn player_mut(&mut self, number: PlayerNumber) -> Result<&mut Player> {
        self.players
            .get_mut(&number)
            .ok_or(GameError::UnknownPlayer(number))
    }

    /// All players in number order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Player numbers in order.
    #[must_use]
    pub fn player_numbers(&self) -> Vec<PlayerNumber> {
        self.players.keys().copied().collect()
    }

    /// Units owned by a player, in identity order.
    #[must_use]
    pub fn units_of(&self, number: PlayerNumber) -> Vec<EntityId> {
        self.board
            .entities()
            .filter(|e| e.as_unit().is_some_and(|u| u.owner == number))
            .map(|e| e.id)
            .collect()
    }

    /// Place a fresh copy of one of a player's blueprints.
    ///
    /// # Errors
    ///
    /// Fails on an unknown player or blueprint, or if the footprint leaves
    /// the board or covers a unit or wall.
    pub fn place_blueprint(
        &mut self,
        owner: PlayerNumber,
        blueprint: &str,
        origin: Coord,
        ids: &mut impl IdSource,
    ) -> Result<EntityId> {
        let player = self.player(owner)?;
        let entity = player
            .blueprint(blueprint)
            .ok_or_else(|| GameError::UnknownBlueprint(blueprint.to_string()))?
            .instantiate(owner, player.team, origin, ids);
        self.board.place_exclusive(entity)
    }

    /// Place a 1×1 resource pile. Piles may lie under units.
    ///
    /// # Errors
    ///
    /// Fails if the cell is off the board.
    pub fn add_resource_pile(
        &mut self,
        origin: Coord,
        amount: Fixed,
        ids: &mut impl IdSource,
    ) -> Result<EntityId> {
        let pile = Entity::resource_pile(ids.next_entity_id(), origin, ResourcePile::new(amount));
        self.board.place(pile)
    }

    /// Place a wall.
    ///
    /// # Errors
    ///
    /// Fails if the footprint leaves the board or covers a unit or wall.
    pub fn add_wall(&mut self, origin: Coord, size: i32, ids: &mut impl IdSource) -> Result<EntityId> {
        self.board
            .place_exclusive(Entity::wall(ids.next_entity_id(), origin, size))
    }

    /// Compute a hash of the full state.
    ///
    /// Covers every entity, part and player in deterministic order; peers
    /// resolving the same turns compare it to detect desync.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        let bounds = self.board.bounds();
        bounds.hash(&mut hasher);
        self.board.len().hash(&mut hasher);

        for entity in self.board.entities() {
            entity.id.hash(&mut hasher);
            entity.origin.hash(&mut hasher);
            entity.size.hash(&mut hasher);
            match &entity.kind {
                EntityKind::Unit(unit) => {
                    0u8.hash(&mut hasher);
                    unit.owner.hash(&mut hasher);
                    unit.team.hash(&mut hasher);
                    for part in &unit.parts {
                        part.id.hash(&mut hasher);
                        part.damage.to_bits().hash(&mut hasher);
                        match &part.kind {
                            PartKind::EnergyCore { current_energy } => {
                                current_energy.to_bits().hash(&mut hasher);
                            }
                            PartKind::Producer(state) => {
                                state.under_production.hash(&mut hasher);
                                state.current_production_points.to_bits().hash(&mut hasher);
                                state.spawn_counter.hash(&mut hasher);
                            }
                            _ => {}
                        }
                    }
                }
                EntityKind::ResourcePile(pile) => {
                    1u8.hash(&mut hasher);
                    pile.amount.to_bits().hash(&mut hasher);
                }
                EntityKind::Wall => 2u8.hash(&mut hasher),
            }
        }

        for player in self.players.values() {
            player.number.hash(&mut hasher);
            player.resources.to_bits().hash(&mut hasher);
            player.research.hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Serialize the state to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Serialization(format!("world state: {e}")))
    }

    /// Deserialize state from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a world state.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::Serialization(format!("world state: {e}")))
    }
}

/// Number of distinct start slots.
pub const START_SLOTS: usize = 8;

/// Origin of start slot `slot` for a footprint of `size`, one cell in from
/// the board edge.
fn start_slot(width: i32, height: i32, size: i32, slot: usize) -> Coord {
    let near = 1;
    let far_x = width - 1 - size;
    let far_y = height - 1 - size;
    let mid_x = (width - size) / 2;
    let mid_y = (height - size) / 2;
    let slots = [
        (near, near),
        (far_x, far_y),
        (far_x, near),
        (near, far_y),
        (mid_x, near),
        (mid_x, far_y),
        (near, mid_y),
        (far_x, mid_y),
    ];
    let (x, y) = slots[slot % START_SLOTS];
    Coord::new(x, y)
}
