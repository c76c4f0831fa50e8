//! Entities placed on the board: units, resource piles and walls.

use serde::{Deserialize, Serialize};

use crate::grid::Coord;
use crate::ids::{EntityId, PartId, PlayerNumber, TeamNumber};
use crate::math::{fixed_serde, Fixed};
use crate::parts::{Part, PartKind};

/// A resource deposit units can collect from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePile {
    /// Remaining amount.
    #[serde(with = "fixed_serde")]
    pub amount: Fixed,
}

impl ResourcePile {
    /// Create a pile holding `amount`.
    #[must_use]
    pub const fn new(amount: Fixed) -> Self {
        Self { amount }
    }

    /// Remove up to `requested` and return what was actually removed.
    pub fn yield_up_to(&mut self, requested: Fixed) -> Fixed {
        let taken = requested.max(Fixed::ZERO).min(self.amount);
        self.amount -= taken;
        taken
    }

    /// A depleted pile is removed from the board.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.amount <= Fixed::ZERO
    }
}

/// A unit: an ordered list of parts owned by a player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    /// Blueprint name.
    pub name: String,
    /// Owning player.
    pub owner: PlayerNumber,
    /// Owning team.
    pub team: TeamNumber,
    /// Parts in list order.
    pub parts: Vec<Part>,
    /// Resources charged when a producer starts building this unit.
    #[serde(with = "fixed_serde")]
    pub production_cost: Fixed,
    /// Research fraction needed to unlock this unit.
    #[serde(with = "fixed_serde")]
    pub research_threshold: Fixed,
}

impl Unit {
    /// Sum of the parts' remaining hit points.
    #[must_use]
    pub fn hp(&self) -> Fixed {
        self.parts.iter().map(Part::hp).sum()
    }

    /// Sum of the parts' maximum hit points.
    #[must_use]
    pub fn max_hp(&self) -> Fixed {
        self.parts.iter().map(Part::max_hp).sum()
    }

    /// A unit is destroyed once it has no hit points left.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.hp() <= Fixed::ZERO
    }

    /// Find a part by identity.
    #[must_use]
    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.iter().find(|part| part.id == id)
    }

    /// Find a part by identity, mutably.
    pub fn part_mut(&mut self, id: PartId) -> Option<&mut Part> {
        self.parts.iter_mut().find(|part| part.id == id)
    }

    /// Total size of all parts; a movement-conflict tie breaker.
    #[must_use]
    pub fn part_size_sum(&self) -> i32 {
        self.parts.iter().map(|part| part.size).sum()
    }

    fn functional_cores(&self) -> impl Iterator<Item = &Part> {
        self.parts
            .iter()
            .filter(|part| part.is_functional() && part.current_energy().is_some())
    }

    /// Energy pooled across the unit's functional cores.
    #[must_use]
    pub fn energy_available(&self) -> Fixed {
        self.functional_cores()
            .filter_map(Part::current_energy)
            .sum()
    }

    /// Pay `cost` from the functional cores in part order.
    ///
    /// All or nothing: returns `false` and leaves every core untouched if
    /// the pooled energy is short.
    pub fn pay_energy(&mut self, cost: Fixed) -> bool {
        if cost > self.energy_available() {
            return false;
        }
        let mut remaining = cost;
        for part in &mut self.parts {
            if remaining <= Fixed::ZERO {
                break;
            }
            if !part.is_functional() {
                continue;
            }
            if let PartKind::EnergyCore { current_energy } = &mut part.kind {
                let drawn = remaining.min(*current_energy);
                *current_energy -= drawn;
                remaining -= drawn;
            }
        }
        true
    }

    /// Apply one hit of `damage`.
    ///
    /// Functional armor absorbs first, then the remaining functional parts
    /// in list order; whatever a part cannot absorb carries to the next.
    pub fn take_hit(&mut self, damage: Fixed) {
        let order = self
            .parts
            .iter()
            .enumerate()
            .filter(|(_, part)| matches!(part.kind, PartKind::Armor))
            .chain(
                self.parts
                    .iter()
                    .enumerate()
                    .filter(|(_, part)| !matches!(part.kind, PartKind::Armor)),
            )
            .filter(|(_, part)| part.is_functional())
            .map(|(index, _)| index)
            .collect::<Vec<_>>();

        let mut remaining = damage;
        for index in order {
            if remaining <= Fixed::ZERO {
                break;
            }
            remaining = self.parts[index].absorb(remaining);
        }
    }
}

/// What an entity is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EntityKind {
    /// A player's unit.
    Unit(Unit),
    /// A resource deposit; shares cells with units.
    ResourcePile(ResourcePile),
    /// Impassable terrain; stops blasts.
    Wall,
}

/// Anything occupying a square footprint on the board.
///
/// Equality and hashing use the identity alone, so "the same" entity can
/// be located across a deep copy or a network round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Stable identity.
    pub id: EntityId,
    /// Top-left cell of the footprint.
    pub origin: Coord,
    /// Footprint side length.
    pub size: i32,
    /// Variant data.
    pub kind: EntityKind,
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Entity {}

impl std::hash::Hash for Entity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Entity {
    /// Create a unit entity.
    #[must_use]
    pub const fn unit(id: EntityId, origin: Coord, size: i32, unit: Unit) -> Self {
        Self {
            id,
            origin,
            size,
            kind: EntityKind::Unit(unit),
        }
    }

    /// Create a 1×1 resource pile.
    #[must_use]
    pub const fn resource_pile(id: EntityId, origin: Coord, pile: ResourcePile) -> Self {
        Self {
            id,
            origin,
            size: 1,
            kind: EntityKind::ResourcePile(pile),
        }
    }

    /// Create a wall.
    #[must_use]
    pub const fn wall(id: EntityId, origin: Coord, size: i32) -> Self {
        Self {
            id,
            origin,
            size,
            kind: EntityKind::Wall,
        }
    }

    /// Unit data, if this entity is a unit.
    #[must_use]
    pub const fn as_unit(&self) -> Option<&Unit> {
        match &self.kind {
            EntityKind::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    /// Mutable unit data, if this entity is a unit.
    pub fn as_unit_mut(&mut self) -> Option<&mut Unit> {
        match &mut self.kind {
            EntityKind::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    /// Pile data, if this entity is a resource pile.
    pub fn as_resource_pile_mut(&mut self) -> Option<&mut ResourcePile> {
        match &mut self.kind {
            EntityKind::ResourcePile(pile) => Some(pile),
            _ => None,
        }
    }

    /// Check if this entity is a resource pile.
    #[must_use]
    pub const fn is_resource_pile(&self) -> bool {
        matches!(self.kind, EntityKind::ResourcePile(_))
    }

    /// Check if this entity is a wall.
    #[must_use]
    pub const fn is_wall(&self) -> bool {
        matches!(self.kind, EntityKind::Wall)
    }
}
