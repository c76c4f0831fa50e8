//! Unit parts and their size/quality-derived stats.
//!
//! A unit is nothing but an ordered list of parts. Each part has a size,
//! a quality multiplier and accumulated damage; its kind decides what it
//! can do during a turn.

use serde::{Deserialize, Serialize};

use crate::grid::{footprints_overlap, Bounds, Coord};
use crate::ids::PartId;
use crate::math::{fixed, fixed_serde, saturating_div, Fixed};
use crate::shape::{ShapeKind, REACH_PER_SIZE};

/// Hit points per point of size at quality 1.
pub const HP_PER_SIZE: i32 = 10;

/// Damage dealt by one armament hit.
pub const DAMAGE_PER_HIT: i32 = 10;

/// Energy capacity per point of core size.
pub const CORE_CAPACITY_PER_SIZE: i32 = 10;

/// Energy recharge per point of core quality.
pub const CORE_RECHARGE_PER_QUALITY: i32 = 10;

/// In-progress production state of a producer part.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProducerState {
    /// Blueprint currently being built, if any.
    pub under_production: Option<String>,
    /// Points needed to finish the current blueprint.
    #[serde(with = "fixed_serde")]
    pub points_to_produce: Fixed,
    /// Points accumulated so far.
    #[serde(with = "fixed_serde")]
    pub current_production_points: Fixed,
    /// Number of units this part has spawned; keys derived identities.
    pub spawn_counter: u64,
}

/// What a part does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartKind {
    /// Moves the unit along its shape's paths.
    Locomotor {
        /// Movement pattern.
        shape: ShapeKind,
    },
    /// Fires blasts along its shape's paths.
    Armament {
        /// Targeting pattern.
        shape: ShapeKind,
    },
    /// Removes resources from piles under the unit.
    Collector,
    /// Generates research points.
    Researcher,
    /// Builds new units from blueprints.
    Producer(ProducerState),
    /// Stores and recharges the unit's energy.
    EnergyCore {
        /// Energy currently stored.
        #[serde(with = "fixed_serde")]
        current_energy: Fixed,
    },
    /// Passive protection; absorbs hits first.
    Armor,
}

impl PartKind {
    /// Short name of the kind.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Locomotor { .. } => "locomotor",
            Self::Armament { .. } => "armament",
            Self::Collector => "collector",
            Self::Researcher => "researcher",
            Self::Producer(_) => "producer",
            Self::EnergyCore { .. } => "core",
            Self::Armor => "armor",
        }
    }
}

/// One functional component of a unit.
///
/// Equality is by identity only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    /// Stable identity.
    pub id: PartId,
    /// Size; drives most stats.
    pub size: i32,
    /// Quality multiplier.
    #[serde(with = "fixed_serde")]
    pub quality: Fixed,
    /// Damage taken so far.
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,
    /// Kind and kind-specific state.
    pub kind: PartKind,
}

impl PartialEq for Part {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Part {}

impl std::hash::Hash for Part {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Part {
    /// Create an undamaged part.
    #[must_use]
    pub fn new(id: PartId, size: i32, quality: Fixed, kind: PartKind) -> Self {
        Self {
            id,
            size,
            quality,
            damage: Fixed::ZERO,
            kind,
        }
    }

    fn size_fixed(&self) -> Fixed {
        fixed(self.size)
    }

    /// `size × 10 × quality`.
    #[must_use]
    pub fn max_hp(&self) -> Fixed {
        self.size_fixed() * fixed(HP_PER_SIZE) * self.quality
    }

    /// Remaining hit points, never negative.
    #[must_use]
    pub fn hp(&self) -> Fixed {
        (self.max_hp() - self.damage).max(Fixed::ZERO)
    }

    /// A part acts only while it has hit points left.
    #[must_use]
    pub fn is_functional(&self) -> bool {
        self.hp() > Fixed::ZERO
    }

    /// Absorb up to `amount` damage; returns what is left over.
    pub fn absorb(&mut self, amount: Fixed) -> Fixed {
        let taken = amount.min(self.hp());
        self.damage += taken;
        amount - taken
    }

    /// Energy per square moved, per resource unit collected (`1 / quality`).
    #[must_use]
    pub fn energy_per_unit(&self) -> Fixed {
        saturating_div(Fixed::ONE, self.quality)
    }

    /// Activation cost of armaments, researchers and producers (`size / quality`).
    #[must_use]
    pub fn activation_cost(&self) -> Fixed {
        saturating_div(self.size_fixed(), self.quality)
    }

    /// Movement or blast reach along one path.
    #[must_use]
    pub fn reach(&self) -> i32 {
        match &self.kind {
            PartKind::Locomotor { shape } | PartKind::Armament { shape } => shape.reach(self.size),
            _ => self.size * REACH_PER_SIZE,
        }
    }

    /// Maximum squares a locomotor moves in one turn (`size × 2`).
    #[must_use]
    pub fn max_squares_traveled(&self) -> i32 {
        self.reach()
    }

    /// Resources a collector can remove per turn (`size`).
    #[must_use]
    pub fn max_resources_removed_per_turn(&self) -> Fixed {
        self.size_fixed()
    }

    /// Stored resources gained per resource removed (`quality`).
    #[must_use]
    pub const fn resources_gained_per_resources_removed(&self) -> Fixed {
        self.quality
    }

    /// Damage per armament hit.
    #[must_use]
    pub fn damage_per_hit(&self) -> Fixed {
        fixed(DAMAGE_PER_HIT)
    }

    /// Research generated per activation (`size`).
    #[must_use]
    pub const fn research_amount(&self) -> u32 {
        self.size.unsigned_abs()
    }

    /// Production points per activation (`size`).
    #[must_use]
    pub fn points_per_activation(&self) -> Fixed {
        self.size_fixed()
    }

    /// Energy core capacity (`size × 10`).
    #[must_use]
    pub fn maximum_energy(&self) -> Fixed {
        self.size_fixed() * fixed(CORE_CAPACITY_PER_SIZE)
    }

    /// Energy core recharge per turn (`quality × 10`).
    #[must_use]
    pub fn energy_recharge_per_turn(&self) -> Fixed {
        self.quality * fixed(CORE_RECHARGE_PER_QUALITY)
    }

    /// Movement/targeting shape, for locomotors and armaments.
    #[must_use]
    pub const fn shape(&self) -> Option<ShapeKind> {
        match &self.kind {
            PartKind::Locomotor { shape } | PartKind::Armament { shape } => Some(*shape),
            _ => None,
        }
    }

    /// Stored energy, for cores.
    #[must_use]
    pub const fn current_energy(&self) -> Option<Fixed> {
        match &self.kind {
            PartKind::EnergyCore { current_energy } => Some(*current_energy),
            _ => None,
        }
    }

    /// Producer state, for producers.
    #[must_use]
    pub const fn producer(&self) -> Option<&ProducerState> {
        match &self.kind {
            PartKind::Producer(state) => Some(state),
            _ => None,
        }
    }

    /// Mutable producer state, for producers.
    pub fn producer_mut(&mut self) -> Option<&mut ProducerState> {
        match &mut self.kind {
            PartKind::Producer(state) => Some(state),
            _ => None,
        }
    }

    /// Whether one more activation completes the current build.
    #[must_use]
    pub fn next_activation_produces(&self) -> bool {
        self.producer().is_some_and(|state| {
            state.under_production.is_some()
                && state.current_production_points + self.points_per_activation()
                    >= state.points_to_produce
        })
    }
}

/// Origins where a unit of `spawn_size` may appear next to its builder.
///
/// Each origin keeps the spawned footprint on the board, outside the
/// builder's footprint, and touching it at an edge or corner.
#[must_use]
pub fn spawn_coords(bounds: Bounds, builder_origin: Coord, builder_size: i32, spawn_size: i32) -> Vec<Coord> {
    let mut coords = Vec::new();
    for y in (builder_origin.y - spawn_size)..=(builder_origin.y + builder_size) {
        for x in (builder_origin.x - spawn_size)..=(builder_origin.x + builder_size) {
            let origin = Coord::new(x, y);
            if bounds.contains_footprint(origin, spawn_size)
                && !footprints_overlap(origin, spawn_size, builder_origin, builder_size)
            {
                coords.push(origin);
            }
        }
    }
    coords
}
