//! Unit blueprints: the templates production copies from.

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, Unit};
use crate::grid::Coord;
use crate::ids::{IdSource, PlayerNumber, TeamNumber};
use crate::math::{fixed, from_percent, Fixed};
use crate::parts::{Part, PartKind, ProducerState};
use crate::shape::ShapeKind;

/// Kind of a part in a blueprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartSpecKind {
    /// Movement part with its pattern.
    Locomotor(ShapeKind),
    /// Weapon part with its targeting pattern.
    Armament(ShapeKind),
    /// Resource collector.
    Collector,
    /// Research generator.
    Researcher,
    /// Unit builder.
    Producer,
    /// Energy storage.
    EnergyCore,
    /// Passive armor.
    Armor,
}

impl PartSpecKind {
    fn fresh_state(self) -> PartKind {
        match self {
            Self::Locomotor(shape) => PartKind::Locomotor { shape },
            Self::Armament(shape) => PartKind::Armament { shape },
            Self::Collector => PartKind::Collector,
            Self::Researcher => PartKind::Researcher,
            Self::Producer => PartKind::Producer(ProducerState::default()),
            Self::EnergyCore => PartKind::EnergyCore {
                current_energy: Fixed::ZERO,
            },
            Self::Armor => PartKind::Armor,
        }
    }
}

/// One part of a blueprint.
///
/// # Example RON
///
/// ```ron
/// PartSpec(kind: Locomotor(Rook), size: 1, quality_percent: 150)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSpec {
    /// Part kind.
    pub kind: PartSpecKind,
    /// Part size.
    pub size: i32,
    /// Quality as an integer percentage (`150` is 1.5).
    #[serde(default = "default_quality_percent")]
    pub quality_percent: u32,
}

const fn default_quality_percent() -> u32 {
    100
}

impl PartSpec {
    /// Quality multiplier.
    #[must_use]
    pub fn quality(&self) -> Fixed {
        from_percent(self.quality_percent)
    }
}

/// Data-driven unit definition.
///
/// # Example RON
///
/// ```ron
/// UnitBlueprint(
///     name: "scout",
///     size: 1,
///     production_cost: 10,
///     research_threshold_percent: 5,
///     parts: [
///         PartSpec(kind: Locomotor(Knight), size: 1),
///         PartSpec(kind: EnergyCore, size: 1, quality_percent: 120),
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitBlueprint {
    /// Unique name within the catalog; production actions refer to it.
    pub name: String,
    /// Footprint side length.
    pub size: i32,
    /// Parts in list order.
    pub parts: Vec<PartSpec>,
    /// Resources charged when a build starts; also the production points needed.
    pub production_cost: u32,
    /// Research fraction needed to unlock, as a percentage.
    #[serde(default)]
    pub research_threshold_percent: u32,
    /// The team's starting unit.
    #[serde(default)]
    pub mothership: bool,
}

impl UnitBlueprint {
    /// Production cost as a fixed-point amount.
    #[must_use]
    pub fn cost(&self) -> Fixed {
        Fixed::from_num(self.production_cost)
    }

    /// Research fraction needed to unlock.
    #[must_use]
    pub fn research_threshold(&self) -> Fixed {
        from_percent(self.research_threshold_percent)
    }

    /// Sum of part sizes.
    #[must_use]
    pub fn part_size_sum(&self) -> i32 {
        self.parts.iter().map(|part| part.size).sum()
    }

    /// Build a fresh unit from this blueprint.
    ///
    /// Parts are undamaged, cores empty and producers idle. The entity
    /// identity is drawn first, then one identity per part in list order.
    pub fn instantiate(
        &self,
        owner: PlayerNumber,
        team: TeamNumber,
        origin: Coord,
        ids: &mut impl IdSource,
    ) -> Entity {
        let id = ids.next_entity_id();
        let parts = self
            .parts
            .iter()
            .map(|spec| {
                Part::new(
                    ids.next_part_id(),
                    spec.size,
                    spec.quality(),
                    spec.kind.fresh_state(),
                )
            })
            .collect();
        let unit = Unit {
            name: self.name.clone(),
            owner,
            team,
            parts,
            production_cost: self.cost(),
            research_threshold: self.research_threshold(),
        };
        Entity::unit(id, origin, self.size, unit)
    }

    /// Whether a builder of `builder_size` may produce this blueprint.
    ///
    /// Builders produce strictly smaller units, except that a size-1
    /// builder may produce size-6 units.
    #[must_use]
    pub const fn buildable_by(&self, builder_size: i32) -> bool {
        self.size < builder_size || (builder_size == 1 && self.size == 6)
    }

    /// Maximum hit points a fresh copy would have.
    #[must_use]
    pub fn max_hp(&self) -> Fixed {
        self.parts
            .iter()
            .map(|spec| fixed(spec.size) * fixed(crate::parts::HP_PER_SIZE) * spec.quality())
            .sum()
    }
}
