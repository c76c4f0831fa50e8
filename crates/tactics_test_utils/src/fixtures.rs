//! Test fixtures and helpers.
//!
//! Pre-built catalogs, parts, units and worlds for consistent testing.
//! Everything here draws identities from [`SequentialIds`], so building
//! the same fixture twice yields identical worlds.

use fixed::types::I32F32;
use tactics_core::config::RulesConfig;
use tactics_core::data::Catalog;
use tactics_core::entity::{Entity, Unit};
use tactics_core::grid::{Board, Coord};
use tactics_core::ids::{EntityId, IdSource, PartId, PlayerNumber};
use tactics_core::math::Fixed;
use tactics_core::parts::{Part, PartKind, ProducerState};
use tactics_core::player::Player;
use tactics_core::shape::ShapeKind;
use tactics_core::world::WorldState;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Counter-based identities starting from a chosen value.
///
/// Unlike the process-wide counter, two instances started at the same
/// value produce the same sequence.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    /// Start handing out identities at `first`.
    #[must_use]
    pub const fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    fn bump(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdSource for SequentialIds {
    fn next_entity_id(&mut self) -> EntityId {
        EntityId(self.bump())
    }

    fn next_part_id(&mut self) -> PartId {
        PartId(self.bump())
    }
}

/// Catalog used by most fixtures.
///
/// - `mothership` (3×3): producer, core, collector, researcher, armor
/// - `scout` (1×1): queen locomotor
/// - `gunner` (1×1): rook armament and locomotor, 5% research to unlock
/// - `harvester` (2×2): collector with a king locomotor
pub const STANDARD_CATALOG_RON: &str = r#"
Catalog(
    team: "standard",
    blueprints: [
        UnitBlueprint(
            name: "mothership",
            size: 3,
            production_cost: 100,
            mothership: true,
            parts: [
                PartSpec(kind: Producer, size: 3),
                PartSpec(kind: EnergyCore, size: 3),
                PartSpec(kind: Collector, size: 2),
                PartSpec(kind: Researcher, size: 1),
                PartSpec(kind: Armor, size: 2),
            ],
        ),
        UnitBlueprint(
            name: "scout",
            size: 1,
            production_cost: 10,
            parts: [
                PartSpec(kind: Locomotor(Queen), size: 1),
                PartSpec(kind: EnergyCore, size: 1),
            ],
        ),
        UnitBlueprint(
            name: "gunner",
            size: 1,
            production_cost: 20,
            research_threshold_percent: 5,
            parts: [
                PartSpec(kind: Armament(Rook), size: 1),
                PartSpec(kind: Locomotor(Rook), size: 1),
                PartSpec(kind: EnergyCore, size: 1, quality_percent: 150),
            ],
        ),
        UnitBlueprint(
            name: "harvester",
            size: 2,
            production_cost: 30,
            parts: [
                PartSpec(kind: Collector, size: 2),
                PartSpec(kind: Locomotor(King), size: 1),
                PartSpec(kind: EnergyCore, size: 2),
            ],
        ),
    ],
)
"#;

/// The parsed standard catalog.
///
/// # Panics
///
/// Panics if [`STANDARD_CATALOG_RON`] stops parsing.
#[must_use]
pub fn standard_catalog() -> Catalog {
    Catalog::from_ron_str("standard.ron", STANDARD_CATALOG_RON).expect("standard catalog is valid")
}

/// A player holding the standard catalog, on a team of its own.
#[must_use]
pub fn standard_player(number: PlayerNumber) -> Player {
    Player::new(
        number,
        number,
        format!("player{number}"),
        standard_catalog().blueprints,
    )
}

/// Quality-1 part.
#[must_use]
pub fn part(id: u64, size: i32, kind: PartKind) -> Part {
    Part::new(PartId(id), size, Fixed::ONE, kind)
}

/// Energy core holding `energy`.
#[must_use]
pub fn core(id: u64, size: i32, energy: i32) -> Part {
    part(
        id,
        size,
        PartKind::EnergyCore {
            current_energy: fixed(energy),
        },
    )
}

/// Locomotor with a movement pattern.
#[must_use]
pub fn locomotor(id: u64, size: i32, shape: ShapeKind) -> Part {
    part(id, size, PartKind::Locomotor { shape })
}

/// Armament with a targeting pattern.
#[must_use]
pub fn armament(id: u64, size: i32, shape: ShapeKind) -> Part {
    part(id, size, PartKind::Armament { shape })
}

/// Idle producer.
#[must_use]
pub fn producer(id: u64, size: i32) -> Part {
    part(id, size, PartKind::Producer(ProducerState::default()))
}

/// A hand-built unit entity.
#[must_use]
pub fn unit_entity(id: u64, owner: PlayerNumber, origin: Coord, size: i32, parts: Vec<Part>) -> Entity {
    let unit = Unit {
        name: format!("unit{id}"),
        owner,
        team: owner,
        parts,
        production_cost: fixed(10),
        research_threshold: Fixed::ZERO,
    };
    Entity::unit(EntityId(id), origin, size, unit)
}

/// Empty board with `players` standard players.
#[must_use]
pub fn empty_world(width: i32, height: i32, players: u32) -> WorldState {
    WorldState::new(Board::new(width, height), (0..players).map(standard_player))
}

/// Match start for `players` standard players on the default board.
///
/// # Panics
///
/// Panics if the players do not fit the start slots.
#[must_use]
pub fn starting_world(players: u32) -> WorldState {
    WorldState::starting(
        &RulesConfig::default(),
        (0..players).map(standard_player).collect(),
        &mut SequentialIds::default(),
    )
    .expect("starting world fits")
}

/// Two armies facing each other across a 20×20 board.
///
/// Each side has a mothership, two gunners in range of the enemy's, a
/// harvester on a pile and a scout. A wall sits in the middle.
///
/// # Panics
///
/// Panics if the layout stops fitting the board.
#[must_use]
pub fn skirmish_world() -> WorldState {
    let mut world = empty_world(20, 20, 2);
    let mut ids = SequentialIds::default();
    let layout = [
        (0, "mothership", Coord::new(1, 1)),
        (0, "gunner", Coord::new(7, 5)),
        (0, "gunner", Coord::new(7, 8)),
        (0, "harvester", Coord::new(3, 12)),
        (0, "scout", Coord::new(2, 16)),
        (1, "mothership", Coord::new(16, 16)),
        (1, "gunner", Coord::new(9, 5)),
        (1, "gunner", Coord::new(9, 8)),
        (1, "harvester", Coord::new(15, 12)),
        (1, "scout", Coord::new(17, 2)),
    ];
    for (owner, blueprint, origin) in layout {
        world
            .place_blueprint(owner, blueprint, origin, &mut ids)
            .expect("skirmish layout fits");
    }
    for origin in [Coord::new(3, 12), Coord::new(4, 13), Coord::new(15, 12), Coord::new(16, 13)] {
        world
            .add_resource_pile(origin, fixed(40), &mut ids)
            .expect("pile on board");
    }
    world
        .add_wall(Coord::new(9, 9), 2, &mut ids)
        .expect("wall fits");
    for number in [0, 1] {
        if let Ok(player) = world.player_mut(number) {
            player.resources = fixed(60);
        }
    }
    world
}
