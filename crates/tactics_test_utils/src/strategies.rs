//! Proptest strategies.
//!
//! Worlds are generated as layouts of small hand-built units placed on a
//! board, skipping any that would overlap. Orders are generated as seeds
//! and resolved against a concrete world with [`orders_for`], so most
//! generated actions name real units and parts.

use proptest::prelude::*;
use tactics_core::entity::Entity;
use tactics_core::grid::{Board, Coord};
use tactics_core::ids::{EntityId, PartId, PlayerNumber};
use tactics_core::parts::{spawn_coords, Part, PartKind};
use tactics_core::shape::ShapeKind;
use tactics_core::turn::{Action, Turn};
use tactics_core::world::WorldState;

use crate::fixtures::{armament, core, fixed, locomotor, part, producer, standard_player, unit_entity};

/// Board side used by generated worlds.
pub const BOARD_SIDE: i32 = 12;

/// Any movement or blast pattern.
pub fn arb_shape() -> impl Strategy<Value = ShapeKind> {
    prop_oneof![
        Just(ShapeKind::Bishop),
        Just(ShapeKind::Rook),
        Just(ShapeKind::Knight),
        Just(ShapeKind::King),
        Just(ShapeKind::Queen),
    ]
}

/// A cell on a `width`×`height` board.
pub fn arb_coord(width: i32, height: i32) -> impl Strategy<Value = Coord> {
    (0..width, 0..height).prop_map(|(x, y)| Coord::new(x, y))
}

/// One generated unit before placement.
#[derive(Debug, Clone)]
pub struct UnitSeed {
    /// Owner.
    pub owner: PlayerNumber,
    /// Origin cell.
    pub origin: Coord,
    /// Footprint side.
    pub size: i32,
    /// Locomotor pattern.
    pub legs: ShapeKind,
    /// Armament pattern.
    pub gun: ShapeKind,
    /// Starting core energy.
    pub energy: i32,
    /// Damage already taken by the armament.
    pub wounded: bool,
}

/// Generate a unit seed for one of `players` players.
pub fn arb_unit_seed(players: u32) -> impl Strategy<Value = UnitSeed> {
    (
        0..players,
        arb_coord(BOARD_SIDE, BOARD_SIDE),
        1..=2i32,
        arb_shape(),
        arb_shape(),
        0..30i32,
        any::<bool>(),
    )
        .prop_map(|(owner, origin, size, legs, gun, energy, wounded)| UnitSeed {
            owner,
            origin,
            size,
            legs,
            gun,
            energy,
            wounded,
        })
}

/// Generated world contents.
#[derive(Debug, Clone)]
pub struct WorldSeed {
    /// Number of players.
    pub players: u32,
    /// Units, placed in order.
    pub units: Vec<UnitSeed>,
    /// Resource piles as `(cell, amount)`.
    pub piles: Vec<(Coord, i32)>,
    /// 1×1 walls.
    pub walls: Vec<Coord>,
}

impl WorldSeed {
    /// Build the world, skipping anything that does not fit.
    ///
    /// Unit `n` gets identity `n + 1` and part identities `(n + 1) * 10 + k`.
    #[must_use]
    pub fn build(&self) -> WorldState {
        let mut board = Board::new(BOARD_SIDE, BOARD_SIDE);
        for (index, seed) in (1u64..).zip(&self.units) {
            let mut gun = armament(index * 10 + 1, 1, seed.gun);
            if seed.wounded {
                gun.damage = fixed(5);
            }
            let parts: Vec<Part> = vec![
                locomotor(index * 10, 1, seed.legs),
                gun,
                core(index * 10 + 2, seed.size, seed.energy),
                part(index * 10 + 3, 1, PartKind::Collector),
                part(index * 10 + 4, 1, PartKind::Researcher),
                producer(index * 10 + 5, 1),
            ];
            let _ = board.place_exclusive(unit_entity(index, seed.owner, seed.origin, seed.size, parts));
        }
        for (index, &(cell, amount)) in (1000u64..).zip(&self.piles) {
            let pile = Entity::resource_pile(
                EntityId(index),
                cell,
                tactics_core::entity::ResourcePile::new(fixed(amount)),
            );
            let _ = board.place(pile);
        }
        for (index, &cell) in (2000u64..).zip(&self.walls) {
            let _ = board.place_exclusive(Entity::wall(EntityId(index), cell, 1));
        }
        WorldState::new(board, (0..self.players).map(standard_player))
    }
}

/// Generate a small world with up to `max_units` units.
pub fn arb_world(max_units: usize) -> impl Strategy<Value = WorldSeed> {
    (2u32..=3).prop_flat_map(move |players| {
        (
            Just(players),
            proptest::collection::vec(arb_unit_seed(players), 1..=max_units),
            proptest::collection::vec((arb_coord(BOARD_SIDE, BOARD_SIDE), 1..20i32), 0..6),
            proptest::collection::vec(arb_coord(BOARD_SIDE, BOARD_SIDE), 0..4),
        )
            .prop_map(|(players, units, piles, walls)| WorldSeed {
                players,
                units,
                piles,
                walls,
            })
    })
}

/// One generated order before it is bound to a world.
#[derive(Debug, Clone, Copy)]
pub struct OrderSeed {
    /// Which unit, modulo the unit count.
    pub unit: usize,
    /// Which part, modulo the part count.
    pub part: usize,
    /// Free choice for the action's parameter.
    pub pick: usize,
    /// Submit under another player's number.
    pub impersonate: bool,
}

/// Generate up to `max_orders` order seeds.
pub fn arb_orders(max_orders: usize) -> impl Strategy<Value = Vec<OrderSeed>> {
    proptest::collection::vec(
        (any::<usize>(), any::<usize>(), any::<usize>(), proptest::bool::weighted(0.1)).prop_map(
            |(unit, part, pick, impersonate)| OrderSeed {
                unit,
                part,
                pick,
                impersonate,
            },
        ),
        0..max_orders,
    )
}

/// Bind order seeds to the units of a concrete world.
///
/// Each seed picks a unit and a part and builds an action of the part's
/// kind. Impersonating seeds submit under the next player's number, and
/// a seed landing on a core or armor part produces a mismatched action.
#[must_use]
pub fn orders_for(world: &WorldState, seeds: &[OrderSeed]) -> Turn {
    let units = world.board.unit_ids();
    let mut turn = Turn::for_players(world.player_numbers());
    let players = world.player_numbers();
    if units.is_empty() || players.is_empty() {
        return turn;
    }
    let bounds = world.board.bounds();

    for seed in seeds {
        let unit_id = units[seed.unit % units.len()];
        let Some(entity) = world.board.get(unit_id) else {
            continue;
        };
        let Some(unit) = entity.as_unit() else {
            continue;
        };
        if unit.parts.is_empty() {
            continue;
        }
        let part = &unit.parts[seed.part % unit.parts.len()];
        let action = match &part.kind {
            PartKind::Locomotor { shape } => {
                let paths = shape.move_paths(bounds, entity.origin, part.size, entity.size);
                let cells: Vec<Coord> = paths.into_iter().flatten().collect();
                match cells.get(seed.pick % cells.len().max(1)) {
                    Some(&cell) => Action::Locomotor {
                        offset: cell.minus(entity.origin),
                    },
                    None => continue,
                }
            }
            PartKind::Armament { .. } => Action::Armament {
                blast_index: seed.pick % 9,
            },
            PartKind::Collector => Action::Collector,
            PartKind::Researcher => Action::Researcher,
            PartKind::Producer(_) => {
                let names = ["scout", "gunner", "harvester", "mothership", "missing"];
                let name = names[seed.pick % names.len()];
                let spots = spawn_coords(bounds, entity.origin, entity.size, 1);
                Action::Producer {
                    blueprint: name.to_string(),
                    out_coords: spots.get(seed.pick % spots.len().max(1)).copied(),
                }
            }
            PartKind::EnergyCore { .. } | PartKind::Armor => Action::Researcher,
        };
        let player = if seed.impersonate {
            let index = players.iter().position(|&p| p == unit.owner).unwrap_or(0);
            players[(index + 1) % players.len()]
        } else {
            unit.owner
        };
        turn.add_action(player, unit_id, part.id, action);
    }
    turn
}

/// Any single action, unbound to a world.
pub fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (-4..=4i32, -4..=4i32).prop_map(|(dx, dy)| Action::Locomotor {
            offset: Coord::new(dx, dy),
        }),
        (0usize..10).prop_map(|blast_index| Action::Armament { blast_index }),
        Just(Action::Collector),
        Just(Action::Researcher),
        ("[a-z]{1,8}", proptest::option::of(arb_coord(BOARD_SIDE, BOARD_SIDE))).prop_map(
            |(blueprint, out_coords)| Action::Producer {
                blueprint,
                out_coords,
            }
        ),
    ]
}

/// A turn with arbitrary identities, for merge and encoding properties.
pub fn arb_turn(players: u32) -> impl Strategy<Value = Turn> {
    proptest::collection::vec((0..players, 1u64..6, 1u64..6, arb_action()), 0..12).prop_map(
        |entries| {
            let mut turn = Turn::new();
            for (player, unit, part, action) in entries {
                turn.add_action(player, EntityId(unit), PartId(unit * 10 + part), action);
            }
            turn
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn test_generated_worlds_are_exclusive() {
        let mut runner = TestRunner::deterministic();
        for _ in 0..20 {
            let seed = arb_world(8).new_tree(&mut runner).unwrap().current();
            let world = seed.build();
            world.board.assert_exclusive();
            assert!(world.board.len() <= seed.units.len() + seed.piles.len() + seed.walls.len());
        }
    }

    #[test]
    fn test_orders_name_real_units() {
        let mut runner = TestRunner::deterministic();
        let world = arb_world(6).new_tree(&mut runner).unwrap().current().build();
        let orders = arb_orders(10).new_tree(&mut runner).unwrap().current();
        let turn = orders_for(&world, &orders);
        for (_, unit, _, _) in turn.iter() {
            assert!(world.board.contains(unit));
        }
    }
}
