//! Simultaneous movement with conflict resolution.
//!
//! Every paid move is applied at once with no collision checks. The board
//! is then scanned for cells holding more than one unit or wall. On each
//! such cell the highest-priority occupant stays and every other mover is
//! sent back to where it started, becoming stationary. Scanning repeats
//! until no cell is shared.
//!
//! Priority, highest first:
//! 1. stationary (never moved, reverted, or a wall) over moved
//! 2. larger footprint
//! 3. larger total part size
//! 4. lower player number
//! 5. lower identity
//!
//! Every round that finds a conflict reverts at least one mover, and
//! reverted units never move again, so the loop ends.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use crate::grid::Coord;
use crate::ids::{EntityId, PlayerNumber};
use crate::math::fixed;
use crate::simulation::{drop_action, gated_actions, pay, TurnReport};
use crate::turn::{Action, Turn};
use crate::world::WorldState;

/// Ordering key for one occupant of a contested cell; larger wins.
type Priority = (bool, i32, i32, Reverse<PlayerNumber>, Reverse<EntityId>);

/// Where each moving unit started.
type Origins = BTreeMap<EntityId, Coord>;

/// Apply locomotor actions and resolve the resulting overlaps.
pub fn resolve(world: &mut WorldState, turn: &Turn, report: &mut TurnReport) {
    let moves = pay_for_moves(world, turn, report);
    if moves.is_empty() {
        return;
    }

    let mut moving = Origins::new();
    for (unit, (origin, destination)) in moves {
        match world.board.relocate(unit, destination) {
            Ok(()) => {
                moving.insert(unit, origin);
            }
            Err(error) => tracing::warn!(unit = %unit, %error, "Move target vanished"),
        }
    }

    let mut round = 0u32;
    loop {
        let contested = world.board.contested_cells();
        if contested.is_empty() {
            break;
        }
        round += 1;
        tracing::trace!(round, cells = contested.len(), movers = moving.len(), "Resolving move conflicts");

        let mut reverted_this_round = 0usize;
        for cell in contested {
            let occupants: Vec<EntityId> = world.board.solid_occupants(cell).collect();
            if occupants.len() < 2 {
                continue;
            }
            let Some(winner) = occupants
                .iter()
                .copied()
                .max_by_key(|&id| priority(world, &moving, id))
            else {
                continue;
            };
            for loser in occupants.into_iter().filter(|&id| id != winner) {
                let Some(start) = moving.remove(&loser) else {
                    continue;
                };
                if world.board.relocate(loser, start).is_ok() {
                    tracing::trace!(unit = %loser, %cell, winner = %winner, "Move reverted");
                    report.reverted.push(loser);
                    reverted_this_round += 1;
                }
            }
        }

        assert!(
            reverted_this_round > 0,
            "movement conflicts remain but no mover can be reverted"
        );
    }

    report.moved.extend(moving.keys().copied());
}

/// Pay for each unit's first affordable move.
///
/// Returns each paying unit's start and requested destination. A unit
/// moves at most once per turn; locomotor actions of a unit that has
/// already paid for a move are dropped.
fn pay_for_moves(
    world: &mut WorldState,
    turn: &Turn,
    report: &mut TurnReport,
) -> BTreeMap<EntityId, (Coord, Coord)> {
    let mut moves = BTreeMap::new();

    for action in gated_actions(world, turn, |a| matches!(a, Action::Locomotor { .. }), report) {
        let Action::Locomotor { offset } = action.action else {
            continue;
        };
        if moves.contains_key(&action.unit) {
            drop_action(report, action.player, action.unit, action.part, "unit already moving");
            continue;
        }
        let Some(entity) = world.board.get(action.unit) else {
            continue;
        };
        let Some(part) = entity.as_unit().and_then(|unit| unit.part(action.part)) else {
            continue;
        };
        let Some(shape) = part.shape() else {
            continue;
        };
        let origin = entity.origin;
        let bounds = world.board.bounds();
        let Some(steps) = shape.steps_to(bounds, origin, part.size, entity.size, offset) else {
            drop_action(report, action.player, action.unit, action.part, "target not on a move path");
            continue;
        };
        let cost = part.energy_per_unit().saturating_mul(fixed(steps));

        if pay(world, &action, cost, report) {
            moves.insert(action.unit, (origin, origin.plus(offset)));
        }
    }
    moves
}

fn priority(world: &WorldState, moving: &Origins, id: EntityId) -> Priority {
    let stationary = !moving.contains_key(&id);
    match world.board.get(id) {
        Some(entity) => match entity.as_unit() {
            Some(unit) => (
                stationary,
                entity.size,
                unit.part_size_sum(),
                Reverse(unit.owner),
                Reverse(id),
            ),
            None => (true, entity.size, 0, Reverse(PlayerNumber::MAX), Reverse(id)),
        },
        None => (stationary, 0, 0, Reverse(PlayerNumber::MAX), Reverse(id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, Unit};
    use crate::grid::Board;
    use crate::ids::PartId;
    use crate::math::Fixed;
    use crate::parts::{Part, PartKind};
    use crate::player::Player;
    use crate::shape::ShapeKind;

    fn walker(id: u64, owner: PlayerNumber, x: i32, y: i32, size: i32, legs: i32) -> Entity {
        let unit = Unit {
            name: "walker".to_string(),
            owner,
            team: owner,
            parts: vec![
                Part::new(
                    PartId(id * 10),
                    legs,
                    Fixed::ONE,
                    PartKind::Locomotor {
                        shape: ShapeKind::Queen,
                    },
                ),
                Part::new(
                    PartId(id * 10 + 1),
                    1,
                    Fixed::ONE,
                    PartKind::EnergyCore {
                        current_energy: fixed(10),
                    },
                ),
            ],
            production_cost: fixed(10),
            research_threshold: Fixed::ZERO,
        };
        Entity::unit(EntityId(id), Coord::new(x, y), size, unit)
    }

    fn world(entities: Vec<Entity>) -> WorldState {
        let mut board = Board::new(20, 20);
        for entity in entities {
            board.place(entity).unwrap();
        }
        WorldState::new(board, (0..3).map(|n| Player::new(n, n, format!("p{n}"), Vec::new())))
    }

    fn order(turn: &mut Turn, owner: PlayerNumber, unit: u64, dx: i32, dy: i32) {
        turn.add_action(
            owner,
            EntityId(unit),
            PartId(unit * 10),
            Action::Locomotor {
                offset: Coord::new(dx, dy),
            },
        );
    }

    fn origin(world: &WorldState, id: u64) -> Coord {
        world.board.get(EntityId(id)).unwrap().origin
    }

    #[test]
    fn test_unblocked_move_reaches_target_and_pays_per_step() {
        let mut world = world(vec![walker(1, 0, 5, 5, 1, 1)]);
        let mut turn = Turn::new();
        order(&mut turn, 0, 1, 2, 0);

        let mut report = TurnReport::default();
        resolve(&mut world, &turn, &mut report);
        assert_eq!(origin(&world, 1), Coord::new(7, 5));
        assert_eq!(report.moved, vec![EntityId(1)]);
        assert_eq!(
            world.board.unit(EntityId(1)).unwrap().energy_available(),
            fixed(8)
        );
    }

    #[test]
    fn test_move_into_stationary_unit_reverts() {
        let mut world = world(vec![walker(1, 0, 5, 5, 1, 1), walker(2, 1, 7, 5, 1, 1)]);
        let mut turn = Turn::new();
        order(&mut turn, 0, 1, 2, 0);

        let mut report = TurnReport::default();
        resolve(&mut world, &turn, &mut report);
        assert_eq!(origin(&world, 1), Coord::new(5, 5));
        assert_eq!(origin(&world, 2), Coord::new(7, 5));
        assert_eq!(report.reverted, vec![EntityId(1)]);
        // energy is spent even when the move is undone
        assert_eq!(
            world.board.unit(EntityId(1)).unwrap().energy_available(),
            fixed(8)
        );
    }

    #[test]
    fn test_larger_unit_wins_shared_destination() {
        // a 2x2 unit moving to (7,5) covers (7..9, 5..7); the 1x1 targets (8,6)
        let mut world = world(vec![walker(1, 0, 5, 5, 2, 1), walker(2, 0, 10, 6, 1, 1)]);
        let mut turn = Turn::new();
        order(&mut turn, 0, 1, 2, 0);
        order(&mut turn, 0, 2, -2, 0);

        let mut report = TurnReport::default();
        resolve(&mut world, &turn, &mut report);
        assert_eq!(origin(&world, 1), Coord::new(7, 5));
        assert_eq!(origin(&world, 2), Coord::new(10, 6));
    }

    #[test]
    fn test_part_size_then_player_number_break_ties() {
        let mut world = world(vec![walker(1, 1, 5, 5, 1, 1), walker(2, 1, 9, 5, 1, 2)]);
        let mut turn = Turn::new();
        order(&mut turn, 1, 1, 2, 0);
        order(&mut turn, 1, 2, -2, 0);
        let mut report = TurnReport::default();
        resolve(&mut world, &turn, &mut report);
        assert_eq!(origin(&world, 2), Coord::new(7, 5));
        assert_eq!(origin(&world, 1), Coord::new(5, 5));

        let mut world = world_of_equals();
        let mut turn = Turn::new();
        order(&mut turn, 2, 1, 2, 0);
        order(&mut turn, 0, 2, -2, 0);
        let mut report = TurnReport::default();
        resolve(&mut world, &turn, &mut report);
        assert_eq!(origin(&world, 2), Coord::new(7, 5));
        assert_eq!(origin(&world, 1), Coord::new(5, 5));
    }

    fn world_of_equals() -> WorldState {
        world(vec![walker(1, 2, 5, 5, 1, 1), walker(2, 0, 9, 5, 1, 1)])
    }

    #[test]
    fn test_revert_cascades() {
        // 1 moves into 2's start; 2 moves into 3's cell; 3 stays put.
        // 2 loses to 3 and reverts, then 1 loses to the reverted 2.
        let mut world = world(vec![
            walker(1, 0, 3, 5, 1, 1),
            walker(2, 0, 5, 5, 1, 1),
            walker(3, 0, 7, 5, 1, 1),
        ]);
        let mut turn = Turn::new();
        order(&mut turn, 0, 1, 2, 0);
        order(&mut turn, 0, 2, 2, 0);

        let mut report = TurnReport::default();
        resolve(&mut world, &turn, &mut report);
        assert_eq!(origin(&world, 1), Coord::new(3, 5));
        assert_eq!(origin(&world, 2), Coord::new(5, 5));
        assert_eq!(origin(&world, 3), Coord::new(7, 5));
        assert_eq!(report.reverted, vec![EntityId(2), EntityId(1)]);
        world.board.assert_exclusive();
    }

    #[test]
    fn test_swap_through_each_other_is_allowed() {
        let mut world = world(vec![walker(1, 0, 5, 5, 1, 1), walker(2, 1, 7, 5, 1, 1)]);
        let mut turn = Turn::new();
        order(&mut turn, 0, 1, 2, 0);
        order(&mut turn, 1, 2, -2, 0);

        let mut report = TurnReport::default();
        resolve(&mut world, &turn, &mut report);
        assert_eq!(origin(&world, 1), Coord::new(7, 5));
        assert_eq!(origin(&world, 2), Coord::new(5, 5));
        assert!(report.reverted.is_empty());
    }

    #[test]
    fn test_wall_blocks_destination() {
        let mut world = world(vec![
            walker(1, 0, 5, 5, 1, 1),
            Entity::wall(EntityId(99), Coord::new(7, 5), 1),
        ]);
        let mut turn = Turn::new();
        order(&mut turn, 0, 1, 2, 0);
        let mut report = TurnReport::default();
        resolve(&mut world, &turn, &mut report);
        assert_eq!(origin(&world, 1), Coord::new(5, 5));
    }

    #[test]
    fn test_unreachable_target_is_dropped_unpaid() {
        let mut world = world(vec![walker(1, 0, 5, 5, 1, 1)]);
        let mut turn = Turn::new();
        order(&mut turn, 0, 1, 3, 0);
        let mut report = TurnReport::default();
        resolve(&mut world, &turn, &mut report);
        assert_eq!(report.dropped, 1);
        assert_eq!(origin(&world, 1), Coord::new(5, 5));
        assert_eq!(
            world.board.unit(EntityId(1)).unwrap().energy_available(),
            fixed(10)
        );
    }
}
