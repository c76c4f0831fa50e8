//! Turn resolution.
//!
//! [`advance`] applies one merged turn to a world state through a fixed
//! sequence of phases:
//!
//! 1. **Charge** - every functional energy core recharges once
//! 2. **Research** - researchers add to their owner's research total
//! 3. **Collection** - collectors drain piles under their unit
//! 4. **Combat** - armaments fire; all hits land after every shot is paid
//! 5. **Production** - producers start, continue and finish builds
//! 6. **Destruction** - units with no hit points leave the board and turn
//! 7. **Movement** - locomotors move simultaneously; conflicts revert
//! 8. **Leak** - cores charged in phase 1 drop back to their capacity
//!
//! # Determinism
//!
//! Players, units and parts are visited in ascending identity order and
//! all arithmetic is fixed-point, so identical inputs give identical
//! outputs on every peer.
//!
//! # Dropped actions
//!
//! An action that names a unit the player does not own, a missing or
//! broken part, a part of the wrong kind, or that cannot be paid for
//! does nothing. It is logged at debug level and counted in the
//! [`TurnReport`], never reported as an error.

use std::collections::BTreeSet;

use crate::combat;
use crate::economy;
use crate::error::Result;
use crate::ids::{EntityId, PartId, PlayerNumber};
use crate::math::Fixed;
use crate::movement;
use crate::production;
use crate::turn::{Action, Turn};
use crate::world::WorldState;

/// What happened while resolving one turn.
///
/// Useful for presentation layers and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnReport {
    /// Actions that did nothing.
    pub dropped: u32,
    /// Research points added across all players.
    pub research_gained: u32,
    /// Resources added to stockpiles.
    pub resources_gained: Fixed,
    /// Hits landed, as `(attacker, target)`.
    pub hits: Vec<(EntityId, EntityId)>,
    /// Units spawned by production.
    pub spawned: Vec<EntityId>,
    /// Units removed after reaching zero hit points.
    pub destroyed: Vec<EntityId>,
    /// Units that ended the turn at their requested destination.
    pub moved: Vec<EntityId>,
    /// Units whose move was undone by a conflict.
    pub reverted: Vec<EntityId>,
    /// Piles removed after running dry.
    pub depleted_piles: Vec<EntityId>,
}

/// One validated part action.
#[derive(Debug, Clone)]
pub(crate) struct PartAction {
    pub player: PlayerNumber,
    pub unit: EntityId,
    pub part: PartId,
    pub action: Action,
}

/// Log and count an action that does nothing this turn.
pub(crate) fn drop_action(report: &mut TurnReport, player: PlayerNumber, unit: EntityId, part: PartId, reason: &str) {
    tracing::debug!(player, unit = %unit, part = %part, reason, "Dropped action");
    report.dropped += 1;
}

/// The actions selected by `wanted` whose unit is owned by the submitting
/// player and whose part exists, works and matches the action.
pub(crate) fn gated_actions(
    world: &WorldState,
    turn: &Turn,
    wanted: fn(&Action) -> bool,
    report: &mut TurnReport,
) -> Vec<PartAction> {
    let mut actions = Vec::new();
    for (player, unit_id, part_id, action) in turn.iter() {
        if !wanted(action) {
            continue;
        }
        let Some(unit) = world.board.unit(unit_id) else {
            drop_action(report, player, unit_id, part_id, "no such unit");
            continue;
        };
        if unit.owner != player {
            drop_action(report, player, unit_id, part_id, "unit owned by another player");
            continue;
        }
        let Some(part) = unit.part(part_id) else {
            drop_action(report, player, unit_id, part_id, "no such part");
            continue;
        };
        if !action.matches_part(&part.kind) {
            drop_action(report, player, unit_id, part_id, "action does not fit part");
            continue;
        }
        if !part.is_functional() {
            drop_action(report, player, unit_id, part_id, "part not functional");
            continue;
        }
        actions.push(PartAction {
            player,
            unit: unit_id,
            part: part_id,
            action: action.clone(),
        });
    }
    actions
}

/// Draw `cost` from a unit's cores; drops the action if it cannot.
pub(crate) fn pay(world: &mut WorldState, action: &PartAction, cost: Fixed, report: &mut TurnReport) -> bool {
    let paid = world
        .board
        .unit_mut(action.unit)
        .is_some_and(|unit| unit.pay_energy(cost));
    if !paid {
        drop_action(report, action.player, action.unit, action.part, "not enough energy");
    }
    paid
}

/// Resolve one merged turn against the world.
///
/// # Errors
///
/// Returns [`GameError::UnknownPlayer`](crate::error::GameError::UnknownPlayer)
/// without touching the world if the turn names a player the world does
/// not have.
///
/// # Panics
///
/// Panics if movement leaves two units or walls on one cell, which would
/// mean the conflict resolution itself is broken.
pub fn advance(world: &mut WorldState, mut turn: Turn) -> Result<TurnReport> {
    for player in turn.players() {
        world.player(player)?;
    }

    let mut report = TurnReport::default();

    let charged = economy::charge(world);
    economy::research(world, &turn, &mut report);
    economy::collect(world, &turn, &mut report);
    combat::fire(world, &turn, &mut report);
    production::produce(world, &turn, &mut report);
    remove_destroyed(world, &mut turn, &mut report);
    movement::resolve(world, &turn, &mut report);
    economy::leak(world, &charged);

    world.board.assert_exclusive();

    tracing::info!(
        actions = turn.action_count(),
        dropped = report.dropped,
        spawned = report.spawned.len(),
        destroyed = report.destroyed.len(),
        "Turn resolved"
    );
    tracing::debug!(state_hash = world.state_hash(), "World state hash");

    Ok(report)
}

fn remove_destroyed(world: &mut WorldState, turn: &mut Turn, report: &mut TurnReport) {
    let destroyed: BTreeSet<EntityId> = world
        .board
        .unit_ids()
        .into_iter()
        .filter(|&id| world.board.unit(id).is_some_and(|unit| unit.is_destroyed()))
        .collect();

    for id in destroyed {
        world.board.remove(id);
        turn.purge_unit(id);
        tracing::info!(unit = %id, "Unit destroyed");
        report.destroyed.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, Unit};
    use crate::error::GameError;
    use crate::grid::{Board, Coord};
    use crate::math::fixed;
    use crate::parts::{Part, PartKind};
    use crate::player::Player;

    fn researcher_unit(id: u64, owner: PlayerNumber, energy: i32) -> Entity {
        let unit = Unit {
            name: "lab".to_string(),
            owner,
            team: owner,
            parts: vec![
                Part::new(PartId(id * 10), 1, Fixed::ONE, PartKind::Researcher),
                Part::new(
                    PartId(id * 10 + 1),
                    1,
                    Fixed::ONE,
                    PartKind::EnergyCore {
                        current_energy: fixed(energy),
                    },
                ),
            ],
            production_cost: fixed(10),
            research_threshold: Fixed::ZERO,
        };
        Entity::unit(EntityId(id), Coord::new(id as i32, 0), 1, unit)
    }

    fn world() -> WorldState {
        let mut board = Board::new(10, 10);
        board.place(researcher_unit(1, 0, 0)).unwrap();
        board.place(researcher_unit(2, 1, 0)).unwrap();
        WorldState::new(
            board,
            [
                Player::new(0, 0, "a", Vec::new()),
                Player::new(1, 1, "b", Vec::new()),
            ],
        )
    }

    #[test]
    fn test_unknown_player_is_an_error() {
        let mut world = world();
        let before = world.state_hash();
        let result = advance(&mut world, Turn::for_players([7]));
        assert!(matches!(result, Err(GameError::UnknownPlayer(7))));
        assert_eq!(world.state_hash(), before);
    }

    #[test]
    fn test_research_uses_charged_energy() {
        let mut world = world();
        let mut turn = Turn::new();
        turn.add_action(0, EntityId(1), PartId(10), Action::Researcher);

        let report = advance(&mut world, turn).unwrap();
        assert_eq!(report.research_gained, 1);
        assert_eq!(world.player(0).unwrap().research, 1);
        // charged 10, capacity 10, spent 1
        let core = world.board.unit(EntityId(1)).unwrap().parts[1].current_energy();
        assert_eq!(core, Some(fixed(9)));
    }

    #[test]
    fn test_foreign_unit_action_is_dropped() {
        let mut world = world();
        let mut turn = Turn::new();
        turn.add_action(0, EntityId(2), PartId(20), Action::Researcher);

        let report = advance(&mut world, turn).unwrap();
        assert_eq!(report.dropped, 1);
        assert_eq!(world.player(0).unwrap().research, 0);
        assert_eq!(world.player(1).unwrap().research, 0);
    }

    #[test]
    fn test_mismatched_action_is_dropped() {
        let mut world = world();
        let mut turn = Turn::new();
        turn.add_action(0, EntityId(1), PartId(11), Action::Researcher);
        turn.add_action(0, EntityId(1), PartId(10), Action::Collector);

        let report = advance(&mut world, turn).unwrap();
        assert_eq!(report.dropped, 2);
    }

    #[test]
    fn test_empty_turn_only_charges() {
        let mut world = world();
        let report = advance(&mut world, Turn::for_players([0, 1])).unwrap();
        assert_eq!(report, TurnReport::default());
        let core = world.board.unit(EntityId(2)).unwrap().parts[1].current_energy();
        assert_eq!(core, Some(fixed(10)));
    }

    #[test]
    fn test_destroyed_unit_is_purged() {
        let mut world = world();
        for part in &mut world.board.unit_mut(EntityId(2)).unwrap().parts {
            part.damage = fixed(10);
        }
        let mut turn = Turn::new();
        turn.add_action(1, EntityId(2), PartId(20), Action::Researcher);

        let report = advance(&mut world, turn).unwrap();
        assert_eq!(report.destroyed, vec![EntityId(2)]);
        assert!(!world.board.contains(EntityId(2)));
        assert!(world.board.cells_of(EntityId(2)).is_empty());
    }
}
