//! Armament fire.
//!
//! Combat is simultaneous: every shot is gated and paid against the
//! positions at the start of the phase, and only then do the hits land.
//! A unit destroyed this phase still fires.

use std::collections::BTreeSet;

use crate::grid::{footprint, Coord};
use crate::ids::EntityId;
use crate::math::Fixed;
use crate::simulation::{drop_action, gated_actions, pay, TurnReport};
use crate::turn::{Action, Turn};
use crate::world::WorldState;

/// One hit waiting to land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    /// Unit that fired.
    pub attacker: EntityId,
    /// Unit struck.
    pub target: EntityId,
    /// Damage dealt.
    pub damage: Fixed,
}

/// Target along one directional blast path.
///
/// Each step of the path is the origin of the attacker's footprint
/// displaced that far, so the blast sweeps a `unit_size` wide block. Cells
/// covered by the attacker are skipped and resource piles are transparent.
/// The first block holding a unit decides the hit (lowest id on a tie); a
/// block holding only a wall stops the path.
#[must_use]
pub fn path_target(world: &WorldState, attacker: EntityId, path: &[Coord], unit_size: i32) -> Option<EntityId> {
    for &step in path {
        let solid: BTreeSet<EntityId> = footprint(step, unit_size)
            .flat_map(|cell| world.board.solid_occupants(cell).collect::<Vec<_>>())
            .filter(|&id| id != attacker)
            .collect();
        if let Some(&unit) = solid.iter().find(|&&id| world.board.unit(id).is_some()) {
            return Some(unit);
        }
        if !solid.is_empty() {
            return None;
        }
    }
    None
}

/// Every distinct unit inside a flood blast, in identity order.
#[must_use]
pub fn flood_targets(world: &WorldState, attacker: EntityId, cells: &[Coord]) -> Vec<EntityId> {
    cells
        .iter()
        .flat_map(|&cell| world.board.solid_occupants(cell).collect::<Vec<_>>())
        .filter(|&id| id != attacker && world.board.unit(id).is_some())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Apply armament actions.
pub fn fire(world: &mut WorldState, turn: &Turn, report: &mut TurnReport) {
    let mut hits = Vec::new();

    for action in gated_actions(world, turn, |a| matches!(a, Action::Armament { .. }), report) {
        let Action::Armament { blast_index } = action.action else {
            continue;
        };
        let Some(entity) = world.board.get(action.unit) else {
            continue;
        };
        let Some(part) = entity.as_unit().and_then(|unit| unit.part(action.part)) else {
            continue;
        };
        let Some(shape) = part.shape() else {
            continue;
        };

        let paths = shape.blast_paths(world.board.bounds(), entity.origin, part.size, entity.size);
        let Some(path) = paths.get(blast_index) else {
            drop_action(report, action.player, action.unit, action.part, "no such blast path");
            continue;
        };
        let targets = if shape.has_flood_blast() {
            flood_targets(world, action.unit, path)
        } else {
            path_target(world, action.unit, path, entity.size).into_iter().collect()
        };
        let damage = part.damage_per_hit();
        let cost = part.activation_cost();

        if !pay(world, &action, cost, report) {
            continue;
        }
        hits.extend(targets.into_iter().map(|target| Hit {
            attacker: action.unit,
            target,
            damage,
        }));
    }

    for hit in hits {
        if let Some(unit) = world.board.unit_mut(hit.target) {
            unit.take_hit(hit.damage);
            tracing::debug!(attacker = %hit.attacker, target = %hit.target, "Hit");
            report.hits.push((hit.attacker, hit.target));
        }
    }
}
