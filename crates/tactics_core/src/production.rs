//! Producer actions: starting, continuing and finishing builds.
//!
//! A producer works on one blueprint at a time. Asking for a different
//! blueprint than the one in progress starts a new build, which must be
//! legal: unlocked by research, small enough for the builder and
//! affordable. Starting charges the blueprint's cost in resources.
//! Each activation then adds the part's points; once the points reach
//! the cost the unit spawns next to the builder and the job clears.

use crate::grid::Coord;
use crate::ids::DerivedIds;
use crate::math::Fixed;
use crate::parts::{spawn_coords, ProducerState};
use crate::simulation::{drop_action, gated_actions, pay, PartAction, TurnReport};
use crate::turn::{Action, Turn};
use crate::world::WorldState;

/// Apply producer actions.
pub fn produce(world: &mut WorldState, turn: &Turn, report: &mut TurnReport) {
    for action in gated_actions(world, turn, |a| matches!(a, Action::Producer { .. }), report) {
        let Action::Producer {
            blueprint,
            out_coords,
        } = &action.action
        else {
            continue;
        };
        let Some(cost) = world
            .board
            .unit(action.unit)
            .and_then(|unit| unit.part(action.part))
            .map(|part| part.activation_cost())
        else {
            continue;
        };
        if !pay(world, &action, cost, report) {
            continue;
        }
        activate(world, &action, blueprint, *out_coords, report);
    }
}

/// One paid activation of a producer.
fn activate(
    world: &mut WorldState,
    action: &PartAction,
    blueprint_name: &str,
    out_coords: Option<Coord>,
    report: &mut TurnReport,
) {
    let Ok(player) = world.player(action.player) else {
        return;
    };
    let Some(blueprint) = player.blueprint(blueprint_name).cloned() else {
        drop_action(report, action.player, action.unit, action.part, "unknown blueprint");
        return;
    };
    let unlocked = player.is_unlocked(&blueprint);
    let affordable = player.can_afford(blueprint.cost());

    let Some(builder) = world.board.get(action.unit) else {
        return;
    };
    let (builder_origin, builder_size) = (builder.origin, builder.size);
    let Some(part) = builder.as_unit().and_then(|unit| unit.part(action.part)) else {
        return;
    };
    let Some(state) = part.producer() else {
        return;
    };
    let points = part.points_per_activation();

    if state.under_production.as_deref() != Some(blueprint_name) {
        let reason = if !unlocked {
            Some("blueprint locked by research")
        } else if !blueprint.buildable_by(builder_size) {
            Some("blueprint too large for builder")
        } else if !affordable {
            Some("not enough resources")
        } else {
            None
        };
        if let Some(reason) = reason {
            drop_action(report, action.player, action.unit, action.part, reason);
            return;
        }

        if let Ok(player) = world.player_mut(action.player) {
            player.spend(blueprint.cost());
        }
        if let Some(state) = producer_state(world, action) {
            state.under_production = Some(blueprint_name.to_string());
            state.points_to_produce = blueprint.cost();
            state.current_production_points = Fixed::ZERO;
        }
        tracing::debug!(
            player = action.player,
            unit = %action.unit,
            blueprint = blueprint_name,
            "Build started"
        );
    }

    let Some(state) = producer_state(world, action) else {
        return;
    };
    state.current_production_points += points;
    if state.current_production_points < state.points_to_produce {
        return;
    }
    let counter = state.spawn_counter;

    let Some(origin) = out_coords else {
        tracing::debug!(unit = %action.unit, "Build complete but no spawn point chosen");
        return;
    };
    let bounds = world.board.bounds();
    if !spawn_coords(bounds, builder_origin, builder_size, blueprint.size).contains(&origin) {
        tracing::debug!(unit = %action.unit, %origin, "Spawn point not adjacent to builder");
        return;
    }
    if let Some(blocker) = world.board.blocker_in(origin, blueprint.size, None) {
        tracing::debug!(unit = %action.unit, %origin, blocker = %blocker, "Spawn point occupied");
        return;
    }

    let Some(builder) = world.board.unit(action.unit) else {
        return;
    };
    let (owner, team) = (builder.owner, builder.team);
    let mut ids = DerivedIds::for_spawn(action.part, counter);
    let spawned = blueprint.instantiate(owner, team, origin, &mut ids);
    match world.board.place(spawned) {
        Ok(id) => {
            if let Some(state) = producer_state(world, action) {
                state.spawn_counter += 1;
                state.current_production_points = Fixed::ZERO;
                state.under_production = None;
            }
            tracing::info!(player = owner, unit = %id, blueprint = blueprint_name, %origin, "Unit produced");
            report.spawned.push(id);
        }
        Err(error) => {
            tracing::warn!(unit = %action.unit, %error, "Spawn placement failed");
        }
    }
}

fn producer_state<'w>(
    world: &'w mut WorldState,
    action: &PartAction,
) -> Option<&'w mut ProducerState> {
    world
        .board
        .unit_mut(action.unit)?
        .part_mut(action.part)?
        .producer_mut()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{PartSpec, PartSpecKind, UnitBlueprint};
    use crate::entity::{Entity, Unit};
    use crate::grid::Board;
    use crate::ids::{EntityId, PartId};
    use crate::math::fixed;
    use crate::parts::{Part, PartKind};
    use crate::player::Player;

    fn drone(threshold_percent: u32) -> UnitBlueprint {
        UnitBlueprint {
            name: "drone".to_string(),
            size: 1,
            parts: vec![PartSpec {
                kind: PartSpecKind::Collector,
                size: 1,
                quality_percent: 100,
            }],
            production_cost: 10,
            research_threshold_percent: threshold_percent,
            mothership: false,
        }
    }

    fn factory() -> Entity {
        let unit = Unit {
            name: "factory".to_string(),
            owner: 0,
            team: 0,
            parts: vec![
                Part::new(PartId(1), 3, Fixed::ONE, PartKind::Producer(ProducerState::default())),
                Part::new(
                    PartId(2),
                    3,
                    Fixed::ONE,
                    PartKind::EnergyCore {
                        current_energy: fixed(30),
                    },
                ),
            ],
            production_cost: fixed(50),
            research_threshold: Fixed::ZERO,
        };
        Entity::unit(EntityId(1), Coord::new(4, 4), 2, unit)
    }

    fn world(resources: i32, threshold_percent: u32) -> WorldState {
        let mut board = Board::new(12, 12);
        board.place(factory()).unwrap();
        let mut player = Player::new(0, 0, "a", vec![drone(threshold_percent)]);
        player.resources = fixed(resources);
        WorldState::new(board, [player])
    }

    fn build_turn(out: Option<Coord>) -> Turn {
        let mut turn = Turn::new();
        turn.add_action(
            0,
            EntityId(1),
            PartId(1),
            Action::Producer {
                blueprint: "drone".to_string(),
                out_coords: out,
            },
        );
        turn
    }

    fn state(world: &WorldState) -> ProducerState {
        world.board.unit(EntityId(1)).unwrap().parts[0]
            .producer()
            .unwrap()
            .clone()
    }

    #[test]
    fn test_points_accumulate_then_spawn() {
        let mut world = world(25, 0);
        let turn = build_turn(Some(Coord::new(6, 4)));

        for expected in [3, 6, 9] {
            let mut report = TurnReport::default();
            produce(&mut world, &turn, &mut report);
            assert!(report.spawned.is_empty());
            assert_eq!(state(&world).current_production_points, fixed(expected));
        }
        assert_eq!(world.player(0).unwrap().resources, fixed(15));

        let mut report = TurnReport::default();
        produce(&mut world, &turn, &mut report);
        assert_eq!(report.spawned.len(), 1);
        let state = state(&world);
        assert_eq!(state.current_production_points, Fixed::ZERO);
        assert_eq!(state.under_production, None);
        assert_eq!(state.spawn_counter, 1);

        let spawned = world.board.get(report.spawned[0]).unwrap();
        assert_eq!(spawned.origin, Coord::new(6, 4));
        assert_eq!(spawned.as_unit().unwrap().owner, 0);
    }

    #[test]
    fn test_locked_blueprint_charges_nothing() {
        let mut world = world(25, 50);
        let mut report = TurnReport::default();
        produce(&mut world, &build_turn(None), &mut report);

        assert_eq!(report.dropped, 1);
        assert_eq!(world.player(0).unwrap().resources, fixed(25));
        assert_eq!(state(&world).under_production, None);
    }

    #[test]
    fn test_unaffordable_blueprint_charges_nothing() {
        let mut world = world(9, 0);
        let mut report = TurnReport::default();
        produce(&mut world, &build_turn(None), &mut report);

        assert_eq!(report.dropped, 1);
        assert_eq!(world.player(0).unwrap().resources, fixed(9));
        assert_eq!(state(&world).under_production, None);
    }

    #[test]
    fn test_blocked_spawn_keeps_points() {
        let mut world = world(25, 0);
        world
            .board
            .place(Entity::wall(EntityId(9), Coord::new(6, 4), 1))
            .unwrap();
        let turn = build_turn(Some(Coord::new(6, 4)));
        for _ in 0..4 {
            produce(&mut world, &turn, &mut TurnReport::default());
        }
        let state = state(&world);
        assert_eq!(state.current_production_points, fixed(12));
        assert_eq!(state.under_production.as_deref(), Some("drone"));
        assert_eq!(state.spawn_counter, 0);
    }

    #[test]
    fn test_spawn_must_touch_builder() {
        let mut world = world(25, 0);
        let turn = build_turn(Some(Coord::new(9, 9)));
        let mut report = TurnReport::default();
        for _ in 0..4 {
            produce(&mut world, &turn, &mut report);
        }
        assert!(report.spawned.is_empty());
        assert_eq!(world.board.unit_ids(), vec![EntityId(1)]);
    }

    #[test]
    fn test_spawn_ids_follow_producer_counter() {
        let mut a = world(25, 0);
        let mut b = world(25, 0);
        let turn = build_turn(Some(Coord::new(3, 3)));
        let mut report_a = TurnReport::default();
        let mut report_b = TurnReport::default();
        for _ in 0..4 {
            produce(&mut a, &turn, &mut report_a);
            produce(&mut b, &turn, &mut report_b);
        }
        assert_eq!(report_a.spawned, report_b.spawned);
        assert_eq!(a.state_hash(), b.state_hash());
    }
}
