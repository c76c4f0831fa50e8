//! Energy, research and resource collection phases.
//!
//! All amounts are fixed-point, so every peer computes identical totals.

use std::collections::BTreeSet;

use crate::grid::footprint;
use crate::ids::{EntityId, PartId};
use crate::math::Fixed;
use crate::parts::PartKind;
use crate::simulation::{drop_action, gated_actions, pay, TurnReport};
use crate::turn::{Action, Turn};
use crate::world::WorldState;

/// Cores that received their recharge this turn.
pub type ChargedCores = BTreeSet<(EntityId, PartId)>;

/// Recharge every functional energy core on the board exactly once.
///
/// Cores may exceed their capacity until [`leak`] runs at the end of the
/// turn, so energy charged now can still be spent this turn.
pub fn charge(world: &mut WorldState) -> ChargedCores {
    let mut charged = ChargedCores::new();
    for unit_id in world.board.unit_ids() {
        let Some(unit) = world.board.unit_mut(unit_id) else {
            continue;
        };
        for part in &mut unit.parts {
            if !part.is_functional() {
                continue;
            }
            let recharge = part.energy_recharge_per_turn();
            if let PartKind::EnergyCore { current_energy } = &mut part.kind {
                if charged.insert((unit_id, part.id)) {
                    *current_energy = current_energy.saturating_add(recharge);
                }
            }
        }
    }
    charged
}

/// Clamp every core charged this turn back to its capacity.
pub fn leak(world: &mut WorldState, charged: &ChargedCores) {
    for &(unit_id, part_id) in charged {
        let Some(part) = world
            .board
            .unit_mut(unit_id)
            .and_then(|unit| unit.part_mut(part_id))
        else {
            continue;
        };
        let maximum = part.maximum_energy();
        if let PartKind::EnergyCore { current_energy } = &mut part.kind {
            *current_energy = (*current_energy).min(maximum);
        }
    }
}

/// Apply researcher actions.
pub fn research(world: &mut WorldState, turn: &Turn, report: &mut TurnReport) {
    for action in gated_actions(world, turn, |a| matches!(a, Action::Researcher), report) {
        let Some((cost, amount)) = world
            .board
            .unit(action.unit)
            .and_then(|unit| unit.part(action.part))
            .map(|part| (part.activation_cost(), part.research_amount()))
        else {
            continue;
        };
        if !pay(world, &action, cost, report) {
            continue;
        }
        if let Ok(player) = world.player_mut(action.player) {
            player.add_research(amount);
            report.research_gained += amount;
        }
    }
}

/// Apply collector actions.
///
/// The amount to remove is worked out before paying: the part's cap or
/// whatever the piles under the unit hold, whichever is smaller. Nothing
/// to collect means nothing is paid. Piles are drained in footprint order
/// and removed once empty.
pub fn collect(world: &mut WorldState, turn: &Turn, report: &mut TurnReport) {
    for action in gated_actions(world, turn, |a| matches!(a, Action::Collector), report) {
        let Some((piles, cap, energy_per_unit, ratio)) = collector_view(world, action.unit, action.part) else {
            continue;
        };
        let available: Fixed = piles
            .iter()
            .filter_map(|&id| pile_amount(world, id))
            .sum();
        let amount = cap.min(available);
        if amount <= Fixed::ZERO {
            drop_action(report, action.player, action.unit, action.part, "nothing to collect");
            continue;
        }
        if !pay(world, &action, amount.saturating_mul(energy_per_unit), report) {
            continue;
        }

        let mut remaining = amount;
        for pile_id in piles {
            if remaining <= Fixed::ZERO {
                break;
            }
            let Some(pile) = world
                .board
                .get_mut(pile_id)
                .and_then(|entity| entity.as_resource_pile_mut())
            else {
                continue;
            };
            remaining -= pile.yield_up_to(remaining);
            if pile.is_depleted() {
                world.board.remove(pile_id);
                tracing::debug!(pile = %pile_id, "Resource pile depleted");
                report.depleted_piles.push(pile_id);
            }
        }

        let gained = amount * ratio;
        if let Ok(player) = world.player_mut(action.player) {
            player.resources += gained;
            report.resources_gained += gained;
        }
    }
}

/// Distinct piles under a unit plus the collector's cap, energy per unit
/// and conversion ratio.
fn collector_view(
    world: &WorldState,
    unit_id: EntityId,
    part_id: PartId,
) -> Option<(Vec<EntityId>, Fixed, Fixed, Fixed)> {
    let entity = world.board.get(unit_id)?;
    let part = entity.as_unit()?.part(part_id)?;

    let mut seen = BTreeSet::new();
    let piles = footprint(entity.origin, entity.size)
        .flat_map(|cell| world.board.occupants(cell).iter().copied())
        .filter(|&id| world.board.get(id).is_some_and(|e| e.is_resource_pile()))
        .filter(|&id| seen.insert(id))
        .collect();

    Some((
        piles,
        part.max_resources_removed_per_turn(),
        part.energy_per_unit(),
        part.resources_gained_per_resources_removed(),
    ))
}

fn pile_amount(world: &WorldState, id: EntityId) -> Option<Fixed> {
    match &world.board.get(id)?.kind {
        crate::entity::EntityKind::ResourcePile(pile) => Some(pile.amount),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, ResourcePile, Unit};
    use crate::grid::{Board, Coord};
    use crate::math::fixed;
    use crate::parts::Part;
    use crate::player::Player;

    fn harvester(energy: i32, quality: f64) -> Entity {
        let unit = Unit {
            name: "harvester".to_string(),
            owner: 0,
            team: 0,
            parts: vec![
                Part::new(PartId(1), 3, Fixed::from_num(quality), PartKind::Collector),
                Part::new(
                    PartId(2),
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
        Entity::unit(EntityId(1), Coord::new(2, 2), 2, unit)
    }

    fn world_with_piles(amounts: &[(i32, i32, i32)]) -> WorldState {
        let mut board = Board::new(10, 10);
        board.place(harvester(0, 1.5)).unwrap();
        for (index, &(x, y, amount)) in amounts.iter().enumerate() {
            let pile = Entity::resource_pile(
                EntityId(100 + index as u64),
                Coord::new(x, y),
                ResourcePile::new(fixed(amount)),
            );
            board.place(pile).unwrap();
        }
        WorldState::new(board, [Player::new(0, 0, "a", Vec::new())])
    }

    fn collect_turn() -> Turn {
        let mut turn = Turn::new();
        turn.add_action(0, EntityId(1), PartId(1), Action::Collector);
        turn
    }

    #[test]
    fn test_charge_then_leak() {
        let mut world = world_with_piles(&[]);
        let core = world
            .board
            .unit_mut(EntityId(1))
            .unwrap()
            .part_mut(PartId(2))
            .unwrap();
        core.kind = PartKind::EnergyCore {
            current_energy: fixed(8),
        };

        let charged = charge(&mut world);
        assert_eq!(charged.len(), 1);
        let energy = world.board.unit(EntityId(1)).unwrap().energy_available();
        assert_eq!(energy, fixed(18));

        leak(&mut world, &charged);
        let energy = world.board.unit(EntityId(1)).unwrap().energy_available();
        assert_eq!(energy, fixed(10));
    }

    #[test]
    fn test_collect_caps_at_part_size_and_converts_by_quality() {
        let mut world = world_with_piles(&[(2, 2, 2), (3, 3, 5)]);
        charge(&mut world);
        let mut report = TurnReport::default();
        collect(&mut world, &collect_turn(), &mut report);

        // cap 3: 2 from the first pile (now gone), 1 from the second
        assert_eq!(report.depleted_piles, vec![EntityId(100)]);
        assert_eq!(pile_amount(&world, EntityId(101)), Some(fixed(4)));
        assert_eq!(world.player(0).unwrap().resources, Fixed::from_num(4.5));
        // 3 units at 1/1.5 energy each
        let energy = world.board.unit(EntityId(1)).unwrap().energy_available();
        let per_unit = Fixed::ONE / Fixed::from_num(1.5);
        assert_eq!(energy, fixed(10) - fixed(3) * per_unit);
    }

    #[test]
    fn test_collect_ignores_piles_outside_footprint() {
        let mut world = world_with_piles(&[(5, 5, 50)]);
        charge(&mut world);
        let mut report = TurnReport::default();
        collect(&mut world, &collect_turn(), &mut report);

        assert_eq!(report.dropped, 1);
        assert_eq!(world.player(0).unwrap().resources, Fixed::ZERO);
        // nothing paid
        let energy = world.board.unit(EntityId(1)).unwrap().energy_available();
        assert_eq!(energy, fixed(10));
    }

    #[test]
    fn test_collect_without_energy_takes_nothing() {
        let mut world = world_with_piles(&[(2, 2, 5)]);
        let mut report = TurnReport::default();
        collect(&mut world, &collect_turn(), &mut report);

        assert_eq!(report.dropped, 1);
        assert_eq!(pile_amount(&world, EntityId(100)), Some(fixed(5)));
    }
}
