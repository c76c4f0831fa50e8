//! Turns: every player's chosen part actions for one tick.
//!
//! A turn maps player → unit → part → action. Only parts with an entry
//! act; absence means the part idles this turn.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::grid::Coord;
use crate::ids::{EntityId, PartId, PlayerNumber};
use crate::parts::PartKind;
use crate::world::WorldState;

/// One part's chosen action. Variants mirror the acting part kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Move the unit by a relative offset along one of the move paths.
    Locomotor {
        /// Destination relative to the unit's origin.
        offset: Coord,
    },
    /// Fire along one blast path.
    Armament {
        /// Index into the part's blast paths.
        blast_index: usize,
    },
    /// Collect from piles under the unit.
    Collector,
    /// Generate research.
    Researcher,
    /// Build (or keep building) a blueprint.
    Producer {
        /// Blueprint name.
        blueprint: String,
        /// Where the finished unit should appear.
        out_coords: Option<Coord>,
    },
}

impl Action {
    /// Whether this action can be performed by a part of `kind`.
    #[must_use]
    pub const fn matches_part(&self, kind: &PartKind) -> bool {
        matches!(
            (self, kind),
            (Self::Locomotor { .. }, PartKind::Locomotor { .. })
                | (Self::Armament { .. }, PartKind::Armament { .. })
                | (Self::Collector, PartKind::Collector)
                | (Self::Researcher, PartKind::Researcher)
                | (Self::Producer { .. }, PartKind::Producer(_))
        )
    }
}

/// Actions of one unit, by part.
pub type UnitActions = BTreeMap<PartId, Action>;

/// Actions of one player, by unit.
pub type PlayerEntry = BTreeMap<EntityId, UnitActions>;

/// A (possibly partial) turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    entries: BTreeMap<PlayerNumber, PlayerEntry>,
}

impl Turn {
    /// Create a turn with no player entries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a turn with an empty entry for each player.
    #[must_use]
    pub fn for_players(players: impl IntoIterator<Item = PlayerNumber>) -> Self {
        Self {
            entries: players.into_iter().map(|p| (p, PlayerEntry::new())).collect(),
        }
    }

    /// Set the action of one part, replacing any previous one.
    pub fn add_action(&mut self, player: PlayerNumber, unit: EntityId, part: PartId, action: Action) {
        self.entries
            .entry(player)
            .or_default()
            .entry(unit)
            .or_default()
            .insert(part, action);
    }

    /// Clear the action of one part. Empty unit entries are dropped; the
    /// player entry stays.
    pub fn remove_action(
        &mut self,
        player: PlayerNumber,
        unit: EntityId,
        part: PartId,
    ) -> Option<Action> {
        let entry = self.entries.get_mut(&player)?;
        let actions = entry.get_mut(&unit)?;
        let removed = actions.remove(&part);
        if actions.is_empty() {
            entry.remove(&unit);
        }
        removed
    }

    /// The action of one part, if any.
    #[must_use]
    pub fn action(&self, player: PlayerNumber, unit: EntityId, part: PartId) -> Option<&Action> {
        self.entries.get(&player)?.get(&unit)?.get(&part)
    }

    /// Whether a part has an action this turn.
    #[must_use]
    pub fn part_active(&self, player: PlayerNumber, unit: EntityId, part: PartId) -> bool {
        self.action(player, unit, part).is_some()
    }

    /// Actions of one unit.
    #[must_use]
    pub fn actions_for(&self, player: PlayerNumber, unit: EntityId) -> Option<&UnitActions> {
        self.entries.get(&player)?.get(&unit)
    }

    /// Players with an entry, in order. An empty entry still counts.
    pub fn players(&self) -> impl Iterator<Item = PlayerNumber> + '_ {
        self.entries.keys().copied()
    }

    /// Whether the player has an entry.
    #[must_use]
    pub fn contains_player(&self, player: PlayerNumber) -> bool {
        self.entries.contains_key(&player)
    }

    /// One player's entry.
    #[must_use]
    pub fn player_entry(&self, player: PlayerNumber) -> Option<&PlayerEntry> {
        self.entries.get(&player)
    }

    /// Replace one player's entry entirely.
    pub fn set_player_entry(&mut self, player: PlayerNumber, entry: PlayerEntry) {
        self.entries.insert(player, entry);
    }

    /// Take every player entry of `other`, replacing ours for those players.
    ///
    /// Returns the players that were already present.
    pub fn absorb(&mut self, other: Self) -> Vec<PlayerNumber> {
        let mut replaced = Vec::new();
        for (player, entry) in other.entries {
            if self.entries.insert(player, entry).is_some() {
                replaced.push(player);
            }
        }
        replaced
    }

    /// Drop a unit from every player's entry.
    pub fn purge_unit(&mut self, unit: EntityId) {
        for entry in self.entries.values_mut() {
            entry.remove(&unit);
        }
    }

    /// Every `(player, unit, part, action)` in order.
    pub fn iter(&self) -> impl Iterator<Item = (PlayerNumber, EntityId, PartId, &Action)> {
        self.entries.iter().flat_map(|(&player, entry)| {
            entry.iter().flat_map(move |(&unit, actions)| {
                actions
                    .iter()
                    .map(move |(&part, action)| (player, unit, part, action))
            })
        })
    }

    /// Total number of part actions.
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.iter().count()
    }

    /// Check if the turn has no player entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Combine turns from several sources into one.
///
/// For each player, the last turn in the list that has an entry for it
/// supplies that entry whole. Inputs are expected to cover disjoint
/// players; overlaps are logged.
#[must_use]
pub fn merge_turns(turns: &[Turn]) -> Turn {
    let mut merged = Turn::new();
    for turn in turns {
        for player in merged.absorb(turn.clone()) {
            tracing::warn!(player, "Player submitted by more than one source; last one wins");
        }
    }
    merged
}

/// The turn a player starts composing after an advance.
///
/// Research and collection carry over, as does production whose job is
/// still the blueprint the action asked for. Everything else lapses.
/// Units or parts that no longer exist are dropped.
#[must_use]
pub fn default_next_turn(world: &WorldState, player: PlayerNumber, previous: &Turn) -> Turn {
    let mut next = Turn::for_players([player]);
    let Some(entry) = previous.player_entry(player) else {
        return next;
    };

    for (&unit_id, actions) in entry {
        let Some(unit) = world.board.unit(unit_id) else {
            continue;
        };
        if unit.owner != player {
            continue;
        }
        for (&part_id, action) in actions {
            let Some(part) = unit.part(part_id) else {
                continue;
            };
            let carry = match action {
                Action::Researcher | Action::Collector => true,
                Action::Producer { blueprint, .. } => part
                    .producer()
                    .and_then(|state| state.under_production.as_deref())
                    .is_some_and(|job| job == blueprint),
                Action::Locomotor { .. } | Action::Armament { .. } => false,
            };
            if carry {
                next.add_action(player, unit_id, part_id, action.clone());
            }
        }
    }
    next
}
