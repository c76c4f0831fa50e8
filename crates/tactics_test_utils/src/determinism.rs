//! Determinism testing utilities.
//!
//! Provides a harness for verifying that turn resolution produces
//! identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Every peer resolves every turn locally, so resolution must be 100%
//! deterministic. Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`tactics_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   We always iterate in sorted identity order.
//!
//! - **Identity allocation**: Spawned units derive their identities from
//!   the producing part, never from a process-wide counter.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual phase determinism (movement, combat, etc.)
//! 2. **Property tests**: Random orders must still resolve deterministically
//! 3. **Integration tests**: Scripted matches are reproducible
//! 4. **Parallel tests**: Running N matches in parallel all match

use std::thread;

use tactics_core::grid::Coord;
use tactics_core::ids::PlayerNumber;
use tactics_core::parts::{spawn_coords, PartKind};
use tactics_core::simulation::{advance, TurnReport};
use tactics_core::turn::{Action, Turn};
use tactics_core::world::WorldState;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of turns resolved.
    pub turns: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic resolution).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that resolution was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Turn resolution is non-deterministic!\n\
                 Runs: {}\n\
                 Turns: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.turns,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a step function multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `turns` - Number of steps per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance the state by one turn
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```ignore
/// use tactics_test_utils::determinism::{busy_turn, play_turn, verify_determinism};
/// use tactics_test_utils::fixtures::skirmish_world;
///
/// let result = verify_determinism(
///     3,
///     20,
///     || (skirmish_world(), 0),
///     |(world, n)| { play_turn(world, *n, busy_turn); *n += 1; },
///     |(world, _)| world.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    turns: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..turns {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        turns,
    }
}

/// Orders every part of every unit would plausibly be given on turn
/// `turn_number`.
///
/// Researchers research, collectors collect, armaments rotate through
/// their blast paths, locomotors step one cell along a rotating path and
/// producers keep building what they started or pick a new blueprint.
/// Orders are legal-looking but not guaranteed affordable.
#[must_use]
pub fn busy_turn(world: &WorldState, turn_number: u64) -> Turn {
    let mut turn = Turn::for_players(world.player_numbers());
    let bounds = world.board.bounds();
    let rotation = usize::try_from(turn_number).unwrap_or(0);

    for player in world.player_numbers() {
        for unit_id in world.units_of(player) {
            let Some(entity) = world.board.get(unit_id) else {
                continue;
            };
            let Some(unit) = entity.as_unit() else {
                continue;
            };
            for part in &unit.parts {
                let action = match &part.kind {
                    PartKind::Researcher => Some(Action::Researcher),
                    PartKind::Collector => Some(Action::Collector),
                    PartKind::Armament { shape } => Some(Action::Armament {
                        blast_index: rotation % shape.directions().len().max(1),
                    }),
                    PartKind::Locomotor { shape } => {
                        let paths = shape.move_paths(bounds, entity.origin, part.size, entity.size);
                        let pick = (rotation + usize::try_from(unit_id.0).unwrap_or(0)) % paths.len().max(1);
                        paths
                            .get(pick)
                            .and_then(|path| path.first())
                            .map(|&cell| Action::Locomotor {
                                offset: cell.minus(entity.origin),
                            })
                    }
                    PartKind::Producer(state) => {
                        producer_order(world, player, entity.origin, entity.size, state.under_production.as_deref(), rotation)
                    }
                    PartKind::EnergyCore { .. } | PartKind::Armor => None,
                };
                if let Some(action) = action {
                    turn.add_action(player, unit_id, part.id, action);
                }
            }
        }
    }
    turn
}

fn producer_order(
    world: &WorldState,
    player: PlayerNumber,
    origin: Coord,
    size: i32,
    in_progress: Option<&str>,
    rotation: usize,
) -> Option<Action> {
    let owner = world.player(player).ok()?;
    let name = match in_progress {
        Some(name) => name.to_string(),
        None => {
            let regular: Vec<_> = owner.blueprints.iter().filter(|bp| !bp.mothership).collect();
            regular.get(rotation % regular.len().max(1))?.name.clone()
        }
    };
    let blueprint = owner.blueprint(&name)?;
    let spots = spawn_coords(world.board.bounds(), origin, size, blueprint.size);
    let out_coords = spots.get(rotation % spots.len().max(1)).copied();
    Some(Action::Producer {
        blueprint: name,
        out_coords,
    })
}

/// Resolve one scripted turn.
///
/// # Panics
///
/// Panics if resolution fails, which a script built from the world's own
/// players never causes.
pub fn play_turn<F>(world: &mut WorldState, turn_number: u64, script: F) -> TurnReport
where
    F: Fn(&WorldState, u64) -> Turn,
{
    let turn = script(world, turn_number);
    advance(world, turn).expect("scripted turn names only known players")
}

/// Resolve `turns` scripted turns, returning every report.
pub fn play_turns<F>(world: &mut WorldState, turns: u64, script: F) -> Vec<TurnReport>
where
    F: Fn(&WorldState, u64) -> Turn,
{
    (0..turns).map(|n| play_turn(world, n, &script)).collect()
}

/// Result of parallel runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each run.
    pub hashes: Vec<u64>,
    /// Number of turns each run resolved.
    pub turns: u64,
    /// Number of runs.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all runs produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all runs matched.
    ///
    /// # Panics
    ///
    /// Panics if runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel matches diverged!\n\
                 Matches: {}\n\
                 Turns: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.turns,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run N scripted matches on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling or
/// memory layout differences.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_simulations<F>(setup_fn: F, num_sims: usize, turns: u64) -> ParallelSimResult
where
    F: Fn() -> WorldState + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut world = setup_fn();
                    play_turns(&mut world, turns, busy_turn);
                    world.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    ParallelSimResult {
        hashes,
        turns,
        num_sims,
    }
}

/// Compare two scripted matches turn by turn, finding the first divergence.
///
/// # Returns
///
/// `None` if the matches agree, `Some(turn)` if they first differ after
/// that many turns.
pub fn find_first_divergence<F>(setup_fn: F, turns: u64) -> Option<u64>
where
    F: Fn() -> WorldState,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for turn in 0..turns {
        play_turn(&mut a, turn, busy_turn);
        play_turn(&mut b, turn, busy_turn);

        if a.state_hash() != b.state_hash() {
            return Some(turn + 1);
        }
    }

    None
}

/// Verify that a serialization round trip preserves the state exactly,
/// and that resolution continues identically from the restored copy.
pub fn verify_serialization_determinism<F>(setup_fn: F, turns: u64) -> bool
where
    F: Fn() -> WorldState,
{
    let mut world = setup_fn();
    play_turns(&mut world, turns, busy_turn);

    let Ok(bytes) = world.serialize() else {
        return false;
    };
    let Ok(mut restored) = WorldState::deserialize(&bytes) else {
        return false;
    };
    if restored.state_hash() != world.state_hash() {
        return false;
    }

    play_turn(&mut world, turns, busy_turn);
    play_turn(&mut restored, turns, busy_turn);
    restored.state_hash() == world.state_hash()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{skirmish_world, starting_world};

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_non_determinism_is_reported() {
        use std::sync::atomic::{AtomicU64, Ordering};
        let runs = AtomicU64::new(0);
        let result = verify_determinism(
            2,
            1,
            || runs.fetch_add(1, Ordering::Relaxed),
            |_| {},
            |n| *n,
        );
        assert!(!result.is_deterministic);
        assert_eq!(result.unique_hashes().len(), 2);
    }

    #[test]
    fn test_skirmish_is_deterministic() {
        verify_determinism(
            3,
            25,
            || (skirmish_world(), 0),
            |(world, turn_number)| {
                play_turn(world, *turn_number, busy_turn);
                *turn_number += 1;
            },
            |(world, _)| world.state_hash(),
        )
        .assert_deterministic();
    }

    #[test]
    fn test_busy_turn_produces_activity() {
        let mut world = skirmish_world();
        let reports = play_turns(&mut world, 10, busy_turn);
        assert!(reports.iter().any(|r| !r.hits.is_empty()));
        assert!(reports.iter().any(|r| r.resources_gained > tactics_core::math::Fixed::ZERO));
        assert!(reports.iter().any(|r| !r.moved.is_empty()));
    }

    #[test]
    fn test_no_divergence_from_start() {
        assert_eq!(find_first_divergence(|| starting_world(4), 30), None);
    }

    #[test]
    fn test_parallel_matches_agree() {
        run_parallel_simulations(skirmish_world, 4, 20).assert_deterministic();
    }

    #[test]
    fn test_serialization_preserves_resolution() {
        assert!(verify_serialization_determinism(skirmish_world, 5));
    }
}
