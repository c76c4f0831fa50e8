//! Client-side game loop state.
//!
//! A [`Gameflow`] owns the history of world states and one [`TurnSource`]
//! per contributor. The outer loop calls [`Gameflow::try_advance`] on every
//! tick; it only resolves a turn once every source has its piece.

use std::time::Instant;

use tactics_core::ids::PlayerNumber;
use tactics_core::player::Player;
use tactics_core::simulation::{advance, TurnReport};
use tactics_core::turn::{default_next_turn, merge_turns, Turn};
use tactics_core::world::WorldState;

use crate::error::{Result, ServerError};
use crate::network::{Channel, Request, Response};
use crate::sync::TurnSource;

/// History, turn sources and the turn being edited locally.
pub struct Gameflow {
    history: Vec<WorldState>,
    sources: Vec<TurnSource>,
    local_player: Option<PlayerNumber>,
    reporter: Option<Box<dyn Channel>>,
    local_turn: Turn,
    last_report: Option<TurnReport>,
}

impl std::fmt::Debug for Gameflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gameflow")
            .field("turn_index", &self.turn_index())
            .field("sources", &self.sources)
            .field("local_player", &self.local_player)
            .field("reporting", &self.reporter.is_some())
            .finish_non_exhaustive()
    }
}

impl Gameflow {
    /// Start from `starting` with the given sources.
    ///
    /// `local_player` is the player whose orders this process enters, if any.
    /// Submitted local turns are also sent to `reporter` when present.
    #[must_use]
    pub fn new(
        starting: WorldState,
        sources: Vec<TurnSource>,
        local_player: Option<PlayerNumber>,
        reporter: Option<Box<dyn Channel>>,
    ) -> Self {
        let local_turn = Turn::for_players(local_player);
        Self {
            history: vec![starting],
            sources,
            local_player,
            reporter,
            local_turn,
            last_report: None,
        }
    }

    /// Index of the next turn to resolve.
    #[must_use]
    pub fn turn_index(&self) -> u64 {
        (self.history.len() - 1) as u64
    }

    /// The latest world state.
    #[must_use]
    pub fn most_recent(&self) -> &WorldState {
        // history starts with the starting state and only grows
        &self.history[self.history.len() - 1]
    }

    /// Every state so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[WorldState] {
        &self.history
    }

    /// The local player as of the latest state.
    ///
    /// # Errors
    ///
    /// Fails if there is no local player or it is missing from the state.
    pub fn local_player(&self) -> Result<&Player> {
        let number = self
            .local_player
            .ok_or_else(|| ServerError::Rejected("no local player".to_string()))?;
        Ok(self.most_recent().player(number)?)
    }

    /// The turn being edited for the local player.
    #[must_use]
    pub fn local_turn(&self) -> &Turn {
        &self.local_turn
    }

    /// Mutable access to the local turn.
    pub fn local_turn_mut(&mut self) -> &mut Turn {
        &mut self.local_turn
    }

    /// Report from the most recent resolution.
    #[must_use]
    pub fn last_report(&self) -> Option<&TurnReport> {
        self.last_report.as_ref()
    }

    /// Hand the local turn to every local source and report it outward.
    ///
    /// # Errors
    ///
    /// Fails if the report cannot be sent.
    pub fn submit_local_turn(&mut self) -> Result<()> {
        let turn_index = self.turn_index();
        for source in &mut self.sources {
            source.submit_local(turn_index, &self.local_turn);
        }
        if let Some(reporter) = self.reporter.as_mut() {
            reporter.send(Request::ReportTurn {
                turn: self.local_turn.clone(),
                turn_index,
            })?;
        }
        tracing::debug!(
            turn = turn_index,
            actions = self.local_turn.action_count(),
            "Local turn submitted"
        );
        Ok(())
    }

    /// Read the server's answers to submitted reports.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Rejected`] for the first rejected report.
    fn drain_reports(&mut self) -> Result<()> {
        let Some(reporter) = self.reporter.as_mut() else {
            return Ok(());
        };
        while let Some(response) = reporter.try_recv() {
            match response {
                Response::ReportTurn => tracing::trace!("Turn report acknowledged"),
                Response::Error { message } => {
                    tracing::warn!(%message, "Turn report rejected");
                    return Err(ServerError::Rejected(message));
                }
                other => tracing::debug!(?other, "Ignoring unexpected response"),
            }
        }
        Ok(())
    }

    /// Resolve the next turn if every source is ready.
    ///
    /// Answers to earlier reports are read first. Every source is polled on
    /// each call, even once one reports not ready, so remote polls keep
    /// flowing. Returns whether a turn was resolved.
    ///
    /// # Errors
    ///
    /// Fails if the server rejected a report, a poll cannot be sent or
    /// resolution hits a broken invariant.
    pub fn try_advance(&mut self, now: Instant) -> Result<bool> {
        self.drain_reports()?;
        let turn_index = self.turn_index();
        let mut ready = true;
        for source in &mut self.sources {
            ready &= source.is_ready(turn_index, now)?;
        }
        if !ready {
            return Ok(false);
        }

        let pieces: Vec<Turn> = self
            .sources
            .iter_mut()
            .filter_map(|source| source.take_turn(turn_index))
            .collect();
        let merged = merge_turns(&pieces);

        let mut next = self.most_recent().clone();
        let report = advance(&mut next, merged.clone())?;
        tracing::info!(
            turn = turn_index,
            state_hash = next.state_hash(),
            "Turn applied to history"
        );

        if let Some(player) = self.local_player {
            self.local_turn = default_next_turn(&next, player, &merged);
        }
        self.history.push(next);
        self.last_report = Some(report);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tactics_core::ids::{EntityId, PartId};
    use tactics_core::turn::Action;
    use tactics_test_utils::fixtures::starting_world;

    use crate::sync::tests::ScriptedChannel;
    use crate::sync::{LocalSource, RemoteSource};

    fn mothership_of(world: &WorldState, player: PlayerNumber) -> EntityId {
        world.units_of(player)[0]
    }

    fn research_order(world: &WorldState, player: PlayerNumber) -> (EntityId, PartId) {
        let unit_id = mothership_of(world, player);
        let unit = world.board.unit(unit_id).unwrap();
        let part = unit
            .parts
            .iter()
            .find(|p| matches!(p.kind, tactics_core::parts::PartKind::Researcher))
            .unwrap();
        (unit_id, part.id)
    }

    #[test]
    fn test_single_local_source_advances_after_submit() {
        let world = starting_world(1);
        let mut flow = Gameflow::new(world, vec![TurnSource::Local(LocalSource::new())], Some(0), None);
        let now = Instant::now();

        assert!(!flow.try_advance(now).unwrap());
        assert_eq!(flow.turn_index(), 0);

        let (unit, part) = research_order(flow.most_recent(), 0);
        flow.local_turn_mut().add_action(0, unit, part, Action::Researcher);
        flow.submit_local_turn().unwrap();

        assert!(flow.try_advance(now).unwrap());
        assert_eq!(flow.turn_index(), 1);
        assert_eq!(flow.history().len(), 2);
        assert!(flow.local_player().unwrap().research > 0);
        // the starting state is untouched
        assert_eq!(flow.history()[0].player(0).unwrap().research, 0);
        // research carries into the next turn
        assert!(flow.local_turn().part_active(0, unit, part));
    }

    #[test]
    fn test_waits_for_every_source() {
        let world = starting_world(2);
        let channel = ScriptedChannel::default();
        let sources = vec![
            TurnSource::Local(LocalSource::new()),
            TurnSource::Remote(RemoteSource::new(Box::new(channel.clone()), Duration::from_secs(5))),
        ];
        let mut flow = Gameflow::new(world, sources, Some(0), None);
        let now = Instant::now();

        // the remote source is polled even though the local one is not ready
        assert!(!flow.try_advance(now).unwrap());
        assert_eq!(channel.sent_count(), 1);

        flow.submit_local_turn().unwrap();
        assert!(!flow.try_advance(now).unwrap());

        channel.push(Response::TurnPoll {
            turn: Some(Turn::for_players([1])),
            turn_index: 0,
        });
        assert!(flow.try_advance(now).unwrap());
        assert_eq!(flow.turn_index(), 1);
        assert!(flow.last_report().is_some());
    }

    #[test]
    fn test_submission_is_reported_outward() {
        let world = starting_world(1);
        let reporter = ScriptedChannel::default();
        let mut flow = Gameflow::new(
            world,
            vec![TurnSource::Local(LocalSource::new())],
            Some(0),
            Some(Box::new(reporter.clone())),
        );
        flow.submit_local_turn().unwrap();

        let sent = reporter.sent.lock().unwrap();
        assert!(matches!(
            sent.as_slice(),
            [Request::ReportTurn { turn_index: 0, .. }]
        ));
    }

    #[test]
    fn test_rejected_report_surfaces() {
        let reporter = ScriptedChannel::default();
        let mut flow = Gameflow::new(
            starting_world(1),
            vec![TurnSource::Local(LocalSource::new())],
            Some(0),
            Some(Box::new(reporter.clone())),
        );
        flow.submit_local_turn().unwrap();
        reporter.push(Response::Error {
            message: "Player 0 is not registered".to_string(),
        });

        let result = flow.try_advance(Instant::now());
        assert!(matches!(result, Err(ServerError::Rejected(ref m)) if m.contains("not registered")));
        assert_eq!(flow.turn_index(), 0);
    }

    #[test]
    fn test_report_acknowledgements_are_drained() {
        let reporter = ScriptedChannel::default();
        let mut flow = Gameflow::new(
            starting_world(1),
            vec![TurnSource::Local(LocalSource::new())],
            Some(0),
            Some(Box::new(reporter.clone())),
        );
        for _ in 0..3 {
            flow.submit_local_turn().unwrap();
            reporter.push(Response::ReportTurn);
            assert!(flow.try_advance(Instant::now()).unwrap());
        }
        assert!(reporter.inbox.lock().unwrap().is_empty());
        assert_eq!(flow.turn_index(), 3);
    }

    #[test]
    fn test_spectator_has_no_local_player() {
        let flow = Gameflow::new(starting_world(1), Vec::new(), None, None);
        assert!(flow.local_player().is_err());
        assert!(flow.local_turn().is_empty());
    }
}
