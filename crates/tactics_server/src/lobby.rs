//! Server-side match state and request handling.
//!
//! [`ServerContext`] is the single writer of everything the server knows:
//! who registered, the starting state and the turn record. Handlers take
//! `&mut self`; sharing across tasks goes through the mutex in
//! [`network::serve`](crate::network::serve).

use std::collections::BTreeMap;

use tactics_core::ids::{PlayerNumber, ProcessIds};
use tactics_core::player::Player;
use tactics_core::turn::Turn;
use tactics_core::world::WorldState;

use crate::error::{Result, ServerError};
use crate::network::{PlayerInfo, Request, Response};
use crate::ServerConfig;

/// Everything the server tracks for one match.
#[derive(Debug)]
pub struct ServerContext {
    config: ServerConfig,
    players: BTreeMap<PlayerNumber, Player>,
    starting_state: Option<WorldState>,
    turns: BTreeMap<u64, Turn>,
}

impl ServerContext {
    /// Create an empty lobby.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            players: BTreeMap::new(),
            starting_state: None,
            turns: BTreeMap::new(),
        }
    }

    /// Answer one request.
    ///
    /// Rejected requests are logged at `warn` and answered with
    /// [`Response::Error`].
    pub fn handle(&mut self, request: Request) -> Response {
        match self.try_handle(request) {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(%error, "Rejected request");
                Response::Error {
                    message: error.to_string(),
                }
            }
        }
    }

    /// Answer one request, surfacing rejections as errors.
    ///
    /// # Errors
    ///
    /// See the individual handlers.
    pub fn try_handle(&mut self, request: Request) -> Result<Response> {
        match request {
            Request::Welcome { player } => self.welcome(player),
            Request::StartGame => self.start_game(),
            Request::GameStartPoll => Ok(self.game_start_poll()),
            Request::ReportTurn { turn, turn_index } => self.report_turn(turn, turn_index),
            Request::TurnPoll { turn_index } => Ok(self.turn_poll(turn_index)),
        }
    }

    /// Register a player under the next sequential number; each player
    /// gets a team of its own.
    fn welcome(&mut self, info: PlayerInfo) -> Result<Response> {
        if self.starting_state.is_some() {
            return Err(ServerError::AlreadyStarted);
        }
        let number = PlayerNumber::try_from(self.players.len()).unwrap_or(PlayerNumber::MAX);
        if number >= self.config.max_players {
            return Err(ServerError::LobbyFull {
                max: self.config.max_players,
            });
        }
        tracing::info!(player = number, name = %info.name, "Player registered");
        self.players
            .insert(number, Player::new(number, number, info.name, info.blueprints));
        Ok(Response::Welcome {
            player_number: number,
            team_number: number,
        })
    }

    /// Build the starting state once; later calls change nothing.
    fn start_game(&mut self) -> Result<Response> {
        if self.starting_state.is_none() {
            if self.players.is_empty() {
                return Err(ServerError::NoPlayers);
            }
            let players = self.players.values().cloned().collect();
            let world = WorldState::starting(&self.config.rules, players, &mut ProcessIds)?;
            tracing::info!(
                players = self.players.len(),
                state_hash = world.state_hash(),
                "Game started"
            );
            self.starting_state = Some(world);
        }
        Ok(Response::StartGame)
    }

    fn game_start_poll(&self) -> Response {
        Response::GameStartPoll {
            world_state: self.starting_state.clone().map(Box::new),
        }
    }

    /// Merge a submission into the record for its index, replacing any
    /// earlier entry from the same player.
    fn report_turn(&mut self, turn: Turn, turn_index: u64) -> Result<Response> {
        if self.starting_state.is_none() {
            return Err(ServerError::NotStarted { turn_index });
        }
        if let Some(stranger) = turn.players().find(|p| !self.players.contains_key(p)) {
            return Err(ServerError::UnregisteredPlayer(stranger));
        }

        let record = self.turns.entry(turn_index).or_default();
        for player in record.absorb(turn) {
            tracing::warn!(turn = turn_index, player, "Turn entry replaced by a later report");
        }
        tracing::debug!(turn = turn_index, players = record.players().count(), "Turn reported");
        Ok(Response::ReportTurn)
    }

    /// The record for an index, once every registered player has an entry.
    fn turn_poll(&self, turn_index: u64) -> Response {
        let turn = self
            .turns
            .get(&turn_index)
            .filter(|turn| self.players.keys().all(|&p| turn.contains_player(p)))
            .cloned();
        Response::TurnPoll { turn, turn_index }
    }

    /// Registered players in number order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// The starting state, once built.
    #[must_use]
    pub fn starting_state(&self) -> Option<&WorldState> {
        self.starting_state.as_ref()
    }

    /// Everything recorded so far for an index, complete or not.
    #[must_use]
    pub fn recorded_turn(&self, turn_index: u64) -> Option<&Turn> {
        self.turns.get(&turn_index)
    }
}
