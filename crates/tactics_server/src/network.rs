//! Protocol messages and the in-process transport.
//!
//! Every request gets exactly one response on the same connection, in
//! order. [`Channel`] is the client's view of a connection: sending never
//! blocks and responses are picked up later with `try_recv`, so a game
//! loop can poll without waiting on the network.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use tactics_core::data::UnitBlueprint;
use tactics_core::ids::{PlayerNumber, TeamNumber};
use tactics_core::turn::Turn;
use tactics_core::world::WorldState;

use crate::error::{Result, ServerError};
use crate::lobby::ServerContext;

/// What a joining player brings to the match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Display name.
    pub name: String,
    /// Blueprints the player fields, mothership included.
    pub blueprints: Vec<UnitBlueprint>,
}

/// Client to server messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    /// Register a player.
    Welcome {
        /// The joining player.
        player: PlayerInfo,
    },
    /// Build the starting state from everyone registered so far.
    StartGame,
    /// Ask for the starting state.
    GameStartPoll,
    /// Submit a turn, possibly covering only some players.
    ReportTurn {
        /// The submitted orders.
        turn: Turn,
        /// Which turn they belong to.
        turn_index: u64,
    },
    /// Ask for a complete turn.
    TurnPoll {
        /// Which turn.
        turn_index: u64,
    },
}

/// Server to client messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    /// Registration accepted.
    Welcome {
        /// Assigned player number.
        player_number: PlayerNumber,
        /// Assigned team number.
        team_number: TeamNumber,
    },
    /// The starting state exists.
    StartGame,
    /// The starting state, once built.
    GameStartPoll {
        /// `None` until the game starts.
        world_state: Option<Box<WorldState>>,
    },
    /// Turn recorded.
    ReportTurn,
    /// The merged turn, once every player has contributed.
    TurnPoll {
        /// `None` while some player is still missing.
        turn: Option<Turn>,
        /// Echo of the requested index.
        turn_index: u64,
    },
    /// The request was rejected.
    Error {
        /// Human-readable reason.
        message: String,
    },
}

/// A client's connection to the server.
pub trait Channel: Send {
    /// Queue a request without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::ChannelClosed`] if the server is gone.
    fn send(&mut self, request: Request) -> Result<()>;

    /// The next response, if one has arrived.
    fn try_recv(&mut self) -> Option<Response>;
}

/// A request waiting for the server loop, with the route back to its sender.
#[derive(Debug)]
pub struct Envelope {
    request: Request,
    reply: mpsc::UnboundedSender<Response>,
}

/// Cloneable handle for opening connections to a running server loop.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    requests: mpsc::UnboundedSender<Envelope>,
}

impl ServerHandle {
    /// Open a new connection.
    #[must_use]
    pub fn connect(&self) -> InProcessChannel {
        let (reply, responses) = mpsc::unbounded_channel();
        InProcessChannel {
            requests: self.requests.clone(),
            reply,
            responses,
        }
    }
}

/// Connection to a server loop in the same process.
#[derive(Debug)]
pub struct InProcessChannel {
    requests: mpsc::UnboundedSender<Envelope>,
    reply: mpsc::UnboundedSender<Response>,
    responses: mpsc::UnboundedReceiver<Response>,
}

impl InProcessChannel {
    /// Wait for the next response.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::ChannelClosed`] if the server is gone.
    pub async fn recv(&mut self) -> Result<Response> {
        self.responses.recv().await.ok_or(ServerError::ChannelClosed)
    }

    /// Send a request and wait for its response.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::ChannelClosed`] if the server is gone.
    pub async fn request(&mut self, request: Request) -> Result<Response> {
        self.send(request)?;
        self.recv().await
    }
}

impl Channel for InProcessChannel {
    fn send(&mut self, request: Request) -> Result<()> {
        self.requests
            .send(Envelope {
                request,
                reply: self.reply.clone(),
            })
            .map_err(|_| ServerError::ChannelClosed)
    }

    fn try_recv(&mut self) -> Option<Response> {
        self.responses.try_recv().ok()
    }
}

/// Answer requests until every handle and connection is dropped.
///
/// The context sits behind a mutex so callers can inspect it while the
/// loop runs; only this loop mutates it.
pub async fn serve(context: Arc<Mutex<ServerContext>>, mut requests: mpsc::UnboundedReceiver<Envelope>) {
    tracing::info!("Server loop started");
    while let Some(Envelope { request, reply }) = requests.recv().await {
        let response = context.lock().await.handle(request);
        if reply.send(response).is_err() {
            tracing::debug!("Client disconnected before its response");
        }
    }
    tracing::info!("Server loop stopped");
}

/// Spawn [`serve`] on the current tokio runtime.
///
/// Returns a handle for connecting clients, the shared context and the
/// loop's task.
#[must_use]
pub fn spawn_server(context: ServerContext) -> (ServerHandle, Arc<Mutex<ServerContext>>, JoinHandle<()>) {
    let (requests, incoming) = mpsc::unbounded_channel();
    let context = Arc::new(Mutex::new(context));
    let task = tokio::spawn(serve(Arc::clone(&context), incoming));
    (ServerHandle { requests }, context, task)
}
