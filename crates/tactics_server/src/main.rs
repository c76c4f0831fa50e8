//! Modular Tactics - turn server demo
//!
//! Runs an in-process server with a handful of scripted clients. Each
//! client keeps its mothership researching, collecting and building scouts,
//! and every client must end on the same state hash.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tactics_core::data::Catalog;
use tactics_core::ids::PlayerNumber;
use tactics_core::parts::{spawn_coords, PartKind};
use tactics_core::turn::{Action, Turn};
use tactics_core::world::WorldState;
use tactics_server::gameflow::Gameflow;
use tactics_server::lobby::ServerContext;
use tactics_server::network::{spawn_server, InProcessChannel, PlayerInfo, Request, Response, ServerHandle};
use tactics_server::sync::{LocalSource, RemoteSource, TurnSource};
use tactics_server::{Result, ServerConfig, ServerError};

#[derive(Parser)]
#[command(name = "tactics-server")]
#[command(about = "Play scripted clients against an in-process turn server")]
struct Cli {
    /// Server config (RON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Blueprint catalog every client fields
    #[arg(long, default_value = "assets/data/catalogs/standard.ron")]
    catalog: PathBuf,

    /// Number of clients
    #[arg(long, default_value_t = 2)]
    players: u32,

    /// Turns to play
    #[arg(long, default_value_t = 10)]
    turns: u64,

    /// Poll cooldown in milliseconds, overriding the config
    #[arg(long)]
    poll_ms: Option<u64>,
}

struct Client {
    number: PlayerNumber,
    flow: Gameflow,
    submitted: Option<u64>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!("Server demo failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    let catalog = load_catalog(&cli.catalog)?;
    let cooldown = cli.poll_ms.map_or(config.poll_cooldown(), Duration::from_millis);
    tracing::info!(
        port = config.port,
        players = cli.players,
        turns = cli.turns,
        "Starting Modular Tactics turn server"
    );

    let (handle, _context, _task) = spawn_server(ServerContext::new(config));

    let mut lobby = Vec::new();
    for n in 0..cli.players {
        let mut channel = handle.connect();
        let number = match channel
            .request(Request::Welcome {
                player: PlayerInfo {
                    name: format!("{} {n}", catalog.team),
                    blueprints: catalog.blueprints.clone(),
                },
            })
            .await?
        {
            Response::Welcome { player_number, .. } => player_number,
            other => return Err(unexpected(&other)),
        };
        lobby.push((number, channel));
    }

    if let Some((_, channel)) = lobby.first_mut() {
        expect_ok(channel.request(Request::StartGame).await?)?;
    }

    let mut clients = Vec::new();
    for (number, mut channel) in lobby {
        let starting = match channel.request(Request::GameStartPoll).await? {
            Response::GameStartPoll {
                world_state: Some(world),
            } => *world,
            other => return Err(unexpected(&other)),
        };
        clients.push(join(&handle, number, starting, channel, cooldown));
    }

    while clients.iter().any(|c| c.flow.turn_index() < cli.turns) {
        for client in &mut clients {
            let index = client.flow.turn_index();
            if index >= cli.turns {
                continue;
            }
            if client.submitted != Some(index) {
                client.flow.submit_local_turn()?;
                client.submitted = Some(index);
            }
            if client.flow.try_advance(Instant::now())? {
                if let Some(report) = client.flow.last_report() {
                    tracing::debug!(
                        player = client.number,
                        turn = index,
                        spawned = report.spawned.len(),
                        destroyed = report.destroyed.len(),
                        "Client advanced"
                    );
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let hashes: Vec<u64> = clients.iter().map(|c| c.flow.most_recent().state_hash()).collect();
    if hashes.windows(2).any(|pair| pair[0] != pair[1]) {
        return Err(ServerError::Rejected(format!("clients diverged: {hashes:?}")));
    }
    for client in &clients {
        let player = client.flow.local_player()?;
        tracing::info!(
            player = client.number,
            research = player.research,
            resources = %player.resources,
            units = client.flow.most_recent().units_of(client.number).len(),
            "Final standing"
        );
    }
    tracing::info!(turns = cli.turns, state_hash = hashes.first().copied().unwrap_or_default(), "Match complete");
    Ok(())
}

/// A client with a local source for its own orders and a remote source for
/// everyone's merged turn.
fn join(
    handle: &ServerHandle,
    number: PlayerNumber,
    starting: WorldState,
    reporter: InProcessChannel,
    cooldown: Duration,
) -> Client {
    let orders = standing_orders(&starting, number);
    let sources = vec![
        TurnSource::Remote(RemoteSource::new(Box::new(handle.connect()), cooldown)),
        TurnSource::Local(LocalSource::new()),
    ];
    let mut flow = Gameflow::new(starting, sources, Some(number), Some(Box::new(reporter)));
    *flow.local_turn_mut() = orders;
    Client {
        number,
        flow,
        submitted: None,
    }
}

/// Research, collect and build the first regular blueprint next to the
/// mothership. Later turns keep these going through the default next turn.
fn standing_orders(world: &WorldState, player: PlayerNumber) -> Turn {
    let mut turn = Turn::for_players([player]);
    let build = world
        .player(player)
        .ok()
        .and_then(|p| p.blueprints.iter().find(|bp| !bp.mothership))
        .map(|bp| (bp.name.clone(), bp.size));

    for unit_id in world.units_of(player) {
        let Some(entity) = world.board.get(unit_id) else {
            continue;
        };
        let Some(unit) = entity.as_unit() else {
            continue;
        };
        for part in &unit.parts {
            let action = match (&part.kind, &build) {
                (PartKind::Researcher, _) => Action::Researcher,
                (PartKind::Collector, _) => Action::Collector,
                (PartKind::Producer(_), Some((name, size))) => Action::Producer {
                    blueprint: name.clone(),
                    out_coords: spawn_coords(world.board.bounds(), entity.origin, entity.size, *size)
                        .first()
                        .copied(),
                },
                _ => continue,
            };
            turn.add_action(player, unit_id, part.id, action);
        }
    }
    turn
}

fn load_catalog(path: &std::path::Path) -> Result<Catalog> {
    let text = std::fs::read_to_string(path).map_err(|source| ServerError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Catalog::from_ron_str(&path.display().to_string(), &text)?)
}

fn expect_ok(response: Response) -> Result<()> {
    match response {
        Response::Error { message } => Err(ServerError::Rejected(message)),
        _ => Ok(()),
    }
}

fn unexpected(response: &Response) -> ServerError {
    match response {
        Response::Error { message } => ServerError::Rejected(message.clone()),
        other => ServerError::Rejected(format!("unexpected response: {other:?}")),
    }
}
