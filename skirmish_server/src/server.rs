// Server lifecycle: bind, run one session on a background thread, report.
//
// `start_server` binds the listener on the calling thread (so bind errors
// surface immediately and port 0 resolves to a real address), then hands it
// to a thread named `session` that runs the phases in order:
//
//   lobby -> "Game starting" -> setup -> gate -> "All players are ready"
//         -> switch sockets to blocking -> battle -> teardown
//
// Gating: the lobby and setup enforce `min_players` as players leave. After
// setup one more check counts registered combatants whose slot is still
// open; too few is session-fatal with the same notice.
//
// The roster is moved out of the shared state into the `TurnController`
// once setup has joined every task, so the battle runs without the lock
// except for slot lookups and broadcasts.
//
// `ServerHandle::stop` shuts the session down (notice, close every socket,
// clear the running flag), which also unblocks a battle read in progress,
// then joins the session thread.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use skirmish_prng::DiceRng;
use skirmish_protocol::text;
use thiserror::Error;
use tracing::{info, warn};

use crate::battle::{BattleEnd, run_battle};
use crate::config::{ArenaConfig, ConfigError};
use crate::lobby::{LobbyOutcome, run_lobby};
use crate::session::SessionContext;
use crate::setup::{SetupOutcome, run_setup};
use crate::turn::TurnController;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to start session thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("session thread panicked")]
    SessionPanicked,
}

/// Session phase, as far as it got.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Lobby,
    Setup,
    Battle,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// The battle ran to the end.
    Completed { survivor: Option<String> },
    /// The session was shut down during `phase`.
    Aborted { phase: Phase },
}

/// What happened to a session, returned when its thread finishes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    pub end: SessionEnd,
    /// Peers present when the lobby closed.
    pub admitted: usize,
    /// Combatants registered during setup.
    pub registered: usize,
}

pub struct ServerHandle {
    ctx: Arc<SessionContext>,
    thread: Option<JoinHandle<SessionSummary>>,
}

impl ServerHandle {
    pub fn is_running(&self) -> bool {
        self.ctx.is_running()
    }

    /// Shut the session down and wait for its thread.
    pub fn stop(self) -> Result<SessionSummary, ServerError> {
        self.ctx.shutdown(None);
        self.wait()
    }

    /// Wait for the session to finish on its own.
    pub fn wait(mut self) -> Result<SessionSummary, ServerError> {
        match self.thread.take() {
            Some(handle) => handle.join().map_err(|_| ServerError::SessionPanicked),
            None => Err(ServerError::SessionPanicked),
        }
    }
}

/// Bind and start a session on a background thread. Returns the handle and
/// the bound address.
pub fn start_server(config: ArenaConfig) -> Result<(ServerHandle, SocketAddr), ServerError> {
    config.validate()?;
    let bind = config.bind_addr();
    let listener = TcpListener::bind(&bind).map_err(|source| ServerError::Bind {
        addr: bind.clone(),
        source,
    })?;
    let addr = listener.local_addr().map_err(|source| ServerError::Bind {
        addr: bind,
        source,
    })?;
    info!(%addr, "server listening");

    let ctx = SessionContext::new(config);
    let ctx_session = Arc::clone(&ctx);
    let thread = thread::Builder::new()
        .name("session".into())
        .spawn(move || run_session(&ctx_session, listener))
        .map_err(ServerError::Spawn)?;

    Ok((
        ServerHandle {
            ctx,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Run every phase of one session to completion.
pub fn run_session(ctx: &Arc<SessionContext>, listener: TcpListener) -> SessionSummary {
    let min_players = ctx.config().min_players;
    let aborted = |phase: Phase, admitted: usize, registered: usize| SessionSummary {
        end: SessionEnd::Aborted { phase },
        admitted,
        registered,
    };

    let admitted = match run_lobby(ctx, listener) {
        LobbyOutcome::Start { players } => players,
        LobbyOutcome::Aborted => return aborted(Phase::Lobby, 0, 0),
    };
    if admitted < min_players {
        ctx.shutdown(Some(text::INSUFFICIENT_PLAYERS));
        return aborted(Phase::Lobby, admitted, 0);
    }
    ctx.broadcast(&text::game_starting(admitted));

    let registered = match run_setup(ctx) {
        SetupOutcome::Complete { registered } => registered,
        SetupOutcome::Aborted => return aborted(Phase::Setup, admitted, ctx.lock().roster.len()),
    };

    let (roster, connected) = {
        let mut state = ctx.lock();
        for slot in state.connections.set_nonblocking_all(false) {
            warn!(slot = %slot, "closed slot that refused blocking mode");
        }
        let roster = std::mem::take(&mut state.roster);
        let connected = roster
            .iter()
            .filter_map(|c| c.slot_position())
            .filter(|&p| state.connections.is_open_at(p))
            .count();
        (roster, connected)
    };
    if connected < min_players {
        ctx.shutdown(Some(text::INSUFFICIENT_PLAYERS));
        return aborted(Phase::Setup, admitted, registered);
    }
    ctx.broadcast(text::ALL_READY);

    let rng = match ctx.config().seed {
        Some(seed) => DiceRng::new(seed),
        None => DiceRng::from_clock(),
    };
    let mut turns = TurnController::new(roster, rng);
    let end = match run_battle(ctx, &mut turns) {
        BattleEnd::Finished { survivor } => SessionEnd::Completed { survivor },
        BattleEnd::Stopped => SessionEnd::Aborted {
            phase: Phase::Battle,
        },
    };
    info!(?end, admitted, registered, "session finished");
    SessionSummary {
        end,
        admitted,
        registered,
    }
}
