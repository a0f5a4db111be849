// Lobby phase: admission, departure sweep, and the start countdown.
//
// `run_lobby` polls on a fixed interval. Each iteration it:
// 1. tries a non-blocking `accept`; a new peer gets a slot (non-blocking),
//    a welcome line with the current occupancy, and restarts the countdown;
// 2. peeks one byte on every slot: EOF or a hard error removes the slot,
//    broadcasts the new occupancy, and restarts the countdown;
// 3. advances the `Countdown` and broadcasts the remaining seconds, but only
//    when that number changed since the last broadcast.
//
// The lobby ends when the countdown reaches zero or the lobby is full. A
// departure that drops an armed lobby (one that had reached `min_players`)
// below the minimum is session-fatal, like the same drop during setup. If
// the session was stopped from elsewhere the lobby tears everything down
// itself and reports `LobbyOutcome::Aborted`. The listener is dropped on
// return either way: nobody joins once setup begins.

use std::io;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use skirmish_protocol::{SlotId, text};
use tracing::{debug, info, warn};

use crate::session::SessionContext;

/// How the lobby phase ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LobbyOutcome {
    /// Countdown expired or the lobby filled up; `players` peers remain.
    Start { players: usize },
    /// The session stopped while the lobby was open.
    Aborted,
}

/// Result of advancing the countdown by one poll iteration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CountdownTick {
    /// Remaining whole seconds, present only when it changed.
    pub announce: Option<u64>,
    pub expired: bool,
}

/// Lobby countdown, driven by explicit instants so it can be tested without
/// sleeping.
#[derive(Clone, Debug)]
pub struct Countdown {
    duration: Duration,
    started: Option<Instant>,
    last_announced: Option<u64>,
}

impl Countdown {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            started: None,
            last_announced: None,
        }
    }

    /// Restart from the full duration (called on every join and leave).
    pub fn reset(&mut self, now: Instant) {
        self.started = Some(now);
    }

    /// Remaining whole seconds at `now`, if the countdown has started.
    pub fn remaining(&self, now: Instant) -> Option<u64> {
        let started = self.started?;
        let elapsed = now.saturating_duration_since(started).as_secs();
        Some(self.duration.as_secs().saturating_sub(elapsed))
    }

    /// True once the countdown has run with enough players present.
    pub fn is_armed(&self) -> bool {
        self.last_announced.is_some()
    }

    /// Advance one iteration. Below `min_players` the countdown is idle and
    /// forgets what it last announced, so a restarted countdown always
    /// announces its first value.
    pub fn tick(&mut self, now: Instant, occupancy: usize, min_players: usize) -> CountdownTick {
        if occupancy < min_players {
            self.last_announced = None;
            return CountdownTick::default();
        }
        if self.started.is_none() {
            self.started = Some(now);
        }
        let remaining = self.remaining(now).unwrap_or(0);
        let announce = if self.last_announced != Some(remaining) {
            self.last_announced = Some(remaining);
            Some(remaining)
        } else {
            None
        };
        CountdownTick {
            announce,
            expired: remaining == 0,
        }
    }
}

/// Run the lobby until the game should start or the session stops.
pub fn run_lobby(ctx: &SessionContext, listener: TcpListener) -> LobbyOutcome {
    let config = ctx.config();
    let max_players = config.max_players;
    let min_players = config.min_players;
    let mut countdown = Countdown::new(config.lobby_duration());

    if let Err(e) = listener.set_nonblocking(true) {
        warn!(error = %e, "listener refused non-blocking mode");
    }
    info!(max_players, min_players, "waiting for connections");

    while ctx.is_running() && ctx.open_count() < max_players {
        accept_one(ctx, &listener, &mut countdown);

        let departed = sweep_departures(ctx);
        if departed > 0 {
            let occupancy = ctx.open_count();
            // One notice per departure, each with the occupancy right after it.
            for i in 1..=departed {
                ctx.broadcast(&text::lobby_departure(occupancy + departed - i, max_players));
            }
            info!(occupancy, "player left the lobby");
            // Armed means a tick has seen `min_players`; a join and leave
            // inside one iteration never arm it.
            if countdown.is_armed() && occupancy < min_players {
                ctx.shutdown(Some(text::INSUFFICIENT_PLAYERS));
                return LobbyOutcome::Aborted;
            }
            countdown.reset(Instant::now());
        }

        let tick = countdown.tick(Instant::now(), ctx.open_count(), min_players);
        if let Some(remaining) = tick.announce {
            debug!(remaining, "countdown");
            ctx.broadcast_raw(&text::countdown(remaining));
        }
        if tick.expired {
            break;
        }

        thread::sleep(config.poll_interval());
    }

    drop(listener);

    if !ctx.is_running() {
        ctx.shutdown(None);
        return LobbyOutcome::Aborted;
    }
    let players = ctx.open_count();
    info!(players, "lobby closed, starting game");
    LobbyOutcome::Start { players }
}

/// Accept at most one pending connection.
fn accept_one(ctx: &SessionContext, listener: &TcpListener, countdown: &mut Countdown) {
    let stream = match listener.accept() {
        Ok((stream, addr)) => {
            debug!(%addr, "accepted connection");
            stream
        }
        Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return,
        Err(e) => {
            warn!(error = %e, "accept failed");
            return;
        }
    };
    if let Err(e) = stream.set_nonblocking(true) {
        warn!(error = %e, "dropping connection that refused non-blocking mode");
        return;
    }

    let (id, stream, occupancy) = {
        let mut state = ctx.lock();
        let (id, stream) = state.connections.admit(stream);
        (id, stream, state.connections.open_count())
    };
    if ctx.send_to(id, &stream, &text::welcome(occupancy)).is_err() {
        ctx.lock().connections.remove(id);
        return;
    }
    info!(slot = %id, occupancy, max = ctx.config().max_players, "player connected");
    countdown.reset(Instant::now());
}

/// Remove every slot whose peer has gone. Returns how many were removed.
fn sweep_departures(ctx: &SessionContext) -> usize {
    let snapshot: Vec<(SlotId, Option<Arc<TcpStream>>)> = ctx
        .lock()
        .connections
        .slots()
        .iter()
        .map(|s| (s.id(), s.stream()))
        .collect();

    let gone: Vec<SlotId> = snapshot
        .into_iter()
        .filter(|(_, stream)| stream.as_deref().is_none_or(peer_has_left))
        .map(|(id, _)| id)
        .collect();

    if gone.is_empty() {
        return 0;
    }
    let mut state = ctx.lock();
    gone.iter().filter(|id| state.connections.remove(**id)).count()
}

/// Zero-cost liveness probe on a non-blocking socket.
fn peer_has_left(stream: &TcpStream) -> bool {
    let mut probe = [0u8; 1];
    match stream.peek(&mut probe) {
        Ok(0) => true,
        Ok(_) => false,
        Err(e) => !matches!(
            e.kind(),
            io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
        ),
    }
}
