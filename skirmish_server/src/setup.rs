// Setup phase: every lobby survivor configures an avatar in parallel.
//
// `run_setup` spawns one named thread per open slot. Each thread prompts for
// `NAME CLASS`, polls its non-blocking socket for a full line (backing off on
// `WouldBlock`), builds a `Combatant`, and registers it in the roster under
// the session lock. Completion is reported over an `mpsc` channel; the
// coordinator drains one report per thread and joins them all before
// returning, so nothing reaches the battle while a setup task is live.
//
// Registration order is whichever thread finishes first. The battle only
// needs each combatant's roster index and slot position to stay fixed, and
// both are set together under the lock.
//
// A disconnect before the line arrives closes the slot (its position is
// kept). If that leaves fewer than `min_players` open slots, the session is
// shut down from the setup thread itself.

use std::io::Read;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use skirmish_combat::{Archetype, Combatant};
use skirmish_protocol::{LineError, MAX_LINE_LEN, RosterIndex, SlotId, text};
use tracing::{debug, info, warn};

use crate::session::SessionContext;

/// Completion signal sent by each setup thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SetupReport {
    Ready { slot: SlotId, index: RosterIndex },
    Departed { slot: SlotId },
    /// The session stopped before this player finished.
    Aborted { slot: SlotId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetupOutcome {
    Complete { registered: usize },
    Aborted,
}

/// Split `NAME CLASS` input. A missing name becomes `Player<slot>`; a missing
/// or unknown class becomes `Archetype::DEFAULT`.
pub fn parse_setup_line(line: &str, slot: SlotId) -> (String, Archetype) {
    let mut tokens = line.split_whitespace();
    let name = tokens
        .next()
        .map(str::to_string)
        .unwrap_or_else(|| format!("Player{}", slot.0));
    (name, Archetype::resolve(tokens.next()))
}

/// Run setup for every open slot and wait for all of them.
pub fn run_setup(ctx: &Arc<SessionContext>) -> SetupOutcome {
    let targets = ctx.lock().connections.open_streams();
    info!(players = targets.len(), "starting avatar setup");

    let (tx, rx) = mpsc::channel();
    let mut handles = Vec::with_capacity(targets.len());
    for (slot, stream) in targets {
        let ctx_thread = Arc::clone(ctx);
        let tx_thread = tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("setup-{}", slot.0))
            .spawn(move || {
                let report = setup_one(&ctx_thread, slot, &stream);
                let _ = tx_thread.send(report);
            });
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                warn!(slot = %slot, error = %e, "could not spawn setup thread");
                ctx.lock().connections.close(slot);
            }
        }
    }
    drop(tx);

    // Ends once every thread has sent its report and dropped its sender.
    for report in rx {
        debug!(?report, "setup report");
    }
    for handle in handles {
        if handle.join().is_err() {
            warn!("setup thread panicked");
        }
    }

    if !ctx.is_running() {
        return SetupOutcome::Aborted;
    }
    let registered = ctx.lock().roster.len();
    info!(registered, "avatar setup finished");
    SetupOutcome::Complete { registered }
}

/// Configure one player. Runs on its own thread.
pub fn setup_one(ctx: &SessionContext, slot: SlotId, stream: &TcpStream) -> SetupReport {
    if ctx.send_to(slot, stream, &text::setup_prompt()).is_err() {
        return depart(ctx, slot);
    }

    let line = match poll_line(ctx, stream) {
        Ok(Some(line)) => line,
        Ok(None) => return SetupReport::Aborted { slot },
        Err(e) => {
            debug!(slot = %slot, error = %e, "lost player during setup");
            return depart(ctx, slot);
        }
    };

    let (name, archetype) = parse_setup_line(&line, slot);
    let mut combatant = Combatant::new(name.clone(), archetype);
    let inventory = combatant.inventory();

    let index = {
        let mut state = ctx.lock();
        let Some(position) = state
            .connections
            .position_of(slot)
            .filter(|&p| state.connections.is_open_at(p))
        else {
            return SetupReport::Departed { slot };
        };
        combatant.set_slot_position(position);
        let index = RosterIndex(state.roster.len());
        state.roster.push(combatant);
        state.connections.set_roster_index(slot, index);
        index
    };
    info!(slot = %slot, %index, %name, class = archetype.name(), "avatar registered");

    let confirmation = text::setup_confirmation(&name, archetype.name(), &inventory);
    let _ = ctx.send_to(slot, stream, &confirmation);
    SetupReport::Ready { slot, index }
}

/// Close a slot that dropped during setup and enforce the player minimum.
fn depart(ctx: &SessionContext, slot: SlotId) -> SetupReport {
    let open = {
        let mut state = ctx.lock();
        state.connections.close(slot);
        state.connections.open_count()
    };
    info!(slot = %slot, open, "player disconnected during avatar setup");
    if ctx.is_running() && open < ctx.config().min_players {
        ctx.shutdown(Some(text::INSUFFICIENT_PLAYERS));
    }
    SetupReport::Departed { slot }
}

/// Read one line from a non-blocking socket, sleeping between empty polls.
/// `Ok(None)` means the session stopped while waiting.
fn poll_line(ctx: &SessionContext, stream: &TcpStream) -> Result<Option<String>, LineError> {
    let retry = ctx.config().setup_retry();
    let mut reader = stream;
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        if !ctx.is_running() {
            return Ok(None);
        }
        match reader.read(&mut byte) {
            Ok(0) => return Err(LineError::Closed),
            Ok(_) if byte[0] == b'\n' => break,
            Ok(_) => {
                if buf.len() >= MAX_LINE_LEN {
                    return Err(LineError::TooLong);
                }
                buf.push(byte[0]);
            }
            Err(e) => {
                let err = LineError::from(e);
                if !err.is_retryable() {
                    return Err(err);
                }
                thread::sleep(retry);
            }
        }
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}
