// Shared session context for one battle.
//
// `SessionContext` bundles the state every phase touches: the connection
// table and the roster behind one `Mutex`, the running flag, and the config.
// It is created once per server, shared by `Arc` with the lobby, every setup
// thread, and the battle loop, and torn down when the session thread ends.
//
// Locking rule: the mutex is held only for table/roster access, never across
// network I/O. Broadcasts snapshot the open streams under the lock, write to
// them unlocked, then re-lock briefly to close any slot whose write failed.
// A failed send is an implicit disconnect for that slot only; the broadcast
// carries on to the other recipients.

use std::io;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use skirmish_combat::Combatant;
use skirmish_protocol::{SlotId, text, write_line, write_raw};
use tracing::{debug, info, warn};

use crate::config::ArenaConfig;
use crate::connection::ConnectionTable;

/// Everything guarded by the session lock.
#[derive(Debug, Default)]
pub struct SharedState {
    pub connections: ConnectionTable,
    /// Combatants in registration order. Moved into the turn controller when
    /// the battle starts.
    pub roster: Vec<Combatant>,
}

pub struct SessionContext {
    config: ArenaConfig,
    state: Mutex<SharedState>,
    running: AtomicBool,
}

impl SessionContext {
    pub fn new(config: ArenaConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            state: Mutex::new(SharedState::default()),
            running: AtomicBool::new(true),
        })
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Take the session lock. A poisoned lock is recovered: the state is
    /// plain data and stays consistent between individual mutations.
    pub fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn open_count(&self) -> usize {
        self.lock().connections.open_count()
    }

    /// Send a `\n`-terminated line to every open slot.
    pub fn broadcast(&self, line: &str) {
        self.broadcast_with(|stream| write_line(&mut &*stream, line));
    }

    /// Send text verbatim (countdown updates carry their own `\r`).
    pub fn broadcast_raw(&self, text: &str) {
        self.broadcast_with(|stream| write_raw(&mut &*stream, text));
    }

    fn broadcast_with(&self, mut send: impl FnMut(&TcpStream) -> io::Result<()>) {
        let targets = self.lock().connections.open_streams();
        let mut failed = Vec::new();
        for (id, stream) in &targets {
            match send(&**stream) {
                Err(e) if e.kind() != io::ErrorKind::WouldBlock => {
                    debug!(slot = %id, error = %e, "broadcast send failed");
                    failed.push(*id);
                }
                _ => {}
            }
        }
        if !failed.is_empty() {
            let mut state = self.lock();
            for id in failed {
                if state.connections.close(id) {
                    warn!(slot = %id, "closed slot after failed send");
                }
            }
        }
    }

    /// Send one line to a single slot. On failure the slot is closed and
    /// the error returned.
    pub fn send_to(&self, id: SlotId, stream: &TcpStream, line: &str) -> io::Result<()> {
        let result = write_line(&mut &*stream, line);
        if let Err(ref e) = result {
            debug!(slot = %id, error = %e, "send failed");
            self.lock().connections.close(id);
        }
        result
    }

    /// Session-fatal exit: tell everyone, close every slot, stop the session.
    /// Safe to call more than once; later calls find nothing left to close.
    pub fn shutdown(&self, reason: Option<&str>) {
        // Cleared before any socket closes, so woken readers see the stop.
        let was_running = self.running.swap(false, Ordering::SeqCst);
        self.broadcast(&text::shutdown(reason));
        let closed = self.lock().connections.close_all();
        if was_running || closed > 0 {
            info!(reason = reason.unwrap_or("stop requested"), closed, "session shut down");
        }
    }
}
