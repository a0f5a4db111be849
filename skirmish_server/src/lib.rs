// skirmish_server: lobby, setup and battle coordinator for Skirmish.
//
// One server process runs one battle session: players connect over plain
// TCP, wait in a lobby with a start countdown, configure an avatar in
// parallel, then take turns attacking each other until one is left.
//
// Module overview:
// - `config.rs`:      `ArenaConfig` (JSON file + clap flags) and validation.
// - `logging.rs`:     tracing-subscriber setup for the binary.
// - `connection.rs`:  `ConnectionTable`: one slot per accepted peer.
// - `session.rs`:     `SessionContext`: the lock-guarded connections and
//                     roster, the running flag, broadcast and shutdown.
// - `lobby.rs`:       Non-blocking accept/sweep loop and the `Countdown`.
// - `setup.rs`:       Thread-per-player avatar configuration.
// - `turn.rs`:        `TurnController`: turn order and action resolution.
// - `battle.rs`:      Blocking per-turn prompt/resolve/broadcast loop.
// - `server.rs`:      `start_server` / `ServerHandle`, phase sequencing.
// - `client.rs`:      `LineClient` used by the client binary and tests.
//
// Dependencies: `skirmish_protocol` (line framing and message text),
// `skirmish_combat` (combatants and abilities), `skirmish_prng` (dice).

pub mod battle;
pub mod client;
pub mod config;
pub mod connection;
pub mod lobby;
pub mod logging;
pub mod server;
pub mod session;
pub mod setup;
pub mod turn;

pub use config::{ArenaConfig, CliArgs, ConfigError};
pub use server::{Phase, ServerError, ServerHandle, SessionEnd, SessionSummary, start_server};
