// skirmish_protocol: text protocol between the battle server and players.
//
// Clients are plain TCP peers exchanging UTF-8 text. This crate holds
// everything both sides must agree on, with no dependency on the server or
// combat crates.
//
// Module overview:
// - `types.rs`:    `SlotId` and `RosterIndex` newtypes.
// - `framing.rs`:  `\n`-delimited line reading/writing, plus `\r`-aware
//                  segment reading for clients (countdown lines).
// - `text.rs`:     The server's message catalog and protocol markers
//                  (`INPUT` prompt prefix, shutdown phrase).
// - `message.rs`:  `ServerLine`, the client-side classification of output.
//
// No length prefix or checksum: a line is a message.

pub mod framing;
pub mod message;
pub mod text;
pub mod types;

pub use framing::{
    LineError, MAX_LINE_LEN, Segment, Terminator, read_line, read_segment, write_line, write_raw,
};
pub use message::ServerLine;
pub use text::RosterEntry;
pub use types::{RosterIndex, SlotId};
