// Server-to-client message catalog.
//
// Every line the server sends is built here so the wording lives in one
// place and the client side (`message.rs`) can recognise the markers it must
// special-case. Builders return the line body without the trailing `\n`;
// `framing::write_line` adds it. The one exception is `countdown`, which
// carries its own `\r` and is written raw.

use crate::types::RosterIndex;

/// Prefix of a line the client should render as an input prompt.
pub const INPUT_MARKER: &str = "INPUT";

/// Phrase contained in every session-ending notice.
pub const SHUTDOWN_PHRASE: &str = "Server is shutting down";

pub const BATTLE_OVER: &str = "Battle is over!";

pub const ALL_READY: &str = "All players are ready. Let's start!";

pub const INVALID_ACTION: &str = "Invalid action! Try again.";

pub const INVALID_TARGET: &str = "Invalid target!";

/// One row of a target listing or status block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterEntry {
    pub index: RosterIndex,
    pub name: String,
    pub health: u32,
    pub alive: bool,
}

/// Wrap prompt text with the input marker.
pub fn prompt(text: &str) -> String {
    format!("{INPUT_MARKER} {text}")
}

pub fn welcome(occupancy: usize) -> String {
    format!("You're in the lobby! Currently {occupancy} player(s) here.")
}

pub fn lobby_departure(occupancy: usize, max_players: usize) -> String {
    format!("A player disconnected! Now {occupancy}/{max_players} players in lobby.")
}

/// Countdown update, terminated by `\r` instead of a newline.
pub fn countdown(remaining_secs: u64) -> String {
    format!("Game starts in {remaining_secs}s...\r")
}

pub fn game_starting(player_count: usize) -> String {
    format!("Game starting with {player_count} players. Get ready!")
}

pub fn setup_prompt() -> String {
    prompt("Configure your avatar. Type your name and your class (ex.: Conan Halfling): ")
}

/// Confirmation sent once a player's avatar is registered. `inventory` is a
/// list of `(item, count)` pairs shown under the class line.
pub fn setup_confirmation(name: &str, class: &str, inventory: &[(String, u32)]) -> String {
    let mut out = format!("You selected {name}, race of {class}!\n");
    if !inventory.is_empty() {
        let items: Vec<String> = inventory
            .iter()
            .map(|(item, count)| format!("{item} x{count}"))
            .collect();
        out.push_str(&format!("You carry: {}\n", items.join(", ")));
    }
    out.push_str("Please wait while others finish.");
    out
}

pub fn action_prompt() -> String {
    prompt("Your turn! Choose action (0=ATTACK, 1=CAST_SPELL, 2=SPECIAL_MOVE): ")
}

/// Target menu: a header line plus one `i: NAME (HP: h, Alive)` row per
/// candidate, followed by the input prompt.
pub fn target_listing(candidates: &[RosterEntry]) -> String {
    let mut out = String::from("Choose target:");
    for entry in candidates {
        out.push_str(&format!(
            "\n{}: {} (HP: {}, Alive)",
            entry.index, entry.name, entry.health
        ));
    }
    out.push('\n');
    out.push_str(&prompt("Target number: "));
    out
}

pub fn battle_departure(name: &str) -> String {
    format!("{name} disconnected and is out!")
}

pub fn action_result(attacker: &str, target: &str, description: &str) -> String {
    format!("{attacker} used action on {target}. {description}")
}

pub fn action_error(description: &str) -> String {
    format!("Error: {description}")
}

/// Full roster status block broadcast after every resolved turn.
pub fn status_block(entries: &[RosterEntry]) -> String {
    let mut out = String::from("\n==== Status after this turn ====\n");
    for entry in entries {
        out.push_str(&format!(
            "{}: {} (HP: {}, {})\n",
            entry.index,
            entry.name,
            entry.health,
            if entry.alive { "Alive" } else { "Dead" }
        ));
    }
    out.push_str("================================\n");
    out
}

pub fn last_standing(name: &str) -> String {
    format!("{name} is the last one standing!")
}

/// Session-ending notice. Always contains `SHUTDOWN_PHRASE`.
pub fn shutdown(reason: Option<&str>) -> String {
    match reason {
        Some(reason) => format!("{SHUTDOWN_PHRASE}: {reason}"),
        None => format!("{SHUTDOWN_PHRASE}."),
    }
}

pub const INSUFFICIENT_PLAYERS: &str = "Insufficient players in lobby!";
