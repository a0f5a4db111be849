// Test-only player for end-to-end battle tests.
//
// Wraps the real `LineClient` (from `skirmish_server::client`) with a
// synchronous, test-friendly API: wait for a line containing some text, wait
// for the next prompt, configure an avatar, or play out the rest of a battle
// on autopilot. Every received line is kept in `transcript` so tests can
// assert on what a player saw after the fact.
//
// The only test-specific code here is the blocking wrappers around
// `LineClient::recv_timeout`. Networking and classification use the same
// code paths as the `skirmish-client` binary.
//
// See also: `tests/full_battle.rs` for the scenarios.

use std::net::SocketAddr;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use skirmish_protocol::ServerLine;
use skirmish_server::ArenaConfig;
use skirmish_server::client::LineClient;

/// Longest a test waits for any single line.
pub const LINE_TIMEOUT: Duration = Duration::from_secs(5);

/// Fast, deterministic server settings. A lobby of `max_players` starts as
/// soon as it fills up.
pub fn test_config(max_players: usize) -> ArenaConfig {
    ArenaConfig {
        host: "127.0.0.1".into(),
        port: 0,
        max_players,
        min_players: 2,
        lobby_seconds: 2,
        poll_interval_ms: 20,
        setup_retry_ms: 10,
        seed: Some(42),
        log_level: "warn".into(),
    }
}

pub struct TestPlayer {
    client: LineClient,
    pub transcript: Vec<ServerLine>,
}

impl TestPlayer {
    pub fn connect(addr: SocketAddr) -> Self {
        let client = LineClient::connect(addr).expect("TestPlayer::connect failed");
        Self {
            client,
            transcript: Vec::new(),
        }
    }

    pub fn send(&mut self, line: &str) {
        self.client.send_line(line).expect("send_line failed");
    }

    /// Next line, or `None` once the server has closed the connection.
    pub fn next_line(&mut self) -> Option<ServerLine> {
        match self.client.recv_timeout(LINE_TIMEOUT) {
            Ok(line) => {
                self.transcript.push(line.clone());
                Some(line)
            }
            Err(RecvTimeoutError::Disconnected) => None,
            Err(RecvTimeoutError::Timeout) => panic!("timed out waiting for a server line"),
        }
    }

    /// Block until a line containing `needle` arrives; returns its text.
    pub fn wait_for(&mut self, needle: &str) -> String {
        loop {
            match self.next_line() {
                Some(line) if line.text().contains(needle) => return line.text().to_string(),
                Some(_) => {}
                None => panic!("connection closed before {needle:?}"),
            }
        }
    }

    /// Block until the next prompt; returns the prompt text.
    pub fn wait_for_prompt(&mut self) -> String {
        loop {
            match self.next_line() {
                Some(ServerLine::Prompt(prompt)) => return prompt,
                Some(_) => {}
                None => panic!("connection closed before a prompt"),
            }
        }
    }

    /// Answer the setup prompt and wait for the confirmation line.
    pub fn configure(&mut self, answer: &str) -> String {
        let prompt = self.wait_for_prompt();
        assert!(prompt.starts_with("Configure your avatar"), "got {prompt:?}");
        self.send(answer);
        self.wait_for("You selected")
    }

    /// Read everything until the server closes the connection.
    pub fn drain(&mut self) {
        while self.next_line().is_some() {}
    }

    /// Attack the first listed target whenever prompted, until the session
    /// ends or the connection closes. Returns the player for inspection.
    pub fn autoplay(mut self) -> Self {
        let mut in_listing = false;
        let mut first_target: Option<String> = None;
        while let Some(line) = self.next_line() {
            match line {
                ServerLine::Prompt(p) if p.starts_with("Your turn") => self.send("0"),
                ServerLine::Prompt(p) if p.starts_with("Target number") => {
                    in_listing = false;
                    let pick = first_target.take().expect("no target listed");
                    self.send(&pick);
                }
                ServerLine::Text(t) if t == "Choose target:" => in_listing = true,
                ServerLine::Text(t) if in_listing && first_target.is_none() => {
                    first_target = t.split_once(':').map(|(index, _)| index.to_string());
                }
                ServerLine::Shutdown(_) => break,
                _ => {}
            }
        }
        self
    }

    /// True if any received line contains `needle`.
    pub fn saw(&self, needle: &str) -> bool {
        self.transcript.iter().any(|l| l.text().contains(needle))
    }

    /// Text of the last received line.
    pub fn last_text(&self) -> Option<&str> {
        self.transcript.last().map(ServerLine::text)
    }

    /// Drop the connection from the client side.
    pub fn disconnect(self) {
        self.client.disconnect();
    }
}
