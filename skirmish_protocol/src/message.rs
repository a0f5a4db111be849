// Client-side classification of server output.
//
// A client reads `Segment`s (see `framing.rs`) and turns each into a
// `ServerLine` so the UI knows how to render it: prompts without a trailing
// newline, countdowns overwritten in place, and the shutdown phrase as the
// signal to stop reading.

use crate::framing::{Segment, Terminator};
use crate::text::{BATTLE_OVER, INPUT_MARKER, SHUTDOWN_PHRASE};

/// One classified piece of server output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerLine {
    /// Input prompt; the marker and its separator are already stripped.
    Prompt(String),
    /// In-place countdown update (arrived `\r`-terminated).
    Countdown(String),
    /// The session is ending; the client should stop its receive loop.
    Shutdown(String),
    /// Any other informational line.
    Text(String),
}

impl ServerLine {
    pub fn classify(segment: Segment) -> Self {
        let Segment { text, terminator } = segment;
        if terminator == Terminator::CarriageReturn {
            return ServerLine::Countdown(text);
        }
        if let Some(prompt) = prompt_body(&text) {
            return ServerLine::Prompt(prompt.to_string());
        }
        if text.contains(SHUTDOWN_PHRASE) || text.contains(BATTLE_OVER) {
            return ServerLine::Shutdown(text);
        }
        ServerLine::Text(text)
    }

    /// The displayable text, whatever the kind.
    pub fn text(&self) -> &str {
        match self {
            ServerLine::Prompt(t)
            | ServerLine::Countdown(t)
            | ServerLine::Shutdown(t)
            | ServerLine::Text(t) => t,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ServerLine::Shutdown(_))
    }
}

/// Text after the `INPUT` token, if the line starts with it. The marker is a
/// whole word: `INPUT` alone or followed by a space.
fn prompt_body(text: &str) -> Option<&str> {
    let rest = text.strip_prefix(INPUT_MARKER)?;
    if rest.is_empty() {
        return Some(rest);
    }
    rest.strip_prefix(' ')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> Segment {
        Segment {
            text: text.into(),
            terminator: Terminator::Newline,
        }
    }

    #[test]
    fn prompt_marker_stripped() {
        let classified = ServerLine::classify(line("INPUT Your turn! "));
        assert_eq!(classified, ServerLine::Prompt("Your turn! ".into()));
    }

    #[test]
    fn marker_must_be_a_whole_token() {
        assert_eq!(ServerLine::classify(line("INPUT")), ServerLine::Prompt(String::new()));
        let named = "INPUTs used action on Bilbo. INPUTs attacks aggressively!";
        assert_eq!(ServerLine::classify(line(named)), ServerLine::Text(named.into()));
        assert_eq!(
            ServerLine::classify(line("INPUTs disconnected and is out!")),
            ServerLine::Text("INPUTs disconnected and is out!".into())
        );
    }

    #[test]
    fn carriage_return_is_countdown() {
        let classified = ServerLine::classify(Segment {
            text: "Game starts in 4s...".into(),
            terminator: Terminator::CarriageReturn,
        });
        assert_eq!(classified, ServerLine::Countdown("Game starts in 4s...".into()));
    }

    #[test]
    fn shutdown_phrase_is_terminal() {
        let classified = ServerLine::classify(line("Server is shutting down."));
        assert!(classified.is_terminal());
        assert!(ServerLine::classify(line("Battle is over!")).is_terminal());
        assert!(!ServerLine::classify(line("Conan used action on Bilbo.")).is_terminal());
    }
}
