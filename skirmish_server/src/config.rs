// Server configuration: defaults, JSON file loading, CLI overrides.
//
// `ArenaConfig` holds every tunable the session reads: listen address,
// player bounds, lobby countdown, poll cadence, and the dice seed. Values are
// resolved once at startup (defaults, then an optional JSON file, then
// command-line flags) and are immutable for the lifetime of the session.
//
// The JSON file may be partial; missing fields keep their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Interface to bind.
    pub host: String,
    /// Listen port. 0 lets the OS pick one (used by tests).
    pub port: u16,
    /// Lobby capacity; reaching it starts the game immediately.
    pub max_players: usize,
    /// Occupancy at which the countdown runs, and below which the session
    /// shuts down at any gating point.
    pub min_players: usize,
    /// Length of the lobby countdown.
    pub lobby_seconds: u64,
    /// Sleep between lobby accept/sweep iterations.
    pub poll_interval_ms: u64,
    /// Backoff between non-blocking reads while waiting for setup input.
    pub setup_retry_ms: u64,
    /// Fixed dice seed for reproducible battles. Clock-seeded when absent.
    pub seed: Option<u64>,
    /// Default tracing filter; `RUST_LOG` still takes precedence.
    pub log_level: String,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5050,
            max_players: 6,
            min_players: 2,
            lobby_seconds: 5,
            poll_interval_ms: 500,
            setup_retry_ms: 50,
            seed: None,
            log_level: "info".into(),
        }
    }
}

impl ArenaConfig {
    /// Load a JSON config file on top of the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check the player bounds and timings make a playable session.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_players < 2 {
            return Err(ConfigError::Invalid(format!(
                "min_players must be at least 2 (got {})",
                self.min_players
            )));
        }
        if self.max_players < self.min_players {
            return Err(ConfigError::Invalid(format!(
                "max_players ({}) is below min_players ({})",
                self.max_players, self.min_players
            )));
        }
        if self.lobby_seconds == 0 {
            return Err(ConfigError::Invalid("lobby_seconds must be positive".into()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn lobby_duration(&self) -> Duration {
        Duration::from_secs(self.lobby_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn setup_retry(&self) -> Duration {
        Duration::from_millis(self.setup_retry_ms)
    }

    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref host) = args.host {
            self.host = host.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(max) = args.max_players {
            self.max_players = max;
        }
        if let Some(min) = args.min_players {
            self.min_players = min;
        }
        if let Some(secs) = args.lobby_seconds {
            self.lobby_seconds = secs;
        }
        if let Some(seed) = args.seed {
            self.seed = Some(seed);
        }
        if let Some(ref level) = args.log_level {
            self.log_level = level.clone();
        }
    }
}

/// `skirmish-server` command-line arguments. Flags override the config file.
#[derive(Parser, Debug, Default)]
#[command(name = "skirmish-server", about = "Turn-based multiplayer battle server")]
pub struct CliArgs {
    /// Path to a JSON config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Interface to bind.
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Lobby capacity.
    #[arg(long)]
    pub max_players: Option<usize>,

    /// Players needed to start the countdown.
    #[arg(long)]
    pub min_players: Option<usize>,

    /// Lobby countdown length in seconds.
    #[arg(long)]
    pub lobby_seconds: Option<u64>,

    /// Dice seed for a reproducible battle.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the final config: defaults, then `--config`, then flags.
    pub fn resolve(&self) -> Result<ArenaConfig, ConfigError> {
        let mut config = match self.config {
            Some(ref path) => ArenaConfig::load(path)?,
            None => ArenaConfig::default(),
        };
        config.apply_cli_overrides(self);
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_classic_constants() {
        let config = ArenaConfig::default();
        assert_eq!(config.port, 5050);
        assert_eq!(config.max_players, 6);
        assert_eq!(config.min_players, 2);
        assert_eq!(config.lobby_seconds, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "port": 6000, "seed": 7 }}"#).unwrap();
        let config = ArenaConfig::load(file.path()).unwrap();
        assert_eq!(config.port, 6000);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.max_players, 6);
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = ArenaConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_reports_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArenaConfig::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn cli_overrides_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "port": 6000, "max_players": 4 }}"#).unwrap();
        let args = CliArgs {
            config: Some(file.path().to_path_buf()),
            port: Some(7000),
            lobby_seconds: Some(10),
            ..CliArgs::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.max_players, 4);
        assert_eq!(config.lobby_seconds, 10);
    }

    #[test]
    fn validation_rejects_bad_bounds() {
        let single = ArenaConfig {
            min_players: 1,
            ..ArenaConfig::default()
        };
        assert!(single.validate().is_err());

        let inverted = ArenaConfig {
            min_players: 4,
            max_players: 3,
            ..ArenaConfig::default()
        };
        assert!(inverted.validate().is_err());

        let no_lobby = ArenaConfig {
            lobby_seconds: 0,
            ..ArenaConfig::default()
        };
        assert!(no_lobby.validate().is_err());
    }
}
