//! Host configuration read from the environment.

use settlers_core::{ConfigError, GameConfig};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerConfigError {
    #[error("{name} has invalid value {value:?}")]
    InvalidVar { name: &'static str, value: String },

    #[error("Cannot read game config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Game(#[from] ConfigError),
}

/// Settings for the simulation host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Seed for the game and the bots
    pub seed: Option<u64>,
    /// Seats to fill with bots
    pub players: u8,
    /// Stop a simulation after this many turns
    pub max_turns: u32,
    /// Bounded command queue per room
    pub queue_depth: usize,
    /// JSON file overriding the standard game
    pub game_config: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            seed: None,
            players: 4,
            max_turns: 500,
            queue_depth: 32,
            game_config: None,
        }
    }
}

impl ServerConfig {
    /// Read `SETTLERS_*` variables, falling back to defaults for anything unset
    pub fn from_env() -> Result<Self, ServerConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env` with an injectable variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            seed: parse_var(&lookup, "SETTLERS_SEED")?,
            players: parse_var(&lookup, "SETTLERS_PLAYERS")?.unwrap_or(defaults.players),
            max_turns: parse_var(&lookup, "SETTLERS_MAX_TURNS")?.unwrap_or(defaults.max_turns),
            queue_depth: parse_var(&lookup, "SETTLERS_QUEUE_DEPTH")?
                .filter(|&depth| depth > 0)
                .unwrap_or(defaults.queue_depth),
            game_config: lookup("SETTLERS_GAME_CONFIG").map(PathBuf::from),
        })
    }

    /// The game rules to use: the JSON file if configured, else the standard game.
    /// `seed` overrides any seed in the file.
    pub fn load_game_config(&self) -> Result<GameConfig, ServerConfigError> {
        let mut config = match &self.game_config {
            Some(path) => {
                let json = std::fs::read_to_string(path).map_err(|source| ServerConfigError::Io {
                    path: path.clone(),
                    source,
                })?;
                GameConfig::from_json_str(&json)?
            }
            None => GameConfig::default(),
        };
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ServerConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ServerConfigError::InvalidVar { name, value }),
    }
}
