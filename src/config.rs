//! Application-level configuration loading, including the estimation deck.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PLANNING_POKER_CONFIG_PATH";
/// Fibonacci deck used when no configuration file provides one.
const DEFAULT_DECK: [u8; 7] = [1, 2, 3, 5, 8, 13, 21];

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    deck: Vec<u8>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the
    /// baked-in Fibonacci deck.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => match AppConfig::try_from(raw) {
                    Ok(config) => {
                        info!(
                            path = %path.display(),
                            deck = ?config.deck,
                            "loaded estimation deck from config"
                        );
                        config
                    }
                    Err(reason) => {
                        warn!(
                            path = %path.display(),
                            reason,
                            "rejecting configured deck; falling back to defaults"
                        );
                        Self::default()
                    }
                },
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Allowed story-point values for votes, ascending.
    pub fn deck(&self) -> &[u8] {
        &self.deck
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            deck: DEFAULT_DECK.to_vec(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    deck: Vec<u8>,
}

impl TryFrom<RawConfig> for AppConfig {
    type Error = &'static str;

    fn try_from(value: RawConfig) -> Result<Self, Self::Error> {
        let mut deck = value.deck;
        deck.sort_unstable();
        deck.dedup();
        if deck.is_empty() {
            return Err("deck must contain at least one value");
        }
        if deck.contains(&0) {
            return Err("deck values must be strictly positive");
        }
        Ok(Self { deck })
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_deck_is_fibonacci() {
        assert_eq!(AppConfig::default().deck(), &[1, 2, 3, 5, 8, 13, 21]);
    }

    #[test]
    fn raw_config_is_sorted_and_deduplicated() {
        let config = AppConfig::try_from(RawConfig {
            deck: vec![8, 1, 5, 1, 3],
        })
        .unwrap();
        assert_eq!(config.deck(), &[1, 3, 5, 8]);
    }

    #[test]
    fn empty_or_zero_decks_are_rejected() {
        assert!(AppConfig::try_from(RawConfig { deck: vec![] }).is_err());
        assert!(AppConfig::try_from(RawConfig { deck: vec![0, 1] }).is_err());
    }
}
