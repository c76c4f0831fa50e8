//! # Tactics Turn Server
//!
//! Turn synchronization for modular tactics matches.
//!
//! The server collects each player's orders per turn index and hands out
//! the merged turn once everyone has contributed. Clients drive a
//! [`gameflow::Gameflow`] that resolves turns locally as soon as every
//! [`sync::TurnSource`] is ready, so all peers compute the same history.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tactics_core::config::RulesConfig;

pub mod error;
pub mod gameflow;
pub mod lobby;
pub mod network;
pub mod sync;

pub use error::{Result, ServerError};

/// Server configuration.
///
/// # Example RON
///
/// ```ron
/// ServerConfig(max_players: 4, rules: RulesConfig(width: 24, height: 24))
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
    /// Maximum players per game.
    pub max_players: u32,
    /// Seconds between turn polls from a remote source.
    pub poll_cooldown_secs: u64,
    /// Rules for the starting state.
    pub rules: RulesConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 7777,
            max_players: 8,
            poll_cooldown_secs: 5,
            rules: RulesConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse a config from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::ConfigParse`] on malformed text.
    pub fn from_ron_str(source_name: &str, text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| ServerError::ConfigParse {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })
    }

    /// Read and parse a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the file cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ServerError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron_str(&path.display().to_string(), &text)
    }

    /// Cooldown between remote turn polls.
    #[must_use]
    pub fn poll_cooldown(&self) -> Duration {
        Duration::from_secs(self.poll_cooldown_secs)
    }
}
