//! Configuration loading for the bridge.
//!
//! Loads from `./bridge.toml` (or `$BRIDGE_CONFIG_PATH`). Environment
//! variables override file values; file values override defaults.
//!
//! Precedence: env vars > config file > defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Bridge configuration, bound once at startup and not revisited.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Base URL of the Mattermost REST API (e.g. `https://chat.example.com`).
    pub api_url: String,
    /// Base URL of the websocket endpoint (e.g. `wss://chat.example.com`).
    pub ws_url: String,
    /// Personal access token or session token used for authentication.
    pub auth_token: String,
    /// Source name attached to every generic event this bridge emits.
    pub name: String,
    /// Team name. Accepted for compatibility with existing configs; the
    /// bridge does not act on it.
    pub team_name: String,
    /// Channel list. Accepted for compatibility with existing configs;
    /// per-channel join/part is not implemented.
    pub channels: Vec<String>,
}

impl BridgeConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// Config file path: `$BRIDGE_CONFIG_PATH` or `./bridge.toml`.
    /// If the file does not exist, starts from defaults.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from TOML file only, no env overrides.
    fn load_from_file() -> Result<Self> {
        let path = Self::config_path_with(|key| std::env::var(key).ok());
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found, using defaults");
                Ok(BridgeConfig::default())
            }
            Err(e) => Err(anyhow::anyhow!("failed to read config file: {e}")),
        }
    }

    /// Resolve config path using a custom env resolver (for testing).
    fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        if let Some(p) = env("BRIDGE_CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("bridge.toml")
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function for testability (avoids unsafe `set_var` in
    /// tests).
    fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("BRIDGE_API_URL") {
            self.api_url = v;
        }
        if let Some(v) = env("BRIDGE_WS_URL") {
            self.ws_url = v;
        }
        if let Some(v) = env("BRIDGE_AUTH_TOKEN") {
            self.auth_token = v;
        }
        if let Some(v) = env("BRIDGE_NAME") {
            self.name = v;
        }
    }

    /// Parse a TOML string into config.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: BridgeConfig =
            toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }

    /// Check that the fields required to establish a session are present
    /// and that the endpoints are well-formed URLs.
    ///
    /// `team_name` and `channels` are deliberately not validated: they are
    /// declared configuration surface without runtime effect.
    pub fn validate(&self) -> Result<()> {
        if self.api_url.is_empty() {
            anyhow::bail!("api_url is required (BRIDGE_API_URL or bridge.toml)");
        }
        if self.ws_url.is_empty() {
            anyhow::bail!("ws_url is required (BRIDGE_WS_URL or bridge.toml)");
        }
        if self.auth_token.is_empty() {
            anyhow::bail!("auth_token is required (BRIDGE_AUTH_TOKEN or bridge.toml)");
        }
        url::Url::parse(&self.api_url).context("api_url is not a valid URL")?;
        let ws = url::Url::parse(&self.ws_url).context("ws_url is not a valid URL")?;
        if !matches!(ws.scheme(), "ws" | "wss") {
            anyhow::bail!("ws_url must use the ws:// or wss:// scheme");
        }
        Ok(())
    }

    /// The source name for emitted events, falling back to `"mattermost"`
    /// when unset.
    pub fn source_name(&self) -> &str {
        if self.name.is_empty() {
            "mattermost"
        } else {
            &self.name
        }
    }
}
