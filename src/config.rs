//! Client configuration: where the backend lives.
//!
//! Layering, weakest first: built-in default, then an optional TOML file in
//! the user config directory, then the `MINGLE_SERVER` environment variable.

use std::env;
use std::fs;
use std::path::PathBuf;

use log::debug;
use serde::Deserialize;

use crate::error::ClientError;

const DEFAULT_SERVER: &str = "http://localhost:8000";
const SERVER_ENV: &str = "MINGLE_SERVER";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP origin of the backend, e.g. `https://chat.example.com`.
    #[serde(default = "default_server")]
    pub server: String,
}

fn default_server() -> String {
    DEFAULT_SERVER.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: default_server(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ClientError> {
        let mut config = match Self::config_file() {
            Some(path) if path.exists() => {
                let raw = fs::read_to_string(&path)
                    .map_err(|e| ClientError::Config(format!("{}: {e}", path.display())))?;
                let parsed: Config = toml::from_str(&raw)
                    .map_err(|e| ClientError::Config(format!("{}: {e}", path.display())))?;
                debug!("loaded config from {}", path.display());
                parsed
            }
            _ => Config::default(),
        };
        if let Ok(server) = env::var(SERVER_ENV) {
            config.server = server;
        }
        config.server = config.server.trim_end_matches('/').to_string();
        Ok(config)
    }

    fn config_file() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mingle").join("config.toml"))
    }

    /// WebSocket origin derived from the server origin: `https` origins get
    /// `wss`, everything else plain `ws`.
    pub fn ws_origin(&self) -> String {
        if let Some(rest) = self.server.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.server.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            format!("ws://{}", self.server)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_origin_follows_server_scheme() {
        let plain = Config {
            server: "http://localhost:8000".to_string(),
        };
        assert_eq!(plain.ws_origin(), "ws://localhost:8000");

        let secure = Config {
            server: "https://chat.example.com".to_string(),
        };
        assert_eq!(secure.ws_origin(), "wss://chat.example.com");

        let bare = Config {
            server: "localhost:8000".to_string(),
        };
        assert_eq!(bare.ws_origin(), "ws://localhost:8000");
    }

    #[test]
    fn config_file_fields_are_optional() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server, DEFAULT_SERVER);

        let config: Config = toml::from_str(r#"server = "https://mingle.dev""#).unwrap();
        assert_eq!(config.server, "https://mingle.dev");
    }
}
