//! Server configuration.
//!
//! Read from `config.json` (camelCase keys) at the path named by
//! `TOOL_RPC_CONFIG`, else `{config_dir}/tool-rpc/config.json`. A missing file
//! means defaults. `TOOL_RPC_LISTEN` and `TOOL_RPC_LOG_DIR` override the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

pub const CONFIG_ENV: &str = "TOOL_RPC_CONFIG";
pub const LISTEN_ENV: &str = "TOOL_RPC_LISTEN";
pub const LOG_DIR_ENV: &str = "TOOL_RPC_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Reported in `serverInfo.name` during `initialize`.
    #[serde(default = "default_server_name")]
    pub server_name: String,
    /// End the serve loop after answering `shutdown`.
    #[serde(default = "default_true")]
    pub exit_on_shutdown: bool,
    /// Default tracing filter; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Directory for rolling log files. Stderr only when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// TCP address to serve on instead of stdin/stdout.
    #[serde(default)]
    pub listen: Option<String>,
}

fn default_server_name() -> String {
    "tool-rpc".into()
}

fn default_true() -> bool {
    true
}

fn default_log_filter() -> String {
    "info".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_name: default_server_name(),
            exit_on_shutdown: true,
            log_filter: default_log_filter(),
            log_dir: None,
            listen: None,
        }
    }
}

impl ServerConfig {
    /// Load from the default location and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path();
        let mut config = read_config_file(&path)?.unwrap_or_default();
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `TOOL_RPC_*` overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(listen) = lookup(LISTEN_ENV).filter(|v| !v.trim().is_empty()) {
            self.listen = Some(listen.trim().to_string());
        }
        if let Some(dir) = lookup(LOG_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.log_dir = Some(PathBuf::from(dir));
        }
    }
}

/// Path to the config file.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tool-rpc")
        .join("config.json")
}

/// Read and parse a config file. `Ok(None)` when the file does not exist.
pub fn read_config_file(path: &Path) -> Result<Option<ServerConfig>, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No config at {}, using defaults", path.display());
            return Ok(None);
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            })
        }
    };

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.server_name, "tool-rpc");
        assert!(config.exit_on_shutdown);
        assert_eq!(config.log_filter, "info");
        assert!(config.listen.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"serverName":"demo","exitOnShutdown":false}"#).unwrap();

        let config = read_config_file(&path).unwrap().unwrap();
        assert_eq!(config.server_name, "demo");
        assert!(!config.exit_on_shutdown);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_config_file(&dir.path().join("nope.json")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(read_config_file(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> =
            HashMap::from([(LISTEN_ENV, "127.0.0.1:9000"), (LOG_DIR_ENV, "/tmp/logs")]);
        let mut config = ServerConfig::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.listen.as_deref(), Some("127.0.0.1:9000"));
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/logs")));
    }

    #[test]
    fn test_blank_env_override_ignored() {
        let mut config = ServerConfig {
            listen: Some("0.0.0.0:1".into()),
            ..ServerConfig::default()
        };
        config.apply_overrides(|k| (k == LISTEN_ENV).then(|| "  ".to_string()));
        assert_eq!(config.listen.as_deref(), Some("0.0.0.0:1"));
    }
}
