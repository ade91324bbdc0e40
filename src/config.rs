//! Configuration management for rwho-server
//!
//! Loads settings from TOML file at ~/.rwho/config.toml

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database location
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Audit log configuration
    #[serde(default)]
    pub audit: AuditConfig,

    /// Data directory (defaults to ~/.rwho)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|p| p.join(".rwho"))
        .unwrap_or_else(|| PathBuf::from(".rwho"))
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server port (default: 19430)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Server host (default: 127.0.0.1 - localhost only).
    /// Reporting clients usually live on other machines, so production
    /// deployments bind "0.0.0.0" behind a reverse proxy.
    #[serde(default = "default_host")]
    pub host: String,

    /// Take the client address from the first `X-Forwarded-For` entry
    /// instead of the socket peer. Only enable behind a trusted proxy.
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

fn default_port() -> u16 {
    19430
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
            host: default_host(),
            trust_forwarded_for: false,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Explicit SQLite file path. Defaults to `<data_dir>/rwho.db`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Audit log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Record one audit line per dispatched action
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory for a daily-rotated `audit.log`. When unset, audit lines
    /// only go to the regular log output.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for AuditConfig {
    fn default() -> Self {
        AuditConfig {
            enabled: true,
            dir: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            audit: AuditConfig::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let expanded_path = expand_path(path.as_ref());

        if !expanded_path.exists() {
            return Err(CoreError::Config(format!(
                "Configuration file not found: {}",
                expanded_path.display()
            )));
        }

        let content = std::fs::read_to_string(&expanded_path)?;
        let config: Config = toml::from_str(&content)?;

        Ok(config)
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|p| p.join(".rwho").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".rwho/config.toml"))
    }

    /// Get the data directory, expanding ~ if present
    pub fn data_dir(&self) -> PathBuf {
        expand_path(&self.data_dir)
    }

    /// Path of the SQLite database file
    pub fn db_path(&self) -> PathBuf {
        match &self.database.path {
            Some(path) => expand_path(path),
            None => self.data_dir().join("rwho.db"),
        }
    }

    /// Directory for the rotated audit log, if configured
    pub fn audit_dir(&self) -> Option<PathBuf> {
        self.audit.dir.as_deref().map(expand_path)
    }

    /// Get the server socket address
    pub fn server_addr(&self) -> SocketAddr {
        use std::net::ToSocketAddrs;

        format!("{}:{}", self.server.host, self.server.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], self.server.port)))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("RWHO_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("RWHO_SERVER_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(data_dir) = std::env::var("RWHO_DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(db_path) = std::env::var("RWHO_DB_PATH") {
            self.database.path = if db_path.is_empty() {
                None
            } else {
                Some(PathBuf::from(db_path))
            };
        }
    }

    /// Create a default configuration file at the given path
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let content = r#"# rwho-server configuration

# Directory holding rwho.db (unless [database].path is set)
data_dir = "~/.rwho"

[server]
# Port to listen on (default: 19430)
port = 19430

# Host to bind to
# "127.0.0.1" = localhost only (put a reverse proxy in front)
# "0.0.0.0" = all interfaces
host = "127.0.0.1"

# Use X-Forwarded-For as the client address (only behind a trusted proxy)
trust_forwarded_for = false

[database]
# path = "/var/lib/rwho/rwho.db"

[audit]
# Log one line per report: addr, host, action, payload size
enabled = true
# Also write a daily-rotated audit.log into this directory
# dir = "/var/log/rwho"
"#;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;

        Ok(())
    }
}

/// Expand ~ to home directory in paths
pub fn expand_path(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
