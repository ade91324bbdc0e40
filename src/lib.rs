//! rwho-server - collects "who is logged in" reports from a fleet of hosts
//!
//! Client hosts periodically POST their current login sessions. The server
//! keeps one session table per reporting host plus a registry of when and
//! from where each host last reported, and serves both as JSON.
//!
//! # Usage
//!
//! As a library:
//! ```ignore
//! use rwho::{Config, Server};
//!
//! let config = Config::from_file("~/.rwho/config.toml").unwrap();
//! let server = Server::new(config).unwrap();
//! // server.start_api_server().await.unwrap();
//! ```
//!
//! As a standalone server (CLI):
//! ```text
//! rwho-server --config ~/.rwho/config.toml
//! ```

pub mod api;
pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;

// Re-export main types for convenience
pub use config::Config;
pub use db::Database;
pub use error::{CoreError, Result};
pub use handlers::{Action, RequestContext};

use std::sync::Arc;

/// Top-level service: configuration plus the shared database
pub struct Server {
    /// Configuration
    pub config: Config,

    /// Database connection
    pub db: Arc<Database>,
}

impl Server {
    /// Open the configured database and build a server around it
    pub fn new(config: Config) -> Result<Self> {
        let db = Database::new(config.db_path())?;
        Ok(Server {
            config,
            db: Arc::new(db),
        })
    }

    /// Create a server around an existing database
    pub fn with_database(config: Config, db: Arc<Database>) -> Self {
        Server { config, db }
    }

    /// Start the HTTP API server (blocks until shutdown)
    pub async fn start_api_server(&self) -> Result<()> {
        let addr = self.config.server_addr();
        tracing::info!("Starting API server on {}", addr);
        api::serve(addr, self.db.clone(), &self.config).await
    }

    /// Get a reference to the database
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_opens_configured_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = dir.path().to_path_buf();

        let server = Server::new(config).unwrap();
        assert_eq!(
            server.database().path(),
            Some(&dir.path().join("rwho.db"))
        );
    }
}
