//! SurrealDB connection management.
//!
//! Configuration is read once at startup; nothing here consults the
//! environment after `DbConfig` has been built.

use std::env;

use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tracing::info;

/// Connection settings for the backing SurrealDB instance.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket endpoint, host:port.
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "orgward".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    /// Build the configuration from `ORGWARD_DB_*` environment
    /// variables, falling back to local-development defaults for any
    /// that are unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: env::var("ORGWARD_DB_URL").unwrap_or(defaults.url),
            namespace: env::var("ORGWARD_DB_NAMESPACE").unwrap_or(defaults.namespace),
            database: env::var("ORGWARD_DB_DATABASE").unwrap_or(defaults.database),
            username: env::var("ORGWARD_DB_USERNAME").unwrap_or(defaults.username),
            password: env::var("ORGWARD_DB_PASSWORD").unwrap_or(defaults.password),
        }
    }
}

/// Owns the live SurrealDB client handed to the repositories.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Open a WebSocket connection, authenticate as root, and select
    /// the configured namespace and database.
    pub async fn connect(config: &DbConfig) -> Result<Self, surrealdb::Error> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "connecting to SurrealDB"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;
        db.signin(Root {
            username: &config.username,
            password: &config.password,
        })
        .await?;
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!("database connection established");
        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_local_development() {
        let config = DbConfig::default();
        assert_eq!(config.url, "127.0.0.1:8000");
        assert_eq!(config.namespace, "orgward");
    }
}
