//! Storage infrastructure for calculation history.

pub mod entity;
pub mod mapper;
pub mod metered;
pub mod migrations;
pub mod sea_orm_repo;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::domain::error::DomainError;

pub use metered::MeteredHistoryStore;
pub use migrations::Migrator;
pub use sea_orm_repo::SeaOrmHistoryStore;

/// Open a connection pool for `config.dsn`.
///
/// # Errors
/// Returns [`DomainError::Persistence`] if the database cannot be reached.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DomainError> {
    let mut options = ConnectOptions::new(config.dsn.clone());
    options
        .max_connections(config.max_connections)
        .connect_timeout(config.connect_timeout)
        .sqlx_logging(false);
    // Every SQLite in-memory connection is its own database.
    if config.dsn.contains(":memory:") {
        options.max_connections(1).min_connections(1);
    }
    Ok(Database::connect(options).await?)
}

/// Apply pending schema migrations.
///
/// # Errors
/// Returns [`DomainError::Persistence`] if a migration fails.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), DomainError> {
    Migrator::up(db, None).await?;
    Ok(())
}

/// Connects on first successful probe and keeps the pool for later use.
///
/// Serves as the readiness probe: until the database answers, every
/// [`StoreConnector::probe`] retries the connection from scratch.
pub struct StoreConnector {
    config: DatabaseConfig,
    conn: Mutex<Option<DatabaseConnection>>,
}

impl StoreConnector {
    #[must_use]
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            conn: Mutex::new(None),
        }
    }

    /// # Errors
    /// Returns [`DomainError::Persistence`] if connecting or pinging fails.
    pub async fn probe(&self) -> Result<(), DomainError> {
        let mut conn = self.conn.lock().await;
        if conn.is_none() {
            debug!("Connecting to history store");
            *conn = Some(connect(&self.config).await?);
        }
        if let Some(db) = conn.as_ref() {
            db.ping().await?;
        }
        Ok(())
    }

    /// The pool opened by a successful [`StoreConnector::probe`], if any.
    #[must_use]
    pub fn into_connection(self) -> Option<DatabaseConnection> {
        self.conn.into_inner()
    }
}
