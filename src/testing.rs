//! Testing utilities
//!
//! `TestDatabase` provides an isolated, fully migrated in-memory SQLite
//! database for DB-backed tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use taskflow::migrations::Migrator;
//! use taskflow::testing::TestDatabase;
//!
//! let db = TestDatabase::fresh::<Migrator>().await?;
//! let orchestrator = WorkflowOrchestrator::new(db.db().clone());
//! ```

use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;

use crate::database::{DatabaseConfig, DbConnection};
use crate::error::EngineError;

/// Isolated in-memory database for tests
///
/// Each call to [`TestDatabase::fresh`] produces a brand-new database with all
/// migrations applied; dropping the value drops the database with it.
pub struct TestDatabase {
    db: DbConnection,
}

impl TestDatabase {
    /// Create a fresh in-memory database and run all migrations
    pub async fn fresh<M: MigratorTrait>() -> Result<Self, EngineError> {
        let db = DbConnection::connect(&DatabaseConfig::in_memory()).await?;
        M::up(db.inner(), None)
            .await
            .map_err(|e| EngineError::database(e.to_string()))?;
        Ok(Self { db })
    }

    /// The connection handle
    pub fn db(&self) -> &DbConnection {
        &self.db
    }

    /// Reference to the underlying SeaORM connection
    pub fn conn(&self) -> &DatabaseConnection {
        self.db.inner()
    }
}
