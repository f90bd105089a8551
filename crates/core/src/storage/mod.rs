//! SQLite storage layer for Ballot
//!
//! Only client-owned data lives here: the persisted identity. Room state is
//! an ephemeral projection of the server and is never stored.

mod identity;
mod local_storage;
mod migrations;

use std::path::Path;

use rusqlite::Connection;
use tracing::instrument;

use crate::error::Result;

pub use identity::{IdentityRecord, IdentityStore, IDENTITY_KEY};
pub use local_storage::LocalStorage;

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        migrations::current_version(&self.conn).unwrap_or(0)
    }

    /// Get the key-value store
    pub fn local_storage(&self) -> LocalStorage<'_> {
        LocalStorage::new(&self.conn)
    }
}
