// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use guestlink_config::model::StorageConfig;
use guestlink_core::GuestlinkError;
use tracing::debug;

use crate::migrations;

/// Handle to the SQLite database used by every Guestlink crate.
///
/// Cloning is cheap; all clones share the same single-writer background
/// thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database named by `config`, apply PRAGMAs, and
    /// run all pending migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, GuestlinkError> {
        let path = config.database_path.as_str();
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| GuestlinkError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| map_tr_err(e.into()))?;

        let wal_mode = config.wal_mode;
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        let db = Self { conn };
        db.conn
            .call(|conn| {
                migrations::run_migrations(conn)
                    .map_err(|e| rusqlite::Error::ModuleError(e.to_string()))
            })
            .await
            .map_err(map_tr_err)?;

        debug!(path, "database opened");
        Ok(db)
    }

    /// Open an in-memory database (tests and ephemeral tooling).
    pub async fn open_in_memory() -> Result<Self, GuestlinkError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| map_tr_err(e.into()))?;
        let db = Self { conn };
        db.conn
            .call(|conn| {
                migrations::run_migrations(conn)
                    .map_err(|e| rusqlite::Error::ModuleError(e.to_string()))
            })
            .await
            .map_err(map_tr_err)?;
        Ok(db)
    }

    /// The underlying tokio-rusqlite connection.
    ///
    /// Query modules call through `connection().call()`; every closure runs
    /// on the one background thread, which is what serializes writes.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Close the connection, flushing WAL.
    pub async fn close(self) -> Result<(), GuestlinkError> {
        self.conn.close().await.map_err(map_tr_err)
    }
}

/// Convert tokio-rusqlite errors to GuestlinkError::Storage.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> GuestlinkError {
    GuestlinkError::Storage {
        source: Box::new(e),
    }
}
