/// Session persistence: keeps the working table across restarts.
///
/// The table and lane names are stored as one bincode value in a redb
/// table. Undo/redo history is not persisted; a restored session starts
/// with the stored table as its baseline.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::table::{LaneNames, PointTable};

/// Working-table storage: `"current"` → bincode(`SessionSnapshot`).
const SESSION_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("working_table");

const CURRENT_KEY: &str = "current";

/// The state needed to resume editing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub table: PointTable,
    pub names: LaneNames,
}

/// Persistence layer for the working session, backed by redb.
pub struct SessionStore {
    db: Database,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish()
    }
}

impl SessionStore {
    /// Returns the session database path inside `data_dir`.
    pub fn session_path(data_dir: &Path) -> PathBuf {
        data_dir.join("lane-edit-session.redb")
    }

    /// Opens or creates the session database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory or database cannot be created.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;
        }
        let db = Database::create(path)
            .with_context(|| format!("Failed to open session database: {}", path.display()))?;

        // Ensure the table exists
        let write_txn = db
            .begin_write()
            .context("Failed to begin initial session write transaction")?;
        {
            let _ = write_txn
                .open_table(SESSION_TABLE)
                .context("Failed to create working_table table")?;
        }
        write_txn
            .commit()
            .context("Failed to commit initial session transaction")?;

        Ok(Self { db })
    }

    /// Stores the working table and lane names, replacing any previous session.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write transaction fails.
    pub fn save_snapshot(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let bytes = bincode::serialize(snapshot).context("Failed to serialize session")?;

        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(SESSION_TABLE)
                .context("Failed to open working_table table")?;
            table
                .insert(CURRENT_KEY, bytes.as_slice())
                .context("Failed to insert session")?;
        }
        write_txn.commit().context("Failed to commit session")?;
        Ok(())
    }

    /// Loads the stored session, or `None` if nothing was saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails, the value cannot be decoded, or the
    /// stored table breaks the `frame_idx == index` invariant.
    pub fn load_snapshot(&self) -> Result<Option<SessionSnapshot>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(SESSION_TABLE)
            .context("Failed to open working_table table")?;

        match table.get(CURRENT_KEY).context("Failed to read session")? {
            Some(guard) => {
                let snapshot: SessionSnapshot = bincode::deserialize(guard.value())
                    .context("Failed to deserialize session")?;
                let checked = PointTable::from_records(snapshot.table.rows().to_vec())
                    .context("Stored session table is inconsistent")?;
                Ok(Some(SessionSnapshot {
                    table: checked,
                    names: snapshot.names,
                }))
            }
            None => Ok(None),
        }
    }

    /// Removes the stored session.
    ///
    /// # Errors
    ///
    /// Returns an error if the write transaction fails.
    pub fn clear(&self) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(SESSION_TABLE)
                .context("Failed to open working_table table")?;
            let _ = table.remove(CURRENT_KEY);
        }
        write_txn.commit().context("Failed to commit session removal")?;
        Ok(())
    }
}
