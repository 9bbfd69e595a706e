//! Durability: exported artifacts and the timed backup scheduler.
//!
//! Artifacts hold only the `[x, y, yaw]` columns of a table, bincode-encoded.
//! They are meant to be read back by this tool, not by third parties.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::table::PointTable;

/// Writes `[x, y, yaw]` rows to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write_artifact(path: &Path, poses: &[[f64; 3]]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    let bytes = bincode::serialize(poses).context("failed to serialize artifact")?;
    std::fs::write(path, bytes)
        .with_context(|| format!("failed to write artifact: {}", path.display()))?;
    Ok(())
}

/// Reads an artifact written by [`write_artifact`].
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded.
pub fn read_artifact(path: &Path) -> Result<Vec<[f64; 3]>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read artifact: {}", path.display()))?;
    bincode::deserialize(&bytes)
        .with_context(|| format!("failed to decode artifact: {}", path.display()))
}

/// Writes the whole table to a fixed, overwritable artifact.
///
/// An empty table still produces an (empty) artifact.
///
/// # Errors
///
/// Returns an error if the artifact cannot be written.
pub fn save_table(path: &Path, table: &PointTable) -> Result<()> {
    write_artifact(path, &table.poses())
}

/// Writes one `Lane_{id}.bin` artifact per lane into `dir`.
///
/// Existing entries in `dir` are removed first; entries that cannot be
/// removed are logged and skipped. Returns the written paths in lane id order.
///
/// # Errors
///
/// Returns an error if `dir` cannot be created or listed, or a lane artifact
/// cannot be written.
pub fn save_lanes(dir: &Path, table: &PointTable) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;
    clear_directory(dir)?;

    table
        .lane_ids()
        .into_iter()
        .map(|lane_id| -> Result<PathBuf> {
            let path = dir.join(format!("Lane_{lane_id}.bin"));
            write_artifact(&path, &table.lane_poses(lane_id))?;
            tracing::info!("Saved lane {lane_id} to {}", path.display());
            Ok(path)
        })
        .collect()
}

fn clear_directory(dir: &Path) -> Result<()> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list directory: {}", dir.display()))?;
    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                tracing::warn!("Failed to read entry in {}: {e}", dir.display());
                continue;
            }
        };
        let removed = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        if let Err(e) = removed {
            tracing::warn!("Failed to delete {}: {e}", path.display());
        }
    }
    Ok(())
}

/// Time-gated backup writer.
///
/// `on_commit` is called after every committed change. It writes a new
/// timestamped artifact only when at least `interval` has elapsed since the
/// last backup (or since the scheduler was created).
#[derive(Debug, Clone)]
pub struct BackupScheduler {
    dir: PathBuf,
    interval: Duration,
    last_backup: Instant,
    /// Number of artifacts written, appended to names so that two backups
    /// within the same second do not collide.
    written: u64,
}

impl BackupScheduler {
    /// Creates a scheduler whose interval starts counting now.
    pub fn new(dir: PathBuf, interval: Duration) -> Self {
        Self::starting_at(dir, interval, Instant::now())
    }

    /// Creates a scheduler whose interval starts counting at `start`.
    pub fn starting_at(dir: PathBuf, interval: Duration, start: Instant) -> Self {
        Self {
            dir,
            interval,
            last_backup: start,
            written: 0,
        }
    }

    /// Directory receiving backups.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Minimum time between two backups.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a backup would be written at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_backup) >= self.interval
    }

    /// Runs the scheduler against the current clock.
    ///
    /// # Errors
    ///
    /// Returns an error if a due backup cannot be written. The timer is not
    /// advanced in that case, so the next commit retries.
    pub fn on_commit(&mut self, table: &PointTable) -> Result<Option<PathBuf>> {
        self.on_commit_at(table, Instant::now(), Local::now())
    }

    /// Runs the scheduler at an explicit point in time.
    ///
    /// `now` drives the gating; `stamp` names the artifact. Returns the path
    /// written, or `None` when not due or the table is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if a due backup cannot be written.
    pub fn on_commit_at(
        &mut self,
        table: &PointTable,
        now: Instant,
        stamp: DateTime<Local>,
    ) -> Result<Option<PathBuf>> {
        if !self.is_due(now) {
            tracing::debug!("Backup skipped: interval not elapsed");
            return Ok(None);
        }

        let mut written = None;
        if !table.is_empty() {
            let path = self.dir.join(format!(
                "backup_{}_{:04}.bin",
                stamp.format("%Y%m%d_%H%M%S"),
                self.written
            ));
            write_artifact(&path, &table.poses()).context("backup failed")?;
            self.written += 1;
            tracing::info!("Auto-saved backup to {}", path.display());
            written = Some(path);
        }
        self.last_backup = now;
        Ok(written)
    }
}
