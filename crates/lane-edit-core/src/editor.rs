//! The lane editor: edit operations bound to history and backups.
//!
//! A `LaneEditor` owns the snapshot history whose top is the current table.
//! Each public operation builds a candidate table with the functions in
//! [`crate::ops`], commits it on success, and then runs the backup hook.
//! Rejected operations are logged and returned as errors with the table
//! left as it was.

use std::path::PathBuf;

use anyhow::Result;
use lane_edit_config::EditorConfig;

use crate::durability::{self, BackupScheduler};
use crate::history::TableHistory;
use crate::ops::{self, Edit, LaneWarning, MergeRequest};
use crate::session::SessionSnapshot;
use crate::table::{LaneId, LaneNames, PointTable};

/// What happened to an accepted operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// A new table was committed to history.
    Applied { warnings: Vec<LaneWarning> },
    /// The operation had nothing to do; history is untouched.
    Unchanged { warnings: Vec<LaneWarning> },
}

impl EditOutcome {
    /// Whether a new table was committed.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// Consistency warnings raised while editing.
    pub fn warnings(&self) -> &[LaneWarning] {
        match self {
            Self::Applied { warnings } | Self::Unchanged { warnings } => warnings,
        }
    }
}

/// Single-session editor over a point table.
pub struct LaneEditor {
    history: TableHistory,
    names: LaneNames,
    backups: BackupScheduler,
    config: EditorConfig,
}

impl std::fmt::Debug for LaneEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaneEditor")
            .field("rows", &self.table().len())
            .field("history", &self.history)
            .field("backups", &self.backups)
            .finish_non_exhaustive()
    }
}

impl LaneEditor {
    /// Creates an editor whose history baseline is `table`.
    pub fn new(table: PointTable, names: LaneNames, config: EditorConfig) -> Self {
        let backups = BackupScheduler::new(config.backup_path(), config.backup_interval());
        tracing::info!("Lane editor initialized with {} points", table.len());
        Self {
            history: TableHistory::new(table),
            names,
            backups,
            config,
        }
    }

    /// Creates an editor from raw 6-column rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows fail construction-time validation.
    pub fn from_rows<R: AsRef<[f64]>>(
        rows: &[R],
        names: LaneNames,
        config: EditorConfig,
    ) -> Result<Self> {
        let table = PointTable::from_rows(rows)?;
        Ok(Self::new(table, names, config))
    }

    /// Resumes editing from a stored session.
    pub fn from_snapshot(snapshot: SessionSnapshot, config: EditorConfig) -> Self {
        Self::new(snapshot.table, snapshot.names, config)
    }

    /// Replaces the backup scheduler (e.g. to control its clock in tests).
    pub fn with_backup_scheduler(mut self, backups: BackupScheduler) -> Self {
        self.backups = backups;
        self
    }

    /// The current table.
    pub fn table(&self) -> &PointTable {
        self.history.current()
    }

    /// Lane display names.
    pub fn names(&self) -> &LaneNames {
        &self.names
    }

    /// Sets the display name of a lane.
    pub fn set_lane_name(&mut self, lane_id: LaneId, name: impl Into<String>) {
        self.names.set(lane_id, name);
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The state needed to resume this session later.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            table: self.table().clone(),
            names: self.names.clone(),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Number of tables in the history, current one included.
    pub fn history_depth(&self) -> usize {
        self.history.depth()
    }

    pub fn redo_depth(&self) -> usize {
        self.history.redo_depth()
    }

    /// Appends a point to `lane_id` at the end of the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinates are not finite.
    pub fn add_point(&mut self, x: f64, y: f64, lane_id: LaneId) -> Result<EditOutcome> {
        let edit = ops::add_point(self.table(), x, y, lane_id);
        let outcome = self.commit("Add point", edit)?;
        tracing::info!("Added point: ({x:.2}, {y:.2}, lane_id={lane_id})");
        Ok(outcome)
    }

    /// Deletes rows by global position and renumbers the rest globally.
    ///
    /// # Errors
    ///
    /// Returns an error if any position is out of bounds.
    pub fn delete_points(&mut self, positions: &[usize]) -> Result<EditOutcome> {
        let edit = ops::delete_points(self.table(), positions);
        let outcome = self.commit("Delete points", edit)?;
        if outcome.is_applied() {
            tracing::info!("Deleted {} points", positions.len());
        }
        Ok(outcome)
    }

    /// Moves rows to `new_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if any position is out of bounds.
    pub fn change_ids(&mut self, positions: &[usize], new_id: LaneId) -> Result<EditOutcome> {
        let edit = ops::change_ids(self.table(), positions, new_id);
        let outcome = self.commit("Change ids", edit)?;
        if outcome.is_applied() {
            tracing::info!(
                "Changed lane IDs for {} points to {new_id}",
                positions.len()
            );
        }
        Ok(outcome)
    }

    /// Removes the lane's points ranked before `position` in index order.
    ///
    /// # Errors
    ///
    /// Returns an error if `position` is out of bounds or not in `lane_id`.
    pub fn remove_points_above(&mut self, position: usize, lane_id: LaneId) -> Result<EditOutcome> {
        let before = self.table().len();
        let edit = ops::remove_points_above(self.table(), position, lane_id);
        let outcome = self.commit("Remove points above", edit)?;
        tracing::info!(
            "Removed {} points above position {position} in lane {lane_id}",
            before - self.table().len()
        );
        Ok(outcome)
    }

    /// Removes the lane's points at global positions `>= position`.
    ///
    /// # Errors
    ///
    /// Returns an error if `position` is out of bounds or the lane is empty.
    pub fn remove_points_below(&mut self, position: usize, lane_id: LaneId) -> Result<EditOutcome> {
        let before = self.table().len();
        let edit = ops::remove_points_below(self.table(), position, lane_id);
        let outcome = self.commit("Remove points below", edit)?;
        tracing::info!(
            "Removed {} points below position {position} in lane {lane_id}",
            before - self.table().len()
        );
        Ok(outcome)
    }

    /// Merges `lane_b` into `lane_a`, joining the designated endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if the request does not describe two non-empty,
    /// distinct lanes containing their designated points.
    pub fn merge_lanes(&mut self, request: &MergeRequest) -> Result<EditOutcome> {
        let edit = ops::merge_lanes(self.table(), request);
        let outcome = self.commit("Merge lanes", edit)?;
        if outcome.is_applied() {
            self.names.fit_to(self.history.current().max_lane_id());
            tracing::info!("Merged lane {} into lane {}", request.lane_b, request.lane_a);
        }
        Ok(outcome)
    }

    /// Undoes the last committed change.
    ///
    /// Returns the table that is current afterwards, or `None` when only the
    /// baseline is left.
    pub fn undo(&mut self) -> Option<&PointTable> {
        if self.history.undo().is_none() {
            tracing::info!("Nothing to undo");
            return None;
        }
        self.after_commit();
        Some(self.history.current())
    }

    /// Redoes the last undone change.
    ///
    /// Returns the table that is current afterwards, or `None` when there is
    /// nothing to redo.
    pub fn redo(&mut self) -> Option<&PointTable> {
        if self.history.redo().is_none() {
            tracing::info!("Nothing to redo");
            return None;
        }
        self.after_commit();
        Some(self.history.current())
    }

    /// Drops the table, lane names, and all history but a new empty baseline.
    pub fn clear(&mut self) -> EditOutcome {
        self.history.reset(PointTable::new());
        self.names.clear();
        self.after_commit();
        tracing::info!("Cleared all data");
        EditOutcome::Applied {
            warnings: Vec::new(),
        }
    }

    /// Writes `[x, y, yaw]` of the whole table to the working file.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact cannot be written.
    pub fn save(&mut self) -> Result<PathBuf> {
        let path = self.config.working_file_path();
        if let Err(e) = durability::save_table(&path, self.table()) {
            tracing::warn!("Error saving data: {e:#}");
            return Err(e);
        }
        tracing::info!("Saved x, y, yaw to {}", path.display());
        self.after_commit();
        Ok(path)
    }

    /// Writes one artifact per lane into the lanes directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or an artifact cannot be written.
    pub fn save_all_lanes(&self) -> Result<Vec<PathBuf>> {
        durability::save_lanes(&self.config.lanes_path(), self.table()).inspect_err(|e| {
            tracing::warn!("Error saving lanes: {e:#}");
        })
    }

    /// Commits a candidate table, or logs and returns the rejection.
    fn commit(&mut self, action: &str, edit: Result<Edit>) -> Result<EditOutcome> {
        let Edit { table, warnings } = match edit {
            Ok(edit) => edit,
            Err(e) => {
                tracing::warn!("{action} rejected: {e:#}");
                return Err(e);
            }
        };
        for warning in &warnings {
            tracing::warn!("{action}: {warning}, using first match");
        }
        match table {
            Some(table) => {
                self.history.push(table);
                self.after_commit();
                Ok(EditOutcome::Applied { warnings })
            }
            None => Ok(EditOutcome::Unchanged { warnings }),
        }
    }

    /// Post-commit hook: runs the backup scheduler. Failures never undo an edit.
    fn after_commit(&mut self) {
        if let Err(e) = self.backups.on_commit(self.history.current()) {
            tracing::warn!("Backup failed: {e:#}");
        }
    }
}
