// Re-exports from lane-edit-mod-history, specialized to point tables.
pub use lane_edit_mod_history::SnapshotHistory;

use crate::table::PointTable;

/// Undo/redo history of whole point tables.
pub type TableHistory = SnapshotHistory<PointTable>;
