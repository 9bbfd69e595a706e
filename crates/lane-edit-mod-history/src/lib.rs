/// Undo/redo history built from full-state snapshots.
///
/// Provides a `SnapshotHistory` that keeps every committed state of a value
/// in memory, oldest first, together with a redo stack of undone states.
/// The history is never empty: it always holds at least the baseline state
/// it was created (or last reset) with.
pub mod manager;

pub use manager::SnapshotHistory;
