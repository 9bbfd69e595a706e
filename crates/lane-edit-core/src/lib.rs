//! Editing engine for lane annotations.
//!
//! Lanes are ordered polylines stored as rows of a `PointTable`. The
//! `LaneEditor` applies edits (add, delete, relabel, truncate, merge) as
//! whole-table snapshots with undo/redo, and exports `[x, y, yaw]` artifacts
//! on explicit saves and on a timed backup schedule.

pub mod durability;
pub mod editor;
pub mod history;
pub mod ops;
pub mod session;
pub mod table;

pub use durability::{read_artifact, BackupScheduler};
pub use editor::{EditOutcome, LaneEditor};
pub use ops::{Endpoint, LaneWarning, MergeRequest};
pub use session::{SessionSnapshot, SessionStore};
pub use table::{LaneId, LaneNames, PointRecord, PointTable, COLUMNS};
