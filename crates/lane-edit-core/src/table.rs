//! Point table: the dense record store behind every lane.
//!
//! A `PointTable` is an ordered list of `PointRecord`s. Row order only
//! addresses rows; lanes are derived views built by filtering on `lane_id`
//! and sorting by `index`. Tables are immutable values from the editor's
//! point of view: every edit produces a new table.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Integer identifier of a lane.
pub type LaneId = u32;

/// Number of numeric columns in a raw row: x, y, yaw, frame_idx, index, lane_id.
pub const COLUMNS: usize = 6;

/// A single annotated point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointRecord {
    pub x: f64,
    pub y: f64,
    /// Heading in radians. Derived from neighbouring points, never authored.
    pub yaw: f64,
    /// Legacy duplicate of `index`; kept equal to it by every operation.
    pub frame_idx: usize,
    /// Position of this point within its lane (0-based).
    pub index: usize,
    pub lane_id: LaneId,
}

impl PointRecord {
    /// Creates a record with zero yaw and `frame_idx == index`.
    pub fn new(x: f64, y: f64, lane_id: LaneId, index: usize) -> Self {
        Self {
            x,
            y,
            yaw: 0.0,
            frame_idx: index,
            index,
            lane_id,
        }
    }

    /// Sets `index` and `frame_idx` together.
    pub fn set_index(&mut self, index: usize) {
        self.index = index;
        self.frame_idx = index;
    }

    /// The exported columns: `[x, y, yaw]`.
    pub fn pose(&self) -> [f64; 3] {
        [self.x, self.y, self.yaw]
    }

    /// The record as a raw 6-column row.
    pub fn to_row(&self) -> [f64; COLUMNS] {
        [
            self.x,
            self.y,
            self.yaw,
            self.frame_idx as f64,
            self.index as f64,
            f64::from(self.lane_id),
        ]
    }

    /// Parses a raw row, coercing the integer columns by truncation.
    fn from_row(row: &[f64], row_no: usize) -> Result<Self> {
        if row.len() != COLUMNS {
            anyhow::bail!(
                "expected rows with {COLUMNS} columns (x, y, yaw, frame_idx, index, lane_id), \
                 got {} in row {row_no}",
                row.len()
            );
        }
        let lane_id = coerce_integer(row[5], "lane_id", row_no)?;
        let lane_id = LaneId::try_from(lane_id)
            .with_context(|| format!("lane_id {lane_id} in row {row_no} is too large"))?;
        Ok(Self {
            x: row[0],
            y: row[1],
            yaw: row[2],
            frame_idx: coerce_integer(row[3], "frame_idx", row_no)?,
            index: coerce_integer(row[4], "index", row_no)?,
            lane_id,
        })
    }
}

/// Best-effort integer coercion: truncates toward zero, rejects values that
/// cannot name a row or lane.
fn coerce_integer(value: f64, column: &str, row_no: usize) -> Result<usize> {
    if !value.is_finite() || value < 0.0 || value > usize::MAX as f64 {
        anyhow::bail!("{column} value {value} in row {row_no} is not a non-negative integer");
    }
    Ok(value.trunc() as usize)
}

/// Ordered collection of point records.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointTable {
    rows: Vec<PointRecord>,
}

impl PointTable {
    /// Creates the canonical zero-row table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from raw numeric rows.
    ///
    /// # Errors
    ///
    /// Returns an error if any row does not have exactly six columns, an
    /// integer column cannot be coerced, or `frame_idx` differs from `index`.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let records = rows
            .iter()
            .enumerate()
            .map(|(row_no, row)| PointRecord::from_row(row.as_ref(), row_no))
            .collect::<Result<Vec<_>>>()?;
        Self::from_records(records)
    }

    /// Builds a table from typed records.
    ///
    /// # Errors
    ///
    /// Returns an error if any record has `frame_idx != index`.
    pub fn from_records(rows: Vec<PointRecord>) -> Result<Self> {
        if let Some((row_no, r)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.frame_idx != r.index)
        {
            anyhow::bail!(
                "frame_idx and index columns must be identical (row {row_no}: {} != {})",
                r.frame_idx,
                r.index
            );
        }
        Ok(Self { rows })
    }

    /// Wraps records produced by an edit operation.
    pub(crate) fn from_edited(rows: Vec<PointRecord>) -> Self {
        debug_assert!(rows.iter().all(|r| r.frame_idx == r.index));
        Self { rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows in global order.
    pub fn rows(&self) -> &[PointRecord] {
        &self.rows
    }

    /// The row at a global position.
    pub fn get(&self, position: usize) -> Option<&PointRecord> {
        self.rows.get(position)
    }

    /// Global positions of a lane's rows, in ascending global order.
    pub fn lane_positions(&self, lane_id: LaneId) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.lane_id == lane_id)
            .map(|(pos, _)| pos)
            .collect()
    }

    /// A lane as `(global position, record)` pairs sorted by `index`.
    ///
    /// The sort is stable, so rows sharing an `index` keep their global order.
    pub fn lane(&self, lane_id: LaneId) -> Vec<(usize, PointRecord)> {
        let mut lane: Vec<(usize, PointRecord)> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.lane_id == lane_id)
            .map(|(pos, r)| (pos, *r))
            .collect();
        lane.sort_by_key(|(_, r)| r.index);
        lane
    }

    /// Distinct lane ids present, ascending.
    pub fn lane_ids(&self) -> Vec<LaneId> {
        self.rows
            .iter()
            .map(|r| r.lane_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn lane_count(&self) -> usize {
        self.lane_ids().len()
    }

    /// Highest lane id present, if any.
    pub fn max_lane_id(&self) -> Option<LaneId> {
        self.rows.iter().map(|r| r.lane_id).max()
    }

    /// `index` values that occur more than once within a lane, ascending.
    pub fn duplicate_indices(&self, lane_id: LaneId) -> Vec<usize> {
        let mut seen = BTreeSet::new();
        let mut duplicates = BTreeSet::new();
        for r in self.rows.iter().filter(|r| r.lane_id == lane_id) {
            if !seen.insert(r.index) {
                duplicates.insert(r.index);
            }
        }
        duplicates.into_iter().collect()
    }

    /// The exported `[x, y, yaw]` columns of every row.
    pub fn poses(&self) -> Vec<[f64; 3]> {
        self.rows.iter().map(PointRecord::pose).collect()
    }

    /// The exported columns of one lane, in global row order.
    pub fn lane_poses(&self, lane_id: LaneId) -> Vec<[f64; 3]> {
        self.rows
            .iter()
            .filter(|r| r.lane_id == lane_id)
            .map(PointRecord::pose)
            .collect()
    }

    /// All rows as raw 6-column arrays.
    pub fn to_rows(&self) -> Vec<[f64; COLUMNS]> {
        self.rows.iter().map(PointRecord::to_row).collect()
    }
}

/// Display names of lanes, keyed by lane id.
///
/// Lanes without an explicit entry get a synthesized `Lane_{id}` name, so the
/// map stays sparse when lane ids are.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LaneNames {
    names: BTreeMap<LaneId, String>,
}

impl LaneNames {
    /// Creates an empty name map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the map from a list indexed by lane id.
    pub fn from_list<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: (0..)
                .zip(names)
                .map(|(id, name)| (id, name.into()))
                .collect(),
        }
    }

    /// Placeholder name for a lane without an explicit entry.
    pub fn placeholder(lane_id: LaneId) -> String {
        format!("Lane_{lane_id}")
    }

    /// The name of a lane, synthesized if missing.
    pub fn name(&self, lane_id: LaneId) -> Cow<'_, str> {
        match self.names.get(&lane_id) {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => Cow::Owned(Self::placeholder(lane_id)),
        }
    }

    /// Whether the lane has an explicit name.
    pub fn contains(&self, lane_id: LaneId) -> bool {
        self.names.contains_key(&lane_id)
    }

    /// Sets an explicit name.
    pub fn set(&mut self, lane_id: LaneId, name: impl Into<String>) {
        self.names.insert(lane_id, name.into());
    }

    /// Keeps only names that fit within `0..=max_lane_id`.
    ///
    /// With `None` (no lanes left) every entry is dropped.
    pub fn fit_to(&mut self, max_lane_id: Option<LaneId>) {
        match max_lane_id {
            Some(max) => self.names.retain(|id, _| *id <= max),
            None => self.names.clear(),
        }
    }

    /// Names for `0..=max_lane_id` as a dense list, placeholders filled in.
    pub fn to_list(&self, max_lane_id: LaneId) -> Vec<String> {
        (0..=max_lane_id)
            .map(|id| self.name(id).into_owned())
            .collect()
    }

    /// Number of explicit entries.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if no lane has an explicit name.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.names.clear();
    }
}
