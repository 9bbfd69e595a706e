//! Edit operations over a `PointTable`.
//!
//! Every operation reads the current table and builds a candidate table; it
//! never mutates its input. A rejected operation returns an error and no
//! table, so the caller's state cannot be left half-edited.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use anyhow::Result;

use crate::table::{LaneId, PointRecord, PointTable};

/// A non-blocking consistency problem noticed while editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaneWarning {
    /// Some `index` values occur more than once within a lane. The edit went
    /// ahead using the first positional match.
    DuplicateIndices { lane_id: LaneId, indices: Vec<usize> },
}

impl fmt::Display for LaneWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateIndices { lane_id, indices } => {
                write!(f, "duplicate indices {indices:?} in lane {lane_id}")
            }
        }
    }
}

/// Result of an edit operation: a candidate table, or none for a no-op.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Edit {
    /// The new table, or `None` when there was nothing to change.
    pub table: Option<PointTable>,
    pub warnings: Vec<LaneWarning>,
}

impl Edit {
    fn changed(table: PointTable) -> Self {
        Self {
            table: Some(table),
            warnings: Vec::new(),
        }
    }

    fn unchanged() -> Self {
        Self::default()
    }

    fn with_warnings(mut self, warnings: Vec<LaneWarning>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Which end of a lane a merge point designates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    End,
}

impl FromStr for Endpoint {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "start" => Ok(Self::Start),
            "end" => Ok(Self::End),
            other => anyhow::bail!("unknown endpoint {other:?} (expected \"start\" or \"end\")"),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::End => "end",
        })
    }
}

/// Parameters of a lane merge.
///
/// `point_a`/`point_b` are global row positions inside `lane_a`/`lane_b`;
/// `end_a`/`end_b` say which end of its lane each point is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRequest {
    pub lane_a: LaneId,
    pub lane_b: LaneId,
    pub point_a: usize,
    pub point_b: usize,
    pub end_a: Endpoint,
    pub end_b: Endpoint,
}

/// Collects the duplicate-index warning for a lane, if any.
fn duplicate_warning(table: &PointTable, lane_id: LaneId) -> Option<LaneWarning> {
    let indices = table.duplicate_indices(lane_id);
    (!indices.is_empty()).then_some(LaneWarning::DuplicateIndices { lane_id, indices })
}

/// Appends a point at the end of the table.
///
/// The new row's `index`/`frame_idx` is the row count before insertion and
/// its yaw is zero.
///
/// # Errors
///
/// Returns an error if a coordinate is not finite.
pub fn add_point(table: &PointTable, x: f64, y: f64, lane_id: LaneId) -> Result<Edit> {
    if !x.is_finite() || !y.is_finite() {
        anyhow::bail!("point ({x}, {y}) has non-finite coordinates");
    }
    let mut rows = table.rows().to_vec();
    rows.push(PointRecord::new(x, y, lane_id, table.len()));
    Ok(Edit::changed(PointTable::from_edited(rows)))
}

/// Removes rows by global position and renumbers the rest.
///
/// Every remaining row gets `index = frame_idx =` its new global position.
/// Repeated positions count once. An empty `positions` is a no-op.
///
/// # Errors
///
/// Returns an error if any position is out of bounds; nothing is removed.
pub fn delete_points(table: &PointTable, positions: &[usize]) -> Result<Edit> {
    if positions.is_empty() {
        return Ok(Edit::unchanged());
    }
    check_positions(table, positions)?;

    let doomed: BTreeSet<usize> = positions.iter().copied().collect();
    let rows = table
        .rows()
        .iter()
        .enumerate()
        .filter(|(pos, _)| !doomed.contains(pos))
        .map(|(_, r)| *r)
        .enumerate()
        .map(|(new_pos, mut r)| {
            r.set_index(new_pos);
            r
        })
        .collect();
    Ok(Edit::changed(PointTable::from_edited(rows)))
}

/// Moves rows to another lane without touching anything else.
///
/// Indices of the source and destination lanes are left as they are, so
/// they may end up with gaps or duplicates.
///
/// # Errors
///
/// Returns an error if any position is out of bounds.
pub fn change_ids(table: &PointTable, positions: &[usize], new_id: LaneId) -> Result<Edit> {
    if positions.is_empty() {
        return Ok(Edit::unchanged());
    }
    check_positions(table, positions)?;

    let mut rows = table.rows().to_vec();
    for &pos in positions {
        rows[pos].lane_id = new_id;
    }
    Ok(Edit::changed(PointTable::from_edited(rows)))
}

/// Removes every point of a lane ranked before `position`.
///
/// The rank is taken in the lane's `index` order: `position` and everything
/// after it stay. Removal goes through [`delete_points`].
///
/// # Errors
///
/// Returns an error if `position` is out of bounds or not in `lane_id`.
pub fn remove_points_above(table: &PointTable, position: usize, lane_id: LaneId) -> Result<Edit> {
    match table.get(position) {
        Some(r) if r.lane_id == lane_id => {}
        _ => anyhow::bail!("invalid position {position} or lane mismatch for lane {lane_id}"),
    }

    let warnings: Vec<LaneWarning> = duplicate_warning(table, lane_id).into_iter().collect();
    let sorted: Vec<usize> = table.lane(lane_id).into_iter().map(|(pos, _)| pos).collect();
    let Some(rank) = sorted.iter().position(|&pos| pos == position) else {
        anyhow::bail!("position {position} not found in lane {lane_id}");
    };

    let edit = delete_points(table, &sorted[..rank])?;
    Ok(edit.with_warnings(warnings))
}

/// Removes every point of a lane whose global position is `>= position`.
///
/// Unlike [`remove_points_above`] this works on raw global positions, and
/// `position` itself does not have to belong to the lane.
///
/// # Errors
///
/// Returns an error if `position` is out of bounds or the lane is empty.
pub fn remove_points_below(table: &PointTable, position: usize, lane_id: LaneId) -> Result<Edit> {
    if position >= table.len() {
        anyhow::bail!("invalid position {position} for table of {} rows", table.len());
    }
    let lane = table.lane_positions(lane_id);
    if lane.is_empty() {
        anyhow::bail!("no points found in lane {lane_id}");
    }
    let doomed: Vec<usize> = lane.into_iter().filter(|&pos| pos >= position).collect();
    delete_points(table, &doomed)
}

/// Splices two lanes into one so that the designated endpoints meet.
///
/// The merged lane keeps `lane_a`'s id, gets fresh indices and recomputed
/// yaw, and is placed first; rows of every other lane follow unchanged.
///
/// # Errors
///
/// Returns an error if the lanes are the same, either lane is empty, or a
/// point does not belong to its lane.
pub fn merge_lanes(table: &PointTable, request: &MergeRequest) -> Result<Edit> {
    let MergeRequest {
        lane_a,
        lane_b,
        point_a,
        point_b,
        end_a,
        end_b,
    } = *request;

    if table.is_empty() {
        anyhow::bail!("no data to merge");
    }
    if lane_a == lane_b {
        anyhow::bail!("cannot merge lane {lane_a} with itself");
    }
    let positions_a = table.lane_positions(lane_a);
    let positions_b = table.lane_positions(lane_b);
    if positions_a.is_empty() || positions_b.is_empty() {
        anyhow::bail!("one or both lanes ({lane_a}, {lane_b}) are empty");
    }

    let warnings: Vec<LaneWarning> = [lane_a, lane_b]
        .into_iter()
        .filter_map(|lane| duplicate_warning(table, lane))
        .collect();

    // The rank comes from global order while slicing uses index order.
    let rank_a = local_rank(&positions_a, point_a, lane_a)?;
    // point_b only has to belong to lane_b; lane_b is always taken whole.
    local_rank(&positions_b, point_b, lane_b)?;

    let sorted_a: Vec<PointRecord> = table.lane(lane_a).into_iter().map(|(_, r)| r).collect();
    let sorted_b: Vec<PointRecord> = table.lane(lane_b).into_iter().map(|(_, r)| r).collect();

    let part_a = match end_a {
        Endpoint::End => &sorted_a[..=rank_a],
        Endpoint::Start => &sorted_a[rank_a..],
    };
    let part_b: Vec<PointRecord> = match (end_a, end_b) {
        (Endpoint::End, Endpoint::Start) | (Endpoint::Start, Endpoint::End) => sorted_b,
        (Endpoint::Start, Endpoint::Start) | (Endpoint::End, Endpoint::End) => {
            sorted_b.into_iter().rev().collect()
        }
    };

    let mut merged: Vec<PointRecord> = part_a.iter().copied().chain(part_b).collect();
    for (i, r) in merged.iter_mut().enumerate() {
        r.lane_id = lane_a;
        r.set_index(i);
    }
    recompute_yaw(&mut merged);

    let others = table
        .rows()
        .iter()
        .filter(|r| r.lane_id != lane_a && r.lane_id != lane_b)
        .copied();
    merged.extend(others);

    Ok(Edit::changed(PointTable::from_edited(merged)).with_warnings(warnings))
}

/// Points each row's yaw at its successor; the last row repeats the
/// second-to-last heading (zero for a single point).
pub fn recompute_yaw(points: &mut [PointRecord]) {
    let n = points.len();
    for i in 0..n.saturating_sub(1) {
        let dx = points[i + 1].x - points[i].x;
        let dy = points[i + 1].y - points[i].y;
        points[i].yaw = dy.atan2(dx);
    }
    if let Some(last) = n.checked_sub(1) {
        points[last].yaw = if n > 1 { points[last - 1].yaw } else { 0.0 };
    }
}

/// Rank of `point` within a lane's global-position ordering.
fn local_rank(positions: &[usize], point: usize, lane_id: LaneId) -> Result<usize> {
    positions
        .iter()
        .position(|&pos| pos == point)
        .ok_or_else(|| anyhow::anyhow!("position {point} is not part of lane {lane_id}"))
}

fn check_positions(table: &PointTable, positions: &[usize]) -> Result<()> {
    if let Some(bad) = positions.iter().find(|&&pos| pos >= table.len()) {
        anyhow::bail!(
            "position {bad} out of bounds for table of {} rows",
            table.len()
        );
    }
    Ok(())
}
