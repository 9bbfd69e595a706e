// Integration tests for the lane editor.
//
// These tests drive the public operation surface the way an annotation UI
// does, checking table invariants, undo/redo round trips, and the files the
// editor leaves on disk.

use std::f64::consts::FRAC_PI_2;
use std::path::Path;
use std::time::Duration;

use lane_edit_config::EditorConfig;
use lane_edit_core::{
    read_artifact, BackupScheduler, EditOutcome, Endpoint, LaneEditor, LaneNames, LaneWarning,
    MergeRequest, PointTable, SessionStore,
};

fn rows(points: &[(f64, f64, usize, u32)]) -> Vec<[f64; 6]> {
    points
        .iter()
        .map(|&(x, y, idx, lane)| [x, y, 0.0, idx as f64, idx as f64, f64::from(lane)])
        .collect()
}

fn editor_in(dir: &Path, points: &[(f64, f64, usize, u32)]) -> LaneEditor {
    LaneEditor::from_rows(
        &rows(points),
        LaneNames::from_list(["lane0.json", "lane1.json"]),
        EditorConfig::rooted_at(dir),
    )
    .expect("editor")
}

fn assert_invariants(table: &PointTable) {
    for r in table.rows() {
        assert_eq!(r.frame_idx, r.index, "frame_idx must equal index");
    }
    for row in table.to_rows() {
        assert_eq!(row.len(), 6);
    }
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

// ── Construction ───────────────────────────────────────────────────────

#[test]
fn test_construction_rejects_bad_shape_and_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let config = EditorConfig::rooted_at(dir.path());

    let narrow = vec![vec![0.0, 0.0, 0.0, 0.0, 0.0]];
    assert!(LaneEditor::from_rows(&narrow, LaneNames::new(), config.clone()).is_err());

    let mismatch = vec![vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0]];
    assert!(LaneEditor::from_rows(&mismatch, LaneNames::new(), config.clone()).is_err());

    let empty: Vec<Vec<f64>> = Vec::new();
    let ed = LaneEditor::from_rows(&empty, LaneNames::new(), config).unwrap();
    assert!(ed.table().is_empty());
    assert_eq!(ed.history_depth(), 1);
}

// ── Invariants & round trips ───────────────────────────────────────────

#[test]
fn test_every_operation_round_trips_through_undo_redo() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor_in(
        dir.path(),
        &[
            (0.0, 0.0, 0, 0),
            (1.0, 0.0, 1, 0),
            (2.0, 0.0, 2, 0),
            (0.0, 5.0, 0, 1),
            (1.0, 5.0, 1, 1),
        ],
    );

    fn add(ed: &mut LaneEditor) -> anyhow::Result<EditOutcome> {
        ed.add_point(3.0, 0.0, 0)
    }
    fn relabel(ed: &mut LaneEditor) -> anyhow::Result<EditOutcome> {
        ed.change_ids(&[4], 2)
    }
    fn below(ed: &mut LaneEditor) -> anyhow::Result<EditOutcome> {
        ed.remove_points_below(4, 2)
    }
    fn above(ed: &mut LaneEditor) -> anyhow::Result<EditOutcome> {
        ed.remove_points_above(1, 0)
    }
    fn merge(ed: &mut LaneEditor) -> anyhow::Result<EditOutcome> {
        ed.merge_lanes(&MergeRequest {
            lane_a: 0,
            lane_b: 1,
            point_a: 0,
            point_b: 2,
            end_a: Endpoint::Start,
            end_b: Endpoint::End,
        })
    }
    fn delete(ed: &mut LaneEditor) -> anyhow::Result<EditOutcome> {
        ed.delete_points(&[0])
    }

    type Op = fn(&mut LaneEditor) -> anyhow::Result<EditOutcome>;
    let ops: [Op; 6] = [add, relabel, below, above, merge, delete];

    for op in ops {
        let before = ed.table().clone();
        let outcome = op(&mut ed).expect("operation accepted");
        assert!(outcome.is_applied());
        let after = ed.table().clone();
        assert_invariants(&after);
        assert_ne!(before, after);

        assert_eq!(ed.undo().expect("undo"), &before);
        assert_eq!(ed.redo().expect("redo"), &after);
        assert!(!ed.can_redo());
    }
}

#[test]
fn test_undo_redo_idempotence_on_empty_stacks() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor_in(dir.path(), &[(0.0, 0.0, 0, 0)]);
    let before = ed.table().clone();

    assert!(ed.undo().is_none());
    assert!(ed.redo().is_none());
    assert_eq!(ed.table(), &before);
    assert_eq!(ed.history_depth(), 1);
}

#[test]
fn test_new_edit_clears_redo() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor_in(dir.path(), &[(0.0, 0.0, 0, 0)]);
    ed.add_point(1.0, 0.0, 0).unwrap();
    ed.add_point(2.0, 0.0, 0).unwrap();
    ed.undo();
    assert_eq!(ed.redo_depth(), 1);

    ed.add_point(9.0, 9.0, 0).unwrap();
    assert_eq!(ed.redo_depth(), 0);
    assert_eq!(ed.history_depth(), 3);
}

#[test]
fn test_deletion_renumbers_every_subset() {
    let dir = tempfile::tempdir().unwrap();
    let points: Vec<(f64, f64, usize, u32)> =
        (0..6).map(|i| (i as f64, 0.0, i, (i % 2) as u32)).collect();

    // Every non-empty subset of 6 rows.
    for mask in 1u32..(1 << 6) {
        let mut ed = editor_in(dir.path(), &points);
        let doomed: Vec<usize> = (0..6).filter(|i| mask & (1 << i) != 0).collect();
        ed.delete_points(&doomed).unwrap();

        let indices: Vec<usize> = ed.table().rows().iter().map(|r| r.index).collect();
        let expected: Vec<usize> = (0..6 - doomed.len()).collect();
        assert_eq!(indices, expected, "mask {mask:06b}");
        assert_invariants(ed.table());
    }
}

// ── Merge ──────────────────────────────────────────────────────────────

#[test]
fn test_merge_example() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor_in(
        dir.path(),
        &[
            (0.0, 0.0, 0, 1),
            (1.0, 0.0, 1, 1),
            (2.0, 0.0, 2, 1),
            (2.0, 1.0, 0, 2),
            (2.0, 2.0, 1, 2),
        ],
    );

    let outcome = ed
        .merge_lanes(&MergeRequest {
            lane_a: 1,
            lane_b: 2,
            point_a: 2,
            point_b: 3,
            end_a: Endpoint::End,
            end_b: Endpoint::Start,
        })
        .unwrap();
    assert_eq!(
        outcome,
        EditOutcome::Applied {
            warnings: Vec::new()
        }
    );

    let t = ed.table();
    let coords: Vec<(f64, f64)> = t.rows().iter().map(|r| (r.x, r.y)).collect();
    assert_eq!(
        coords,
        vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (2.0, 1.0), (2.0, 2.0)]
    );
    assert!(t.rows().iter().all(|r| r.lane_id == 1));
    let indices: Vec<usize> = t.rows().iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    assert!(t.rows()[0].yaw.abs() < 1e-12);
    assert!((t.rows()[3].yaw - FRAC_PI_2).abs() < 1e-12);
    assert_invariants(t);
}

#[test]
fn test_merge_with_empty_lane_fails_and_keeps_table() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor_in(dir.path(), &[(0.0, 0.0, 0, 1), (1.0, 0.0, 1, 1)]);
    let before = ed.table().clone();

    let result = ed.merge_lanes(&MergeRequest {
        lane_a: 1,
        lane_b: 7,
        point_a: 1,
        point_b: 0,
        end_a: Endpoint::End,
        end_b: Endpoint::Start,
    });
    assert!(result.is_err());
    assert_eq!(ed.table(), &before);
    assert_eq!(ed.history_depth(), 1);
}

#[test]
fn test_merge_surfaces_duplicate_warning() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor_in(
        dir.path(),
        &[(0.0, 0.0, 0, 1), (1.0, 0.0, 0, 1), (4.0, 4.0, 0, 2)],
    );
    let outcome = ed
        .merge_lanes(&MergeRequest {
            lane_a: 1,
            lane_b: 2,
            point_a: 1,
            point_b: 2,
            end_a: Endpoint::End,
            end_b: Endpoint::Start,
        })
        .unwrap();
    assert!(outcome.is_applied());
    assert_eq!(
        outcome.warnings(),
        &[LaneWarning::DuplicateIndices {
            lane_id: 1,
            indices: vec![0]
        }]
    );
}

// ── Truncation ─────────────────────────────────────────────────────────

#[test]
fn test_remove_below_example() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor_in(
        dir.path(),
        &[
            (0.0, 0.0, 0, 3),
            (1.0, 0.0, 1, 3),
            (2.0, 0.0, 2, 3),
            (3.0, 0.0, 3, 3),
        ],
    );
    ed.remove_points_below(1, 3).unwrap();

    let t = ed.table();
    assert_eq!(t.len(), 1);
    assert_eq!(t.rows()[0].index, 0);
    assert_eq!(t.rows()[0].x, 0.0);
}

#[test]
fn test_remove_above_rejects_lane_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor_in(dir.path(), &[(0.0, 0.0, 0, 3), (1.0, 0.0, 0, 4)]);
    assert!(ed.remove_points_above(1, 3).is_err());
    assert_eq!(ed.history_depth(), 1);
}

// ── Durability ─────────────────────────────────────────────────────────

#[test]
fn test_backups_gated_by_interval() {
    let dir = tempfile::tempdir().unwrap();
    let backup_dir = dir.path().join("workspace-Backup");

    // Default interval: two quick edits produce no backup at all.
    let mut ed = editor_in(dir.path(), &[(0.0, 0.0, 0, 0)]);
    ed.add_point(1.0, 0.0, 0).unwrap();
    ed.add_point(2.0, 0.0, 0).unwrap();
    assert_eq!(count_files(&backup_dir), 0);

    // Zero interval: every committed change is backed up.
    let mut ed = editor_in(dir.path(), &[(0.0, 0.0, 0, 0)])
        .with_backup_scheduler(BackupScheduler::new(backup_dir.clone(), Duration::ZERO));
    ed.add_point(1.0, 0.0, 0).unwrap();
    ed.add_point(2.0, 0.0, 0).unwrap();
    ed.undo();
    assert_eq!(count_files(&backup_dir), 3);
}

#[test]
fn test_backup_failure_does_not_abort_edit() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"x").unwrap();

    let mut ed = editor_in(dir.path(), &[(0.0, 0.0, 0, 0)])
        .with_backup_scheduler(BackupScheduler::new(blocker, Duration::ZERO));
    assert!(ed.add_point(1.0, 0.0, 0).unwrap().is_applied());
    assert_eq!(ed.table().len(), 2);
}

#[test]
fn test_save_and_save_all_lanes() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor_in(
        dir.path(),
        &[(0.0, 0.0, 0, 0), (5.0, 5.0, 0, 2), (1.0, 0.0, 1, 0)],
    );

    let working = ed.save().unwrap();
    assert_eq!(read_artifact(&working).unwrap().len(), 3);

    let lanes = ed.save_all_lanes().unwrap();
    assert_eq!(lanes.len(), 2);
    assert!(lanes[0].ends_with("workspace-Temp/Lane_0.bin"));
    assert!(lanes[1].ends_with("workspace-Temp/Lane_2.bin"));
    assert_eq!(
        read_artifact(&lanes[0]).unwrap(),
        vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]
    );

    // Saving an empty table still produces an artifact.
    ed.clear();
    let working = ed.save().unwrap();
    assert!(read_artifact(&working).unwrap().is_empty());
}

// ── Session ────────────────────────────────────────────────────────────

#[test]
fn test_session_resume_after_edits() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = SessionStore::session_path(dir.path());

    {
        let mut ed = editor_in(dir.path(), &[(0.0, 0.0, 0, 0)]);
        ed.add_point(1.0, 1.0, 1).unwrap();
        let store = SessionStore::open(&store_path).unwrap();
        store.save_snapshot(&ed.snapshot()).unwrap();
    }

    let store = SessionStore::open(&store_path).unwrap();
    let snapshot = store.load_snapshot().unwrap().expect("stored session");
    let mut ed = LaneEditor::from_snapshot(snapshot, EditorConfig::rooted_at(dir.path()));
    assert_eq!(ed.table().len(), 2);
    assert_eq!(ed.names().name(1), "lane1.json");
    // History starts over at the restored table.
    assert!(ed.undo().is_none());
}
