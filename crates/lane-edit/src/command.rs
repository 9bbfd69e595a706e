/// Line-oriented command driver for the lane editor.
///
/// Each non-blank line is one command; `#` starts a comment. Malformed
/// commands and rejected edits are reported on the output and the session
/// goes on.
use std::io::{BufRead, Write};
use std::str::FromStr;

use anyhow::{Context, Result};
use lane_edit_core::{EditOutcome, Endpoint, LaneEditor, LaneId, MergeRequest};

/// A parsed editor command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Add { x: f64, y: f64, lane_id: LaneId },
    Delete { positions: Vec<usize> },
    Relabel { lane_id: LaneId, positions: Vec<usize> },
    Above { position: usize, lane_id: LaneId },
    Below { position: usize, lane_id: LaneId },
    Merge(MergeRequest),
    Save,
    SaveLanes,
    Clear,
    Undo,
    Redo,
    Show,
    Lanes,
}

fn parse_arg<T>(word: Option<&str>, what: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let word = word.with_context(|| format!("missing {what}"))?;
    word.parse::<T>()
        .with_context(|| format!("invalid {what}: {word:?}"))
}

fn parse_positions<'a>(words: impl Iterator<Item = &'a str>) -> Result<Vec<usize>> {
    words
        .map(|w| parse_arg(Some(w), "position"))
        .collect()
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let name = words.next().context("empty command")?;
        let command = match name {
            "add" => Command::Add {
                x: parse_arg(words.next(), "x")?,
                y: parse_arg(words.next(), "y")?,
                lane_id: parse_arg(words.next(), "lane id")?,
            },
            "delete" => Command::Delete {
                positions: parse_positions(words.by_ref())?,
            },
            "relabel" => {
                let lane_id = parse_arg(words.next(), "lane id")?;
                let positions = parse_positions(words.by_ref())?;
                if positions.is_empty() {
                    anyhow::bail!("relabel needs at least one position");
                }
                Command::Relabel { lane_id, positions }
            }
            "above" => Command::Above {
                position: parse_arg(words.next(), "position")?,
                lane_id: parse_arg(words.next(), "lane id")?,
            },
            "below" => Command::Below {
                position: parse_arg(words.next(), "position")?,
                lane_id: parse_arg(words.next(), "lane id")?,
            },
            "merge" => {
                let lane_a = parse_arg(words.next(), "first lane id")?;
                let lane_b = parse_arg(words.next(), "second lane id")?;
                let point_a = parse_arg(words.next(), "first position")?;
                let point_b = parse_arg(words.next(), "second position")?;
                let end_a: Endpoint = words.next().context("missing first endpoint")?.parse()?;
                let end_b: Endpoint = words.next().context("missing second endpoint")?.parse()?;
                Command::Merge(MergeRequest {
                    lane_a,
                    lane_b,
                    point_a,
                    point_b,
                    end_a,
                    end_b,
                })
            }
            "save" => Command::Save,
            "save-lanes" => Command::SaveLanes,
            "clear" => Command::Clear,
            "undo" => Command::Undo,
            "redo" => Command::Redo,
            "show" => Command::Show,
            "lanes" => Command::Lanes,
            other => anyhow::bail!("unknown command {other:?}"),
        };
        if let Some(extra) = words.next() {
            anyhow::bail!("unexpected argument {extra:?} after {name}");
        }
        Ok(command)
    }
}

/// Runs every command read from `input`, reporting to `out`.
///
/// # Errors
///
/// Returns an error only if reading input or writing output fails.
pub fn run_script<R: BufRead, W: Write>(editor: &mut LaneEditor, input: R, out: &mut W) -> Result<()> {
    for (line_no, line) in input.lines().enumerate() {
        let line = line.context("failed to read command")?;
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(command) => execute(editor, &command, out)?,
            Err(e) => writeln!(out, "line {}: {e:#}", line_no + 1)?,
        }
    }
    Ok(())
}

/// Executes one command against the editor.
///
/// # Errors
///
/// Returns an error only if writing output fails.
pub fn execute<W: Write>(editor: &mut LaneEditor, command: &Command, out: &mut W) -> Result<()> {
    let result = match command {
        Command::Add { x, y, lane_id } => editor.add_point(*x, *y, *lane_id),
        Command::Delete { positions } => editor.delete_points(positions),
        Command::Relabel { lane_id, positions } => editor.change_ids(positions, *lane_id),
        Command::Above { position, lane_id } => editor.remove_points_above(*position, *lane_id),
        Command::Below { position, lane_id } => editor.remove_points_below(*position, *lane_id),
        Command::Merge(request) => editor.merge_lanes(request),
        Command::Clear => Ok(editor.clear()),
        Command::Undo => {
            match editor.undo() {
                Some(table) => writeln!(out, "undone ({} rows)", table.len())?,
                None => writeln!(out, "nothing to undo")?,
            }
            return Ok(());
        }
        Command::Redo => {
            match editor.redo() {
                Some(table) => writeln!(out, "redone ({} rows)", table.len())?,
                None => writeln!(out, "nothing to redo")?,
            }
            return Ok(());
        }
        Command::Save => {
            match editor.save() {
                Ok(path) => writeln!(out, "saved {}", path.display())?,
                Err(e) => writeln!(out, "save failed: {e:#}")?,
            }
            return Ok(());
        }
        Command::SaveLanes => {
            match editor.save_all_lanes() {
                Ok(paths) => writeln!(out, "saved {} lanes", paths.len())?,
                Err(e) => writeln!(out, "save failed: {e:#}")?,
            }
            return Ok(());
        }
        Command::Show => return show(editor, out),
        Command::Lanes => return lanes(editor, out),
    };

    match result {
        Ok(outcome) => {
            for warning in outcome.warnings() {
                writeln!(out, "warning: {warning}")?;
            }
            match outcome {
                EditOutcome::Applied { .. } => writeln!(out, "ok ({} rows)", editor.table().len())?,
                EditOutcome::Unchanged { .. } => writeln!(out, "unchanged")?,
            }
        }
        Err(e) => writeln!(out, "rejected: {e:#}")?,
    }
    Ok(())
}

fn show<W: Write>(editor: &LaneEditor, out: &mut W) -> Result<()> {
    for (pos, r) in editor.table().rows().iter().enumerate() {
        writeln!(
            out,
            "{pos}: x={:.3} y={:.3} yaw={:.4} index={} lane={}",
            r.x, r.y, r.yaw, r.index, r.lane_id
        )?;
    }
    Ok(())
}

fn lanes<W: Write>(editor: &LaneEditor, out: &mut W) -> Result<()> {
    let table = editor.table();
    for lane_id in table.lane_ids() {
        writeln!(
            out,
            "lane {lane_id} ({}): {} points",
            editor.names().name(lane_id),
            table.lane_positions(lane_id).len()
        )?;
    }
    Ok(())
}
