mod command;

use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use lane_edit_config::{resolve_data_dir, EditorConfig};
use lane_edit_core::{LaneEditor, LaneNames, PointTable, SessionStore};

/// Interactive lane annotation editor.
#[derive(Parser, Debug)]
#[command(name = "lane-edit", version, about)]
struct Cli {
    /// Config file (defaults to lane-edit.json next to the executable).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Initial table: JSON array of [x, y, yaw, frame_idx, index, lane_id] rows.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Lane display names: JSON array of strings indexed by lane id.
    #[arg(long)]
    names: Option<PathBuf>,

    /// Command script to run; commands are read from stdin when omitted.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Start without restoring the last session.
    #[arg(long = "no-session")]
    no_session: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting lane-edit");

    let config_path = cli.config.clone().unwrap_or_else(EditorConfig::config_path);
    let config = EditorConfig::load_or_create(&config_path);

    let store = match SessionStore::open(&SessionStore::session_path(&resolve_data_dir())) {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::warn!("Session persistence unavailable: {e:#}");
            None
        }
    };

    let mut editor = build_editor(&cli, config, store.as_ref())?;

    let input: Box<dyn BufRead> = match &cli.script {
        Some(path) => Box::new(std::io::BufReader::new(
            std::fs::File::open(path)
                .with_context(|| format!("failed to open script: {}", path.display()))?,
        )),
        None => Box::new(std::io::stdin().lock()),
    };
    command::run_script(&mut editor, input, &mut std::io::stdout().lock())?;

    if let Some(store) = &store {
        if let Err(e) = store.save_snapshot(&editor.snapshot()) {
            tracing::warn!("Failed to save session: {e:#}");
        }
    }

    Ok(())
}

/// Builds the editor from `--input`, the stored session, or an empty table.
fn build_editor(cli: &Cli, config: EditorConfig, store: Option<&SessionStore>) -> Result<LaneEditor> {
    let names = match &cli.names {
        Some(path) => read_names(path)?,
        None => LaneNames::new(),
    };

    if let Some(path) = &cli.input {
        let rows = read_rows(path)?;
        return LaneEditor::from_rows(&rows, names, config)
            .with_context(|| format!("invalid input table: {}", path.display()));
    }

    if config.restore_session && !cli.no_session {
        if let Some(store) = store {
            match store.load_snapshot() {
                Ok(Some(mut snapshot)) => {
                    tracing::info!("Restored session with {} points", snapshot.table.len());
                    if cli.names.is_some() {
                        snapshot.names = names;
                    }
                    return Ok(LaneEditor::from_snapshot(snapshot, config));
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Failed to restore session: {e:#}"),
            }
        }
    }

    Ok(LaneEditor::new(PointTable::new(), names, config))
}

fn read_rows(path: &Path) -> Result<Vec<Vec<f64>>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read input: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse input rows: {}", path.display()))
}

fn read_names(path: &Path) -> Result<LaneNames> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read names: {}", path.display()))?;
    let names: Vec<String> = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse lane names: {}", path.display()))?;
    Ok(LaneNames::from_list(names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn default_cli() -> Cli {
        Cli {
            config: None,
            input: None,
            names: None,
            script: None,
            no_session: false,
        }
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from([
            "lane-edit",
            "--input",
            "rows.json",
            "--script",
            "edits.txt",
            "--no-session",
        ]);
        assert_eq!(cli.input, Some(PathBuf::from("rows.json")));
        assert_eq!(cli.script, Some(PathBuf::from("edits.txt")));
        assert!(cli.no_session);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_build_editor_from_input_files() {
        let dir = TempDir::new().expect("create temp dir");
        let rows = dir.path().join("rows.json");
        let names = dir.path().join("names.json");
        std::fs::write(&rows, "[[0,0,0,0,0,1],[1,0,0,1,1,1]]").expect("write");
        std::fs::write(&names, r#"["left.json", "right.json"]"#).expect("write");

        let cli = Cli {
            input: Some(rows),
            names: Some(names),
            ..default_cli()
        };
        let editor =
            build_editor(&cli, EditorConfig::rooted_at(dir.path()), None).expect("editor");
        assert_eq!(editor.table().len(), 2);
        assert_eq!(editor.names().name(1), "right.json");
    }

    #[test]
    fn test_build_editor_rejects_bad_input() {
        let dir = TempDir::new().expect("create temp dir");
        let rows = dir.path().join("rows.json");
        std::fs::write(&rows, "[[0,0,0,0,0]]").expect("write");

        let cli = Cli {
            input: Some(rows),
            ..default_cli()
        };
        assert!(build_editor(&cli, EditorConfig::rooted_at(dir.path()), None).is_err());
    }

    #[test]
    fn test_build_editor_restores_session() {
        let dir = TempDir::new().expect("create temp dir");
        let store = SessionStore::open(&dir.path().join("s.redb")).expect("open");
        let config = EditorConfig::rooted_at(dir.path());

        let mut editor = LaneEditor::new(PointTable::new(), LaneNames::new(), config.clone());
        editor.add_point(3.0, 4.0, 2).expect("add");
        store.save_snapshot(&editor.snapshot()).expect("save");

        let restored = build_editor(&default_cli(), config.clone(), Some(&store)).expect("editor");
        assert_eq!(restored.table(), editor.table());

        let fresh = Cli {
            no_session: true,
            ..default_cli()
        };
        let empty = build_editor(&fresh, config, Some(&store)).expect("editor");
        assert!(empty.table().is_empty());
    }
}
