/// Editor configuration: load, save, and sanitize.
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_BACKUP_DIR: &str = "workspace-Backup";
const DEFAULT_LANES_DIR: &str = "workspace-Temp";
const DEFAULT_WORKING_FILE: &str = "WorkingLane.bin";

/// Seconds between two timed backups.
const DEFAULT_BACKUP_INTERVAL_SECS: u64 = 300;

/// Top-level editor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Base directory for every relative path below. Empty = current directory.
    pub working_dir: String,
    /// Directory receiving timestamped backup artifacts.
    pub backup_dir: String,
    /// Directory receiving one artifact per lane on "save all lanes".
    pub lanes_dir: String,
    /// File name of the explicit save artifact (overwritten on every save).
    pub working_file: String,
    /// Minimum number of seconds between two timed backups.
    pub backup_interval_secs: u64,
    /// Whether to reload the last working table on startup.
    pub restore_session: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            working_dir: String::new(),
            backup_dir: DEFAULT_BACKUP_DIR.to_string(),
            lanes_dir: DEFAULT_LANES_DIR.to_string(),
            working_file: DEFAULT_WORKING_FILE.to_string(),
            backup_interval_secs: DEFAULT_BACKUP_INTERVAL_SECS,
            restore_session: true,
        }
    }
}

impl EditorConfig {
    /// Returns the config file path: exe directory + `lane-edit.json`.
    pub fn config_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|d| d.join("lane-edit.json")))
            .unwrap_or_else(|| PathBuf::from("lane-edit.json"))
    }

    /// Creates a config whose every output lands under `dir`.
    pub fn rooted_at(dir: &Path) -> Self {
        Self {
            working_dir: dir.to_string_lossy().into_owned(),
            ..Self::default()
        }
    }

    /// Loads config from `path`, creating a default file if it doesn't exist.
    /// Returns defaults on any error (missing file, parse error, etc.).
    pub fn load_or_create(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => match serde_json::from_str::<EditorConfig>(&contents) {
                    Ok(mut config) => {
                        config.sanitize();
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {}: {e}", path.display());
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {}: {e}", path.display());
                }
            }
            // Return defaults on error (don't overwrite broken file)
            Self::default()
        } else {
            let config = Self::default();
            if let Err(e) = config.save(path) {
                tracing::warn!("Failed to create default config at {}: {e}", path.display());
            }
            config
        }
    }

    /// Saves config to `path` as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Resets blank names to their defaults.
    pub fn sanitize(&mut self) {
        if self.backup_dir.trim().is_empty() {
            self.backup_dir = DEFAULT_BACKUP_DIR.to_string();
        }
        if self.lanes_dir.trim().is_empty() {
            self.lanes_dir = DEFAULT_LANES_DIR.to_string();
        }
        if self.working_file.trim().is_empty() {
            self.working_file = DEFAULT_WORKING_FILE.to_string();
        }
    }

    /// Minimum time between two timed backups.
    pub fn backup_interval(&self) -> Duration {
        Duration::from_secs(self.backup_interval_secs)
    }

    /// Directory for timestamped backups, resolved against `working_dir`.
    pub fn backup_path(&self) -> PathBuf {
        self.resolve(&self.backup_dir)
    }

    /// Directory for per-lane artifacts, resolved against `working_dir`.
    pub fn lanes_path(&self) -> PathBuf {
        self.resolve(&self.lanes_dir)
    }

    /// Path of the explicit save artifact, resolved against `working_dir`.
    pub fn working_file_path(&self) -> PathBuf {
        self.resolve(&self.working_file)
    }

    /// Joins a relative path onto `working_dir`; absolute paths pass through.
    fn resolve(&self, value: &str) -> PathBuf {
        let p = PathBuf::from(value);
        if p.is_absolute() || self.working_dir.is_empty() {
            p
        } else {
            PathBuf::from(&self.working_dir).join(p)
        }
    }
}

/// Resolves the data directory holding the session database.
///
/// Resolution order:
/// 1. `LANE_EDIT_DATA_DIR` environment variable
/// 2. `.data/` directory next to the executable
/// 3. the user's local data directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("LANE_EDIT_DATA_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|d| d.join(".data")))
    {
        return dir;
    }
    dirs::data_local_dir()
        .map(|d| d.join("lane-edit"))
        .unwrap_or_else(|| PathBuf::from(".data"))
}
