//! Settings resolution.
//!
//! Effective settings are computed per operation from three layers:
//! explicit overrides (CLI flags and environment), the stored
//! `settings.json` in the data directory, and built-in defaults. Nothing is
//! cached between operations and nothing here writes settings back.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::models::whole_minutes;

const DATA_DIR_NAME: &str = ".pomodoro";
const SETTINGS_FILE: &str = "settings.json";

/// Effective settings for a single operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_directory: PathBuf,
    pub daily_goal: u32,
    pub default_pomodoro_duration: Duration,
    pub default_break_duration: Duration,
    pub default_tags: Vec<String>,
}

impl Settings {
    /// Built-in defaults rooted at `data_directory`.
    pub fn builtin(data_directory: impl Into<PathBuf>) -> Self {
        Self {
            data_directory: data_directory.into(),
            daily_goal: 0,
            default_pomodoro_duration: Duration::minutes(25),
            default_break_duration: Duration::minutes(5),
            default_tags: Vec::new(),
        }
    }
}

/// One optional layer of configuration. Durations are whole minutes.
///
/// Used both for the stored file and for overrides. Minute values of zero or
/// less carry no meaning and fall through to the next layer; values above
/// [`MAX_MINUTES`](crate::models::MAX_MINUTES) are capped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_goal: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_pomodoro_duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_break_duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_tags: Option<Vec<String>>,
}

fn layered_minutes(over: Option<i64>, stored: Option<i64>, builtin: Duration) -> Duration {
    over.and_then(whole_minutes)
        .or_else(|| stored.and_then(whole_minutes))
        .unwrap_or(builtin)
}

/// Merge layers: `overrides` beats `stored` beats `defaults`.
pub fn resolve(overrides: &SettingsLayer, stored: &SettingsLayer, defaults: &Settings) -> Settings {
    Settings {
        data_directory: defaults.data_directory.clone(),
        daily_goal: overrides
            .daily_goal
            .or(stored.daily_goal)
            .unwrap_or(defaults.daily_goal),
        default_pomodoro_duration: layered_minutes(
            overrides.default_pomodoro_duration,
            stored.default_pomodoro_duration,
            defaults.default_pomodoro_duration,
        ),
        default_break_duration: layered_minutes(
            overrides.default_break_duration,
            stored.default_break_duration,
            defaults.default_break_duration,
        ),
        default_tags: overrides
            .default_tags
            .clone()
            .or_else(|| stored.default_tags.clone())
            .unwrap_or_else(|| defaults.default_tags.clone()),
    }
}

/// Default data directory, `~/.pomodoro`.
pub fn default_data_directory() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(home.join(DATA_DIR_NAME))
}

pub fn settings_path(data_directory: &Path) -> PathBuf {
    data_directory.join(SETTINGS_FILE)
}

/// Read the stored layer. A missing file is an empty layer.
pub fn load_stored(data_directory: &Path) -> Result<SettingsLayer> {
    let path = settings_path(data_directory);
    if !path.exists() {
        return Ok(SettingsLayer::default());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read settings file at {:?}", path))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse settings file at {:?}", path))
}

/// Write a stored layer. Only used to seed a data directory, never by the
/// timer operations themselves.
pub fn save_stored(data_directory: &Path, layer: &SettingsLayer) -> Result<()> {
    fs::create_dir_all(data_directory).context("Failed to create data directory")?;
    let content = serde_json::to_string_pretty(layer).context("Failed to serialize settings")?;
    fs::write(settings_path(data_directory), content).context("Failed to write settings file")?;
    Ok(())
}

/// Where settings come from: a data directory plus override values.
#[derive(Debug, Clone)]
pub struct SettingsSource {
    data_directory: PathBuf,
    overrides: SettingsLayer,
}

impl SettingsSource {
    pub fn new(data_directory: impl Into<PathBuf>, overrides: SettingsLayer) -> Self {
        Self {
            data_directory: data_directory.into(),
            overrides,
        }
    }

    /// Resolve fresh effective settings from disk.
    pub fn load(&self) -> Result<Settings> {
        let stored = load_stored(&self.data_directory)?;
        Ok(resolve(
            &self.overrides,
            &stored,
            &Settings::builtin(&self.data_directory),
        ))
    }
}
