//! Request and response types for MCP tools.

use chrono::Local;
use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::models::*;
use crate::tracker::{AmendInput, StartInput, Status};

// ============================================================
// Request Types
// ============================================================

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StartPomodoroRequest {
    #[schemars(description = "Description of what you're working on")]
    pub description: Option<String>,
    #[schemars(description = "Duration in minutes (default: 25)")]
    pub duration: Option<f64>,
    #[schemars(description = "Tags for this Pomodoro")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StartBreakRequest {
    #[schemars(description = "Break duration in minutes (default: 5)")]
    pub duration: Option<f64>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AmendPomodoroRequest {
    #[schemars(description = "New description")]
    pub description: Option<String>,
    #[schemars(description = "New duration in minutes")]
    pub duration: Option<f64>,
    #[schemars(description = "New tags")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GetHistoryRequest {
    #[schemars(description = "Limit number of entries returned (0 = all)")]
    pub limit: Option<f64>,
}

impl From<StartPomodoroRequest> for StartInput {
    fn from(req: StartPomodoroRequest) -> Self {
        Self {
            description: req.description.unwrap_or_default(),
            duration: req.duration.and_then(minutes_to_duration),
            tags: req.tags,
        }
    }
}

impl From<AmendPomodoroRequest> for AmendInput {
    fn from(req: AmendPomodoroRequest) -> Self {
        Self {
            description: req.description,
            duration: req.duration.and_then(minutes_to_duration),
            tags: req.tags,
        }
    }
}

impl GetHistoryRequest {
    /// Whole-number limit; fractions truncate, absent means all.
    pub fn limit(&self) -> i64 {
        self.limit
            .filter(|l| l.is_finite())
            .map(|l| l.trunc() as i64)
            .unwrap_or(0)
    }
}

// ============================================================
// Response Types
// ============================================================

/// Status of the current pomodoro. Session fields are absent, not empty,
/// when the slot is inactive. While a session occupies the slot they are
/// always present, so a session without tags reports `"tags": []`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StatusResponse {
    pub active: bool,
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub goal_complete: usize,
    pub goal_total: u32,
}

impl From<Status> for StatusResponse {
    fn from(status: Status) -> Self {
        let remaining = status.remaining.map(format_duration);
        let (duration, description, tags) = match status.current {
            Some(p) => (
                Some(format_duration(p.duration)),
                Some(p.description),
                Some(p.tags),
            ),
            None => (None, None, None),
        };

        Self {
            active: status.state == PomodoroState::Active,
            done: status.state == PomodoroState::Done,
            remaining,
            duration,
            description,
            tags,
            goal_complete: status.goal_complete,
            goal_total: status.goal_total,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PomodoroInfo {
    /// RFC 3339 start time in the local timezone.
    pub start_time: String,
    pub duration: String,
    pub description: String,
    pub tags: Vec<String>,
}

impl From<Pomodoro> for PomodoroInfo {
    fn from(p: Pomodoro) -> Self {
        Self {
            start_time: p.start_time.with_timezone(&Local).to_rfc3339(),
            duration: format_duration(p.duration),
            description: p.description,
            tags: p.tags,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HistoryResponse {
    pub pomodoros: Vec<PomodoroInfo>,
}

impl From<Vec<Pomodoro>> for HistoryResponse {
    fn from(pomodoros: Vec<Pomodoro>) -> Self {
        Self {
            pomodoros: pomodoros.into_iter().map(PomodoroInfo::from).collect(),
        }
    }
}

/// Effective settings, durations in whole minutes.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SettingsResponse {
    pub data_directory: String,
    pub daily_goal: u32,
    pub default_pomodoro_duration: i64,
    pub default_break_duration: i64,
    pub default_tags: Vec<String>,
}

impl From<Settings> for SettingsResponse {
    fn from(s: Settings) -> Self {
        Self {
            data_directory: s.data_directory.display().to_string(),
            daily_goal: s.daily_goal,
            default_pomodoro_duration: s.default_pomodoro_duration.num_minutes(),
            default_break_duration: s.default_break_duration.num_minutes(),
            default_tags: s.default_tags,
        }
    }
}
