use chrono::{DateTime, Duration, Utc};

/// Longest session or break accepted, one week in minutes. Longer requests
/// are capped to it.
pub const MAX_MINUTES: i64 = 7 * 24 * 60;

/// A single timed work interval.
///
/// The lifecycle state is never stored alongside the session. It is derived
/// from `start_time`, `duration` and the instant it is observed at, see
/// [`Pomodoro::state_at`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pomodoro {
    pub start_time: DateTime<Utc>,
    pub duration: Duration,
    pub description: String,
    pub tags: Vec<String>,
}

/// Lifecycle of the current session slot.
///
/// - `Inactive`: the slot is empty
/// - `Active`: a session is running and has time left
/// - `Done`: a session is in the slot and its duration has elapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PomodoroState {
    Inactive,
    Active,
    Done,
}

impl PomodoroState {
    /// Classify an optional slot occupant at `now`.
    pub fn of(slot: Option<&Pomodoro>, now: DateTime<Utc>) -> Self {
        match slot {
            Some(p) => p.state_at(now),
            None => Self::Inactive,
        }
    }
}

impl Pomodoro {
    pub fn new(
        start_time: DateTime<Utc>,
        duration: Duration,
        description: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            start_time,
            duration,
            description: description.into(),
            tags,
        }
    }

    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.start_time
    }

    /// Time left at `now`, never negative.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        let remaining = self.duration - self.elapsed_at(now);
        remaining.max(Duration::zero())
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> PomodoroState {
        if self.elapsed_at(now) < self.duration {
            PomodoroState::Active
        } else {
            PomodoroState::Done
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == PomodoroState::Active
    }
}

/// Format a duration as `m:ss`, clamping negative values to `0:00`.
///
/// Minutes are not wrapped into hours, so a 90 minute session reads `90:00`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.num_seconds().max(0);
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Convert a minutes value from the tool boundary into a duration.
///
/// Returns `None` for anything that does not amount to at least one whole
/// second, so callers fall back to a configured default instead of creating
/// a zero-length session. Values above [`MAX_MINUTES`] are capped.
pub fn minutes_to_duration(minutes: f64) -> Option<Duration> {
    if !minutes.is_finite() || minutes <= 0.0 {
        return None;
    }
    let secs = (minutes.min(MAX_MINUTES as f64) * 60.0).round() as i64;
    if secs <= 0 {
        return None;
    }
    Duration::try_seconds(secs)
}

/// Whole configured minutes as a duration, `None` when zero or negative.
pub fn whole_minutes(minutes: i64) -> Option<Duration> {
    if minutes <= 0 {
        return None;
    }
    Duration::try_minutes(minutes.min(MAX_MINUTES))
}
