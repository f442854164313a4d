//! The session lifecycle state machine.
//!
//! `Tracker` owns the current-pomodoro slot and the append path into
//! history. Every mutating operation holds one exclusive lock from its first
//! read to its last write, so at most one operation moves the slot at a time.
//! Read-only views come from a single storage snapshot and do not take the
//! lock.
//!
//! Side effects run in two steps with no shared rollback:
//! - start, repeat: persist the slot, then fire `start`
//! - finish, cancel, clear: fire `stop`, then archive or drop the slot
//!
//! A hook failure after a write still reports an error; the write stays.

use std::sync::Arc;

use chrono::{Duration, Local};
use tokio::sync::Mutex;

use crate::config::{Settings, SettingsSource};
use crate::db::Database;
use crate::error::PomodoroError;
use crate::hooks::{Hook, HookEvent};
use crate::models::*;

/// Input for starting a new pomodoro.
#[derive(Debug, Clone, Default)]
pub struct StartInput {
    pub description: String,
    /// Requested length. `None`, zero or negative means the configured default.
    pub duration: Option<Duration>,
    /// `None` applies the configured default tags.
    pub tags: Option<Vec<String>>,
}

/// Fields to change on the latest pomodoro. Empty, zero or absent fields
/// keep their current value.
#[derive(Debug, Clone, Default)]
pub struct AmendInput {
    pub description: Option<String>,
    pub duration: Option<Duration>,
    pub tags: Option<Vec<String>>,
}

/// Point-in-time view of the slot plus today's goal progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub state: PomodoroState,
    pub current: Option<Pomodoro>,
    pub remaining: Option<Duration>,
    pub goal_complete: usize,
    pub goal_total: u32,
}

#[derive(Clone)]
pub struct Tracker {
    db: Database,
    settings: SettingsSource,
    hook: Arc<dyn Hook>,
    clock: Arc<dyn Clock>,
    op_lock: Arc<Mutex<()>>,
}

impl Tracker {
    pub fn new(db: Database, settings: SettingsSource, hook: Arc<dyn Hook>) -> Self {
        Self::with_clock(db, settings, hook, Arc::new(SystemClock))
    }

    pub fn with_clock(
        db: Database,
        settings: SettingsSource,
        hook: Arc<dyn Hook>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            settings,
            hook,
            clock,
            op_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn settings(&self) -> Result<Settings, PomodoroError> {
        self.settings.load().map_err(PomodoroError::ClientInit)
    }

    fn resolve_duration(requested: Option<Duration>, default: Duration) -> Duration {
        requested
            .filter(|d| *d > Duration::zero())
            .unwrap_or(default)
    }

    async fn fire(&self, event: HookEvent) -> Result<(), PomodoroError> {
        self.hook.invoke(event).await.map_err(|e| {
            tracing::warn!(event = %event, error = %e, "hook failed");
            PomodoroError::from(e)
        })
    }

    fn write_slot(&self, pomodoro: &Pomodoro) -> Result<(), PomodoroError> {
        self.db
            .set_current(pomodoro)
            .map_err(PomodoroError::persistence("failed to start pomodoro"))
    }

    fn read_slot(&self) -> Result<Option<Pomodoro>, PomodoroError> {
        self.db
            .get_current()
            .map_err(PomodoroError::persistence("failed to get pomodoro"))
    }

    fn latest(&self) -> Result<Option<Pomodoro>, PomodoroError> {
        self.db
            .latest_history()
            .map_err(PomodoroError::persistence("failed to get history"))
    }

    // ============================================================
    // Lifecycle
    // ============================================================

    /// Replace the slot with a fresh pomodoro starting now.
    ///
    /// The slot is written before the `start` hook fires. If the hook fails
    /// the new pomodoro stays in place and the error is returned.
    pub async fn start(&self, input: StartInput) -> Result<Pomodoro, PomodoroError> {
        let _guard = self.op_lock.lock().await;
        let settings = self.settings()?;

        let pomodoro = Pomodoro {
            start_time: self.clock.now(),
            duration: Self::resolve_duration(input.duration, settings.default_pomodoro_duration),
            description: input.description,
            tags: input.tags.unwrap_or(settings.default_tags),
        };

        self.write_slot(&pomodoro)?;
        tracing::info!(
            description = %pomodoro.description,
            duration = %format_duration(pomodoro.duration),
            "pomodoro started"
        );

        self.fire(HookEvent::Start).await?;
        Ok(pomodoro)
    }

    /// Archive the current pomodoro into history.
    ///
    /// Returns the elapsed time measured before the `stop` hook runs. The
    /// slot is only archived once the hook succeeds.
    pub async fn finish(&self) -> Result<Duration, PomodoroError> {
        let _guard = self.op_lock.lock().await;

        let current = self
            .read_slot()?
            .ok_or(PomodoroError::NoActiveSession { action: "finish" })?;
        let elapsed = current.elapsed_at(self.clock.now());

        self.fire(HookEvent::Stop).await?;

        self.db
            .finish_current()
            .map_err(PomodoroError::persistence("failed to finish pomodoro"))?;
        tracing::info!(
            description = %current.description,
            elapsed = %format_duration(elapsed),
            "pomodoro finished"
        );
        Ok(elapsed)
    }

    /// Drop the current pomodoro without recording it.
    pub async fn cancel(&self) -> Result<(), PomodoroError> {
        let _guard = self.op_lock.lock().await;

        if self.read_slot()?.is_none() {
            return Err(PomodoroError::NoActiveSession { action: "cancel" });
        }

        self.fire(HookEvent::Stop).await?;

        self.db
            .clear_current()
            .map_err(PomodoroError::persistence("failed to cancel pomodoro"))?;
        tracing::info!("pomodoro cancelled");
        Ok(())
    }

    /// Empty the slot whatever it holds, including nothing.
    pub async fn clear(&self) -> Result<(), PomodoroError> {
        let _guard = self.op_lock.lock().await;

        self.fire(HookEvent::Stop).await?;

        let removed = self
            .db
            .clear_current()
            .map_err(PomodoroError::persistence("failed to clear pomodoro"))?;
        tracing::info!(removed, "pomodoro cleared");
        Ok(())
    }

    /// Rewrite the latest history entry into the slot with the given changes.
    ///
    /// This works from history, not from the slot: the most recently
    /// finished pomodoro is the one amended, and the result replaces the
    /// slot. No hook fires.
    pub async fn amend(&self, input: AmendInput) -> Result<Pomodoro, PomodoroError> {
        let _guard = self.op_lock.lock().await;

        let mut pomodoro = self.latest()?.ok_or(PomodoroError::NothingToAmend)?;

        if let Some(description) = input.description.filter(|d| !d.is_empty()) {
            pomodoro.description = description;
        }
        if let Some(duration) = input.duration.filter(|d| *d > Duration::zero()) {
            pomodoro.duration = duration;
        }
        if let Some(tags) = input.tags.filter(|t| !t.is_empty()) {
            pomodoro.tags = tags;
        }

        self.db
            .set_current(&pomodoro)
            .map_err(PomodoroError::persistence("failed to amend pomodoro"))?;
        tracing::info!(description = %pomodoro.description, "pomodoro amended");
        Ok(pomodoro)
    }

    /// Start again with the latest entry's description and tags and the
    /// default duration.
    ///
    /// An archived entry has left the slot and never blocks a repeat. It is
    /// only live again when [`amend`](Self::amend) has written it back into
    /// the slot, and repeating it while that copy is still running fails
    /// with `CannotRepeatActive`.
    pub async fn repeat(&self) -> Result<Pomodoro, PomodoroError> {
        let _guard = self.op_lock.lock().await;
        let settings = self.settings()?;

        let template = self.latest()?.ok_or(PomodoroError::NothingToRepeat)?;
        let now = self.clock.now();
        let live = self
            .read_slot()?
            .filter(|current| current.start_time == template.start_time);
        if live.is_some_and(|current| current.is_active_at(now)) {
            return Err(PomodoroError::CannotRepeatActive);
        }

        let pomodoro = Pomodoro {
            start_time: now,
            duration: settings.default_pomodoro_duration,
            description: template.description,
            tags: template.tags,
        };

        self.write_slot(&pomodoro)?;
        tracing::info!(description = %pomodoro.description, "pomodoro repeated");

        self.fire(HookEvent::Start).await?;
        Ok(pomodoro)
    }

    /// Announce a break. Touches neither the slot nor history and returns
    /// right after the `break` hook.
    pub async fn start_break(&self, duration: Option<Duration>) -> Result<Duration, PomodoroError> {
        let settings = self.settings()?;
        let duration = Self::resolve_duration(duration, settings.default_break_duration);

        self.fire(HookEvent::Break).await?;
        tracing::info!(duration = %format_duration(duration), "break started");
        Ok(duration)
    }

    // ============================================================
    // Read-only views
    // ============================================================

    pub fn status(&self) -> Result<Status, PomodoroError> {
        let settings = self.settings()?;
        let (current, history) = self
            .db
            .snapshot()
            .map_err(PomodoroError::persistence("failed to get status"))?;

        let now = self.clock.now();
        let today = now.with_timezone(&Local).date_naive();

        Ok(Status {
            state: PomodoroState::of(current.as_ref(), now),
            remaining: current.as_ref().map(|p| p.remaining_at(now)),
            current,
            goal_complete: history.date_count(today),
            goal_total: settings.daily_goal,
        })
    }

    /// The last `limit` history entries; zero or less returns all.
    pub fn history(&self, limit: i64) -> Result<Vec<Pomodoro>, PomodoroError> {
        let history = self
            .db
            .get_history()
            .map_err(PomodoroError::persistence("failed to get history"))?;
        Ok(history.window(limit).to_vec())
    }
}
