//! Error types for pomodoro operations.

use std::time::Duration;

use thiserror::Error;

/// Failure of an external notification hook.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("hook '{event}' could not be started: {source}")]
    Spawn {
        event: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("hook '{event}' exited with status {code}: {stderr}")]
    Exit {
        event: &'static str,
        code: i32,
        stderr: String,
    },

    #[error("hook '{event}' timed out after {}s", .timeout.as_secs())]
    Timeout {
        event: &'static str,
        timeout: Duration,
    },

    #[error("hook '{event}' failed: {message}")]
    Rejected {
        event: &'static str,
        message: String,
    },
}

/// All errors a tool call can surface to the caller.
///
/// Precondition errors (`NoActiveSession`, `NothingToAmend`, ...) leave the
/// slot and the history untouched. `Hook` may be returned after state was
/// already written, see the individual operations on
/// [`Tracker`](crate::tracker::Tracker).
#[derive(Debug, Error)]
pub enum PomodoroError {
    #[error("failed to create client: {0:#}")]
    ClientInit(anyhow::Error),

    #[error("no active pomodoro to {action}")]
    NoActiveSession { action: &'static str },

    #[error("no pomodoro to amend")]
    NothingToAmend,

    #[error("no previous pomodoro to repeat")]
    NothingToRepeat,

    #[error("cannot repeat an active pomodoro")]
    CannotRepeatActive,

    #[error("hook failed: {0}")]
    Hook(#[from] HookError),

    #[error("{context}: {source:#}")]
    Persistence {
        context: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to encode response: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PomodoroError {
    pub(crate) fn persistence(context: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| Self::Persistence { context, source }
    }

    /// Stable machine-readable kind, useful for logs and tests.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ClientInit(_) => "client_init_failure",
            Self::NoActiveSession { .. } => "no_active_session",
            Self::NothingToAmend => "nothing_to_amend",
            Self::NothingToRepeat => "nothing_to_repeat",
            Self::CannotRepeatActive => "cannot_repeat_active",
            Self::Hook(_) => "hook_failure",
            Self::Persistence { .. } => "persistence_failure",
            Self::Serialization(_) => "serialization_failure",
        }
    }
}
