//! External notification hooks fired at lifecycle points.
//!
//! The tracker only knows the [`Hook`] capability. Backends:
//! - [`ScriptHook`]: runs `<data dir>/hooks/<event>` when present
//! - [`LogHook`]: writes a log line and nothing else
//! - [`RecordingHook`]: keeps fired events in memory (for testing)

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::HookError;

pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle points that notify the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    Start,
    Stop,
    Break,
}

impl HookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Break => "break",
        }
    }
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait Hook: Send + Sync {
    async fn invoke(&self, event: HookEvent) -> Result<(), HookError>;
}

/// Runs an executable named after the event from `<data dir>/hooks/`.
///
/// A missing script counts as success. Output is captured so it never
/// reaches a stdio protocol channel.
#[derive(Debug, Clone)]
pub struct ScriptHook {
    hooks_dir: PathBuf,
    timeout: Duration,
}

impl ScriptHook {
    pub fn new(data_directory: &Path, timeout: Duration) -> Self {
        Self {
            hooks_dir: data_directory.join("hooks"),
            timeout,
        }
    }

    pub fn script_path(&self, event: HookEvent) -> PathBuf {
        self.hooks_dir.join(event.as_str())
    }
}

#[async_trait]
impl Hook for ScriptHook {
    async fn invoke(&self, event: HookEvent) -> Result<(), HookError> {
        let path = self.script_path(event);
        if !path.exists() {
            tracing::debug!(event = %event, "No hook script at {:?}", path);
            return Ok(());
        }

        let name = event.as_str();
        let output = Command::new(&path)
            .current_dir(&self.hooks_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, output).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => return Err(HookError::Spawn { event: name, source }),
            Err(_) => {
                tracing::warn!(event = %event, "Hook timed out after {:?}", self.timeout);
                return Err(HookError::Timeout {
                    event: name,
                    timeout: self.timeout,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            tracing::info!(event = %event, "hook output: {}", stdout.trim());
        }

        if output.status.success() {
            tracing::debug!(event = %event, "Hook succeeded");
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(event = %event, "Hook failed: {}", stderr);
            Err(HookError::Exit {
                event: name,
                code: output.status.code().unwrap_or(-1),
                stderr,
            })
        }
    }
}

/// Logs each event instead of running anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogHook;

#[async_trait]
impl Hook for LogHook {
    async fn invoke(&self, event: HookEvent) -> Result<(), HookError> {
        tracing::info!(event = %event, "pomodoro hook");
        Ok(())
    }
}

/// Collects fired events in memory (for testing).
///
/// Can be told to fail a given event; the failed invocation is still
/// recorded.
#[derive(Debug, Default)]
pub struct RecordingHook {
    events: Mutex<Vec<HookEvent>>,
    fail_on: Mutex<Option<HookEvent>>,
}

impl RecordingHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(event: HookEvent) -> Self {
        let hook = Self::new();
        hook.fail_on(Some(event));
        hook
    }

    pub fn fail_on(&self, event: Option<HookEvent>) {
        *self.fail_on.lock().expect("hook lock poisoned") = event;
    }

    pub fn events(&self) -> Vec<HookEvent> {
        self.events.lock().expect("hook lock poisoned").clone()
    }
}

#[async_trait]
impl Hook for RecordingHook {
    async fn invoke(&self, event: HookEvent) -> Result<(), HookError> {
        self.events.lock().expect("hook lock poisoned").push(event);
        if *self.fail_on.lock().expect("hook lock poisoned") == Some(event) {
            return Err(HookError::Rejected {
                event: event.as_str(),
                message: "configured to fail".to_string(),
            });
        }
        Ok(())
    }
}
