//! Domain models for pomodoro tracking.
//!
//! # Core Concepts
//!
//! - [`Pomodoro`]: A timed work interval with a description and tags. The
//!   current session lives in a single slot; its [`PomodoroState`] is derived
//!   on demand and never stored.
//! - [`History`]: Append-only log of finished sessions, used for listing and
//!   daily goal progress.
//! - [`Clock`]: Source of "now" for every lifecycle computation.

mod clock;
mod history;
mod pomodoro;

pub use clock::*;
pub use history::*;
pub use pomodoro::*;
