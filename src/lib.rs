//! Pomodoro timer sessions, history and daily goals, served to AI agents
//! over the Model Context Protocol.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod hooks;
pub mod mcp;
pub mod models;
pub mod tracker;
