//! MCP server exposing the pomodoro timer as tools.

mod types;

pub use types::*;

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};

use crate::error::PomodoroError;
use crate::models::format_duration;
use crate::tracker::Tracker;

#[derive(Clone)]
pub struct McpServer {
    tracker: Tracker,
    tool_router: ToolRouter<Self>,
}

/// Turn an operation outcome into a tool result. Failures become error
/// results for the caller, never protocol errors.
fn respond(tool: &str, result: Result<String, PomodoroError>) -> Result<CallToolResult, McpError> {
    match result {
        Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
        Err(e) => {
            tracing::warn!(tool, kind = e.kind(), "tool failed: {}", e);
            Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
        }
    }
}

impl McpServer {
    pub fn new(tracker: Tracker) -> Self {
        Self {
            tracker,
            tool_router: Self::tool_router(),
        }
    }

    // ============================================================
    // Tool logic, shared by the tools below and by tests
    // ============================================================

    pub async fn start_message(&self, req: StartPomodoroRequest) -> Result<String, PomodoroError> {
        let p = self.tracker.start(req.into()).await?;
        Ok(format!(
            "Pomodoro started: {} ({})",
            p.description,
            format_duration(p.duration)
        ))
    }

    pub fn status_report(&self) -> Result<StatusResponse, PomodoroError> {
        Ok(self.tracker.status()?.into())
    }

    pub async fn finish_message(&self) -> Result<String, PomodoroError> {
        let elapsed = self.tracker.finish().await?;
        Ok(format!("Pomodoro finished after {}", format_duration(elapsed)))
    }

    pub async fn cancel_message(&self) -> Result<String, PomodoroError> {
        self.tracker.cancel().await?;
        Ok("Pomodoro cancelled".to_string())
    }

    pub async fn clear_message(&self) -> Result<String, PomodoroError> {
        self.tracker.clear().await?;
        Ok("Pomodoro cleared".to_string())
    }

    pub async fn break_message(&self, req: StartBreakRequest) -> Result<String, PomodoroError> {
        let duration = self
            .tracker
            .start_break(req.duration.and_then(crate::models::minutes_to_duration))
            .await?;
        Ok(format!("Break started ({})", format_duration(duration)))
    }

    pub async fn repeat_message(&self) -> Result<String, PomodoroError> {
        let p = self.tracker.repeat().await?;
        Ok(format!("Pomodoro repeated: {}", p.description))
    }

    pub async fn amend_message(&self, req: AmendPomodoroRequest) -> Result<String, PomodoroError> {
        let p = self.tracker.amend(req.into()).await?;
        Ok(format!("Pomodoro amended: {}", p.description))
    }

    pub fn history_report(&self, req: &GetHistoryRequest) -> Result<HistoryResponse, PomodoroError> {
        Ok(self.tracker.history(req.limit())?.into())
    }

    pub fn settings_report(&self) -> Result<SettingsResponse, PomodoroError> {
        Ok(self.tracker.settings()?.into())
    }
}

fn to_json<T: serde::Serialize>(value: Result<T, PomodoroError>) -> Result<String, PomodoroError> {
    Ok(serde_json::to_string_pretty(&value?)?)
}

#[tool_router]
impl McpServer {
    #[tool(
        description = "Start a new Pomodoro timer. Replaces any Pomodoro already in progress. Duration is in minutes; omit it (or pass 0) to use the configured default."
    )]
    async fn start_pomodoro(
        &self,
        params: Parameters<StartPomodoroRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond("start_pomodoro", self.start_message(params.0).await)
    }

    #[tool(
        description = "Get the status of the current Pomodoro: active/done flags, remaining time, and today's progress toward the daily goal."
    )]
    async fn get_status(&self) -> Result<CallToolResult, McpError> {
        respond("get_status", to_json(self.status_report()))
    }

    #[tool(description = "Finish the current Pomodoro early and record it in history")]
    async fn finish_pomodoro(&self) -> Result<CallToolResult, McpError> {
        respond("finish_pomodoro", self.finish_message().await)
    }

    #[tool(description = "Cancel the current active Pomodoro without recording it")]
    async fn cancel_pomodoro(&self) -> Result<CallToolResult, McpError> {
        respond("cancel_pomodoro", self.cancel_message().await)
    }

    #[tool(description = "Clear a finished Pomodoro")]
    async fn clear_pomodoro(&self) -> Result<CallToolResult, McpError> {
        respond("clear_pomodoro", self.clear_message().await)
    }

    #[tool(
        description = "Start a break timer. Returns immediately; notification is left to the break hook."
    )]
    async fn start_break(
        &self,
        params: Parameters<StartBreakRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond("start_break", self.break_message(params.0).await)
    }

    #[tool(description = "Repeat the last Pomodoro with the same description and tags")]
    async fn repeat_pomodoro(&self) -> Result<CallToolResult, McpError> {
        respond("repeat_pomodoro", self.repeat_message().await)
    }

    #[tool(
        description = "Amend the most recently recorded Pomodoro's description, duration, or tags. Omitted fields keep their value."
    )]
    async fn amend_pomodoro(
        &self,
        params: Parameters<AmendPomodoroRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond("amend_pomodoro", self.amend_message(params.0).await)
    }

    #[tool(description = "Get Pomodoro history, oldest first")]
    async fn get_history(
        &self,
        params: Parameters<GetHistoryRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond("get_history", to_json(self.history_report(&params.0)))
    }

    #[tool(description = "Get current Pomodoro settings")]
    async fn get_settings(&self) -> Result<CallToolResult, McpError> {
        respond("get_settings", to_json(self.settings_report()))
    }
}

#[tool_handler]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: rmcp::model::Implementation {
                name: "pomodoro".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            instructions: Some(
                r#"Pomodoro timer for focused work sessions.

There is at most one current Pomodoro. Time is computed from its start time
whenever you ask; nothing ticks in the background, so call get_status to see
how much time is left.

WORKFLOW:
1. start_pomodoro with a description (and optional duration in minutes, tags)
2. get_status to check remaining time and daily goal progress
3. finish_pomodoro to record it in history, or cancel_pomodoro to drop it
4. start_break between Pomodoros; it returns immediately
5. repeat_pomodoro to start the same work again

NOTES:
- amend_pomodoro edits the most recently recorded Pomodoro, not the running one
- clear_pomodoro empties the slot without recording anything, even when idle
- Hooks in <data_directory>/hooks/{start,stop,break} run on each transition;
  a hook failure is reported even when the timer change already happened"#
                    .into(),
            ),
            ..Default::default()
        }
    }
}

pub async fn run_stdio_server(tracker: Tracker) -> anyhow::Result<()> {
    use tokio::io::{stdin, stdout};

    tracing::info!("Starting MCP server via stdio");

    let service = McpServer::new(tracker);
    let server = service.serve((stdin(), stdout())).await?;

    let quit_reason = server.waiting().await?;
    tracing::info!("MCP server stopped: {:?}", quit_reason);

    Ok(())
}
