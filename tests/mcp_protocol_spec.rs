//! MCP protocol integration tests.
//!
//! These spawn the actual `pomodoro-mcp mcp` process and talk JSON-RPC over
//! stdio, one JSON message per line.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};

use tempfile::TempDir;

/// JSON-RPC 2.0 request
#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct JsonRpcError {
    code: i64,
    message: String,
    data: Option<Value>,
}

/// MCP test client that spawns and communicates with the server
struct McpTestClient {
    child: Child,
    request_id: u64,
    reader: BufReader<std::process::ChildStdout>,
    _data_dir: TempDir,
}

impl McpTestClient {
    /// Spawn a server with an isolated data directory and optional settings.
    fn spawn_with_settings(settings: Option<Value>) -> Self {
        let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
        if let Some(settings) = settings {
            std::fs::write(data_dir.path().join("settings.json"), settings.to_string())
                .expect("Failed to write settings");
        }

        let mut child = Command::new(env!("CARGO_BIN_EXE_pomodoro-mcp"))
            .arg("--directory")
            .arg(data_dir.path())
            .arg("--no-hooks")
            .arg("mcp")
            .env_remove("POMODORO_DIR")
            .env_remove("POMODORO_DAILY_GOAL")
            .env_remove("POMODORO_DURATION")
            .env_remove("POMODORO_BREAK_DURATION")
            .env_remove("POMODORO_TAGS")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to spawn pomodoro-mcp");

        let stdout = child.stdout.take().expect("Failed to get stdout");

        Self {
            child,
            request_id: 0,
            reader: BufReader::new(stdout),
            _data_dir: data_dir,
        }
    }

    fn spawn() -> Self {
        Self::spawn_with_settings(None)
    }

    fn send_message(&mut self, content: &str) {
        let stdin = self.child.stdin.as_mut().expect("Failed to get stdin");
        writeln!(stdin, "{}", content).expect("Failed to write message");
        stdin.flush().expect("Failed to flush stdin");
    }

    fn read_message(&mut self) -> String {
        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .expect("Failed to read line");
        line.trim().to_string()
    }

    fn request(&mut self, method: &str, params: Option<Value>) -> JsonRpcResponse {
        self.request_id += 1;
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.request_id,
            method: method.to_string(),
            params,
        };

        let request_json = serde_json::to_string(&request).expect("Failed to serialize request");
        self.send_message(&request_json);

        let response_json = self.read_message();
        serde_json::from_str(&response_json).expect("Failed to parse response")
    }

    /// Send initialize request and initialized notification (required first messages)
    fn initialize(&mut self) -> JsonRpcResponse {
        let response = self.request(
            "initialize",
            Some(json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {
                    "name": "test-client",
                    "version": "1.0.0"
                }
            })),
        );

        let notification = json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized"
        });
        self.send_message(&notification.to_string());

        response
    }

    fn list_tools(&mut self) -> JsonRpcResponse {
        self.request("tools/list", None)
    }

    fn call_tool(&mut self, name: &str, arguments: Value) -> JsonRpcResponse {
        self.request(
            "tools/call",
            Some(json!({
                "name": name,
                "arguments": arguments
            })),
        )
    }

    /// Call a tool and return (text, is_error).
    fn call_tool_text(&mut self, name: &str, arguments: Value) -> (String, bool) {
        let response = self.call_tool(name, arguments);
        assert!(
            response.error.is_none(),
            "Tool {} returned a protocol error: {:?}",
            name,
            response.error
        );
        let result = response.result.expect("Expected result");
        let text = result["content"][0]["text"]
            .as_str()
            .expect("Expected text content")
            .to_string();
        let is_error = result
            .get("isError")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        (text, is_error)
    }
}

impl Drop for McpTestClient {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

// ============================================================
// Protocol Tests
// ============================================================

mod protocol {
    use super::*;

    #[test]
    fn initialize_returns_server_info() {
        let mut client = McpTestClient::spawn();
        let response = client.initialize();

        assert!(response.error.is_none(), "Expected success, got error");
        let result = response.result.expect("Expected result");

        assert_eq!(result["serverInfo"]["name"], "pomodoro");
        assert!(result.get("capabilities").is_some());
    }

    #[test]
    fn tools_list_returns_all_tools() {
        let mut client = McpTestClient::spawn();
        client.initialize();

        let response = client.list_tools();
        assert!(response.error.is_none(), "Expected success, got error");

        let result = response.result.expect("Expected result");
        let tools = result["tools"].as_array().expect("Tools should be array");

        let mut names: Vec<&str> = tools
            .iter()
            .filter_map(|t| t.get("name").and_then(|n| n.as_str()))
            .collect();
        names.sort_unstable();

        assert_eq!(
            names,
            vec![
                "amend_pomodoro",
                "cancel_pomodoro",
                "clear_pomodoro",
                "finish_pomodoro",
                "get_history",
                "get_settings",
                "get_status",
                "repeat_pomodoro",
                "start_break",
                "start_pomodoro",
            ]
        );

        for tool in tools {
            assert!(tool.get("description").is_some());
            assert!(tool.get("inputSchema").is_some());
        }
    }
}

// ============================================================
// Tool Tests
// ============================================================

mod tools {
    use super::*;

    #[test]
    fn start_status_finish_history_round() {
        let mut client = McpTestClient::spawn();
        client.initialize();

        let (text, is_error) = client.call_tool_text(
            "start_pomodoro",
            json!({ "description": "write spec", "duration": 25, "tags": ["work"] }),
        );
        assert!(!is_error, "{}", text);
        assert_eq!(text, "Pomodoro started: write spec (25:00)");

        let (text, _) = client.call_tool_text("get_status", json!({}));
        let status: Value = serde_json::from_str(&text).expect("Status should be JSON");
        assert_eq!(status["active"], true);
        assert_eq!(status["done"], false);
        assert_eq!(status["description"], "write spec");
        assert_eq!(status["tags"], json!(["work"]));

        let (text, is_error) = client.call_tool_text("finish_pomodoro", json!({}));
        assert!(!is_error, "{}", text);
        assert!(text.starts_with("Pomodoro finished after 0:0"));

        let (text, _) = client.call_tool_text("get_status", json!({}));
        let status: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(status["active"], false);
        assert!(status.get("description").is_none());

        let (text, _) = client.call_tool_text("get_history", json!({ "limit": 1 }));
        let history: Value = serde_json::from_str(&text).unwrap();
        let entries = history["pomodoros"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["description"], "write spec");
    }

    #[test]
    fn precondition_failures_are_tool_errors_not_protocol_errors() {
        let mut client = McpTestClient::spawn();
        client.initialize();

        let (text, is_error) = client.call_tool_text("finish_pomodoro", json!({}));
        assert!(is_error);
        assert_eq!(text, "no active pomodoro to finish");

        let (text, is_error) = client.call_tool_text("amend_pomodoro", json!({ "description": "x" }));
        assert!(is_error);
        assert_eq!(text, "no pomodoro to amend");

        let (text, is_error) = client.call_tool_text("repeat_pomodoro", json!({}));
        assert!(is_error);
        assert_eq!(text, "no previous pomodoro to repeat");

        // Server keeps serving after errors
        let (_, is_error) = client.call_tool_text("clear_pomodoro", json!({}));
        assert!(!is_error);
    }

    #[test]
    fn huge_duration_still_gets_a_response() {
        let mut client = McpTestClient::spawn();
        client.initialize();

        let (text, is_error) =
            client.call_tool_text("start_pomodoro", json!({ "description": "big", "duration": 1e300 }));
        assert!(!is_error, "{}", text);
        assert_eq!(text, "Pomodoro started: big (10080:00)");

        let (text, is_error) = client.call_tool_text("start_break", json!({ "duration": 1e300 }));
        assert!(!is_error, "{}", text);
        assert_eq!(text, "Break started (10080:00)");
    }

    #[test]
    fn settings_come_from_the_data_directory() {
        let mut client = McpTestClient::spawn_with_settings(Some(json!({
            "daily_goal": 4,
            "default_pomodoro_duration": 50
        })));
        client.initialize();

        let (text, _) = client.call_tool_text("get_settings", json!({}));
        let settings: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(settings["daily_goal"], 4);
        assert_eq!(settings["default_pomodoro_duration"], 50);
        assert_eq!(settings["default_break_duration"], 5);

        let (text, _) = client.call_tool_text("start_break", json!({}));
        assert_eq!(text, "Break started (5:00)");

        let (text, _) = client.call_tool_text("start_pomodoro", json!({ "description": "long" }));
        assert_eq!(text, "Pomodoro started: long (50:00)");
    }
}
