//! JSON-RPC 2.0 message handling for the garden tool server.
//!
//! One request per line in, one response per line out. Notifications get no
//! response. Tool failures are reported inside a successful tool result with
//! `isError` set, so the client can show them to the traveler.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use super::{handle_tool_call, SharedState};

/// Protocol revision announced during `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

/// JSON-RPC 2.0 request. A missing `id` marks a notification.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response. Exactly one of `result` and `error` is set.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Tool advertised by `tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Parameters for a tools/call request.
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ToolResultContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolResultContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

impl ToolCallResult {
    fn text(text: String, is_error: bool) -> Self {
        Self {
            content: vec![ToolResultContent {
                content_type: "text".to_string(),
                text,
            }],
            is_error: is_error.then_some(true),
        }
    }
}

/// Tool server speaking line-delimited JSON-RPC.
pub struct McpServer {
    state: SharedState,
}

impl McpServer {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Serve on stdin and stdout until stdin closes.
    pub async fn run(&self) -> std::io::Result<()> {
        info!("Forking paths tool server starting...");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve requests read from `reader`, writing responses to `writer`.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                info!("EOF received, shutting down");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            debug!(request = %trimmed, "Received request");

            let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    error!(error = %e, "Failed to parse request");
                    Some(JsonRpcResponse::error(
                        None,
                        PARSE_ERROR,
                        format!("Parse error: {}", e),
                    ))
                }
            };

            if let Some(response) = response {
                let response_json = serde_json::to_string(&response)?;
                debug!(response = %response_json, "Sending response");

                writer.write_all(response_json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        Ok(())
    }

    /// Handle one request. Returns `None` for notifications.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id;

        match request.method.as_str() {
            "initialize" => Some(JsonRpcResponse::success(id, initialize_result())),
            "initialized" | "notifications/initialized" | "notifications/cancelled" => {
                debug!(method = %request.method, "Received notification");
                None
            }
            "ping" => Some(JsonRpcResponse::success(id, json!({}))),
            "tools/list" => Some(JsonRpcResponse::success(
                id,
                json!({ "tools": garden_tools() }),
            )),
            "tools/call" => Some(self.handle_tool_call(id, request.params).await),
            method if id.is_none() => {
                debug!(method = %method, "Unknown notification, ignoring");
                None
            }
            method => {
                error!(method = %method, "Unknown method");
                Some(JsonRpcResponse::error(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {}", method),
                ))
            }
        }
    }

    async fn handle_tool_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params.map(serde_json::from_value) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {}", e))
            }
            None => return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing params"),
        };

        info!(tool = %params.name, "Handling tool call");

        let result = match handle_tool_call(&self.state, &params.name, params.arguments).await {
            Ok(value) => match serde_json::to_string_pretty(&value) {
                Ok(text) => ToolCallResult::text(text, false),
                Err(e) => ToolCallResult::text(format!("Error: {}", e), true),
            },
            Err(e) => {
                info!(tool = %params.name, error = %e, "Tool call failed");
                ToolCallResult::text(format!("Error: {}", e), true)
            }
        };

        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => {
                error!(error = %e, "Failed to serialize tool call result");
                JsonRpcResponse::error(id, INTERNAL_ERROR, format!("Internal error: {}", e))
            }
        }
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }
    })
}

fn session_id_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "session_id": { "type": "string", "description": description }
        },
        "required": ["session_id"],
        "additionalProperties": false
    })
}

/// Every tool the server exposes.
pub fn garden_tools() -> Vec<Tool> {
    vec![
        Tool {
            name: "garden_start".to_string(),
            description: "Enter the Garden of Forking Paths. Creates a session for the traveler and narrates the first island. If the opening narration failed earlier, pass the saved session_id to try again.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "traveler": {
                        "type": "string",
                        "description": "Who the traveler is: name, origin, backstory"
                    },
                    "session_id": {
                        "type": "string",
                        "description": "Existing session with no islands yet"
                    }
                },
                "additionalProperties": false
            }),
        },
        Tool {
            name: "garden_choose".to_string(),
            description: "Choose the left or right path at the current island. Call garden_advance afterwards to reach the next island.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "session_id": { "type": "string", "description": "The session ID" },
                    "side": {
                        "type": "string",
                        "enum": ["left", "right"],
                        "description": "The path to take"
                    }
                },
                "required": ["session_id", "side"],
                "additionalProperties": false
            }),
        },
        Tool {
            name: "garden_advance".to_string(),
            description: "Follow the chosen path to the next island. May include a vision shown along the way.".to_string(),
            input_schema: session_id_schema("The session ID"),
        },
        Tool {
            name: "garden_end".to_string(),
            description: "End the journey. The session stays saved but accepts no further choices.".to_string(),
            input_schema: session_id_schema("The session ID"),
        },
        Tool {
            name: "garden_load".to_string(),
            description: "Show a saved journey island by island.".to_string(),
            input_schema: session_id_schema("The session ID"),
        },
        Tool {
            name: "garden_list".to_string(),
            description: "List saved journeys, most recent first.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        },
        Tool {
            name: "garden_delete".to_string(),
            description: "Delete a saved journey.".to_string(),
            input_schema: session_id_schema("The session to delete"),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_jsonrpc_response_success_without_id() {
        let response = JsonRpcResponse::success(None, json!({"data": "value"}));
        assert_eq!(response.id, Value::Null);
        let serialized = serde_json::to_string(&response).unwrap();
        assert!(!serialized.contains("\"error\""));
    }

    #[test]
    fn test_jsonrpc_error_serialization() {
        let response = JsonRpcResponse::error(Some(json!(7)), METHOD_NOT_FOUND, "Method not found");
        let serialized = serde_json::to_value(&response).unwrap();
        assert_eq!(serialized["id"], 7);
        assert_eq!(serialized["error"]["code"], -32601);
        assert!(serialized.get("result").is_none());
    }

    #[test]
    fn test_request_without_id_is_notification() {
        let request: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"initialized"}"#).unwrap();
        assert!(request.id.is_none());
        assert!(request.params.is_none());
    }

    #[test]
    fn test_tool_names_are_unique_and_prefixed() {
        let tools = garden_tools();
        let names: HashSet<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names.len(), 7);
        assert!(names.iter().all(|n| n.starts_with("garden_")));
    }

    #[test]
    fn test_tool_schemas_are_closed_objects() {
        for tool in garden_tools() {
            assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
            assert_eq!(
                tool.input_schema["additionalProperties"], false,
                "{}",
                tool.name
            );
        }
    }

    #[test]
    fn test_choose_schema_only_offers_two_sides() {
        let tools = garden_tools();
        let choose = tools.iter().find(|t| t.name == "garden_choose").unwrap();
        assert_eq!(
            choose.input_schema["properties"]["side"]["enum"],
            json!(["left", "right"])
        );
    }

    #[test]
    fn test_tool_serializes_input_schema_key() {
        let value = serde_json::to_value(&garden_tools()[0]).unwrap();
        assert!(value.get("inputSchema").is_some());
        assert!(value.get("input_schema").is_none());
    }

    #[test]
    fn test_tool_call_result_error_flag() {
        let ok = serde_json::to_value(ToolCallResult::text("{}".into(), false)).unwrap();
        assert!(ok.get("isError").is_none());

        let failed = serde_json::to_value(ToolCallResult::text("Error".into(), true)).unwrap();
        assert_eq!(failed["isError"], true);
        assert_eq!(failed["content"][0]["type"], "text");
    }

    #[test]
    fn test_initialize_result_names_server() {
        let result = initialize_result();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "forking-paths");
    }
}
