//! MCP stdio front end: line-delimited JSON-RPC 2.0 on stdin/stdout.
//! Tool lookup/argument mistakes are protocol errors; remote API failures
//! are tool results the caller can read and act on.

use octogate_github::{Gateway, GatewayError};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "octogate";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

pub struct McpServer {
    gateway: Arc<Gateway>,
}

impl McpServer {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Serve until stdin closes. stdout carries protocol frames only;
    /// logs must go to stderr.
    pub async fn run(&self) -> anyhow::Result<()> {
        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(stdin).lines();

        info!("octogate stdio server ready");

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some(reply) = self.handle_line(line).await else {
                continue;
            };
            let mut frame = serde_json::to_vec(&reply)?;
            frame.push(b'\n');
            stdout.write_all(&frame).await?;
            stdout.flush().await?;
        }

        info!("stdin closed, shutting down");
        Ok(())
    }

    /// One frame in, at most one frame out. Notifications (no id) get no
    /// reply per JSON-RPC.
    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                warn!("unparseable frame: {}", e);
                return Some(error_response(
                    Value::Null,
                    PARSE_ERROR,
                    format!("parse error: {}", e),
                    None,
                ));
            }
        };

        let Some(id) = request.id else {
            debug!("notification '{}'", request.method);
            return None;
        };

        Some(self.handle_request(id, &request.method, request.params).await)
    }

    async fn handle_request(&self, id: Value, method: &str, params: Value) -> Value {
        match method {
            "initialize" => result_response(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION }
                }),
            ),
            "ping" => result_response(id, json!({})),
            "tools/list" => result_response(
                id,
                json!({ "tools": self.gateway.registry().list_definitions() }),
            ),
            "tools/call" => self.handle_tool_call(id, params).await,
            other => error_response(
                id,
                METHOD_NOT_FOUND,
                format!("method not found: {}", other),
                None,
            ),
        }
    }

    async fn handle_tool_call(&self, id: Value, params: Value) -> Value {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return error_response(
                id,
                INVALID_PARAMS,
                "tools/call requires a 'name' parameter".to_string(),
                None,
            );
        };
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        match self.gateway.dispatch(name, arguments).await {
            Ok(value) => result_response(id, tool_result(&value)),
            // Caller mistakes are protocol errors.
            Err(err @ GatewayError::UnknownTool(_)) => {
                error_response(id, INVALID_PARAMS, err.to_string(), None)
            }
            Err(GatewayError::InvalidArguments(err)) => {
                let data = json!({ "issues": err.issues });
                error_response(id, INVALID_PARAMS, err.to_string(), Some(data))
            }
            // Remote failures are tool outcomes the agent should see.
            Err(err) => {
                warn!("tool '{}' failed: {}", name, err);
                result_response(id, tool_error(&err))
            }
        }
    }
}

fn result_response(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn error_response(id: Value, code: i64, message: String, data: Option<Value>) -> Value {
    let mut error = json!({ "code": code, "message": message });
    if let Some(data) = data {
        error["data"] = data;
    }
    json!({ "jsonrpc": "2.0", "id": id, "error": error })
}

fn tool_result(value: &Value) -> Value {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    json!({ "content": [{ "type": "text", "text": text }] })
}

fn tool_error(error: &GatewayError) -> Value {
    json!({
        "content": [{ "type": "text", "text": error.to_string() }],
        "isError": true
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use octogate_github::transport::{ApiRequest, ApiResponse, Transport, TransportError};
    use octogate_github::ToolRegistry;

    struct CannedTransport {
        status: u16,
        body: Vec<u8>,
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn send(&self, _request: ApiRequest) -> Result<ApiResponse, TransportError> {
            Ok(ApiResponse {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    fn server_with(status: u16, body: Value) -> McpServer {
        let transport = Arc::new(CannedTransport {
            status,
            body: serde_json::to_vec(&body).expect("body"),
        });
        McpServer::new(Arc::new(Gateway::new(ToolRegistry::new(), transport)))
    }

    fn server() -> McpServer {
        server_with(200, json!({}))
    }

    #[tokio::test]
    async fn initialize_advertises_tools_capability() {
        let reply = server()
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .await
            .expect("reply");
        assert_eq!(reply["id"], 1);
        assert_eq!(reply["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert!(reply["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn tools_list_returns_every_definition() {
        let reply = server()
            .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .await
            .expect("reply");
        let tools = reply["result"]["tools"].as_array().expect("tools");
        assert_eq!(tools.len(), 15);
        assert!(tools.iter().all(|t| t["inputSchema"].is_object()));
    }

    #[tokio::test]
    async fn notifications_get_no_reply() {
        let reply = server()
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn unparseable_frames_yield_parse_errors() {
        let reply = server().handle_line("{not json").await.expect("reply");
        assert_eq!(reply["error"]["code"], PARSE_ERROR);
        assert_eq!(reply["id"], Value::Null);
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let reply = server()
            .handle_line(r#"{"jsonrpc":"2.0","id":3,"method":"resources/list"}"#)
            .await
            .expect("reply");
        assert_eq!(reply["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params() {
        let reply = server()
            .handle_line(
                r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"nope","arguments":{}}}"#,
            )
            .await
            .expect("reply");
        assert_eq!(reply["error"]["code"], INVALID_PARAMS);
        assert!(reply["error"]["message"]
            .as_str()
            .expect("message")
            .contains("unknown tool"));
    }

    #[tokio::test]
    async fn validation_failures_carry_machine_readable_issues() {
        let reply = server()
            .handle_line(
                r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"create_issue","arguments":{"owner":"o"}}}"#,
            )
            .await
            .expect("reply");
        assert_eq!(reply["error"]["code"], INVALID_PARAMS);
        let issues = reply["error"]["data"]["issues"].as_array().expect("issues");
        assert!(issues
            .iter()
            .any(|i| i["field"] == "title" && i["reason"]["code"] == "missing_required"));
    }

    #[tokio::test]
    async fn api_failures_render_as_error_results() {
        let srv = server_with(403, json!({ "message": "API rate limit exceeded for you" }));
        let reply = srv
            .handle_line(
                r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"search_users","arguments":{"q":"octocat"}}}"#,
            )
            .await
            .expect("reply");
        assert_eq!(reply["result"]["isError"], true);
        let text = reply["result"]["content"][0]["text"].as_str().expect("text");
        assert!(text.contains("Rate limit exceeded while searching users"));
    }

    #[tokio::test]
    async fn successful_calls_render_the_result_as_text_content() {
        let srv = server_with(
            200,
            json!({ "total_count": 0, "incomplete_results": false, "items": [] }),
        );
        let reply = srv
            .handle_line(
                r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"search_users","arguments":{"q":"octocat"}}}"#,
            )
            .await
            .expect("reply");
        assert_eq!(reply["result"]["content"][0]["type"], "text");
        let text = reply["result"]["content"][0]["text"].as_str().expect("text");
        assert!(text.contains("\"total_count\": 0"));
    }
}
