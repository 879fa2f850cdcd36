use crate::handlers::ToolDispatcher;
use crate::protocol::*;
use crate::registry::{resource_descriptors, tool_descriptors};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

pub const SERVER_NAME: &str = "dhan-mcp";

/// Serve MCP over stdin/stdout until the client closes the stream.
///
/// Each request runs as its own task; responses are funneled through a
/// channel so stdout frames never interleave. Completion order is not
/// guaranteed to match arrival order.
pub async fn serve_stdio(dispatcher: Arc<ToolDispatcher>) -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    let (tx, mut rx) = mpsc::channel::<String>(64);
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(frame) = rx.recv().await {
            if stdout.write_all(frame.as_bytes()).await.is_err() {
                break;
            }
            if stdout.write_all(b"\n").await.is_err() {
                break;
            }
            if stdout.flush().await.is_err() {
                break;
            }
        }
    });

    info!("MCP server ready on stdio");

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let dispatcher = dispatcher.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Some(response) = handle_line(&dispatcher, &line).await {
                match serde_json::to_string(&response) {
                    Ok(frame) => {
                        let _ = tx.send(frame).await;
                    }
                    Err(err) => error!(error = %err, "failed to serialize response"),
                }
            }
        });
    }

    // Client closed stdin; let in-flight responses drain.
    drop(tx);
    let _ = writer.await;
    info!("MCP client disconnected, shutting down");
    Ok(())
}

async fn handle_line(dispatcher: &ToolDispatcher, line: &str) -> Option<RpcResponse> {
    let request: RpcRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(err) => {
            return Some(RpcResponse::failure(
                Value::Null,
                error_codes::PARSE_ERROR,
                format!("parse error: {}", err),
            ))
        }
    };
    handle_request(dispatcher, request).await
}

/// Dispatch one request. Notifications return `None`.
pub async fn handle_request(
    dispatcher: &ToolDispatcher,
    request: RpcRequest,
) -> Option<RpcResponse> {
    if request.is_notification() {
        debug!(method = %request.method, "notification received");
        return None;
    }
    let id = request.id.clone().unwrap_or(Value::Null);

    let response = match request.method.as_str() {
        "initialize" => {
            let result = InitializeResult::new(SERVER_NAME, env!("CARGO_PKG_VERSION"));
            success(id, &result)
        }
        "ping" => RpcResponse::success(id, json!({})),
        "tools/list" => success(id, &json!({ "tools": tool_descriptors() })),
        "tools/call" => match serde_json::from_value::<CallToolParams>(request.params) {
            Ok(params) => {
                debug!(tool = %params.name, "tool call");
                let result = dispatcher.call_tool(&params.name, params.arguments).await;
                success(id, &result)
            }
            Err(err) => RpcResponse::failure(
                id,
                error_codes::INVALID_PARAMS,
                format!("invalid params: {}", err),
            ),
        },
        "resources/list" => success(id, &json!({ "resources": resource_descriptors() })),
        "resources/read" => match serde_json::from_value::<ReadResourceParams>(request.params) {
            Ok(params) => match dispatcher.read_resource(&params.uri).await {
                Ok(text) => {
                    let result = ReadResourceResult {
                        contents: vec![ResourceContents {
                            uri: params.uri,
                            mime_type: "application/json",
                            text,
                        }],
                    };
                    success(id, &result)
                }
                Err(err) => {
                    RpcResponse::failure(id, error_codes::INTERNAL_ERROR, err.to_string())
                }
            },
            Err(err) => RpcResponse::failure(
                id,
                error_codes::INVALID_PARAMS,
                format!("invalid params: {}", err),
            ),
        },
        other => RpcResponse::failure(
            id,
            error_codes::METHOD_NOT_FOUND,
            format!("method not found: {}", other),
        ),
    };
    Some(response)
}

fn success<T: serde::Serialize>(id: Value, result: &T) -> RpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::failure(
            id,
            error_codes::INTERNAL_ERROR,
            format!("failed to serialize result: {}", err),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockApi;
    use serde_json::json;

    fn dispatcher() -> ToolDispatcher {
        ToolDispatcher::new(Arc::new(MockApi::default()))
    }

    fn request(raw: Value) -> RpcRequest {
        serde_json::from_value(raw).unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let response = handle_request(
            &dispatcher(),
            request(json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} })),
        )
        .await
        .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let response = handle_request(
            &dispatcher(),
            request(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" })),
        )
        .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = handle_request(
            &dispatcher(),
            request(json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/uninstall" })),
        )
        .await
        .unwrap();
        assert_eq!(response.error.unwrap().code, error_codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tools_list() {
        let response = handle_request(
            &dispatcher(),
            request(json!({ "jsonrpc": "2.0", "id": 3, "method": "tools/list" })),
        )
        .await
        .unwrap();
        let tools = response.result.unwrap()["tools"].as_array().unwrap().len();
        assert_eq!(tools, 25);
    }

    #[tokio::test]
    async fn test_tool_call_failure_stays_inside_result() {
        let response = handle_request(
            &dispatcher(),
            request(json!({
                "jsonrpc": "2.0",
                "id": 4,
                "method": "tools/call",
                "params": { "name": "get_profile" }
            })),
        )
        .await
        .unwrap();
        // The upstream failed, but the protocol frame is a success whose
        // payload carries isError.
        assert!(response.error.is_none());
        assert_eq!(response.result.unwrap()["isError"], true);
    }

    #[tokio::test]
    async fn test_tool_call_with_bad_params_shape() {
        let response = handle_request(
            &dispatcher(),
            request(json!({
                "jsonrpc": "2.0",
                "id": 5,
                "method": "tools/call",
                "params": { "tool": "get_profile" }
            })),
        )
        .await
        .unwrap();
        assert_eq!(response.error.unwrap().code, error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_malformed_line_is_parse_error() {
        let response = handle_line(&dispatcher(), "{not json").await.unwrap();
        assert_eq!(response.error.unwrap().code, error_codes::PARSE_ERROR);
        assert_eq!(response.id, Value::Null);
    }

    #[tokio::test]
    async fn test_resources_list() {
        let response = handle_request(
            &dispatcher(),
            request(json!({ "jsonrpc": "2.0", "id": 6, "method": "resources/list" })),
        )
        .await
        .unwrap();
        let resources = response.result.unwrap()["resources"]
            .as_array()
            .unwrap()
            .len();
        assert_eq!(resources, 6);
    }
}
