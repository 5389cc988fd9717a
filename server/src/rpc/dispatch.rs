//! Method dispatch for the streaming RPC surface.

use serde::Deserialize;
use serde_json::{json, Value};

use super::protocol::{Request, Response, RpcError, JSONRPC_VERSION};
use crate::service::{redact_pdf, RedactRequest};
use crate::state::AppState;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const TOOL_NAME: &str = "redact_pdf";

#[derive(Debug, Deserialize)]
struct ToolCall {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

fn tool_descriptor() -> Value {
    json!({
        "name": TOOL_NAME,
        "description": "Redact PII (emails, phone numbers, SSNs, people, places, organizations) \
                        from a base64-encoded PDF. Optionally re-redact through an external model.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "pdf_base64": {"type": "string", "description": "Base64-encoded PDF bytes"},
                "retry_with_ai": {"type": "boolean", "default": false}
            },
            "required": ["pdf_base64"]
        }
    })
}

fn initialize_result(params: Option<&Value>) -> Value {
    let version = params
        .and_then(|p| p.get("protocolVersion"))
        .and_then(Value::as_str)
        .unwrap_or(PROTOCOL_VERSION);
    json!({
        "protocolVersion": version,
        "capabilities": {"tools": {"listChanged": false}},
        "serverInfo": {"name": "scrub-server", "version": env!("CARGO_PKG_VERSION")}
    })
}

async fn call_tool(state: &AppState, params: Option<Value>) -> Result<Value, RpcError> {
    let params = params.ok_or_else(|| RpcError::invalid_params("missing params"))?;
    let call: ToolCall = serde_json::from_value(params).map_err(RpcError::invalid_params)?;
    if call.name != TOOL_NAME {
        return Err(RpcError::invalid_params(format!("unknown tool: {}", call.name)));
    }
    let arguments = call.arguments.unwrap_or_else(|| json!({}));
    let request: RedactRequest =
        serde_json::from_value(arguments).map_err(RpcError::invalid_params)?;

    // Tool failures are results, not protocol errors.
    let result = match redact_pdf(state, request).await {
        Ok(response) => {
            let structured = serde_json::to_value(&response).map_err(RpcError::internal)?;
            json!({
                "content": [{"type": "text", "text": response.summary}],
                "structuredContent": structured,
                "isError": false
            })
        }
        Err(err) => json!({
            "content": [{"type": "text", "text": err.to_string()}],
            "isError": true
        }),
    };
    Ok(result)
}

async fn dispatch(state: &AppState, request: Request) -> Result<Value, RpcError> {
    match request.method.as_str() {
        "initialize" => Ok(initialize_result(request.params.as_ref())),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({"tools": [tool_descriptor()]})),
        "tools/call" => call_tool(state, request.params).await,
        other => Err(RpcError::method_not_found(other)),
    }
}

/// Handles one raw message; `None` when no reply is due (notifications).
pub async fn handle_message(state: &AppState, body: &str) -> Option<Response> {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => return Some(Response::failure(Value::Null, RpcError::parse(e))),
    };
    let id = value.get("id").cloned().unwrap_or(Value::Null);

    let request: Request = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => return Some(Response::failure(id, RpcError::invalid_request(e))),
    };
    if request.jsonrpc != JSONRPC_VERSION {
        return Some(Response::failure(
            id,
            RpcError::invalid_request(format!("unsupported jsonrpc version {}", request.jsonrpc)),
        ));
    }

    let notification = request.is_notification();
    let method = request.method.clone();
    let outcome = dispatch(state, request).await;
    if notification {
        if let Err(err) = outcome {
            tracing::debug!(method = %method, error = %err.message, "notification ignored");
        }
        return None;
    }

    Some(match outcome {
        Ok(result) => Response::success(id, result),
        Err(error) => {
            tracing::warn!(method = %method, code = error.code, "rpc call failed");
            Response::failure(id, error)
        }
    })
}
