//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! newline-delimited JSON-RPC method calls to the command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use loopline_royalty::RoyaltyError;
use loopline_types::PassState;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    #[serde(default)]
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Result or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    /// Error code.
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self {
            code: -32700,
            message: "PARSE_ERROR".to_string(),
            data: None,
        }
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self {
            code: -32600,
            message: "INVALID_REQUEST".to_string(),
            data: None,
        }
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: "METHOD_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"method": method})),
        }
    }

    /// Invalid params (-32602). Also used for engine validation failures.
    pub fn invalid_params(detail: &str) -> Self {
        Self {
            code: -32602,
            message: "INVALID_PARAMS".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self {
            code: -32603,
            message: "INTERNAL_ERROR".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    // Engine errors

    /// Work or pass not found (-32020).
    pub fn not_found(kind: &str, id: &str) -> Self {
        Self {
            code: -32020,
            message: "NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"kind": kind, "id": id})),
        }
    }

    /// Pass expired (-32030).
    pub fn pass_expired(expires_at: u64) -> Self {
        Self {
            code: -32030,
            message: "PASS_EXPIRED".to_string(),
            data: Some(serde_json::json!({"expires_at": expires_at})),
        }
    }

    /// Pass in a non-active stored state (-32031).
    pub fn pass_inactive(status: PassState) -> Self {
        Self {
            code: -32031,
            message: "PASS_INACTIVE".to_string(),
            data: Some(serde_json::json!({"status": status.as_str()})),
        }
    }
}

impl From<RoyaltyError> for RpcError {
    fn from(err: RoyaltyError) -> Self {
        match err {
            RoyaltyError::WorkNotFound(id) => Self::not_found("work", &id),
            RoyaltyError::PassNotFound(id) => Self::not_found("pass", &id),
            RoyaltyError::PassExpired { expires_at, .. } => Self::pass_expired(expires_at),
            RoyaltyError::PassInactive { status } => Self::pass_inactive(status),
            RoyaltyError::Validation(_)
            | RoyaltyError::InvalidSplitTotal { .. }
            | RoyaltyError::NotOwner { .. } => Self::invalid_params(&err.to_string()),
            RoyaltyError::Overflow | RoyaltyError::Conflict(_) | RoyaltyError::Storage(_) => {
                error!(error = %err, "engine failure");
                Self::internal_error(&err.to_string())
            }
        }
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break; // EOF
        }
        if line.trim().is_empty() {
            continue;
        }

        let response = match parse_request(&line) {
            Ok(request) => dispatch_request(state.clone(), request).await,
            Err(err) => RpcResponse::error(serde_json::Value::Null, err),
        };

        let mut response_json = serde_json::to_string(&response)?;
        response_json.push('\n');
        writer.write_all(response_json.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Decode one line: malformed JSON is a parse error, well-formed JSON of the
/// wrong shape or version is an invalid request.
fn parse_request(line: &str) -> std::result::Result<RpcRequest, RpcError> {
    let value: serde_json::Value =
        serde_json::from_str(line).map_err(|_| RpcError::parse_error())?;
    let request: RpcRequest =
        serde_json::from_value(value).map_err(|_| RpcError::invalid_request())?;
    if request.jsonrpc != "2.0" {
        return Err(RpcError::invalid_request());
    }
    Ok(request)
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
async fn dispatch_request(state: Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let method = request.method.as_str();
    let params = &request.params;

    debug!("Dispatching RPC method: {}", method);

    let result = match method {
        // Works & splits
        "validate_splits" => commands::works::validate_splits(&state, params).await,
        "save_work" => commands::works::save_work(&state, params).await,
        "get_work" => commands::works::get_work(&state, params).await,
        "list_pending" => commands::works::list_pending(&state, params).await,
        "resolve_pending" => commands::works::resolve_pending(&state, params).await,

        // Usage pricing
        "calculate_cost" => commands::usage::calculate_cost(&state, params).await,
        "get_config" => commands::usage::get_config(&state).await,

        // Passes & plays
        "issue_pass" => commands::passes::issue_pass(&state, params).await,
        "log_play" => commands::passes::log_play(&state, params).await,
        "log_preview" => commands::passes::log_preview(&state, params).await,
        "pass_status" => commands::passes::pass_status(&state, params).await,
        "pass_usage" => commands::passes::pass_usage(&state, params).await,
        "mark_pass_distributed" => commands::passes::mark_pass_distributed(&state, params).await,

        "shutdown" => {
            let _ = state.shutdown_tx.send(());
            Ok(serde_json::json!({"stopping": true}))
        }

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}
