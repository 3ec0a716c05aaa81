//! IPC command handlers.
//!
//! Each submodule implements the commands for one IPC category. Handlers
//! lock the shared connection for the whole call, so engine operations are
//! serialized per process.

pub mod passes;
pub mod usage;
pub mod works;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::rpc::RpcError;

type Result = std::result::Result<Value, RpcError>;

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Required string parameter.
fn str_param<'a>(params: &'a Value, key: &str) -> std::result::Result<&'a str, RpcError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

/// Optional string parameter; JSON null counts as absent.
fn opt_str_param(params: &Value, key: &str) -> Option<String> {
    params.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

/// Required parameter decoded into `T`.
fn typed_param<T: DeserializeOwned>(params: &Value, key: &str) -> std::result::Result<T, RpcError> {
    let raw = params
        .get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))?;
    serde_json::from_value(raw.clone())
        .map_err(|e| RpcError::invalid_params(&format!("{key}: {e}")))
}

/// Optional parameter decoded into `T`.
fn opt_typed_param<T: DeserializeOwned>(
    params: &Value,
    key: &str,
) -> std::result::Result<Option<T>, RpcError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => serde_json::from_value(raw.clone())
            .map(Some)
            .map_err(|e| RpcError::invalid_params(&format!("{key}: {e}"))),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result {
    serde_json::to_value(value).map_err(|e| RpcError::internal_error(&format!("encode error: {e}")))
}
