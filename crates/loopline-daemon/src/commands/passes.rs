//! Pass, play and preview command handlers.

use std::sync::Arc;

use loopline_royalty::SqliteStore;
use loopline_types::{ContentCategory, PassId, WorkId};
use serde_json::Value;

use super::{opt_str_param, opt_typed_param, str_param, to_json, typed_param, unix_now, Result};
use crate::DaemonState;

/// Issue a new pass to `payer`.
pub async fn issue_pass(state: &Arc<DaemonState>, params: &Value) -> Result {
    let payer = str_param(params, "payer")?;
    let tx_reference = opt_str_param(params, "tx_reference");

    let db = state.db.lock().await;
    let pass = state
        .meter
        .issue_pass(&SqliteStore::new(&db), payer, tx_reference, unix_now())?;
    to_json(&pass)
}

/// Record a metered play.
pub async fn log_play(state: &Arc<DaemonState>, params: &Value) -> Result {
    let pass_id = PassId::new(str_param(params, "pass_id")?);
    let work_id = WorkId::new(str_param(params, "work_id")?);
    let category: ContentCategory = typed_param(params, "category")?;
    let duration_seconds: Option<u32> = opt_typed_param(params, "duration_seconds")?;

    let db = state.db.lock().await;
    let receipt = state.meter.log_play(
        &SqliteStore::new(&db),
        &pass_id,
        &work_id,
        category,
        duration_seconds,
        unix_now(),
    )?;
    to_json(&receipt)
}

/// Record an unpaid preview. Always succeeds once params are well-formed.
pub async fn log_preview(state: &Arc<DaemonState>, params: &Value) -> Result {
    let work_id = WorkId::new(str_param(params, "work_id")?);
    let listener = opt_str_param(params, "listener");
    let duration_seconds: Option<u32> = opt_typed_param(params, "duration_seconds")?;

    let db = state.db.lock().await;
    state.meter.log_preview(
        &SqliteStore::new(&db),
        &work_id,
        listener,
        duration_seconds,
        unix_now(),
    );
    Ok(serde_json::json!({"accepted": true}))
}

/// Live status of a pass.
pub async fn pass_status(state: &Arc<DaemonState>, params: &Value) -> Result {
    let pass_id = PassId::new(str_param(params, "pass_id")?);

    let db = state.db.lock().await;
    let report = state
        .meter
        .pass_status(&SqliteStore::new(&db), &pass_id, unix_now())?;
    to_json(&report)
}

/// Per-work plays and credits under a pass.
pub async fn pass_usage(state: &Arc<DaemonState>, params: &Value) -> Result {
    let pass_id = PassId::new(str_param(params, "pass_id")?);

    let db = state.db.lock().await;
    to_json(&state.meter.pass_usage(&SqliteStore::new(&db), &pass_id)?)
}

/// Close a lapsed pass after its payout has been made.
pub async fn mark_pass_distributed(state: &Arc<DaemonState>, params: &Value) -> Result {
    let pass_id = PassId::new(str_param(params, "pass_id")?);

    let db = state.db.lock().await;
    let pass = state
        .meter
        .mark_distributed(&SqliteStore::new(&db), &pass_id, unix_now())?;
    to_json(&pass)
}
