//! Usage pricing command handlers.

use std::sync::Arc;

use loopline_royalty::pricing::load_sources;
use loopline_royalty::SqliteStore;
use loopline_types::WorkId;
use serde_json::Value;

use super::{opt_typed_param, to_json, typed_param, Result};
use crate::DaemonState;

/// Price a recording session.
///
/// With `source_work_ids` the track count follows the number of sources and
/// the creators' share is attributed to their split holders, through the
/// lineage of any derivative source. Without it, `track_count` (default 1)
/// is priced on its own.
pub async fn calculate_cost(state: &Arc<DaemonState>, params: &Value) -> Result {
    let bars: i64 = typed_param(params, "bars")?;
    let source_ids: Option<Vec<WorkId>> = opt_typed_param(params, "source_work_ids")?;

    match source_ids {
        Some(ids) => {
            let db = state.db.lock().await;
            let sources = load_sources(&SqliteStore::new(&db), &ids)?;
            drop(db);
            to_json(&state.calculator.recording_breakdown(bars, &sources)?)
        }
        None => {
            let track_count: u32 = opt_typed_param(params, "track_count")?.unwrap_or(1);
            to_json(&state.calculator.calculate_cost(bars, track_count)?)
        }
    }
}

/// Effective pricing and metering configuration.
pub async fn get_config(state: &Arc<DaemonState>) -> Result {
    Ok(serde_json::json!({
        "pricing": to_json(&state.config.pricing)?,
        "metering": to_json(&state.config.metering)?,
    }))
}
