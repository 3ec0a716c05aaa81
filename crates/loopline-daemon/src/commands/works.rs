//! Work, split and pending-payee command handlers.

use std::sync::Arc;

use loopline_royalty::{resolution, splits, SqliteStore};
use loopline_types::{ContentCategory, Payee, SplitModel, SplitSlot, Work, WorkId};
use serde::Deserialize;
use serde_json::Value;

use super::{opt_typed_param, str_param, to_json, typed_param, unix_now, Result};
use crate::rpc::RpcError;
use crate::DaemonState;

/// A payee as sent by clients: either the stored tagged form or raw form
/// text, which is classified as a wallet address or a placeholder name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PayeeInput {
    Tagged(Payee),
    Raw(String),
}

#[derive(Debug, Deserialize)]
struct SlotInput {
    #[serde(default)]
    payee: Option<PayeeInput>,
    #[serde(default)]
    percentage: u8,
}

#[derive(Debug, Default, Deserialize)]
struct SplitsInput {
    #[serde(default)]
    composition: Vec<SlotInput>,
    #[serde(default)]
    production: Vec<SlotInput>,
}

impl SlotInput {
    fn into_slot(self) -> SplitSlot {
        let payee = match self.payee {
            Some(PayeeInput::Tagged(Payee::Pending { name })) => Some(Payee::pending(name.trim())),
            Some(PayeeInput::Tagged(payee)) => Some(payee),
            Some(PayeeInput::Raw(raw)) => Payee::from_input(&raw),
            None => None,
        };
        SplitSlot {
            payee,
            percentage: self.percentage,
        }
    }
}

impl From<SplitsInput> for SplitModel {
    fn from(input: SplitsInput) -> Self {
        Self {
            composition: input.composition.into_iter().map(SlotInput::into_slot).collect(),
            production: input.production.into_iter().map(SlotInput::into_slot).collect(),
        }
    }
}

/// Work fields a client may set. Ownership and timestamps are server-side.
#[derive(Debug, Deserialize)]
struct WorkInput {
    id: String,
    title: String,
    category: ContentCategory,
    #[serde(default)]
    is_draft: bool,
    #[serde(default)]
    source_work_ids: Vec<WorkId>,
    #[serde(default)]
    splits: SplitsInput,
    #[serde(default)]
    remixer_stake_pct: Option<u8>,
}

/// Validate a split model without saving it.
pub async fn validate_splits(_state: &Arc<DaemonState>, params: &Value) -> Result {
    let input: SplitsInput = typed_param(params, "splits")?;
    to_json(&splits::validate_splits(&input.into()))
}

/// Create or update a work owned by `caller`.
pub async fn save_work(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = str_param(params, "caller")?;
    let input: WorkInput = typed_param(params, "work")?;
    let now = unix_now();

    let work = Work {
        id: WorkId::new(input.id),
        uploader: caller.to_string(),
        title: input.title,
        category: input.category,
        is_draft: input.is_draft,
        source_work_ids: input.source_work_ids,
        splits: input.splits.into(),
        remixer_stake_pct: input.remixer_stake_pct,
        is_deleted: false,
        splits_version: 0,
        created_at: now,
        updated_at: now,
    };

    let db = state.db.lock().await;
    let saved = splits::save_work(&SqliteStore::new(&db), caller, work, now)?;
    to_json(&saved)
}

/// Fetch a live work by id.
pub async fn get_work(state: &Arc<DaemonState>, params: &Value) -> Result {
    let work_id = WorkId::new(str_param(params, "work_id")?);

    let db = state.db.lock().await;
    match loopline_db::queries::works::get(&db, &work_id) {
        Ok(Some(work)) if !work.is_deleted => to_json(&work),
        Ok(_) => Err(RpcError::not_found("work", work_id.as_str())),
        Err(e) => Err(RpcError::internal_error(&format!("db error: {e}"))),
    }
}

/// Placeholder names still awaiting resolution on an uploader's works.
pub async fn list_pending(state: &Arc<DaemonState>, params: &Value) -> Result {
    let uploader = str_param(params, "uploader")?;

    let db = state.db.lock().await;
    to_json(&resolution::list_pending(&SqliteStore::new(&db), uploader)?)
}

/// Rewrite a placeholder to a wallet identity.
///
/// With `work_ids` only those works are attempted; otherwise every live work
/// of the first caller identity is.
pub async fn resolve_pending(state: &Arc<DaemonState>, params: &Value) -> Result {
    let pending_name = str_param(params, "pending_name")?;
    let resolved_identity = str_param(params, "resolved_identity")?;
    let caller_identities: Vec<String> = typed_param(params, "caller_identities")?;
    let work_ids: Option<Vec<WorkId>> = opt_typed_param(params, "work_ids")?;
    let now = unix_now();

    let db = state.db.lock().await;
    let store = SqliteStore::new(&db);
    let outcome = match work_ids {
        Some(ids) => resolution::resolve_pending(
            &store,
            pending_name,
            resolved_identity,
            &ids,
            &caller_identities,
            now,
        )?,
        None => {
            let uploader = caller_identities
                .first()
                .ok_or_else(|| RpcError::invalid_params("caller_identities must not be empty"))?;
            resolution::resolve_pending_for_uploader(
                &store,
                uploader,
                pending_name,
                resolved_identity,
                now,
            )?
        }
    };
    to_json(&outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_payee_input_is_classified() {
        let input: SplitsInput = serde_json::from_value(serde_json::json!({
            "composition": [
                {"payee": "0xABCDEFabcdefABCDEFabcdefABCDEFabcdefABCD", "percentage": 50},
                {"payee": "  Marcy Rae ", "percentage": 50}
            ],
            "production": [
                {"payee": {"kind": "pending", "name": " DJ Shadow "}, "percentage": 100},
                {"payee": "", "percentage": 0}
            ]
        }))
        .expect("decode");

        let model: SplitModel = input.into();
        assert_eq!(
            model.composition[0].payee,
            Some(Payee::resolved("0xabcdefabcdefabcdefabcdefabcdefabcdefabcd"))
        );
        assert_eq!(model.composition[1].payee, Some(Payee::pending("Marcy Rae")));
        assert_eq!(model.production[0].payee, Some(Payee::pending("DJ Shadow")));
        assert_eq!(model.production[1].payee, None);
        assert!(splits::validate_splits(&model).valid);
    }
}
