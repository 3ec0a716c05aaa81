//! Pending payee resolution.
//!
//! When a collaborator who was entered by name registers a wallet, the
//! uploader resolves the placeholder: every slot on the uploader's works whose
//! pending name matches (ignoring case) is rewritten to the wallet identity.
//!
//! Each work is an independent read-modify-write guarded by its
//! `splits_version`. The batch is best-effort: a failure on one work is logged
//! and counted, and earlier writes stay in place. Because a resolved slot no
//! longer matches a pending name, the first resolution of a name wins and any
//! later run for the same name is a no-op.

use std::collections::BTreeMap;

use loopline_types::{
    is_wallet_address, Payee, PendingPlaceholder, ResolutionOutcome, SplitModel, WorkId,
};

use crate::store::WorkStore;
use crate::{Result, RoyaltyError};

/// Rewrite every slot pending on `pending_name` to `identity`.
///
/// Returns the number of slots changed.
pub fn rewrite_pending(model: &mut SplitModel, pending_name: &str, identity: &str) -> u32 {
    let mut changed = 0;
    for slot in model.iter_slots_mut() {
        if slot
            .payee
            .as_ref()
            .is_some_and(|p| p.matches_pending(pending_name))
        {
            slot.payee = Some(Payee::resolved(identity));
            changed += 1;
        }
    }
    changed
}

/// Resolve a pending placeholder across the given works.
///
/// Works whose uploader is not among `caller_identities` are skipped, not
/// errored. Missing works are skipped. A load or save failure (including a
/// lost version race) is logged and counted in `works_failed`.
///
/// # Errors
///
/// - [`RoyaltyError::Validation`] if the name is blank, the identity is not a
///   wallet address, or no caller identity is given. Nothing is read or
///   written in that case.
pub fn resolve_pending<S: WorkStore + ?Sized>(
    store: &S,
    pending_name: &str,
    resolved_identity: &str,
    work_ids: &[WorkId],
    caller_identities: &[String],
    now: u64,
) -> Result<ResolutionOutcome> {
    let pending_name = pending_name.trim();
    if pending_name.is_empty() {
        return Err(RoyaltyError::Validation("pending name is required".into()));
    }
    let resolved_identity = resolved_identity.trim();
    if !is_wallet_address(resolved_identity) {
        return Err(RoyaltyError::Validation(format!(
            "resolved identity '{resolved_identity}' is not a wallet address"
        )));
    }
    let identity = resolved_identity.to_ascii_lowercase();
    if caller_identities.iter().all(|c| c.trim().is_empty()) {
        return Err(RoyaltyError::Validation("caller identities are required".into()));
    }

    let mut outcome = ResolutionOutcome::default();
    let mut seen: Vec<&WorkId> = Vec::with_capacity(work_ids.len());

    for work_id in work_ids {
        if seen.contains(&work_id) {
            continue;
        }
        seen.push(work_id);
        outcome.works_processed += 1;

        let work = match store.load_work(work_id) {
            Ok(Some(work)) => work,
            Ok(None) => {
                tracing::debug!(%work_id, "resolution skipped: work not found");
                outcome.works_skipped_missing += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!(%work_id, error = %e, "resolution failed to load work");
                outcome.works_failed += 1;
                continue;
            }
        };

        let owned = caller_identities
            .iter()
            .any(|c| c.trim().eq_ignore_ascii_case(&work.uploader));
        if !owned {
            tracing::debug!(%work_id, uploader = %work.uploader, "resolution skipped: not owner");
            outcome.works_skipped_unowned += 1;
            continue;
        }

        let mut splits = work.splits.clone();
        let changed = rewrite_pending(&mut splits, pending_name, &identity);
        if changed == 0 {
            continue;
        }

        match store.update_splits(work_id, &splits, work.splits_version, now) {
            Ok(true) => {
                outcome.updated_field_count += changed;
                outcome.works_updated += 1;
            }
            Ok(false) => {
                tracing::warn!(
                    %work_id,
                    expected_version = work.splits_version,
                    "resolution lost a concurrent write; work skipped"
                );
                outcome.works_failed += 1;
            }
            Err(e) => {
                tracing::warn!(%work_id, error = %e, "resolution failed to persist work");
                outcome.works_failed += 1;
            }
        }
    }

    tracing::info!(
        pending_name,
        identity = %identity,
        updated_fields = outcome.updated_field_count,
        works_processed = outcome.works_processed,
        works_updated = outcome.works_updated,
        works_failed = outcome.works_failed,
        "pending payee resolution finished"
    );

    Ok(outcome)
}

/// Resolve a placeholder across every live work the uploader owns.
pub fn resolve_pending_for_uploader<S: WorkStore + ?Sized>(
    store: &S,
    uploader: &str,
    pending_name: &str,
    resolved_identity: &str,
    now: u64,
) -> Result<ResolutionOutcome> {
    let work_ids: Vec<WorkId> = store
        .works_by_uploader(uploader)?
        .into_iter()
        .map(|w| w.id)
        .collect();
    resolve_pending(
        store,
        pending_name,
        resolved_identity,
        &work_ids,
        &[uploader.to_string()],
        now,
    )
}

/// Every placeholder still pending on an uploader's live works.
///
/// Names are grouped case-insensitively and sorted by that key.
pub fn list_pending<S: WorkStore + ?Sized>(
    store: &S,
    uploader: &str,
) -> Result<Vec<PendingPlaceholder>> {
    let mut by_key: BTreeMap<String, PendingPlaceholder> = BTreeMap::new();

    for work in store.works_by_uploader(uploader)? {
        for slot in work.splits.iter_slots() {
            let Some(Payee::Pending { name }) = &slot.payee else {
                continue;
            };
            let entry = by_key
                .entry(name.to_lowercase())
                .or_insert_with(|| PendingPlaceholder {
                    name: name.clone(),
                    work_ids: Vec::new(),
                    slot_count: 0,
                });
            entry.slot_count += 1;
            if !entry.work_ids.contains(&work.id) {
                entry.work_ids.push(work.id.clone());
            }
        }
    }

    Ok(by_key.into_values().collect())
}
