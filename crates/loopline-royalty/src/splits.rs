//! Split model validation and pro-rata allocation.
//!
//! A work's ownership is recorded in two categories, composition and
//! production, each with at most [`MAX_SLOTS_PER_CATEGORY`] slots:
//!
//! - A category with no populated slots records no claim and is valid.
//! - Otherwise populated percentages must sum to exactly 100.
//! - A populated slot must carry a non-zero percentage.
//! - An empty slot must carry 0%.
//!
//! Pending placeholders are valid payees. Money allocated to them is
//! computed and reported with `pending: true`; routing waits for resolution.

use loopline_types::{
    Payee, PayeeShare, SplitCategory, SplitModel, SplitSlot, SplitValidation, Work,
    MAX_SLOTS_PER_CATEGORY, MAX_SOURCE_WORKS,
};

use crate::store::WorkStore;
use crate::{Result, RoyaltyError};

/// Validate a split model, reporting the first problem as a reason string.
pub fn validate_splits(model: &SplitModel) -> SplitValidation {
    match check_splits(model) {
        Ok(()) => SplitValidation {
            valid: true,
            error_reason: None,
        },
        Err(e) => SplitValidation {
            valid: false,
            error_reason: Some(e.to_string()),
        },
    }
}

/// Validate a split model.
///
/// # Errors
///
/// - [`RoyaltyError::Validation`] for slot-level problems
/// - [`RoyaltyError::InvalidSplitTotal`] if a populated category does not sum to 100
pub fn check_splits(model: &SplitModel) -> Result<()> {
    check_category(SplitCategory::Composition, &model.composition)?;
    check_category(SplitCategory::Production, &model.production)?;
    Ok(())
}

fn check_category(category: SplitCategory, slots: &[SplitSlot]) -> Result<()> {
    if slots.len() > MAX_SLOTS_PER_CATEGORY {
        return Err(RoyaltyError::Validation(format!(
            "{category} has {} slots, at most {MAX_SLOTS_PER_CATEGORY} allowed",
            slots.len()
        )));
    }

    let mut total: u16 = 0;
    let mut populated = 0usize;
    for (index, slot) in slots.iter().enumerate() {
        match &slot.payee {
            None if slot.percentage > 0 => {
                return Err(RoyaltyError::Validation(format!(
                    "{category} slot {} has {}% but no payee",
                    index + 1,
                    slot.percentage
                )));
            }
            None => {}
            Some(payee) => {
                if payee.label().trim().is_empty() {
                    return Err(RoyaltyError::Validation(format!(
                        "{category} slot {} has a blank payee",
                        index + 1
                    )));
                }
                if slot.percentage == 0 {
                    return Err(RoyaltyError::Validation(format!(
                        "{category} slot {} ({}) has a zero percentage",
                        index + 1,
                        payee.label()
                    )));
                }
                populated += 1;
                total += u16::from(slot.percentage);
            }
        }
    }

    if populated > 0 && total != 100 {
        return Err(RoyaltyError::InvalidSplitTotal { category, total });
    }
    Ok(())
}

/// Allocate `amount` across the populated slots pro rata.
///
/// The rounding remainder goes to the first populated slot so the shares
/// always sum to `amount`. Returns an empty list if no slot is populated.
///
/// # Errors
///
/// - [`RoyaltyError::Overflow`] on arithmetic overflow
pub fn allocate(amount: u64, slots: &[SplitSlot]) -> Result<Vec<PayeeShare>> {
    let mut shares: Vec<PayeeShare> = Vec::with_capacity(slots.len());
    let mut allocated: u64 = 0;

    for slot in slots {
        let Some(payee) = &slot.payee else { continue };
        let share = amount
            .checked_mul(u64::from(slot.percentage))
            .ok_or(RoyaltyError::Overflow)?
            / 100;
        allocated = allocated.checked_add(share).ok_or(RoyaltyError::Overflow)?;
        shares.push(PayeeShare {
            payee: payee.clone(),
            amount: share,
            pending: payee.is_pending(),
        });
    }

    if let Some(first) = shares.first_mut() {
        first.amount += amount.saturating_sub(allocated);
    }
    Ok(shares)
}

/// Distribute a work's creator pool over its split model.
///
/// `composition_pct` of the pool goes to composition slots and the rest to
/// production slots. An empty category passes its part to the other one;
/// with no claims recorded at all the uploader receives the whole pool.
///
/// # Errors
///
/// - [`RoyaltyError::Validation`] if `composition_pct` exceeds 100
/// - [`RoyaltyError::Overflow`] on arithmetic overflow
pub fn distribute_to_work(
    amount: u64,
    work: &Work,
    composition_pct: u8,
) -> Result<Vec<PayeeShare>> {
    if composition_pct > 100 {
        return Err(RoyaltyError::Validation(format!(
            "composition share {composition_pct}% exceeds 100"
        )));
    }

    let has_composition = work.splits.composition.iter().any(SplitSlot::is_populated);
    let has_production = work.splits.production.iter().any(SplitSlot::is_populated);

    let shares = match (has_composition, has_production) {
        (true, true) => {
            let composition_pool = amount
                .checked_mul(u64::from(composition_pct))
                .ok_or(RoyaltyError::Overflow)?
                / 100;
            let mut shares = allocate(composition_pool, &work.splits.composition)?;
            shares.extend(allocate(amount - composition_pool, &work.splits.production)?);
            shares
        }
        (true, false) => allocate(amount, &work.splits.composition)?,
        (false, true) => allocate(amount, &work.splits.production)?,
        (false, false) => vec![PayeeShare {
            payee: Payee::resolved(work.uploader.clone()),
            amount,
            pending: false,
        }],
    };

    Ok(merge_shares(shares))
}

/// Merge shares owed to the same payee, keeping first-seen order.
pub fn merge_shares(shares: Vec<PayeeShare>) -> Vec<PayeeShare> {
    let mut merged: Vec<PayeeShare> = Vec::with_capacity(shares.len());
    for share in shares {
        match merged.iter_mut().find(|m| same_payee(&m.payee, &share.payee)) {
            Some(existing) => existing.amount += share.amount,
            None => merged.push(share),
        }
    }
    merged
}

/// Resolved identities compare ignoring ASCII case; placeholders compare by
/// case-insensitive name.
fn same_payee(a: &Payee, b: &Payee) -> bool {
    match (a, b) {
        (Payee::Resolved { identity: x }, Payee::Resolved { identity: y }) => {
            x.eq_ignore_ascii_case(y)
        }
        (Payee::Pending { name }, other) => other.matches_pending(name),
        _ => false,
    }
}

/// Distinct placeholder names in a model, first spelling wins.
pub fn pending_names(model: &SplitModel) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for slot in model.iter_slots() {
        if let Some(Payee::Pending { name }) = &slot.payee {
            if !names.iter().any(|n| n.to_lowercase() == name.to_lowercase()) {
                names.push(name.clone());
            }
        }
    }
    names
}

/// Create or update a work on behalf of `caller`.
///
/// Splits are validated before anything is written. An existing work may only
/// be replaced by its uploader; the uploader and creation time are preserved.
///
/// # Errors
///
/// - [`RoyaltyError::Validation`] / [`RoyaltyError::InvalidSplitTotal`] for bad input
/// - [`RoyaltyError::NotOwner`] if `caller` did not upload the existing work
/// - [`RoyaltyError::WorkNotFound`] if a source work does not exist
pub fn save_work<S: WorkStore + ?Sized>(
    store: &S,
    caller: &str,
    mut work: Work,
    now: u64,
) -> Result<Work> {
    if work.id.as_str().trim().is_empty() {
        return Err(RoyaltyError::Validation("work id is required".into()));
    }
    if caller.trim().is_empty() {
        return Err(RoyaltyError::Validation("caller identity is required".into()));
    }
    if work.title.trim().is_empty() {
        return Err(RoyaltyError::Validation("title is required".into()));
    }
    if work.source_work_ids.len() > MAX_SOURCE_WORKS {
        return Err(RoyaltyError::Validation(format!(
            "a recording has at most {MAX_SOURCE_WORKS} source works, got {}",
            work.source_work_ids.len()
        )));
    }
    if work.source_work_ids.contains(&work.id) {
        return Err(RoyaltyError::Validation("a work cannot be its own source".into()));
    }
    if let Some(pct) = work.remixer_stake_pct {
        if pct > 100 {
            return Err(RoyaltyError::Validation(format!(
                "remixer stake {pct}% exceeds 100"
            )));
        }
    }
    check_splits(&work.splits)?;

    for source in &work.source_work_ids {
        if store.load_work(source)?.is_none() {
            return Err(RoyaltyError::WorkNotFound(source.to_string()));
        }
    }

    match store.load_work(&work.id)? {
        Some(existing) => {
            if !existing.uploader.eq_ignore_ascii_case(caller) {
                return Err(RoyaltyError::NotOwner {
                    work_id: work.id.to_string(),
                    caller: caller.to_string(),
                });
            }
            work.uploader = existing.uploader;
            work.created_at = existing.created_at;
            work.splits_version = existing.splits_version + 1;
        }
        None => {
            work.uploader = caller.to_string();
            work.created_at = now;
            work.splits_version = 0;
        }
    }
    work.updated_at = now;

    store.save_work(&work)?;

    let pending = pending_names(&work.splits);
    tracing::info!(
        work_id = %work.id,
        uploader = %work.uploader,
        pending = pending.len(),
        "work saved"
    );
    Ok(work)
}
