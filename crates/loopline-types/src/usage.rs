//! Usage pricing and resolution result shapes.

use serde::{Deserialize, Serialize};

use crate::split::PayeeShare;
use crate::work::WorkId;

/// Three-way partition of a usage cost. Amounts in micro-units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct ShareSplit {
    pub platform: u64,
    pub creators: u64,
    /// Non-cash: recorded as the derivative's stake in itself.
    pub remixer_stake: u64,
}

impl ShareSplit {
    pub fn total(&self) -> u64 {
        self.platform + self.creators + self.remixer_stake
    }
}

/// Cost of a recording session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct CostBreakdown {
    pub blocks: u32,
    /// Micro-units.
    pub total_cost: u64,
    pub split: ShareSplit,
}

/// Cost of a recording plus who the creators' share is owed to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct RecordingBreakdown {
    pub cost: CostBreakdown,
    pub source_work_ids: Vec<WorkId>,
    /// Cash owed to rights-holders of the source works, merged per payee.
    pub payouts: Vec<PayeeShare>,
    /// True if any payout still targets a placeholder.
    pub has_pending: bool,
    /// Stake percentage recorded on the new derivative.
    pub remixer_stake_pct: u8,
}

/// Counts reported by a pending-payee resolution run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct ResolutionOutcome {
    /// Slots rewritten across all works.
    pub updated_field_count: u32,
    /// Every work id attempted, including skipped ones.
    pub works_processed: u32,
    pub works_updated: u32,
    pub works_skipped_unowned: u32,
    pub works_skipped_missing: u32,
    pub works_failed: u32,
}

impl ResolutionOutcome {
    /// True if every attempted work was either updated or had nothing to do.
    pub fn is_complete(&self) -> bool {
        self.works_skipped_unowned == 0 && self.works_skipped_missing == 0 && self.works_failed == 0
    }
}
