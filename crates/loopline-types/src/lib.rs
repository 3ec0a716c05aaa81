//! # loopline-types
//!
//! Shared domain types used across the Loopline workspace: works and their
//! ownership splits, access passes, play records and the result shapes
//! returned by the royalty engine.

pub mod pass;
pub mod split;
pub mod usage;
pub mod work;

pub use pass::{
    Pass, PassId, PassState, PassStatusReport, PlayReceipt, PlayRecord, PreviewPlay, WorkUsage,
};
pub use split::{
    Payee, PayeeShare, PendingPlaceholder, SplitCategory, SplitModel, SplitSlot, SplitValidation,
};
pub use usage::{CostBreakdown, RecordingBreakdown, ResolutionOutcome, ShareSplit};
pub use work::{ContentCategory, Work, WorkId};

/// Micro-units per currency unit (1 unit = 1,000,000 micro-units).
pub const MICRO_UNITS_PER_UNIT: u64 = 1_000_000;

/// Maximum populated slots per split category.
pub const MAX_SLOTS_PER_CATEGORY: usize = 3;

/// Maximum direct source works of a recording.
pub const MAX_SOURCE_WORKS: usize = 2;

/// Length of a wallet address: `0x` followed by 40 hex digits.
pub const WALLET_ADDRESS_LEN: usize = 42;

/// Errors raised when decoding stored enum values.
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    /// Unknown content category string.
    #[error("unknown content category: {0}")]
    UnknownCategory(String),

    /// Unknown pass state string.
    #[error("unknown pass state: {0}")]
    UnknownPassState(String),
}

/// Returns `true` if `s` is a well-formed wallet address (`0x` + 40 hex).
pub fn is_wallet_address(s: &str) -> bool {
    s.len() == WALLET_ADDRESS_LEN
        && (s.starts_with("0x") || s.starts_with("0X"))
        && hex::decode(&s[2..]).is_ok()
}
