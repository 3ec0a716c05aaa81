//! # loopline-royalty
//!
//! Royalty and revenue distribution engine.
//!
//! Decides, for every unit of paid usage of a work, who is owed money and how
//! much, and keeps ownership records consistent when a placeholder payee
//! finally registers a wallet.
//!
//! ## Modules
//!
//! - [`splits`]: Split model validation, pro-rata allocation, work saves
//! - [`resolution`]: Rewriting pending placeholders across an uploader's works
//! - [`pricing`]: Block-quantized usage pricing and the three-way split
//! - [`metering`]: Listening passes, weighted play credits, previews
//! - [`store`]: Persistence traits and the SQLite-backed store

pub mod metering;
pub mod pricing;
pub mod resolution;
pub mod splits;
pub mod store;

use loopline_types::{PassState, SplitCategory};

pub use store::{PassStore, SqliteStore, WorkStore};

/// Error types for royalty operations.
#[derive(Debug, thiserror::Error)]
pub enum RoyaltyError {
    /// Malformed input rejected before any computation or write.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Populated percentages in a category do not sum to 100.
    #[error("{category} split percentages must sum to 100, got {total}")]
    InvalidSplitTotal {
        /// Category that failed.
        category: SplitCategory,
        /// The actual total.
        total: u16,
    },

    /// Work does not exist (or is soft-deleted where a live work is needed).
    #[error("work not found: {0}")]
    WorkNotFound(String),

    /// Caller is not the uploader of the work.
    #[error("{caller} does not own work {work_id}")]
    NotOwner {
        /// Work being modified.
        work_id: String,
        /// Identity that attempted the change.
        caller: String,
    },

    /// Pass does not exist.
    #[error("pass not found: {0}")]
    PassNotFound(String),

    /// Pass lapsed; stored status may still read active.
    #[error("pass expired at {expires_at} (now {now})")]
    PassExpired {
        /// When the pass expired.
        expires_at: u64,
        /// The time of the rejected call.
        now: u64,
    },

    /// Pass is in a non-active stored state.
    #[error("pass is {status}")]
    PassInactive {
        /// The stored status.
        status: PassState,
    },

    /// Arithmetic overflow.
    #[error("arithmetic overflow in royalty calculation")]
    Overflow,

    /// Concurrent writer won.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Persistence failure.
    #[error("storage error: {0}")]
    Storage(#[from] loopline_db::DbError),
}

/// Convenience result type for royalty operations.
pub type Result<T> = std::result::Result<T, RoyaltyError>;

/// Generate a random 128-bit hex identifier.
pub(crate) fn new_id() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}
