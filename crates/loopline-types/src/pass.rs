//! Listening passes and play records.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::work::{ContentCategory, WorkId};
use crate::TypeError;

/// Pass identifier (hex).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct PassId(pub String);

impl PassId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored pass status.
///
/// `Expired` is only ever written by housekeeping; liveness is always
/// recomputed from `expires_at`. `Distributed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PassState {
    Active,
    Expired,
    Distributed,
}

impl PassState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Distributed => "distributed",
        }
    }
}

impl std::fmt::Display for PassState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PassState {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "distributed" => Ok(Self::Distributed),
            other => Err(TypeError::UnknownPassState(other.to_string())),
        }
    }
}

/// A time-boxed access grant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct Pass {
    pub id: PassId,
    /// Identity that paid for the pass.
    pub payer: String,
    /// Optional on-chain payment reference.
    pub tx_reference: Option<String>,
    pub purchased_at: u64,
    pub expires_at: u64,
    pub status: PassState,
}

impl Pass {
    /// Whether the pass accepts plays at `now`.
    pub fn is_live(&self, now: u64) -> bool {
        self.status == PassState::Active && now < self.expires_at
    }

    /// Seconds left before expiry, never negative.
    pub fn remaining_seconds(&self, now: u64) -> u64 {
        self.expires_at.saturating_sub(now)
    }
}

/// One metered playback. Insert-only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct PlayRecord {
    pub id: String,
    pub pass_id: PassId,
    pub work_id: WorkId,
    pub category: ContentCategory,
    /// Fixed at insert time.
    pub credits: u32,
    pub duration_seconds: Option<u32>,
    pub played_at: u64,
}

/// Unpaid preview sample, analytics only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct PreviewPlay {
    pub work_id: WorkId,
    pub listener: Option<String>,
    pub duration_seconds: Option<u32>,
    pub played_at: u64,
}

/// Returned from a successful play log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct PlayReceipt {
    pub play_id: String,
    pub credits: u32,
}

/// Live view of a pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct PassStatusReport {
    pub active: bool,
    pub remaining_seconds: u64,
    pub total_plays: u64,
    pub total_credits: u64,
    /// Stored status, which may lag behind `active`.
    pub status: PassState,
}

/// Aggregate plays and credits for one work under a pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct WorkUsage {
    pub work_id: WorkId,
    pub plays: u64,
    pub credits: u64,
}
