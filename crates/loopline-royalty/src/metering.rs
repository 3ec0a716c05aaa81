//! Listening passes and weighted play credits.
//!
//! A pass grants [`DEFAULT_PASS_DURATION_HOURS`] of access. Every play logged
//! under a live pass earns credits according to the content category of the
//! work; credits are fixed on the play record at insert time so later
//! changes to the weight table never rewrite history.
//!
//! Liveness is always recomputed from `expires_at`. The stored `Expired`
//! status is housekeeping written by [`Meter::refresh_expired`] and is never
//! relied on when reading.

use loopline_types::{
    ContentCategory, Pass, PassId, PassState, PassStatusReport, PlayReceipt, PlayRecord,
    PreviewPlay, WorkId, WorkUsage,
};
use serde::{Deserialize, Serialize};

use crate::store::PassStore;
use crate::{new_id, Result, RoyaltyError};

/// Default pass lifetime in hours.
pub const DEFAULT_PASS_DURATION_HOURS: u64 = 24;

/// Credits per category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditWeights {
    pub loop_credits: u32,
    pub song_credits: u32,
    pub pack_credits: u32,
}

impl Default for CreditWeights {
    fn default() -> Self {
        Self {
            loop_credits: 1,
            song_credits: 3,
            pack_credits: 5,
        }
    }
}

impl CreditWeights {
    pub fn credits_for(&self, category: ContentCategory) -> u32 {
        match category {
            ContentCategory::Loop => self.loop_credits,
            ContentCategory::Song => self.song_credits,
            ContentCategory::Pack => self.pack_credits,
        }
    }
}

/// Pass and credit parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeteringConfig {
    pub pass_duration_hours: u64,
    pub credit_weights: CreditWeights,
}

impl Default for MeteringConfig {
    fn default() -> Self {
        Self {
            pass_duration_hours: DEFAULT_PASS_DURATION_HOURS,
            credit_weights: CreditWeights::default(),
        }
    }
}

impl MeteringConfig {
    /// # Errors
    ///
    /// - [`RoyaltyError::Validation`] for a zero duration or a zero weight
    pub fn validate(&self) -> Result<()> {
        if self.pass_duration_hours == 0 {
            return Err(RoyaltyError::Validation("pass_duration_hours must be positive".into()));
        }
        if self.pass_duration_hours.checked_mul(3600).is_none() {
            return Err(RoyaltyError::Overflow);
        }
        let w = &self.credit_weights;
        if w.loop_credits == 0 || w.song_credits == 0 || w.pack_credits == 0 {
            return Err(RoyaltyError::Validation("credit weights must be positive".into()));
        }
        Ok(())
    }
}

/// Pass accounting under a validated [`MeteringConfig`].
///
/// The meter holds no connection; every call takes the store it should use.
#[derive(Clone, Debug, Default)]
pub struct Meter {
    config: MeteringConfig,
}

impl Meter {
    /// Build a meter, validating `config` once.
    pub fn new(config: MeteringConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MeteringConfig {
        &self.config
    }

    fn duration_secs(&self) -> u64 {
        self.config.pass_duration_hours.saturating_mul(3600)
    }

    /// Issue a new active pass to `payer`, valid from `now`.
    ///
    /// # Errors
    ///
    /// - [`RoyaltyError::Validation`] if `payer` is blank
    /// - [`RoyaltyError::Overflow`] if the expiry does not fit
    pub fn issue_pass<S: PassStore + ?Sized>(
        &self,
        store: &S,
        payer: &str,
        tx_reference: Option<String>,
        now: u64,
    ) -> Result<Pass> {
        let payer = payer.trim();
        if payer.is_empty() {
            return Err(RoyaltyError::Validation("payer identity is required".into()));
        }
        let expires_at = now
            .checked_add(self.duration_secs())
            .ok_or(RoyaltyError::Overflow)?;

        let pass = Pass {
            id: PassId::new(new_id()),
            payer: payer.to_string(),
            tx_reference: tx_reference.filter(|t| !t.trim().is_empty()),
            purchased_at: now,
            expires_at,
            status: PassState::Active,
        };
        store.insert_pass(&pass)?;

        tracing::info!(pass_id = %pass.id, payer, expires_at, "pass issued");
        Ok(pass)
    }

    /// Record a play of `work_id` under `pass_id`.
    ///
    /// # Errors
    ///
    /// - [`RoyaltyError::PassNotFound`] if the pass does not exist
    /// - [`RoyaltyError::PassInactive`] if the pass was distributed
    /// - [`RoyaltyError::PassExpired`] if `now` is at or past `expires_at`,
    ///   whether or not the pass has been marked expired yet
    /// - [`RoyaltyError::WorkNotFound`] if the work is missing or deleted
    /// - [`RoyaltyError::Validation`] if `category` is not the work's category
    pub fn log_play<S: PassStore + ?Sized>(
        &self,
        store: &S,
        pass_id: &PassId,
        work_id: &WorkId,
        category: ContentCategory,
        duration_seconds: Option<u32>,
        now: u64,
    ) -> Result<PlayReceipt> {
        let pass = store
            .load_pass(pass_id)?
            .ok_or_else(|| RoyaltyError::PassNotFound(pass_id.to_string()))?;
        check_live(&pass, now)?;

        let stored = store
            .work_category(work_id)?
            .ok_or_else(|| RoyaltyError::WorkNotFound(work_id.to_string()))?;
        if stored != category {
            return Err(RoyaltyError::Validation(format!(
                "work {work_id} is a {}, not a {}",
                stored.as_str(),
                category.as_str()
            )));
        }

        let credits = self.config.credit_weights.credits_for(category);
        let record = PlayRecord {
            id: new_id(),
            pass_id: pass_id.clone(),
            work_id: work_id.clone(),
            category,
            credits,
            duration_seconds,
            played_at: now,
        };

        if !store.insert_play_if_live(&record)? {
            // The pass changed between the read and the insert.
            let current = store
                .load_pass(pass_id)?
                .ok_or_else(|| RoyaltyError::PassNotFound(pass_id.to_string()))?;
            check_live(&current, now)?;
            return Err(RoyaltyError::Conflict(format!(
                "play on pass {pass_id} was not recorded"
            )));
        }

        tracing::debug!(
            pass_id = %pass_id,
            work_id = %work_id,
            category = category.as_str(),
            credits,
            "play logged"
        );

        Ok(PlayReceipt {
            play_id: record.id,
            credits,
        })
    }

    /// Live status of a pass with its play totals.
    ///
    /// # Errors
    ///
    /// - [`RoyaltyError::PassNotFound`] if the pass does not exist
    pub fn pass_status<S: PassStore + ?Sized>(
        &self,
        store: &S,
        pass_id: &PassId,
        now: u64,
    ) -> Result<PassStatusReport> {
        let pass = store
            .load_pass(pass_id)?
            .ok_or_else(|| RoyaltyError::PassNotFound(pass_id.to_string()))?;
        let (total_plays, total_credits) = store.play_totals(pass_id)?;

        Ok(PassStatusReport {
            active: pass.is_live(now),
            remaining_seconds: pass.remaining_seconds(now),
            total_plays,
            total_credits,
            status: pass.status,
        })
    }

    /// Plays and credits per work under a pass, for payout.
    ///
    /// # Errors
    ///
    /// - [`RoyaltyError::PassNotFound`] if the pass does not exist
    pub fn pass_usage<S: PassStore + ?Sized>(
        &self,
        store: &S,
        pass_id: &PassId,
    ) -> Result<Vec<WorkUsage>> {
        if store.load_pass(pass_id)?.is_none() {
            return Err(RoyaltyError::PassNotFound(pass_id.to_string()));
        }
        store.usage_by_work(pass_id)
    }

    /// Move a lapsed pass to the terminal `Distributed` state.
    ///
    /// # Errors
    ///
    /// - [`RoyaltyError::PassNotFound`] if the pass does not exist
    /// - [`RoyaltyError::PassInactive`] if it was already distributed
    /// - [`RoyaltyError::Validation`] if the pass is still live at `now`
    pub fn mark_distributed<S: PassStore + ?Sized>(
        &self,
        store: &S,
        pass_id: &PassId,
        now: u64,
    ) -> Result<Pass> {
        let mut pass = store
            .load_pass(pass_id)?
            .ok_or_else(|| RoyaltyError::PassNotFound(pass_id.to_string()))?;
        if pass.status == PassState::Distributed {
            return Err(RoyaltyError::PassInactive {
                status: PassState::Distributed,
            });
        }
        if pass.is_live(now) {
            return Err(RoyaltyError::Validation(format!(
                "pass {pass_id} is active until {}",
                pass.expires_at
            )));
        }

        store.set_pass_status(pass_id, PassState::Distributed)?;
        pass.status = PassState::Distributed;

        tracing::info!(pass_id = %pass_id, "pass marked distributed");
        Ok(pass)
    }

    /// Write `Expired` on every active pass that has lapsed by `now`.
    pub fn refresh_expired<S: PassStore + ?Sized>(&self, store: &S, now: u64) -> Result<usize> {
        let count = store.expire_lapsed(now)?;
        if count > 0 {
            tracing::info!(count, "lapsed passes marked expired");
        }
        Ok(count)
    }

    /// Record an unpaid preview sample. Never fails the caller.
    pub fn log_preview<S: PassStore + ?Sized>(
        &self,
        store: &S,
        work_id: &WorkId,
        listener: Option<String>,
        duration_seconds: Option<u32>,
        now: u64,
    ) {
        if work_id.as_str().trim().is_empty() {
            tracing::warn!("preview without work id ignored");
            return;
        }
        let preview = PreviewPlay {
            work_id: work_id.clone(),
            listener,
            duration_seconds,
            played_at: now,
        };
        if let Err(e) = store.insert_preview(&preview) {
            tracing::warn!(work_id = %work_id, error = %e, "failed to record preview");
        }
    }

    pub fn preview_count<S: PassStore + ?Sized>(&self, store: &S, work_id: &WorkId) -> Result<u64> {
        store.preview_count(work_id)
    }
}

/// Lapsed passes report `PassExpired` whether or not `refresh_expired` has
/// written `Expired` yet; only a distributed pass is `PassInactive`.
fn check_live(pass: &Pass, now: u64) -> Result<()> {
    match pass.status {
        PassState::Distributed => Err(RoyaltyError::PassInactive {
            status: pass.status,
        }),
        PassState::Expired => Err(RoyaltyError::PassExpired {
            expires_at: pass.expires_at,
            now,
        }),
        PassState::Active if now >= pass.expires_at => Err(RoyaltyError::PassExpired {
            expires_at: pass.expires_at,
            now,
        }),
        PassState::Active => Ok(()),
    }
}
