//! Block-quantized usage pricing.
//!
//! Recording over existing works is billed in blocks of
//! [`BLOCK_SIZE_BARS`] bars; any partial block is billed as a whole one.
//! The total is split three ways:
//!
//! - **Platform**: Default 10%
//! - **Creators**: Default 70%, paid to the rights-holders of the source works
//! - **Remixer stake**: Default 20%, non-cash, recorded on the new derivative
//!
//! The creators' share absorbs rounding so the three parts always sum to the
//! total.
//!
//! A source that is itself a derivative keeps its remixer stake of whatever
//! it receives and passes the rest up to its own sources, so holders of the
//! original works are paid through every generation of remixes.

use std::collections::BTreeMap;

use loopline_types::{
    CostBreakdown, PayeeShare, RecordingBreakdown, ShareSplit, Work, WorkId, MAX_SOURCE_WORKS,
    MICRO_UNITS_PER_UNIT,
};
use serde::{Deserialize, Serialize};

use crate::splits::{distribute_to_work, merge_shares};
use crate::store::WorkStore;
use crate::{Result, RoyaltyError};

/// Bars per billable block.
pub const BLOCK_SIZE_BARS: u32 = 8;

/// Default price of one block for one track (0.10 in micro-units).
pub const DEFAULT_PRICE_PER_BLOCK: u64 = MICRO_UNITS_PER_UNIT / 10;

/// Default platform share percentage.
pub const DEFAULT_PLATFORM_PCT: u8 = 10;

/// Default creators share percentage.
pub const DEFAULT_CREATORS_PCT: u8 = 70;

/// Default remixer stake percentage.
pub const DEFAULT_REMIXER_STAKE_PCT: u8 = 20;

/// Default part of a work's creator pool owed to composition holders.
pub const DEFAULT_COMPOSITION_PCT: u8 = 50;

const _: () = assert!(
    DEFAULT_PLATFORM_PCT as u16 + DEFAULT_CREATORS_PCT as u16 + DEFAULT_REMIXER_STAKE_PCT as u16
        == 100
);

/// Pricing parameters, fixed for the lifetime of a [`UsageCalculator`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub block_size_bars: u32,
    /// Micro-units per block per track.
    pub price_per_block: u64,
    pub platform_pct: u8,
    pub creators_pct: u8,
    pub remixer_stake_pct: u8,
    pub composition_pct: u8,
}

/// Default pricing: 8-bar blocks at 0.10, split 10/70/20.
pub const DEFAULT_PRICING: PricingConfig = PricingConfig {
    block_size_bars: BLOCK_SIZE_BARS,
    price_per_block: DEFAULT_PRICE_PER_BLOCK,
    platform_pct: DEFAULT_PLATFORM_PCT,
    creators_pct: DEFAULT_CREATORS_PCT,
    remixer_stake_pct: DEFAULT_REMIXER_STAKE_PCT,
    composition_pct: DEFAULT_COMPOSITION_PCT,
};

impl Default for PricingConfig {
    fn default() -> Self {
        DEFAULT_PRICING
    }
}

impl PricingConfig {
    /// Check that the configuration is usable.
    ///
    /// # Errors
    ///
    /// - [`RoyaltyError::Validation`] for a zero block size or price, shares
    ///   that do not sum to 100, or a composition share above 100
    pub fn validate(&self) -> Result<()> {
        if self.block_size_bars == 0 {
            return Err(RoyaltyError::Validation(
                "block_size_bars must be positive".into(),
            ));
        }
        if self.price_per_block == 0 {
            return Err(RoyaltyError::Validation(
                "price_per_block must be positive".into(),
            ));
        }
        let total = u16::from(self.platform_pct)
            + u16::from(self.creators_pct)
            + u16::from(self.remixer_stake_pct);
        if total != 100 {
            return Err(RoyaltyError::Validation(format!(
                "platform, creators and remixer shares must sum to 100, got {total}"
            )));
        }
        if self.composition_pct > 100 {
            return Err(RoyaltyError::Validation(format!(
                "composition_pct {} exceeds 100",
                self.composition_pct
            )));
        }
        Ok(())
    }
}

/// Prices recording sessions under a validated [`PricingConfig`].
#[derive(Clone, Debug)]
pub struct UsageCalculator {
    config: PricingConfig,
}

impl Default for UsageCalculator {
    fn default() -> Self {
        Self {
            config: DEFAULT_PRICING,
        }
    }
}

impl UsageCalculator {
    /// Build a calculator, validating `config` once.
    pub fn new(config: PricingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Number of billable blocks for `bars`, rounding partial blocks up.
    ///
    /// # Errors
    ///
    /// - [`RoyaltyError::Validation`] if `bars` is zero or negative
    /// - [`RoyaltyError::Overflow`] if the block count does not fit in a `u32`
    pub fn block_count(&self, bars: i64) -> Result<u32> {
        let bars = u64::try_from(bars)
            .ok()
            .filter(|b| *b > 0)
            .ok_or_else(|| {
                RoyaltyError::Validation(format!("bars must be positive, got {bars}"))
            })?;
        let blocks = bars.div_ceil(u64::from(self.config.block_size_bars));
        u32::try_from(blocks).map_err(|_| RoyaltyError::Overflow)
    }

    /// `blocks × price_per_block × track_count`, in micro-units.
    ///
    /// # Errors
    ///
    /// - [`RoyaltyError::Validation`] for non-positive bars or a track count
    ///   outside `1..=2`
    /// - [`RoyaltyError::Overflow`] on arithmetic overflow
    pub fn total_cost(&self, bars: i64, track_count: u32) -> Result<u64> {
        check_track_count(track_count)?;
        let blocks = self.block_count(bars)?;
        u64::from(blocks)
            .checked_mul(self.config.price_per_block)
            .and_then(|c| c.checked_mul(u64::from(track_count)))
            .ok_or(RoyaltyError::Overflow)
    }

    /// Three-way split of `total`. Creators take the rounding remainder.
    pub fn split(&self, total: u64) -> Result<ShareSplit> {
        let platform = pct_of(total, self.config.platform_pct)?;
        let remixer_stake = pct_of(total, self.config.remixer_stake_pct)?;
        let creators = total
            .checked_sub(platform)
            .and_then(|r| r.checked_sub(remixer_stake))
            .ok_or(RoyaltyError::Overflow)?;
        Ok(ShareSplit {
            platform,
            creators,
            remixer_stake,
        })
    }

    /// Blocks, total and split for a session.
    pub fn calculate_cost(&self, bars: i64, track_count: u32) -> Result<CostBreakdown> {
        let total_cost = self.total_cost(bars, track_count)?;
        let blocks = self.block_count(bars)?;
        let split = self.split(total_cost)?;

        tracing::debug!(bars, track_count, blocks, total_cost, "usage cost calculated");

        Ok(CostBreakdown {
            blocks,
            total_cost,
            split,
        })
    }

    /// Price a recording over `sources` and attribute the creators' share.
    ///
    /// Each source work receives an equal part of the creators' share (the
    /// first absorbs the remainder). A derivative source with ancestors in
    /// `sources.lineage` keeps its remixer stake of that part for its own
    /// split model and routes the rest to its sources the same way. Every
    /// other work distributes its part through its split model. Placeholder
    /// payees are reported with `pending = true`; nothing is persisted.
    ///
    /// # Errors
    ///
    /// - [`RoyaltyError::Validation`] for no sources, more than
    ///   [`MAX_SOURCE_WORKS`], or bad bars
    /// - [`RoyaltyError::Overflow`] on arithmetic overflow
    pub fn recording_breakdown(
        &self,
        bars: i64,
        sources: &RecordingSources,
    ) -> Result<RecordingBreakdown> {
        let direct = &sources.works;
        if direct.is_empty() || direct.len() > MAX_SOURCE_WORKS {
            return Err(RoyaltyError::Validation(format!(
                "a recording uses 1 to {MAX_SOURCE_WORKS} source works, got {}",
                direct.len()
            )));
        }
        let track_count = u32::try_from(direct.len()).map_err(|_| RoyaltyError::Overflow)?;
        let cost = self.calculate_cost(bars, track_count)?;

        let mut shares = Vec::new();
        let mut path = Vec::new();
        for (work, pool) in direct.iter().zip(equal_parts(cost.split.creators, direct.len())) {
            self.route(pool, work, &sources.lineage, &mut path, &mut shares)?;
        }
        let payouts = merge_shares(shares);
        let has_pending = payouts.iter().any(|p| p.pending);

        Ok(RecordingBreakdown {
            cost,
            source_work_ids: direct.iter().map(|w| w.id.clone()).collect(),
            payouts,
            has_pending,
            remixer_stake_pct: self.config.remixer_stake_pct,
        })
    }

    /// Attribute `pool` to `work`, walking up its lineage. `path` holds the
    /// works above this one so a cycle in recorded sources ends the walk.
    fn route(
        &self,
        pool: u64,
        work: &Work,
        lineage: &BTreeMap<WorkId, Work>,
        path: &mut Vec<WorkId>,
        out: &mut Vec<PayeeShare>,
    ) -> Result<()> {
        path.push(work.id.clone());
        let parents: Vec<&Work> = work
            .source_work_ids
            .iter()
            .filter(|id| !path.contains(id))
            .filter_map(|id| lineage.get(id))
            .collect();

        if parents.is_empty() {
            out.extend(distribute_to_work(pool, work, self.config.composition_pct)?);
        } else {
            let stake = work
                .remixer_stake_pct
                .unwrap_or(self.config.remixer_stake_pct)
                .min(100);
            let kept = pct_of(pool, stake)?;
            if kept > 0 {
                out.extend(distribute_to_work(kept, work, self.config.composition_pct)?);
            }
            for (parent, part) in parents.iter().zip(equal_parts(pool - kept, parents.len())) {
                self.route(part, parent, lineage, path, out)?;
            }
        }

        path.pop();
        Ok(())
    }
}

/// The direct sources of a recording and the live ancestors they derive from.
#[derive(Clone, Debug, Default)]
pub struct RecordingSources {
    /// Direct sources, in the order given. One track each.
    pub works: Vec<Work>,
    /// Transitive ancestors of the derivative sources, by id.
    pub lineage: BTreeMap<WorkId, Work>,
}

impl RecordingSources {
    /// Sources priced without any lineage.
    pub fn direct(works: Vec<Work>) -> Self {
        Self {
            works,
            lineage: BTreeMap::new(),
        }
    }
}

/// Load the live source works of a recording, in the order given, with the
/// ancestors of any derivative among them.
///
/// # Errors
///
/// - [`RoyaltyError::Validation`] if the list is empty, too long or repeats
///   a work
/// - [`RoyaltyError::WorkNotFound`] if a source is missing or soft-deleted
pub fn load_sources<S: WorkStore + ?Sized>(
    store: &S,
    ids: &[WorkId],
) -> Result<RecordingSources> {
    if ids.is_empty() || ids.len() > MAX_SOURCE_WORKS {
        return Err(RoyaltyError::Validation(format!(
            "a recording uses 1 to {MAX_SOURCE_WORKS} source works, got {}",
            ids.len()
        )));
    }
    if ids.len() == 2 && ids[0] == ids[1] {
        return Err(RoyaltyError::Validation(format!(
            "source work {} listed twice",
            ids[0]
        )));
    }

    let mut works = Vec::with_capacity(ids.len());
    for id in ids {
        match store.load_work(id)? {
            Some(work) if !work.is_deleted => works.push(work),
            _ => return Err(RoyaltyError::WorkNotFound(id.to_string())),
        }
    }

    let mut lineage = BTreeMap::new();
    for work in works.iter().filter(|w| w.is_derivative()) {
        for ancestor in store.ancestors(&work.id)? {
            lineage.entry(ancestor.id.clone()).or_insert(ancestor);
        }
    }
    if !lineage.is_empty() {
        tracing::debug!(ancestors = lineage.len(), "recording sources carry lineage");
    }

    Ok(RecordingSources { works, lineage })
}

/// Split `amount` into `parts` equal pieces, the first taking the remainder.
fn equal_parts(amount: u64, parts: usize) -> Vec<u64> {
    let Ok(count) = u64::try_from(parts) else {
        return Vec::new();
    };
    if count == 0 {
        return Vec::new();
    }
    let each = amount / count;
    let mut pieces = vec![each; parts];
    pieces[0] += amount - each * count;
    pieces
}

fn check_track_count(track_count: u32) -> Result<()> {
    if track_count == 0 || track_count as usize > MAX_SOURCE_WORKS {
        return Err(RoyaltyError::Validation(format!(
            "track count must be 1 or 2, got {track_count}"
        )));
    }
    Ok(())
}

fn pct_of(amount: u64, pct: u8) -> Result<u64> {
    Ok(amount
        .checked_mul(u64::from(pct))
        .ok_or(RoyaltyError::Overflow)?
        / 100)
}

#[cfg(test)]
mod tests {
    use loopline_types::{Payee, SplitModel, SplitSlot};

    use super::*;
    use crate::store::memory::MemoryStore;

    const OWNER: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const PRODUCER: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn work(id: &str, splits: SplitModel) -> Work {
        Work {
            id: WorkId::new(id),
            uploader: OWNER.into(),
            title: format!("Work {id}"),
            category: loopline_types::ContentCategory::Loop,
            is_draft: false,
            source_work_ids: Vec::new(),
            splits,
            remixer_stake_pct: None,
            is_deleted: false,
            splits_version: 0,
            created_at: 1000,
            updated_at: 1000,
        }
    }

    #[test]
    fn test_block_count_rounds_up() {
        let calc = UsageCalculator::default();
        assert_eq!(calc.block_count(1).expect("1 bar"), 1);
        assert_eq!(calc.block_count(8).expect("8 bars"), 1);
        assert_eq!(calc.block_count(9).expect("9 bars"), 2);
        assert_eq!(calc.block_count(16).expect("16 bars"), 2);
        assert_eq!(calc.block_count(17).expect("17 bars"), 3);
    }

    #[test]
    fn test_block_count_rejects_non_positive() {
        let calc = UsageCalculator::default();
        assert!(matches!(calc.block_count(0), Err(RoyaltyError::Validation(_))));
        assert!(matches!(calc.block_count(-4), Err(RoyaltyError::Validation(_))));
    }

    #[test]
    fn test_single_block_single_track() {
        let cost = UsageCalculator::default().calculate_cost(8, 1).expect("cost");
        assert_eq!(cost.blocks, 1);
        assert_eq!(cost.total_cost, 100_000);
        assert_eq!(cost.split.platform, 10_000);
        assert_eq!(cost.split.creators, 70_000);
        assert_eq!(cost.split.remixer_stake, 20_000);
    }

    #[test]
    fn test_two_tracks_partial_block() {
        let cost = UsageCalculator::default().calculate_cost(9, 2).expect("cost");
        assert_eq!(cost.blocks, 2);
        assert_eq!(cost.total_cost, 400_000);
        assert_eq!(cost.split.total(), 400_000);
    }

    #[test]
    fn test_track_count_bounds() {
        let calc = UsageCalculator::default();
        assert!(matches!(calc.total_cost(8, 0), Err(RoyaltyError::Validation(_))));
        assert!(matches!(calc.total_cost(8, 3), Err(RoyaltyError::Validation(_))));
    }

    #[test]
    fn test_split_remainder_goes_to_creators() {
        let split = UsageCalculator::default().split(99).expect("split");
        assert_eq!(split.platform, 9);
        assert_eq!(split.remixer_stake, 19);
        assert_eq!(split.creators, 71);
        assert_eq!(split.total(), 99);
    }

    #[test]
    fn test_split_always_sums_to_total() {
        let skewed = UsageCalculator::new(PricingConfig {
            platform_pct: 7,
            creators_pct: 61,
            remixer_stake_pct: 32,
            ..PricingConfig::default()
        })
        .expect("valid config");

        for calc in [UsageCalculator::default(), skewed] {
            for total in (1..5_000u64).step_by(7).chain([u64::MAX / 100]) {
                let split = calc.split(total).expect("split");
                assert_eq!(split.total(), total, "total {total}");
                assert!(split.platform <= split.creators);
            }
        }
    }

    #[test]
    fn test_config_validated_once_at_construction() {
        let bad = PricingConfig {
            platform_pct: 20,
            ..PricingConfig::default()
        };
        assert!(matches!(UsageCalculator::new(bad), Err(RoyaltyError::Validation(_))));

        let zero_block = PricingConfig {
            block_size_bars: 0,
            ..PricingConfig::default()
        };
        assert!(UsageCalculator::new(zero_block).is_err());

        let custom = PricingConfig {
            block_size_bars: 4,
            price_per_block: 250_000,
            ..PricingConfig::default()
        };
        let calc = UsageCalculator::new(custom).expect("valid config");
        assert_eq!(calc.calculate_cost(5, 1).expect("cost").total_cost, 500_000);
    }

    #[test]
    fn test_partial_config_from_toml() {
        let config: PricingConfig = toml::from_str("price_per_block = 50000").expect("parse");
        assert_eq!(config.price_per_block, 50_000);
        assert_eq!(config.block_size_bars, BLOCK_SIZE_BARS);
        assert_eq!(config.creators_pct, DEFAULT_CREATORS_PCT);
    }

    #[test]
    fn test_recording_breakdown_pays_split_holders() {
        let splits = SplitModel {
            composition: vec![SplitSlot::new(Payee::resolved(OWNER), 100)],
            production: vec![
                SplitSlot::new(Payee::resolved(PRODUCER), 50),
                SplitSlot::new(Payee::pending("DJ Shadow"), 50),
            ],
        };
        let source = work("w1", splits);

        let breakdown = UsageCalculator::default()
            .recording_breakdown(8, &RecordingSources::direct(vec![source]))
            .expect("breakdown");

        assert_eq!(breakdown.cost.split.creators, 70_000);
        assert!(breakdown.has_pending);
        assert_eq!(breakdown.remixer_stake_pct, DEFAULT_REMIXER_STAKE_PCT);
        let total: u64 = breakdown.payouts.iter().map(|p| p.amount).sum();
        assert_eq!(total, 70_000);

        let owner = breakdown
            .payouts
            .iter()
            .find(|p| p.payee == Payee::resolved(OWNER))
            .expect("owner share");
        assert_eq!(owner.amount, 35_000);
        let pending = breakdown
            .payouts
            .iter()
            .find(|p| p.pending)
            .expect("pending share");
        assert_eq!(pending.amount, 17_500);
    }

    #[test]
    fn test_recording_breakdown_two_sources_share_equally() {
        let a = work("a", SplitModel::default());
        let mut b = work("b", SplitModel::default());
        b.uploader = PRODUCER.into();

        let breakdown = UsageCalculator::default()
            .recording_breakdown(8, &RecordingSources::direct(vec![a, b]))
            .expect("breakdown");

        assert_eq!(breakdown.cost.total_cost, 200_000);
        assert_eq!(breakdown.payouts.len(), 2);
        assert_eq!(breakdown.payouts[0].amount, 70_000);
        assert_eq!(breakdown.payouts[1].amount, 70_000);
        assert!(!breakdown.has_pending);
    }

    #[test]
    fn test_recording_breakdown_needs_sources() {
        let calc = UsageCalculator::default();
        assert!(matches!(
            calc.recording_breakdown(8, &RecordingSources::default()),
            Err(RoyaltyError::Validation(_))
        ));
    }

    #[test]
    fn test_derivative_source_pays_its_ancestors() {
        let original = work(
            "original",
            SplitModel {
                composition: vec![SplitSlot::new(Payee::resolved(PRODUCER), 100)],
                production: vec![],
            },
        );
        let mut remix = work("remix", SplitModel::default());
        remix.source_work_ids = vec![WorkId::new("original")];
        remix.remixer_stake_pct = Some(25);

        let store = MemoryStore::default();
        store.put(original);
        store.put(remix);

        let sources = load_sources(&store, &[WorkId::new("remix")]).expect("load");
        assert!(sources.lineage.contains_key(&WorkId::new("original")));

        let breakdown = UsageCalculator::default()
            .recording_breakdown(8, &sources)
            .expect("breakdown");

        // 70_000 to the remix: 25% kept by its uploader, the rest upstream.
        let owner = breakdown
            .payouts
            .iter()
            .find(|p| p.payee == Payee::resolved(OWNER))
            .expect("remixer share");
        assert_eq!(owner.amount, 17_500);
        let producer = breakdown
            .payouts
            .iter()
            .find(|p| p.payee == Payee::resolved(PRODUCER))
            .expect("original holder share");
        assert_eq!(producer.amount, 52_500);
        assert_eq!(breakdown.source_work_ids, vec![WorkId::new("remix")]);
    }

    #[test]
    fn test_lineage_walk_survives_cycles() {
        let mut a = work("a", SplitModel::default());
        a.source_work_ids = vec![WorkId::new("b")];
        let mut b = work("b", SplitModel::default());
        b.uploader = PRODUCER.into();
        b.source_work_ids = vec![WorkId::new("a")];

        let store = MemoryStore::default();
        store.put(a);
        store.put(b);

        let sources = load_sources(&store, &[WorkId::new("a")]).expect("load");
        let breakdown = UsageCalculator::default()
            .recording_breakdown(8, &sources)
            .expect("breakdown");

        let paid: u64 = breakdown.payouts.iter().map(|p| p.amount).sum();
        assert_eq!(paid, 70_000);
        assert_eq!(breakdown.payouts.len(), 2);
    }

    #[test]
    fn test_derivative_without_lineage_keeps_whole_pool() {
        let mut remix = work("remix", SplitModel::default());
        remix.source_work_ids = vec![WorkId::new("elsewhere")];

        let breakdown = UsageCalculator::default()
            .recording_breakdown(8, &RecordingSources::direct(vec![remix]))
            .expect("breakdown");

        assert_eq!(breakdown.payouts.len(), 1);
        assert_eq!(breakdown.payouts[0].amount, 70_000);
    }

    #[test]
    fn test_load_sources_rejects_missing_and_deleted() {
        let store = MemoryStore::default();
        store.put(work("live", SplitModel::default()));
        let mut gone = work("gone", SplitModel::default());
        gone.is_deleted = true;
        store.put(gone);

        let loaded = load_sources(&store, &[WorkId::new("live")]).expect("load");
        assert_eq!(loaded.works.len(), 1);
        assert!(loaded.lineage.is_empty());

        assert!(matches!(
            load_sources(&store, &[WorkId::new("live"), WorkId::new("gone")]),
            Err(RoyaltyError::WorkNotFound(id)) if id == "gone"
        ));
        assert!(matches!(
            load_sources(&store, &[WorkId::new("missing")]),
            Err(RoyaltyError::WorkNotFound(_))
        ));
        assert!(matches!(
            load_sources(&store, &[WorkId::new("live"), WorkId::new("live")]),
            Err(RoyaltyError::Validation(_))
        ));
    }
}
