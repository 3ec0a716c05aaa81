//! Integration test: pricing a recording and attributing the creators' share.
//!
//! Exercises the usage payment flow:
//! 1. Upload two source works with composition and production splits
//! 2. Price an 8-bar-block recording over one and two sources
//! 3. Verify the platform / creators / remixer split sums exactly
//! 4. Verify payouts to placeholders are flagged as pending
//! 5. Resolve the placeholder and verify the same money now has a wallet
//! 6. Verify remixes of remixes pay the holders of the original works
//! 7. Verify deleted sources cannot be priced

use loopline_integration_tests::{
    draft_work, load, save_as, slot, test_db, BASE_TIME, COLLABORATOR_WALLET, OTHER_UPLOADER,
    PRODUCER_WALLET, UPLOADER,
};
use loopline_royalty::pricing::{load_sources, PricingConfig, UsageCalculator};
use loopline_royalty::resolution::resolve_pending;
use loopline_royalty::{RoyaltyError, SqliteStore};
use loopline_types::{ContentCategory, Payee, SplitModel, WorkId};
use rusqlite::Connection;

fn seed(conn: &Connection) {
    save_as(
        conn,
        UPLOADER,
        draft_work(
            "beat",
            ContentCategory::Loop,
            SplitModel {
                composition: vec![
                    slot(Payee::resolved(UPLOADER), 50),
                    slot(Payee::pending("DJ Shadow"), 50),
                ],
                production: vec![slot(Payee::resolved(PRODUCER_WALLET), 100)],
            },
        ),
    );
    save_as(
        conn,
        OTHER_UPLOADER,
        draft_work("vocal", ContentCategory::Song, SplitModel::default()),
    );
}

fn share_of(payouts: &[loopline_types::PayeeShare], payee: &Payee) -> u64 {
    payouts
        .iter()
        .filter(|p| &p.payee == payee)
        .map(|p| p.amount)
        .sum()
}

#[test]
fn single_source_recording() {
    let conn = test_db();
    seed(&conn);
    let store = SqliteStore::new(&conn);
    let calc = UsageCalculator::default();

    // 12 bars -> 2 blocks x 0.10 x 1 track
    let sources = load_sources(&store, &[WorkId::new("beat")]).expect("load sources");
    let breakdown = calc.recording_breakdown(12, &sources).expect("breakdown");

    assert_eq!(breakdown.cost.blocks, 2);
    assert_eq!(breakdown.cost.total_cost, 200_000);
    assert_eq!(breakdown.cost.split.platform, 20_000);
    assert_eq!(breakdown.cost.split.creators, 140_000);
    assert_eq!(breakdown.cost.split.remixer_stake, 40_000);
    assert_eq!(breakdown.cost.split.total(), breakdown.cost.total_cost);
    assert_eq!(breakdown.remixer_stake_pct, 20);

    // Composition 70_000 split 50/50, production 70_000 to the producer.
    assert_eq!(share_of(&breakdown.payouts, &Payee::resolved(UPLOADER)), 35_000);
    assert_eq!(share_of(&breakdown.payouts, &Payee::pending("DJ Shadow")), 35_000);
    let producer = share_of(&breakdown.payouts, &Payee::resolved(PRODUCER_WALLET));
    assert_eq!(producer, 70_000);
    assert!(breakdown.has_pending);

    let paid: u64 = breakdown.payouts.iter().map(|p| p.amount).sum();
    assert_eq!(paid, breakdown.cost.split.creators);

    let json = serde_json::to_value(&breakdown).expect("serialize");
    let kinds: Vec<&str> = json["payouts"]
        .as_array()
        .expect("payouts array")
        .iter()
        .filter_map(|p| p["payee"]["kind"].as_str())
        .collect();
    assert!(kinds.contains(&"pending"));
    assert!(kinds.contains(&"resolved"));
}

#[test]
fn two_source_recording_doubles_track_count() {
    let conn = test_db();
    seed(&conn);
    let store = SqliteStore::new(&conn);
    let calc = UsageCalculator::default();

    let sources = load_sources(&store, &[WorkId::new("beat"), WorkId::new("vocal")])
        .expect("load sources");
    let breakdown = calc.recording_breakdown(9, &sources).expect("breakdown");

    assert_eq!(breakdown.cost.blocks, 2);
    assert_eq!(breakdown.cost.total_cost, 400_000);
    assert_eq!(breakdown.cost.split.creators, 280_000);
    assert_eq!(
        breakdown.source_work_ids,
        vec![WorkId::new("beat"), WorkId::new("vocal")]
    );

    // "vocal" has no splits recorded: its half goes to its uploader.
    let vocal_holder = share_of(&breakdown.payouts, &Payee::resolved(OTHER_UPLOADER));
    assert_eq!(vocal_holder, 140_000);
    let paid: u64 = breakdown.payouts.iter().map(|p| p.amount).sum();
    assert_eq!(paid, 280_000);
}

#[test]
fn resolution_moves_pending_money_to_the_wallet() {
    let conn = test_db();
    seed(&conn);
    let store = SqliteStore::new(&conn);
    let calc = UsageCalculator::default();

    let beat = [WorkId::new("beat")];
    let before = calc
        .recording_breakdown(8, &load_sources(&store, &beat).expect("load"))
        .expect("breakdown");
    let pending_amount = share_of(&before.payouts, &Payee::pending("DJ Shadow"));
    assert!(pending_amount > 0);

    resolve_pending(
        &store,
        "dj shadow",
        COLLABORATOR_WALLET,
        &[WorkId::new("beat")],
        &[UPLOADER.to_string()],
        BASE_TIME + 60,
    )
    .expect("resolve");

    let after = calc
        .recording_breakdown(8, &load_sources(&store, &beat).expect("load"))
        .expect("breakdown");
    assert!(!after.has_pending);
    assert_eq!(
        share_of(&after.payouts, &Payee::resolved(COLLABORATOR_WALLET)),
        pending_amount
    );
    assert_eq!(after.cost, before.cost);
}

#[test]
fn derivative_records_its_sources() {
    let conn = test_db();
    seed(&conn);

    let mut remix = draft_work("remix", ContentCategory::Song, SplitModel::default());
    remix.source_work_ids = vec![WorkId::new("beat"), WorkId::new("vocal")];
    remix.remixer_stake_pct = Some(20);
    let saved = save_as(&conn, COLLABORATOR_WALLET, remix);
    assert!(saved.is_derivative());

    let loaded = load(&conn, "remix");
    assert_eq!(loaded.source_work_ids, vec![WorkId::new("beat"), WorkId::new("vocal")]);
    assert_eq!(loaded.remixer_stake_pct, Some(20));
}

#[test]
fn remix_of_remix_reaches_original_holders() {
    let conn = test_db();
    seed(&conn);

    let mut remix = draft_work("remix", ContentCategory::Song, SplitModel::default());
    remix.source_work_ids = vec![WorkId::new("beat"), WorkId::new("vocal")];
    remix.remixer_stake_pct = Some(20);
    save_as(&conn, COLLABORATOR_WALLET, remix);

    // No stake recorded: the configured default applies.
    let mut second = draft_work("second", ContentCategory::Song, SplitModel::default());
    second.source_work_ids = vec![WorkId::new("remix")];
    save_as(&conn, OTHER_UPLOADER, second);

    let store = SqliteStore::new(&conn);
    let sources = load_sources(&store, &[WorkId::new("second")]).expect("load sources");
    let mut lineage: Vec<&str> = sources.lineage.keys().map(WorkId::as_str).collect();
    lineage.sort_unstable();
    assert_eq!(lineage, vec!["beat", "remix", "vocal"]);

    let breakdown = UsageCalculator::default()
        .recording_breakdown(8, &sources)
        .expect("breakdown");
    assert_eq!(breakdown.cost.split.creators, 70_000);
    assert_eq!(breakdown.source_work_ids, vec![WorkId::new("second")]);

    // 70_000 -> "second" keeps 14_000, "remix" keeps 11_200 of 56_000,
    // "beat" and "vocal" take 22_400 each.
    let payouts = &breakdown.payouts;
    assert_eq!(share_of(payouts, &Payee::resolved(COLLABORATOR_WALLET)), 11_200);
    assert_eq!(share_of(payouts, &Payee::resolved(OTHER_UPLOADER)), 14_000 + 22_400);
    assert_eq!(share_of(payouts, &Payee::resolved(PRODUCER_WALLET)), 11_200);
    assert_eq!(share_of(payouts, &Payee::resolved(UPLOADER)), 5_600);
    assert_eq!(share_of(payouts, &Payee::pending("DJ Shadow")), 5_600);
    assert!(breakdown.has_pending);

    let paid: u64 = payouts.iter().map(|p| p.amount).sum();
    assert_eq!(paid, 70_000);
}

#[test]
fn deleted_ancestors_leave_the_share_with_the_remix() {
    let conn = test_db();
    seed(&conn);

    let mut remix = draft_work("remix", ContentCategory::Song, SplitModel::default());
    remix.source_work_ids = vec![WorkId::new("vocal")];
    save_as(&conn, COLLABORATOR_WALLET, remix);
    loopline_db::queries::works::soft_delete(&conn, &WorkId::new("vocal"), BASE_TIME + 5)
        .expect("soft delete");

    let store = SqliteStore::new(&conn);
    let sources = load_sources(&store, &[WorkId::new("remix")]).expect("load sources");
    assert!(sources.lineage.is_empty());

    let breakdown = UsageCalculator::default()
        .recording_breakdown(8, &sources)
        .expect("breakdown");
    assert_eq!(
        share_of(&breakdown.payouts, &Payee::resolved(COLLABORATOR_WALLET)),
        70_000
    );
}

#[test]
fn deleted_or_missing_sources_cannot_be_priced() {
    let conn = test_db();
    seed(&conn);
    loopline_db::queries::works::soft_delete(&conn, &WorkId::new("vocal"), BASE_TIME + 5)
        .expect("soft delete");
    let store = SqliteStore::new(&conn);

    assert!(matches!(
        load_sources(&store, &[WorkId::new("beat"), WorkId::new("vocal")]),
        Err(RoyaltyError::WorkNotFound(id)) if id == "vocal"
    ));
    assert!(matches!(
        load_sources(&store, &[WorkId::new("nope")]),
        Err(RoyaltyError::WorkNotFound(_))
    ));
}

#[test]
fn custom_pricing_applies_everywhere() {
    let conn = test_db();
    seed(&conn);
    let store = SqliteStore::new(&conn);

    let calc = UsageCalculator::new(PricingConfig {
        block_size_bars: 4,
        price_per_block: 1_000_000,
        platform_pct: 5,
        creators_pct: 80,
        remixer_stake_pct: 15,
        composition_pct: 100,
    })
    .expect("valid pricing");

    let sources = load_sources(&store, &[WorkId::new("beat")]).expect("load");
    let breakdown = calc.recording_breakdown(5, &sources).expect("breakdown");

    assert_eq!(breakdown.cost.blocks, 2);
    assert_eq!(breakdown.cost.total_cost, 2_000_000);
    assert_eq!(breakdown.cost.split.creators, 1_600_000);
    // Everything goes to composition holders; the producer gets nothing.
    assert_eq!(share_of(&breakdown.payouts, &Payee::resolved(PRODUCER_WALLET)), 0);
    assert_eq!(share_of(&breakdown.payouts, &Payee::resolved(UPLOADER)), 800_000);
}
