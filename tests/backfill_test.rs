mod common;

use common::{MemoryReturnCache, StubBackfill, StubMarketData, date};
use maestro::domain::context::EvalContext;
use maestro::domain::eval::Evaluator;
use maestro::domain::groups::derive_group_id;
use maestro::domain::indicator::service::IndicatorService;
use maestro::domain::parser::parse_strategy;
use maestro::ports::return_cache_port::ReturnCachePort;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const RANKED_GROUPS: &str = r#"(filter (cumulative-return {:window 5}) (select-top 1)
      (group "Alpha" (asset "AAA"))
      (group "Beta" (asset "BBB")))"#;

fn ranked_market() -> StubMarketData {
    // AAA compounds 2% a day, BBB is flat.
    StubMarketData::steady(date(2024, 1, 1), 60)
        .with_growth("AAA", dec!(1.02))
        .with_growth("BBB", dec!(1.00))
}

#[test]
fn in_process_backfill_ranks_groups_by_history() {
    let market = ranked_market();
    let indicators = IndicatorService::new(&market);
    let cache = MemoryReturnCache::default();
    let mut ctx = EvalContext::new(&market, &indicators)
        .with_return_cache(&cache)
        .with_as_of(date(2024, 2, 9));

    let ast = parse_strategy(RANKED_GROUPS).unwrap();
    let allocation = Evaluator::new().evaluate(&ast, &mut ctx).unwrap();
    assert_eq!(allocation.len(), 1);
    assert_eq!(allocation["AAA"], Decimal::ONE);

    // Both groups' series were persisted for future runs.
    for name in ["Alpha", "Beta"] {
        let rows = cache
            .lookup_historical_returns(&derive_group_id(name), 100, date(2024, 2, 9))
            .unwrap();
        assert!(rows.len() >= 5, "{name} has only {} cached rows", rows.len());
    }
}

#[test]
fn cache_first_skips_every_backfill_tier() {
    let market = ranked_market();
    let indicators = IndicatorService::new(&market);
    let cache = MemoryReturnCache::default();
    // Preloaded series invert the live ranking: Beta's cached history wins.
    cache.preload(
        &derive_group_id("Alpha"),
        date(2024, 2, 5),
        &[dec!(0.001); 5],
    );
    cache.preload(
        &derive_group_id("Beta"),
        date(2024, 2, 5),
        &[dec!(0.02); 5],
    );
    let remote = StubBackfill::default();
    let mut ctx = EvalContext::new(&market, &indicators)
        .with_return_cache(&cache)
        .with_backfill(&remote)
        .with_as_of(date(2024, 2, 9));

    let ast = parse_strategy(RANKED_GROUPS).unwrap();
    let allocation = Evaluator::new().evaluate(&ast, &mut ctx).unwrap();
    assert_eq!(allocation["BBB"], Decimal::ONE);
    assert!(remote.invocations.borrow().is_empty());
}

#[test]
fn remote_tier_runs_before_in_process() {
    let market = ranked_market();
    let indicators = IndicatorService::new(&market);
    let cache = MemoryReturnCache::default();
    let remote = StubBackfill::default();
    let mut ctx = EvalContext::new(&market, &indicators)
        .with_return_cache(&cache)
        .with_backfill(&remote)
        .with_as_of(date(2024, 2, 9));

    let ast = parse_strategy(RANKED_GROUPS).unwrap();
    Evaluator::new().evaluate(&ast, &mut ctx).unwrap();

    // One remote attempt per group, despite the in-process loop evaluating
    // each group's body dozens of times.
    let invocations = remote.invocations.borrow();
    assert_eq!(invocations.len(), 2);
    assert!(invocations.contains(&derive_group_id("Alpha")));
    assert!(invocations.contains(&derive_group_id("Beta")));
}

#[test]
fn self_referential_group_terminates_with_one_backfill() {
    let market = ranked_market();
    let indicators = IndicatorService::new(&market);
    let cache = MemoryReturnCache::default();
    let remote = StubBackfill::default();
    let mut ctx = EvalContext::new(&market, &indicators)
        .with_return_cache(&cache)
        .with_backfill(&remote)
        .with_as_of(date(2024, 2, 9));

    // The group's own body filters over itself.
    let ast = parse_strategy(
        r#"(filter (cumulative-return {:window 5}) (select-top 1)
              (group "Snake"
                (filter (cumulative-return {:window 5}) (select-top 1)
                  (group "Snake" (asset "AAA")))))"#,
    )
    .unwrap();
    let allocation = Evaluator::new().evaluate(&ast, &mut ctx).unwrap();
    assert_eq!(allocation["AAA"], Decimal::ONE);

    let snake = derive_group_id("Snake");
    let invocations = remote.invocations.borrow();
    assert_eq!(
        invocations.iter().filter(|id| **id == snake).count(),
        1,
        "backfill must not re-invoke for a group already mid-backfill"
    );
    assert!(ctx.session.backfilling.is_empty());
}

#[test]
fn degrades_to_snapshot_without_a_cache() {
    let market = ranked_market();
    let indicators = IndicatorService::new(&market);
    // No return cache configured at all: ranking falls back to today-only
    // per-symbol scoring, which still prefers the compounding asset.
    let mut ctx = EvalContext::new(&market, &indicators).with_as_of(date(2024, 2, 9));

    let ast = parse_strategy(RANKED_GROUPS).unwrap();
    let allocation = Evaluator::new().evaluate(&ast, &mut ctx).unwrap();
    assert_eq!(allocation["AAA"], Decimal::ONE);
}

#[test]
fn failed_cache_writes_degrade_instead_of_failing() {
    let market = ranked_market();
    let indicators = IndicatorService::new(&market);
    let cache = MemoryReturnCache {
        fail_writes: true,
        ..MemoryReturnCache::default()
    };
    let mut ctx = EvalContext::new(&market, &indicators)
        .with_return_cache(&cache)
        .with_as_of(date(2024, 2, 9));

    let ast = parse_strategy(RANKED_GROUPS).unwrap();
    // Nothing persists, so scoring degrades to the snapshot path; the
    // evaluation still completes with a full allocation.
    let allocation = Evaluator::new().evaluate(&ast, &mut ctx).unwrap();
    assert_eq!(allocation["AAA"], Decimal::ONE);
}
