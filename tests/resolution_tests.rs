//! Market resolution: pari-mutuel payouts, authorization and state checks.

use chrono::Duration;
use parimutuel_ledger::error::LedgerError;
use parimutuel_ledger::testkit::{Harness, TestMarket};
use parimutuel_ledger::types::{BetResult, Lifecycle, MarketStatus, ResolverKind};
use uuid::Uuid;

async fn bettors(h: &Harness, n: usize) -> Vec<Uuid> {
    let mut ids = Vec::with_capacity(n);
    for _ in 0..n {
        ids.push(h.user().await);
    }
    ids
}

async fn payouts(h: &Harness, market: &TestMarket) -> Vec<(Uuid, Option<i64>)> {
    h.store
        .bets_of(market.id)
        .await
        .into_iter()
        .map(|b| (b.user_id, b.payout))
        .collect()
}

fn payout_of(rows: &[(Uuid, Option<i64>)], user: Uuid) -> Option<i64> {
    rows.iter().find(|(u, _)| *u == user).and_then(|(_, p)| *p)
}

#[tokio::test]
async fn winners_share_the_whole_pool_in_proportion() {
    let h = Harness::start();
    let creator = h.user().await;
    let u = bettors(&h, 3).await;
    let (a, b, c) = (u[0], u[1], u[2]);
    let market = h.market(creator).await;

    h.ledger.place_bet(a, market.id, market.yes, 300).await.unwrap();
    h.ledger.place_bet(b, market.id, market.yes, 100).await.unwrap();
    h.ledger.place_bet(c, market.id, market.no, 200).await.unwrap();

    h.expire(&market);
    let settlement = h
        .ledger
        .resolve_market(market.id, creator, market.yes)
        .await
        .unwrap();

    assert_eq!(settlement.distribution.total_pool, 600);
    assert_eq!(settlement.distribution.winning_pool, 400);
    assert_eq!(settlement.distribution.leftover, 0);
    assert_eq!(settlement.resolved_by, creator);

    let rows = payouts(&h, &market).await;
    assert_eq!(payout_of(&rows, a), Some(450));
    assert_eq!(payout_of(&rows, b), Some(150));
    assert_eq!(payout_of(&rows, c), Some(0));

    assert_eq!(h.balance(a).await, 700 + 450);
    assert_eq!(h.balance(b).await, 900 + 150);
    assert_eq!(h.balance(c).await, 800);

    let view = h.ledger.get_market(market.id).await.unwrap();
    assert_eq!(view.market.status, MarketStatus::Resolved);
    assert_eq!(view.market.lifecycle(h.now()), Lifecycle::Resolved);
    let resolution = view.market.resolution.unwrap();
    assert_eq!(resolution.outcome_id, market.yes);
    assert_eq!(resolution.resolved_by, creator);
    assert_eq!(resolution.resolved_at, h.now());

    // pools remain as the historical totals
    let pools: i64 = view.outcomes.iter().map(|o| o.pool_amount).sum();
    assert_eq!(pools, 600);
}

#[tokio::test]
async fn equal_stakes_and_uncontested_pools() {
    let h = Harness::start();
    let creator = h.user().await;
    let u = bettors(&h, 5).await;

    let split = h.market(creator).await;
    h.ledger.place_bet(u[0], split.id, split.yes, 100).await.unwrap();
    h.ledger.place_bet(u[1], split.id, split.yes, 100).await.unwrap();
    h.ledger.place_bet(u[2], split.id, split.no, 100).await.unwrap();

    let uncontested = h.market(creator).await;
    h.ledger
        .place_bet(u[3], uncontested.id, uncontested.yes, 100)
        .await
        .unwrap();
    h.ledger
        .place_bet(u[4], uncontested.id, uncontested.yes, 200)
        .await
        .unwrap();

    h.expire(&split);
    h.ledger
        .resolve_market(split.id, creator, split.yes)
        .await
        .unwrap();
    h.ledger
        .resolve_market(uncontested.id, creator, uncontested.yes)
        .await
        .unwrap();

    let rows = payouts(&h, &split).await;
    assert_eq!(payout_of(&rows, u[0]), Some(150));
    assert_eq!(payout_of(&rows, u[1]), Some(150));
    assert_eq!(payout_of(&rows, u[2]), Some(0));

    let rows = payouts(&h, &uncontested).await;
    assert_eq!(payout_of(&rows, u[3]), Some(100));
    assert_eq!(payout_of(&rows, u[4]), Some(200));
    assert_eq!(h.balance(u[3]).await, 1000);
    assert_eq!(h.balance(u[4]).await, 1000);
}

#[tokio::test]
async fn rounding_leftover_goes_to_the_earliest_winner() {
    let h = Harness::start();
    let creator = h.user().await;
    let u = bettors(&h, 4).await;
    let market = h.market(creator).await;

    for (i, user) in u.iter().take(3).enumerate() {
        h.clock.advance(Duration::minutes(1));
        h.ledger
            .place_bet(*user, market.id, market.yes, 100)
            .await
            .unwrap_or_else(|e| panic!("bet {i}: {e}"));
    }
    h.ledger.place_bet(u[3], market.id, market.no, 100).await.unwrap();

    h.expire(&market);
    let settlement = h
        .ledger
        .resolve_market(market.id, creator, market.yes)
        .await
        .unwrap();

    assert_eq!(settlement.distribution.leftover, 1);

    let rows = payouts(&h, &market).await;
    assert_eq!(payout_of(&rows, u[0]), Some(134));
    assert_eq!(payout_of(&rows, u[1]), Some(133));
    assert_eq!(payout_of(&rows, u[2]), Some(133));
    assert_eq!(payout_of(&rows, u[3]), Some(0));

    let paid: i64 = rows.iter().filter_map(|(_, p)| *p).sum();
    assert_eq!(paid, 400);
    assert_eq!(h.balance(u[0]).await, 900 + 134);
}

#[tokio::test]
async fn unbacked_winning_outcome_pays_nobody() {
    let h = Harness::start();
    let creator = h.user().await;
    let u = bettors(&h, 2).await;
    let market = h.market(creator).await;

    h.ledger.place_bet(u[0], market.id, market.no, 250).await.unwrap();
    h.ledger.place_bet(u[1], market.id, market.no, 150).await.unwrap();

    h.expire(&market);
    let settlement = h
        .ledger
        .resolve_market(market.id, creator, market.yes)
        .await
        .unwrap();

    // the pool is left undistributed when no one backed the winner
    assert_eq!(settlement.distribution.winning_pool, 0);
    assert_eq!(settlement.distribution.undistributed(), 400);

    let rows = payouts(&h, &market).await;
    assert!(rows.iter().all(|(_, p)| *p == Some(0)));
    assert_eq!(h.balance(u[0]).await, 750);
    assert_eq!(h.balance(u[1]).await, 850);

    let history = h.ledger.user_bet_history(u[0]).await.unwrap();
    assert_eq!(history[0].result, BetResult::Lose);
}

#[tokio::test]
async fn market_without_bets_resolves() {
    let h = Harness::start();
    let creator = h.user().await;
    let market = h.market(creator).await;

    h.expire(&market);
    let settlement = h
        .ledger
        .resolve_market(market.id, creator, market.no)
        .await
        .unwrap();

    assert_eq!(settlement.distribution.total_pool, 0);
    assert!(settlement.distribution.payouts.is_empty());
}

#[tokio::test]
async fn second_resolution_fails_without_touching_balances() {
    let h = Harness::start();
    let creator = h.user().await;
    let u = bettors(&h, 2).await;
    let market = h.market(creator).await;

    h.ledger.place_bet(u[0], market.id, market.yes, 100).await.unwrap();
    h.ledger.place_bet(u[1], market.id, market.no, 100).await.unwrap();

    h.expire(&market);
    h.ledger
        .resolve_market(market.id, creator, market.yes)
        .await
        .unwrap();

    let before = (h.balance(u[0]).await, h.balance(u[1]).await);

    for outcome in [market.yes, market.no] {
        let err = h
            .ledger
            .resolve_market(market.id, creator, outcome)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::MarketAlreadyResolved));
    }

    assert_eq!((h.balance(u[0]).await, h.balance(u[1]).await), before);
    assert_eq!(before, (1100, 900));
}

#[tokio::test]
async fn only_the_designated_resolver_may_resolve() {
    let h = Harness::start();
    let creator = h.user().await;
    let stranger = h.user().await;
    let market = h.market(creator).await;
    h.expire(&market);

    let err = h
        .ledger
        .resolve_market(market.id, stranger, market.yes)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::UserNotAuthorized));

    let err = h
        .ledger
        .resolve_market_as_admin(market.id, stranger, market.yes)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::UserNotAuthorized));

    // authorization is checked before the resolved flag
    h.ledger
        .resolve_market(market.id, creator, market.yes)
        .await
        .unwrap();
    let err = h
        .ledger
        .resolve_market(market.id, stranger, market.yes)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::UserNotAuthorized));
}

#[tokio::test]
async fn admin_markets_resolve_through_the_admin_entry_point() {
    let h = Harness::start();
    let creator = h.user().await;
    let admin = h.user().await;
    let bettor = h.user().await;
    let market = h
        .market_with(creator, ResolverKind::Admin, Duration::hours(2))
        .await;

    h.ledger
        .place_bet(bettor, market.id, market.no, 400)
        .await
        .unwrap();
    h.expire(&market);

    let err = h
        .ledger
        .resolve_market(market.id, creator, market.no)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::UserNotAuthorized));

    let settlement = h
        .ledger
        .resolve_market_as_admin(market.id, admin, market.no)
        .await
        .unwrap();
    assert_eq!(settlement.resolved_by, admin);
    assert_eq!(h.balance(bettor).await, 1000);
}

#[tokio::test]
async fn markets_cannot_be_resolved_before_expiry() {
    let h = Harness::start();
    let creator = h.user().await;
    let market = h.market(creator).await;

    h.clock.set(market.expires_at - Duration::seconds(1));
    let err = h
        .ledger
        .resolve_market(market.id, creator, market.yes)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::MarketNotExpired));

    h.clock.set(market.expires_at);
    h.ledger
        .resolve_market(market.id, creator, market.yes)
        .await
        .unwrap();
}

#[tokio::test]
async fn winning_outcome_must_belong_to_the_market() {
    let h = Harness::start();
    let creator = h.user().await;
    let market = h.market(creator).await;
    let other = h.market(creator).await;
    h.expire(&market);

    let err = h
        .ledger
        .resolve_market(market.id, creator, other.yes)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::OutcomeDoesNotBelongToMarket));

    let view = h.ledger.get_market(market.id).await.unwrap();
    assert!(view.market.resolution.is_none());
}

#[tokio::test]
async fn pool_mismatch_aborts_the_settlement() {
    let h = Harness::start();
    let creator = h.user().await;
    let bettor = h.user().await;
    let market = h.market(creator).await;

    h.ledger
        .place_bet(bettor, market.id, market.yes, 300)
        .await
        .unwrap();
    h.store.force_pool(market.no, 50).await;

    h.expire(&market);
    let err = h
        .ledger
        .resolve_market(market.id, creator, market.yes)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::PoolMismatch {
            pools: 350,
            stakes: 300,
            ..
        }
    ));

    assert_eq!(h.balance(bettor).await, 700);
    assert!(h.store.bets_of(market.id).await[0].payout.is_none());
    let view = h.ledger.get_market(market.id).await.unwrap();
    assert_eq!(view.market.status, MarketStatus::Open);
}

#[tokio::test]
async fn unknown_market_is_reported() {
    let h = Harness::start();
    let creator = h.user().await;
    let missing = Uuid::new_v4();

    let err = h
        .ledger
        .resolve_market(missing, creator, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::MarketNotFound(id) if id == missing));
}

#[tokio::test]
async fn history_reports_win_lose_and_pending() {
    let h = Harness::start();
    let creator = h.user().await;
    let bettor = h.user().await;
    let rival = h.user().await;

    let won = h.market(creator).await;
    let lost = h.market(creator).await;
    let open = h
        .market_with(creator, ResolverKind::Creator, Duration::days(7))
        .await;

    h.ledger.place_bet(bettor, won.id, won.yes, 100).await.unwrap();
    h.ledger.place_bet(rival, won.id, won.no, 100).await.unwrap();
    h.clock.advance(Duration::minutes(1));
    h.ledger.place_bet(bettor, lost.id, lost.yes, 100).await.unwrap();
    h.clock.advance(Duration::minutes(1));
    h.ledger.place_bet(bettor, open.id, open.no, 100).await.unwrap();

    h.expire(&won);
    h.ledger.resolve_market(won.id, creator, won.yes).await.unwrap();
    h.ledger.resolve_market(lost.id, creator, lost.no).await.unwrap();

    let history = h.ledger.user_bet_history(bettor).await.unwrap();
    let result_for = |market_id: Uuid| {
        history
            .iter()
            .find(|r| r.market_id == market_id)
            .map(|r| (r.result, r.payout))
            .unwrap()
    };

    assert_eq!(result_for(won.id), (BetResult::Win, Some(200)));
    assert_eq!(result_for(lost.id), (BetResult::Lose, Some(0)));
    assert_eq!(result_for(open.id), (BetResult::Pending, None));

    // newest first
    assert_eq!(history[0].market_id, open.id);
    assert_eq!(history[2].market_id, won.id);
}
