//! Accounts, market creation and the read-side listings.

use chrono::Duration;
use parimutuel_ledger::error::LedgerError;
use parimutuel_ledger::testkit::Harness;
use parimutuel_ledger::types::{
    Category, CreateMarketRequest, Lifecycle, MarketStatus, ResolverKind, ResolverPolicy,
};
use uuid::Uuid;

fn request(title: &str, expires_at: &str) -> CreateMarketRequest {
    CreateMarketRequest {
        title: title.to_string(),
        description: "  settled by the group  ".to_string(),
        category: Category::Crypto,
        resolver: ResolverKind::Creator,
        expires_at: expires_at.to_string(),
    }
}

#[tokio::test]
async fn accounts_open_once_with_the_initial_balance() {
    let h = Harness::start();
    let id = Uuid::new_v4();

    let account = h.ledger.open_account(id).await.unwrap();
    assert_eq!(account.balance, 1000);
    assert_eq!(account.last_claimed_at, None);

    let err = h.ledger.open_account(id).await.unwrap_err();
    assert!(matches!(err, LedgerError::AccountExists(dup) if dup == id));

    let err = h.ledger.account(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, LedgerError::UserNotFound(_)));
}

#[tokio::test]
async fn created_market_has_empty_yes_and_no_pools() {
    let h = Harness::start();
    let creator = h.user().await;

    // 2026-03-02 13:00 at +01:00
    let created = h
        .ledger
        .create_market(creator, request("  BTC above 100k?  ", "2026-03-02T13:00"))
        .await
        .unwrap();

    let market = &created.market;
    assert_eq!(market.title, "BTC above 100k?");
    assert_eq!(market.description, "settled by the group");
    assert_eq!(market.category, Category::Crypto);
    assert_eq!(market.resolver, ResolverPolicy::Creator { resolver: creator });
    assert_eq!(market.status, MarketStatus::Open);
    assert_eq!(market.created_by, creator);
    assert_eq!(market.created_at, h.now());
    assert_eq!(market.expires_at - h.now(), Duration::hours(24));
    assert!(market.resolution.is_none());

    let labels: Vec<&str> = created.outcomes.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, ["yes", "no"]);
    assert!(created.outcomes.iter().all(|o| o.pool_amount == 0));

    let stored = h.ledger.get_market(market.id).await.unwrap();
    assert_eq!(stored, created);
}

#[tokio::test]
async fn market_creation_is_validated() {
    let h = Harness::start();
    let creator = h.user().await;

    let err = h
        .ledger
        .create_market(creator, request("   ", "2026-03-05T10:00"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidMarket(_)));

    for expiry in ["tomorrow", "2026-03-05 10:00", "2026-13-01T10:00"] {
        let err = h
            .ledger
            .create_market(creator, request("Rain?", expiry))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidExpiry { .. }), "{expiry}");
    }

    // 13:00 at +01:00 is exactly now
    let err = h
        .ledger
        .create_market(creator, request("Rain?", "2026-03-01T13:00"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidExpiry { .. }));

    let ghost = Uuid::new_v4();
    let err = h
        .ledger
        .create_market(ghost, request("Rain?", "2026-03-05T10:00"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::UserNotFound(id) if id == ghost));
}

#[tokio::test]
async fn unknown_market_lookup() {
    let h = Harness::start();
    let id = Uuid::new_v4();

    let err = h.ledger.get_market(id).await.unwrap_err();
    assert!(matches!(err, LedgerError::MarketNotFound(missing) if missing == id));
}

#[tokio::test]
async fn latest_open_markets_are_ordered_by_expiry_descending() {
    let h = Harness::start();
    let creator = h.user().await;

    let soon = h
        .market_with(creator, ResolverKind::Creator, Duration::hours(1))
        .await;
    let later = h
        .market_with(creator, ResolverKind::Creator, Duration::hours(5))
        .await;
    let latest = h
        .market_with(creator, ResolverKind::Admin, Duration::days(3))
        .await;

    let listed = h.ledger.list_latest_open_markets(10).await.unwrap();
    let ids: Vec<Uuid> = listed.iter().map(|m| m.market.id).collect();
    assert_eq!(ids, [latest.id, later.id, soon.id]);
    assert!(listed.iter().all(|m| m.outcomes.len() == 2));

    let page = h.ledger.list_latest_open_markets(2).await.unwrap();
    assert_eq!(page.len(), 2);

    // non-positive limits still return a single row
    let page = h.ledger.list_latest_open_markets(0).await.unwrap();
    assert_eq!(page.len(), 1);

    h.expire(&soon);
    let ids: Vec<Uuid> = h
        .ledger
        .list_latest_open_markets(10)
        .await
        .unwrap()
        .iter()
        .map(|m| m.market.id)
        .collect();
    assert_eq!(ids, [latest.id, later.id]);
}

#[tokio::test]
async fn resolved_markets_leave_the_open_listing() {
    let h = Harness::start();
    let creator = h.user().await;
    let market = h
        .market_with(creator, ResolverKind::Creator, Duration::hours(1))
        .await;
    let long = h
        .market_with(creator, ResolverKind::Creator, Duration::days(2))
        .await;

    h.expire(&market);
    h.ledger
        .resolve_market(market.id, creator, market.no)
        .await
        .unwrap();

    let listed = h.ledger.list_latest_open_markets(10).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].market.id, long.id);
    assert_eq!(listed[0].market.lifecycle(h.now()), Lifecycle::Open);
}

#[tokio::test]
async fn pending_resolution_lists_expired_unresolved_markets() {
    let h = Harness::start();
    let alice = h.user().await;
    let bob = h.user().await;

    let first = h
        .market_with(alice, ResolverKind::Creator, Duration::hours(1))
        .await;
    let second = h
        .market_with(alice, ResolverKind::Creator, Duration::hours(2))
        .await;
    let bobs = h
        .market_with(bob, ResolverKind::Creator, Duration::hours(1))
        .await;
    let admin = h
        .market_with(bob, ResolverKind::Admin, Duration::hours(1))
        .await;
    let open = h
        .market_with(alice, ResolverKind::Creator, Duration::days(5))
        .await;

    assert!(h.ledger.list_pending_resolution(alice).await.unwrap().is_empty());

    h.expire(&second);

    let pending: Vec<Uuid> = h
        .ledger
        .list_pending_resolution(alice)
        .await
        .unwrap()
        .iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(pending, [first.id, second.id]);
    assert!(!pending.contains(&open.id));

    let pending: Vec<Uuid> = h
        .ledger
        .list_pending_resolution(bob)
        .await
        .unwrap()
        .iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(pending, [bobs.id]);

    let admin_pending = h.ledger.list_pending_admin_resolution().await.unwrap();
    assert_eq!(admin_pending.len(), 1);
    assert_eq!(admin_pending[0].id, admin.id);
    assert_eq!(admin_pending[0].lifecycle(h.now()), Lifecycle::Expired);

    h.ledger
        .resolve_market(first.id, alice, first.yes)
        .await
        .unwrap();
    let pending = h.ledger.list_pending_resolution(alice).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, second.id);
}

#[tokio::test]
async fn empty_history_for_new_accounts() {
    let h = Harness::start();
    let user = h.user().await;

    assert!(h.ledger.user_bet_history(user).await.unwrap().is_empty());
}
