//! Test support: an in-memory store, a hand-driven clock and a harness that
//! wires them into a [`Ledger`].

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::LedgerRules;
use crate::ledger::Ledger;
use crate::store::LedgerStore;
use crate::types::{Account, Category, CreateMarketRequest, ResolverKind};

pub mod memory;

pub use memory::MemoryLedger;

#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A binary market created through the ledger.
#[derive(Debug, Clone, Copy)]
pub struct TestMarket {
    pub id: Uuid,
    pub yes: Uuid,
    pub no: Uuid,
    pub expires_at: DateTime<Utc>,
}

pub struct Harness<S = MemoryLedger> {
    pub ledger: Arc<Ledger<S>>,
    pub store: S,
    pub clock: Arc<ManualClock>,
}

impl Harness<MemoryLedger> {
    /// In-memory ledger with the clock at 2026-03-01 12:00 UTC.
    pub fn start() -> Self {
        Self::with_rules(LedgerRules::default())
    }

    pub fn with_rules(rules: LedgerRules) -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .unwrap_or_default();
        Harness::with_store(MemoryLedger::new(), rules, start)
    }
}

impl<S: LedgerStore + Clone> Harness<S> {
    pub fn with_store(store: S, rules: LedgerRules, start: DateTime<Utc>) -> Self {
        let clock = Arc::new(ManualClock::new(start));
        let ledger = Ledger::with_clock(store.clone(), rules, clock.clone());

        Self {
            ledger: Arc::new(ledger),
            store,
            clock,
        }
    }
}

impl<S: LedgerStore> Harness<S> {
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn user(&self) -> Uuid {
        self.account().await.id
    }

    pub async fn account(&self) -> Account {
        self.ledger
            .open_account(Uuid::new_v4())
            .await
            .unwrap_or_else(|e| panic!("open account: {e}"))
    }

    /// A creator-policy market owned by `creator`, expiring in 24 hours.
    pub async fn market(&self, creator: Uuid) -> TestMarket {
        self.market_with(creator, ResolverKind::Creator, Duration::hours(24))
            .await
    }

    pub async fn market_with(
        &self,
        creator: Uuid,
        resolver: ResolverKind,
        lifetime: Duration,
    ) -> TestMarket {
        let tz = self.ledger.rules().resolution_timezone;
        let local = (self.now() + lifetime).with_timezone(&tz);

        let created = self
            .ledger
            .create_market(
                creator,
                CreateMarketRequest {
                    title: "Will the ferry run on time?".to_string(),
                    description: String::new(),
                    category: Category::Friends,
                    resolver,
                    expires_at: local.format("%Y-%m-%dT%H:%M").to_string(),
                },
            )
            .await
            .unwrap_or_else(|e| panic!("create market: {e}"));

        let label = |l: &str| {
            created
                .outcomes
                .iter()
                .find(|o| o.label == l)
                .map(|o| o.id)
                .unwrap_or_else(|| panic!("missing {l} outcome"))
        };

        TestMarket {
            id: created.market.id,
            yes: label("yes"),
            no: label("no"),
            expires_at: created.market.expires_at,
        }
    }

    /// Move the clock just past a market's expiry.
    pub fn expire(&self, market: &TestMarket) {
        self.clock.set(market.expires_at + Duration::minutes(1));
    }

    pub async fn balance(&self, user_id: Uuid) -> i64 {
        self.ledger
            .account(user_id)
            .await
            .unwrap_or_else(|e| panic!("account: {e}"))
            .balance
    }
}
