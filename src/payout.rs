//! Pari-mutuel payout computation.
//!
//! Winners split the whole pool in proportion to their stake on the winning
//! outcome. Shares are truncated toward zero and the truncation leftover goes
//! to the earliest winning bet (by creation time, then id), so the pool is
//! paid out in full. If nobody backed the winning outcome every payout is
//! zero and the pool stays undistributed.

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use crate::types::Bet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Payout {
    pub bet_id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Distribution {
    pub winning_outcome_id: Uuid,
    pub total_pool: i64,
    pub winning_pool: i64,
    /// One entry per bet, in the order the bets were given.
    pub payouts: Vec<Payout>,
    /// Bet that received the rounding leftover, if any leftover existed.
    pub leftover_bet_id: Option<Uuid>,
    pub leftover: i64,
}

impl Distribution {
    pub fn distributed(&self) -> i64 {
        self.payouts.iter().map(|p| p.amount).sum()
    }

    pub fn undistributed(&self) -> i64 {
        self.total_pool - self.distributed()
    }

    pub fn payout_for(&self, bet_id: Uuid) -> Option<i64> {
        self.payouts
            .iter()
            .find(|p| p.bet_id == bet_id)
            .map(|p| p.amount)
    }

    /// Non-zero balance credits per user, ordered by user id so that
    /// concurrent settlements lock user rows in the same order.
    pub fn credits(&self) -> Vec<(Uuid, i64)> {
        let mut by_user: BTreeMap<Uuid, i64> = BTreeMap::new();
        for p in self.payouts.iter().filter(|p| p.amount > 0) {
            *by_user.entry(p.user_id).or_default() += p.amount;
        }
        by_user.into_iter().collect()
    }
}

pub fn distribute(bets: &[Bet], winning_outcome_id: Uuid) -> Distribution {
    let total_pool: i64 = bets.iter().map(|b| b.amount).sum();
    let winning_pool: i64 = bets
        .iter()
        .filter(|b| b.outcome_id == winning_outcome_id)
        .map(|b| b.amount)
        .sum();

    let mut payouts: Vec<Payout> = bets
        .iter()
        .map(|b| {
            let amount = if b.outcome_id != winning_outcome_id || winning_pool == 0 {
                0
            } else {
                share(b.amount, total_pool, winning_pool)
            };

            Payout {
                bet_id: b.id,
                user_id: b.user_id,
                amount,
            }
        })
        .collect();

    let distributed: i64 = payouts.iter().map(|p| p.amount).sum();
    let leftover = if winning_pool == 0 {
        0
    } else {
        total_pool - distributed
    };

    let first_winner = bets
        .iter()
        .enumerate()
        .filter(|(_, b)| b.outcome_id == winning_outcome_id)
        .min_by_key(|(_, b)| (b.created_at, b.id))
        .map(|(i, _)| i);

    let mut leftover_bet_id = None;
    if leftover > 0 {
        if let Some(i) = first_winner {
            payouts[i].amount += leftover;
            leftover_bet_id = Some(payouts[i].bet_id);
        }
    }

    Distribution {
        winning_outcome_id,
        total_pool,
        winning_pool,
        payouts,
        leftover_bet_id,
        leftover,
    }
}

/// `floor(stake * total / winning)` without intermediate overflow.
fn share(stake: i64, total_pool: i64, winning_pool: i64) -> i64 {
    let exact = i128::from(stake) * i128::from(total_pool) / i128::from(winning_pool);
    // stake <= winning_pool, so the share never exceeds total_pool
    exact as i64
}
