//! Row shapes as they come back from Postgres.

pub mod bet;
pub mod market;
pub mod outcome;
pub mod user;

pub use bet::{BetHistoryRecord, BetRow};
pub use market::MarketRow;
pub use outcome::OutcomeRow;
pub use user::UserRow;
