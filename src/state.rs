use std::sync::Arc;

use crate::ledger::Ledger;

pub struct AppState<S> {
    pub ledger: Arc<Ledger<S>>,
}

impl<S> AppState<S> {
    pub fn new(ledger: Ledger<S>) -> Self {
        Self {
            ledger: Arc::new(ledger),
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
        }
    }
}
