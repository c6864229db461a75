//! Credit ledger seam.
//!
//! The persisted per-caller balance lives outside this crate; the router only
//! needs read and atomic decrement/increment, expressed by [`CreditLedger`].
//! [`InMemoryLedger`] is the reference implementation used by tests and
//! single-process embeddings.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::LedgerError;

/// Trait for the external credit ledger. Each call is atomic on its own;
/// no cross-call transaction is assumed.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Current balance for a caller.
    async fn balance(&self, caller_id: Uuid) -> Result<i64, LedgerError>;

    /// Atomically subtract `amount` and return the new balance.
    async fn decrement(&self, caller_id: Uuid, amount: i64) -> Result<i64, LedgerError>;

    /// Atomically add `amount` and return the new balance.
    async fn increment(&self, caller_id: Uuid, amount: i64) -> Result<i64, LedgerError>;
}

/// In-memory ledger. Unknown callers read as a zero balance; balances may go
/// negative — affordability is the credit gate's concern, not the ledger's.
#[derive(Default)]
pub struct InMemoryLedger {
    /// `std::sync::Mutex` (not tokio) — never held across an `.await` point.
    balances: Mutex<HashMap<Uuid, i64>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a caller's balance, replacing any existing value.
    pub fn set_balance(&self, caller_id: Uuid, amount: i64) {
        self.balances
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(caller_id, amount);
    }
}

#[async_trait]
impl CreditLedger for InMemoryLedger {
    async fn balance(&self, caller_id: Uuid) -> Result<i64, LedgerError> {
        Ok(self
            .balances
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&caller_id)
            .copied()
            .unwrap_or(0))
    }

    async fn decrement(&self, caller_id: Uuid, amount: i64) -> Result<i64, LedgerError> {
        let mut guard = self.balances.lock().unwrap_or_else(|e| e.into_inner());
        let balance = guard.entry(caller_id).or_insert(0);
        *balance -= amount;
        Ok(*balance)
    }

    async fn increment(&self, caller_id: Uuid, amount: i64) -> Result<i64, LedgerError> {
        let mut guard = self.balances.lock().unwrap_or_else(|e| e.into_inner());
        let balance = guard.entry(caller_id).or_insert(0);
        *balance += amount;
        Ok(*balance)
    }
}
