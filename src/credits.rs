//! Credit gating against the external ledger.
//!
//! `check` runs before any provider call; `charge` runs exactly once per
//! served request, for the tier that actually produced the returned content.
//!
//! The check-then-charge window is not serialized per caller: two concurrent
//! requests from one caller can both pass `check` and both `charge`, matching
//! the reference behavior. Closing the race would require holding a
//! per-caller critical section across the provider call.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::CostTable;
use crate::error::LedgerError;
use crate::ledger::CreditLedger;
use crate::request::Tier;

/// Result of an affordability check.
#[derive(Debug, Clone, Copy)]
pub struct CreditCheck {
    pub has_credits: bool,
    pub balance: i64,
    pub required: i64,
}

/// Enforces pay-per-tier usage against the injected ledger.
pub struct CreditGate {
    ledger: Arc<dyn CreditLedger>,
    costs: CostTable,
}

impl CreditGate {
    pub fn new(ledger: Arc<dyn CreditLedger>, costs: CostTable) -> Self {
        Self { ledger, costs }
    }

    /// Cost of serving one request at `tier`.
    pub fn cost(&self, tier: Tier) -> i64 {
        self.costs.cost(tier)
    }

    /// Whether the caller can afford `tier` right now.
    pub async fn check(&self, caller_id: Uuid, tier: Tier) -> Result<CreditCheck, LedgerError> {
        let balance = self.ledger.balance(caller_id).await?;
        let required = self.costs.cost(tier);
        Ok(CreditCheck {
            has_credits: balance >= required,
            balance,
            required,
        })
    }

    /// Debit the caller for one request served at `tier`. Returns the new
    /// balance.
    pub async fn charge(&self, caller_id: Uuid, tier: Tier) -> Result<i64, LedgerError> {
        let amount = self.costs.cost(tier);
        let new_balance = self.ledger.decrement(caller_id, amount).await?;
        tracing::debug!(
            caller = %caller_id,
            tier = %tier,
            amount,
            new_balance,
            "charged credits"
        );
        Ok(new_balance)
    }
}
