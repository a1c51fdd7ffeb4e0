//! Per-account mutual exclusion for discharge and commit.
//!
//! Two credits on the same account must not read the same outstanding-debit
//! snapshot. `AccountLocks` hands out one async mutex per account; admissions
//! on different accounts never contend.

use std::sync::Arc;

use dashmap::DashMap;
use payline_shared::types::AccountId;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = DashMap<AccountId, Arc<Mutex<()>>>;

/// Table of per-account locks.
#[derive(Debug, Clone, Default)]
pub struct AccountLocks {
    table: Arc<LockTable>,
}

/// Exclusive access to one account. Released on drop, including cancellation.
#[derive(Debug)]
pub struct AccountGuard {
    account_id: AccountId,
    guard: Option<OwnedMutexGuard<()>>,
    table: Arc<LockTable>,
}

impl AccountLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `account_id`.
    pub async fn acquire(&self, account_id: AccountId) -> AccountGuard {
        let mutex = Arc::clone(&self.table.entry(account_id).or_default());
        let guard = mutex.lock_owned().await;

        AccountGuard {
            account_id,
            guard: Some(guard),
            table: Arc::clone(&self.table),
        }
    }

    /// Number of accounts with a live lock entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns true if no account currently has a lock entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl AccountGuard {
    /// The account this guard serializes.
    #[must_use]
    pub const fn account_id(&self) -> AccountId {
        self.account_id
    }
}

impl Drop for AccountGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the table's own handle left means nobody holds or waits on it.
        self.table
            .remove_if(&self.account_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
