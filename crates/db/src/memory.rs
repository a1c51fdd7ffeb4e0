//! In-process ledger store.
//!
//! All state lives behind one `tokio::sync::RwLock`. Every write validates
//! first and mutates second without awaiting in between, so a dropped future
//! never leaves a partial write behind.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use payline_core::ledger::{
    Account, AdmissionCommit, BalanceUpdate, LedgerStore, NewAccount, NewTransaction, StoreError,
    Transaction,
};
use payline_shared::types::{AccountId, PageRequest, TransactionId};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct LedgerState {
    accounts: HashMap<AccountId, Account>,
    accounts_by_document: HashMap<String, AccountId>,
    transactions: HashMap<TransactionId, Transaction>,
    transactions_by_key: HashMap<String, TransactionId>,
    /// Per-account transaction IDs in sequence order.
    account_transactions: HashMap<AccountId, Vec<TransactionId>>,
    last_sequence: u64,
}

impl LedgerState {
    fn check_key_free(&self, idempotency_key: &str) -> Result<(), StoreError> {
        if self.transactions_by_key.contains_key(idempotency_key) {
            return Err(StoreError::DuplicateIdempotencyKey(idempotency_key.to_string()));
        }
        Ok(())
    }

    fn check_update(&self, update: &BalanceUpdate) -> Result<(), StoreError> {
        let current = self
            .transactions
            .get(&update.transaction_id)
            .ok_or(StoreError::TransactionNotFound(update.transaction_id))?;

        if current.remaining_balance != update.expected_previous {
            return Err(StoreError::BalanceConflict {
                id: update.transaction_id,
                expected: update.expected_previous,
                actual: current.remaining_balance,
            });
        }
        Ok(())
    }

    fn apply_update(&mut self, update: &BalanceUpdate) {
        if let Some(transaction) = self.transactions.get_mut(&update.transaction_id) {
            transaction.remaining_balance = update.new_remaining;
        }
    }

    fn insert(&mut self, new: NewTransaction) -> Transaction {
        self.last_sequence += 1;
        let transaction = Transaction {
            id: TransactionId::new(),
            account_id: new.account_id,
            operation_kind: new.operation_kind,
            amount: new.amount,
            remaining_balance: new.remaining_balance,
            idempotency_key: new.idempotency_key,
            event_date: new.event_date,
            sequence: self.last_sequence,
        };

        self.transactions_by_key
            .insert(transaction.idempotency_key.clone(), transaction.id);
        self.account_transactions
            .entry(transaction.account_id)
            .or_default()
            .push(transaction.id);
        self.transactions.insert(transaction.id, transaction.clone());
        transaction
    }

    fn account_history(&self, account_id: AccountId) -> impl Iterator<Item = &Transaction> {
        self.account_transactions
            .get(&account_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.transactions.get(id))
    }
}

/// Ledger store kept entirely in memory.
///
/// Besides the store contract it exposes two fault knobs: `set_available`
/// makes every call fail with `Unavailable`, and `set_latency` delays every
/// call before it touches state.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    state: RwLock<LedgerState>,
    unavailable: AtomicBool,
    latency_ms: AtomicU64,
}

impl MemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggles simulated unavailability.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Sets a delay applied to every call before it touches state.
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::SeqCst);
    }

    /// Number of committed transactions across all accounts.
    pub async fn transaction_count(&self) -> usize {
        self.state.read().await.transactions.len()
    }

    async fn enter(&self) -> Result<(), StoreError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        self.enter().await?;
        let mut state = self.state.write().await;

        if state.accounts_by_document.contains_key(&account.document_number) {
            return Err(StoreError::DuplicateDocumentNumber(account.document_number));
        }

        let account = Account {
            id: AccountId::new(),
            document_number: account.document_number,
            created_at: Utc::now(),
        };
        state
            .accounts_by_document
            .insert(account.document_number.clone(), account.id);
        state.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.enter().await?;
        Ok(self.state.read().await.accounts.get(&id).cloned())
    }

    async fn find_account_by_document_number(
        &self,
        document_number: &str,
    ) -> Result<Option<Account>, StoreError> {
        self.enter().await?;
        let state = self.state.read().await;
        Ok(state
            .accounts_by_document
            .get(document_number)
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }

    async fn find_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, StoreError> {
        self.enter().await?;
        Ok(self.state.read().await.transactions.get(&id).cloned())
    }

    async fn find_transaction_by_idempotency_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        self.enter().await?;
        let state = self.state.read().await;
        Ok(state
            .transactions_by_key
            .get(idempotency_key)
            .and_then(|id| state.transactions.get(id))
            .cloned())
    }

    async fn insert_transaction(
        &self,
        transaction: NewTransaction,
    ) -> Result<Transaction, StoreError> {
        self.enter().await?;
        let mut state = self.state.write().await;
        state.check_key_free(&transaction.idempotency_key)?;
        Ok(state.insert(transaction))
    }

    async fn update_transaction_balance(
        &self,
        id: TransactionId,
        new_remaining: Decimal,
        expected_previous: Decimal,
    ) -> Result<(), StoreError> {
        self.enter().await?;
        let update = BalanceUpdate {
            transaction_id: id,
            expected_previous,
            new_remaining,
        };
        let mut state = self.state.write().await;
        state.check_update(&update)?;
        state.apply_update(&update);
        Ok(())
    }

    async fn list_outstanding_debits(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, StoreError> {
        self.enter().await?;
        let state = self.state.read().await;
        Ok(state
            .account_history(account_id)
            .filter(|t| t.is_outstanding_debit())
            .cloned()
            .collect())
    }

    async fn list_outstanding_credits(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, StoreError> {
        self.enter().await?;
        let state = self.state.read().await;
        Ok(state
            .account_history(account_id)
            .filter(|t| t.is_outstanding_credit())
            .cloned()
            .collect())
    }

    async fn list_account_transactions(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> Result<(Vec<Transaction>, u64), StoreError> {
        self.enter().await?;
        let state = self.state.read().await;
        let total = state
            .account_transactions
            .get(&account_id)
            .map_or(0, Vec::len);
        let items = state
            .account_history(account_id)
            .skip(page.offset())
            .take(page.limit())
            .cloned()
            .collect();
        Ok((items, total as u64))
    }

    async fn commit_admission(&self, commit: AdmissionCommit) -> Result<Transaction, StoreError> {
        self.enter().await?;
        let mut state = self.state.write().await;

        state.check_key_free(&commit.transaction.idempotency_key)?;
        for update in &commit.balance_updates {
            state.check_update(update)?;
        }

        for update in &commit.balance_updates {
            state.apply_update(update);
        }
        let committed = state.insert(commit.transaction);

        debug!(
            transaction_id = %committed.id,
            sequence = committed.sequence,
            updates = commit.balance_updates.len(),
            "Admission committed"
        );
        Ok(committed)
    }
}
