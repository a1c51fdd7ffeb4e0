//! Ledger store contract.
//!
//! The store is the durable side of the ledger. The core only relies on the
//! guarantees listed here; which engine provides them is up to the
//! implementation:
//!
//! - idempotency keys and document numbers are unique at insert time, and a
//!   violation is reported as a typed error rather than silently overwritten
//! - balance updates are compare-and-swap on the previous remaining balance
//! - `commit_admission` applies its whole batch or nothing
//! - `sequence` is assigned at insert and strictly increases

use async_trait::async_trait;
use payline_shared::types::{AccountId, PageRequest, TransactionId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::{Account, AdmissionCommit, NewAccount, NewTransaction, Transaction};

/// Failures reported by a ledger store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An account with this document number already exists.
    #[error("Document number '{0}' is already registered")]
    DuplicateDocumentNumber(String),

    /// A transaction with this idempotency key is already committed.
    #[error("Idempotency key '{0}' is already committed")]
    DuplicateIdempotencyKey(String),

    /// The stored remaining balance differs from the expected one.
    #[error("Balance of transaction {id} changed: expected {expected}, found {actual}")]
    BalanceConflict {
        /// The transaction being updated.
        id: TransactionId,
        /// Remaining balance the caller read.
        expected: Decimal,
        /// Remaining balance currently stored.
        actual: Decimal,
    },

    /// No transaction with this ID exists.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// The store could not be reached or failed mid-operation.
    #[error("Ledger store unavailable: {0}")]
    Unavailable(String),
}

/// Durable keyed storage for accounts and transactions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Inserts an account, enforcing document number uniqueness.
    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Point lookup of an account.
    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Looks up an account by its document number.
    async fn find_account_by_document_number(
        &self,
        document_number: &str,
    ) -> Result<Option<Account>, StoreError>;

    /// Point lookup of a transaction.
    async fn find_transaction(&self, id: TransactionId)
    -> Result<Option<Transaction>, StoreError>;

    /// Looks up the transaction committed under an idempotency key.
    async fn find_transaction_by_idempotency_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<Transaction>, StoreError>;

    /// Inserts a single transaction, enforcing idempotency key uniqueness.
    async fn insert_transaction(&self, transaction: NewTransaction)
    -> Result<Transaction, StoreError>;

    /// Sets a transaction's remaining balance if it still equals `expected_previous`.
    async fn update_transaction_balance(
        &self,
        id: TransactionId,
        new_remaining: Decimal,
        expected_previous: Decimal,
    ) -> Result<(), StoreError>;

    /// Debits of the account with a non-zero remaining balance, oldest first.
    async fn list_outstanding_debits(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, StoreError>;

    /// Credits of the account with a positive remaining balance, oldest first.
    async fn list_outstanding_credits(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, StoreError>;

    /// One page of the account's transactions, oldest first, with the total count.
    async fn list_account_transactions(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> Result<(Vec<Transaction>, u64), StoreError>;

    /// Inserts the admitted transaction and applies its balance updates atomically.
    async fn commit_admission(&self, commit: AdmissionCommit) -> Result<Transaction, StoreError>;
}
