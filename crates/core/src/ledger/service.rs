//! Transaction admission and ledger introspection.
//!
//! Admission runs a fixed sequence of stages, each of which either advances
//! or ends the request:
//!
//! 1. Idempotency: a key that is already committed returns the stored record
//! 2. Validation: operation kind and amount sign, before any account lookup
//! 3. Account check: unknown accounts are rejected with `AccountNotFound`
//! 4. Discharge: under the account lock, compute balances from outstanding debt
//! 5. Commit: one atomic store write for the transaction and every discharge update
//!
//! The account lock is held from the outstanding-debit read to the commit, so
//! credits on one account are applied one at a time. Dropping the admission
//! future at any await point leaves the store untouched, because the only
//! write is the single `commit_admission` call.

use std::sync::Arc;

use chrono::Utc;
use payline_shared::LedgerConfig;
use payline_shared::types::{AccountId, PageRequest, PageResponse, TransactionId};
use rust_decimal::Decimal;
use tracing::{debug, error, info, instrument, warn};

use super::discharge::DischargeEngine;
use super::error::{ErrorCategory, LedgerError};
use super::idempotency::{self, Resolution};
use super::locks::AccountLocks;
use super::store::{LedgerStore, StoreError};
use super::types::{
    Account, AccountPosition, AdmissionCommit, CreateTransactionInput, CreateTransactionRequest,
    NewTransaction, Transaction, TransactionRecord,
};
use super::validation;

/// Ledger service: admits transactions and answers ledger queries.
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    locks: AccountLocks,
    config: LedgerConfig,
}

impl std::fmt::Debug for LedgerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerService")
            .field("locks", &self.locks)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LedgerService {
    /// Creates a ledger service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, config: LedgerConfig) -> Self {
        Self {
            store,
            locks: AccountLocks::new(),
            config,
        }
    }

    /// The per-account lock table used by admission.
    #[must_use]
    pub const fn locks(&self) -> &AccountLocks {
        &self.locks
    }

    /// Creates a transaction from a raw boundary request.
    ///
    /// Missing fields are rejected before the pipeline is entered. Replaying a
    /// request with a committed idempotency key returns the committed record.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` for incomplete requests and any error `admit`
    /// returns.
    pub async fn create_transaction(
        &self,
        request: CreateTransactionRequest,
    ) -> Result<TransactionRecord, LedgerError> {
        let input = validation::require_fields(request)
            .inspect_err(|err| warn!(error = %err, "Rejected incomplete transaction request"))?;
        self.admit(input).await.map(TransactionRecord::from)
    }

    /// Runs the admission pipeline and returns the full ledger record.
    ///
    /// Field presence is not checked beyond a non-blank idempotency key.
    ///
    /// # Errors
    ///
    /// - `MissingField` for a blank idempotency key
    /// - `InvalidOperationKind`, `SignMismatch` for rule-breaking requests
    /// - `AccountNotFound` when the account does not exist
    /// - `Storage`, `Timeout` for infrastructure failures (retryable)
    /// - `ConcurrentModification` if another writer changed a discharged debit
    /// - `InvariantViolation` when stored data breaks a ledger invariant
    #[instrument(
        skip(self, input),
        fields(
            account_id = %input.account_id,
            idempotency_key = %input.idempotency_key,
            operation_code = input.operation_code,
        )
    )]
    pub async fn admit(&self, input: CreateTransactionInput) -> Result<Transaction, LedgerError> {
        info!(amount = %input.amount, "Admitting transaction");
        let admission = self.run_admission(input);
        let result = match self.config.admission_timeout() {
            Some(limit) => tokio::time::timeout(limit, admission)
                .await
                .unwrap_or(Err(LedgerError::Timeout)),
            None => admission.await,
        };

        result.inspect_err(|err| match err.category() {
            ErrorCategory::Validation | ErrorCategory::NotFound | ErrorCategory::Conflict => {
                warn!(error = %err, code = err.error_code(), "Transaction rejected");
            }
            ErrorCategory::Infrastructure => {
                error!(error = %err, code = err.error_code(), "Transaction admission failed");
            }
            ErrorCategory::Internal => {
                error!(error = %err, code = err.error_code(), "Ledger invariant violated");
            }
        })
    }

    async fn run_admission(&self, input: CreateTransactionInput) -> Result<Transaction, LedgerError> {
        if input.idempotency_key.trim().is_empty() {
            return Err(LedgerError::MissingField("idempotency_key"));
        }

        if let Resolution::Found(existing) =
            idempotency::resolve(self.store.as_ref(), &input.idempotency_key).await?
        {
            info!(transaction_id = %existing.id, "Replayed committed transaction");
            return Ok(*existing);
        }

        let amount = validation::normalize_amount(input.amount, self.config.amount_scale);
        let kind = validation::validate_operation(input.operation_code, amount)?;

        let account = self.require_account(input.account_id).await?;

        let _guard = self.locks.acquire(account.id).await;

        let outstanding = if kind.is_credit() {
            self.store.list_outstanding_debits(account.id).await?
        } else {
            Vec::new()
        };
        let outcome = DischargeEngine::discharge(account.id, kind, amount, &outstanding)?;
        debug!(
            %kind,
            %amount,
            remaining_balance = %outcome.remaining_balance,
            discharged = %outcome.discharged(),
            debits_touched = outcome.updates.len(),
            "Computed discharge"
        );

        let commit = AdmissionCommit {
            transaction: NewTransaction {
                account_id: account.id,
                operation_kind: kind,
                amount,
                remaining_balance: outcome.remaining_balance,
                idempotency_key: input.idempotency_key.clone(),
                event_date: Utc::now(),
            },
            balance_updates: outcome.updates,
        };

        match self.store.commit_admission(commit).await {
            Ok(committed) => {
                info!(
                    transaction_id = %committed.id,
                    sequence = committed.sequence,
                    remaining_balance = %committed.remaining_balance,
                    "Transaction committed"
                );
                Ok(committed)
            }
            Err(StoreError::DuplicateIdempotencyKey(_)) => {
                warn!("Lost idempotency race, returning the winning transaction");
                self.resolve_winner(&input.idempotency_key).await
            }
            Err(StoreError::TransactionNotFound(id)) => Err(LedgerError::InvariantViolation(
                format!("discharged debit {id} vanished before commit"),
            )),
            Err(err) => Err(err.into()),
        }
    }

    /// Re-reads the record that won a commit race on `idempotency_key`.
    async fn resolve_winner(&self, idempotency_key: &str) -> Result<Transaction, LedgerError> {
        match idempotency::resolve(self.store.as_ref(), idempotency_key).await? {
            Resolution::Found(winner) => Ok(*winner),
            Resolution::NotFound => Err(LedgerError::InvariantViolation(format!(
                "idempotency key '{idempotency_key}' reported as committed but not found"
            ))),
        }
    }

    async fn require_account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        self.store
            .find_account(account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    /// Returns a committed transaction with its current remaining balance.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` for unknown IDs or `Storage` on lookup failure.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        self.store
            .find_transaction(id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    /// Lists an account's transactions in admission order.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for unknown accounts or `Storage` on lookup failure.
    pub async fn list_transactions(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> Result<PageResponse<Transaction>, LedgerError> {
        self.require_account(account_id).await?;
        let (transactions, total) = self
            .store
            .list_account_transactions(account_id, page)
            .await?;
        Ok(PageResponse::new(transactions, &page, total))
    }

    /// Summarizes an account's outstanding debt and unconsumed credit.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for unknown accounts, `Storage` on lookup
    /// failure, or `InvariantViolation` if a total leaves `Decimal`'s range.
    pub async fn account_position(&self, account_id: AccountId) -> Result<AccountPosition, LedgerError> {
        self.require_account(account_id).await?;

        let debits = self.store.list_outstanding_debits(account_id).await?;
        let credits = self.store.list_outstanding_credits(account_id).await?;

        Ok(AccountPosition {
            account_id,
            outstanding_debt: total_remaining(account_id, &debits, "debt")?,
            available_credit: total_remaining(account_id, &credits, "credit")?,
        })
    }
}

/// Sums remaining balances, failing instead of panicking past `Decimal`'s range.
fn total_remaining(
    account_id: AccountId,
    transactions: &[Transaction],
    side: &str,
) -> Result<Decimal, LedgerError> {
    transactions
        .iter()
        .try_fold(Decimal::ZERO, |total, t| total.checked_add(t.remaining_balance))
        .ok_or_else(|| {
            LedgerError::InvariantViolation(format!(
                "outstanding {side} of account {account_id} exceeds the representable range"
            ))
        })
}
