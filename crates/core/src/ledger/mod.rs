//! Transaction ledger.
//!
//! This module implements transaction admission and FIFO discharge:
//! - Domain types for accounts, transactions and operation kinds
//! - Field, operation kind and amount sign validation
//! - Idempotency key resolution
//! - Per-account admission locks
//! - The discharge engine that offsets outstanding debt with credits
//! - The store contract the ledger persists through
//! - Ledger and account services

pub mod account;
pub mod discharge;
pub mod error;
pub mod idempotency;
pub mod locks;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(test)]
mod discharge_props;
#[cfg(test)]
mod validation_props;

pub use account::AccountService;
pub use discharge::{DischargeEngine, DischargeOutcome};
pub use error::{ErrorCategory, LedgerError};
pub use idempotency::Resolution;
pub use locks::{AccountGuard, AccountLocks};
pub use service::LedgerService;
pub use store::{LedgerStore, StoreError};
pub use types::{
    Account, AccountPosition, AdmissionCommit, AmountSign, BalanceUpdate, CreateTransactionInput,
    CreateTransactionRequest, NewAccount, NewTransaction, OperationKind, Transaction,
    TransactionRecord,
};
