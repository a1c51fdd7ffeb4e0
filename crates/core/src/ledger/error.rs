//! Ledger error types.
//!
//! Control flow in the admission pipeline is driven by these variants only,
//! never by message text. `category` groups them into the classes callers
//! apply policy to (reject, retry, page someone).

use payline_shared::AppError;
use payline_shared::types::{AccountId, TransactionId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::store::StoreError;
use super::types::OperationKind;

/// Broad class of a ledger error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed or rule-breaking request; never retried.
    Validation,
    /// A referenced entity does not exist; terminal.
    NotFound,
    /// Lost a race with another writer.
    Conflict,
    /// Storage unavailable or too slow; retry with backoff.
    Infrastructure,
    /// A programming defect was detected.
    Internal,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// A required request field is absent or empty.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// The operation code is outside the known set.
    #[error("Invalid operation kind: {0}")]
    InvalidOperationKind(i32),

    /// The amount's sign does not match the operation kind.
    #[error("Amount {amount} is not valid for operation {kind}")]
    SignMismatch {
        /// The requested operation.
        kind: OperationKind,
        /// The offending amount.
        amount: Decimal,
    },

    // ========== Not Found Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    // ========== Conflict Errors ==========
    /// An account with this document number already exists.
    #[error("Account with document number '{0}' already exists")]
    DuplicateDocumentNumber(String),

    /// A balance changed between read and commit.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,

    // ========== Infrastructure Errors ==========
    /// The ledger store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The admission did not finish before its deadline.
    #[error("Admission timed out")]
    Timeout,

    // ========== Internal Errors ==========
    /// A ledger invariant does not hold.
    #[error("Ledger invariant violated: {0}")]
    InvariantViolation(String),
}

impl LedgerError {
    /// Returns the class this error belongs to.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingField(_) | Self::InvalidOperationKind(_) | Self::SignMismatch { .. } => {
                ErrorCategory::Validation
            }
            Self::AccountNotFound(_) | Self::TransactionNotFound(_) => ErrorCategory::NotFound,
            Self::DuplicateDocumentNumber(_) | Self::ConcurrentModification => {
                ErrorCategory::Conflict
            }
            Self::Storage(_) | Self::Timeout => ErrorCategory::Infrastructure,
            Self::InvariantViolation(_) => ErrorCategory::Internal,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "MISSING_FIELD",
            Self::InvalidOperationKind(_) => "INVALID_OPERATION_KIND",
            Self::SignMismatch { .. } => "SIGN_MISMATCH",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::DuplicateDocumentNumber(_) => "DUPLICATE_DOCUMENT_NUMBER",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::InvariantViolation(_) => "INVARIANT_VIOLATION",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::MissingField(_) | Self::InvalidOperationKind(_) | Self::SignMismatch { .. } => 400,

            // 404 Not Found
            Self::AccountNotFound(_) | Self::TransactionNotFound(_) => 404,

            // 409 Conflict
            Self::DuplicateDocumentNumber(_) | Self::ConcurrentModification => 409,

            // 503/504 - storage trouble
            Self::Storage(_) => 503,
            Self::Timeout => 504,

            // 500 Internal Server Error
            Self::InvariantViolation(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrentModification | Self::Storage(_) | Self::Timeout
        )
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateDocumentNumber(document_number) => {
                Self::DuplicateDocumentNumber(document_number)
            }
            StoreError::DuplicateIdempotencyKey(_) | StoreError::BalanceConflict { .. } => {
                Self::ConcurrentModification
            }
            StoreError::TransactionNotFound(id) => Self::TransactionNotFound(id),
            StoreError::Unavailable(reason) => Self::Storage(reason),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err.category() {
            ErrorCategory::Validation => Self::Validation(message),
            ErrorCategory::NotFound => Self::NotFound(message),
            ErrorCategory::Conflict => Self::Conflict(message),
            ErrorCategory::Infrastructure => match err {
                LedgerError::Timeout => Self::Timeout(message),
                _ => Self::Unavailable(message),
            },
            ErrorCategory::Internal => Self::Internal(message),
        }
    }
}
