//! Idempotency key resolution.
//!
//! The lookup here is an optimization: the store's uniqueness constraint on
//! the key is what actually prevents two commits. A replayed request is
//! answered with the committed record, never by running admission again.

use tracing::debug;

use super::error::LedgerError;
use super::store::LedgerStore;
use super::types::Transaction;

/// Outcome of looking up an idempotency key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A transaction was already committed under the key.
    Found(Box<Transaction>),
    /// No transaction exists for the key yet.
    NotFound,
}

/// Looks up the transaction committed under `idempotency_key`.
///
/// # Errors
///
/// Returns `LedgerError::Storage` if the store lookup fails; that is a
/// retryable infrastructure error, not a rejection of the request.
pub async fn resolve(
    store: &dyn LedgerStore,
    idempotency_key: &str,
) -> Result<Resolution, LedgerError> {
    match store.find_transaction_by_idempotency_key(idempotency_key).await? {
        Some(existing) => {
            debug!(
                idempotency_key,
                transaction_id = %existing.id,
                "Idempotency key already committed"
            );
            Ok(Resolution::Found(Box::new(existing)))
        }
        None => Ok(Resolution::NotFound),
    }
}
