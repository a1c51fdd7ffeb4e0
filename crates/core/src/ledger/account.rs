//! Account registration and lookup.

use std::sync::Arc;

use payline_shared::types::AccountId;
use tracing::{info, instrument, warn};

use super::error::LedgerError;
use super::store::LedgerStore;
use super::types::{Account, NewAccount};

/// Registers accounts and resolves them by ID.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn LedgerStore>,
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService").finish_non_exhaustive()
    }
}

impl AccountService {
    /// Creates an account service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Registers a new account under a unique document number.
    ///
    /// # Errors
    ///
    /// - `MissingField` if the document number is blank
    /// - `DuplicateDocumentNumber` if another account already holds it
    /// - `Storage` if the store is unavailable
    #[instrument(skip(self))]
    pub async fn create_account(&self, document_number: &str) -> Result<Account, LedgerError> {
        let document_number = document_number.trim();
        if document_number.is_empty() {
            return Err(LedgerError::MissingField("document_number"));
        }

        if self
            .store
            .find_account_by_document_number(document_number)
            .await?
            .is_some()
        {
            warn!("Document number already registered");
            return Err(LedgerError::DuplicateDocumentNumber(document_number.to_string()));
        }

        // the lookup above can race; the store's unique index decides
        let account = self
            .store
            .insert_account(NewAccount {
                document_number: document_number.to_string(),
            })
            .await?;

        info!(account_id = %account.id, "Account created");
        Ok(account)
    }

    /// Returns the account with the given ID.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for unknown IDs or `Storage` on lookup failure.
    pub async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.store
            .find_account(id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::store::{MockLedgerStore, StoreError};
    use chrono::Utc;

    fn account(document_number: &str) -> Account {
        Account {
            id: AccountId::new(),
            document_number: document_number.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_account_inserts_trimmed_number() {
        let mut store = MockLedgerStore::new();
        store
            .expect_find_account_by_document_number()
            .withf(|number| number == "12345678900")
            .times(1)
            .returning(|_| Ok(None));
        store
            .expect_insert_account()
            .withf(|new| new.document_number == "12345678900")
            .times(1)
            .returning(|new| Ok(account(&new.document_number)));

        let created = AccountService::new(Arc::new(store))
            .create_account("  12345678900 ")
            .await
            .unwrap();

        assert_eq!(created.document_number, "12345678900");
    }

    #[tokio::test]
    async fn test_create_account_rejects_blank_number() {
        let store = MockLedgerStore::new();
        let err = AccountService::new(Arc::new(store))
            .create_account("   ")
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::MissingField("document_number"));
    }

    #[tokio::test]
    async fn test_create_account_rejects_known_number() {
        let mut store = MockLedgerStore::new();
        store
            .expect_find_account_by_document_number()
            .returning(|number| Ok(Some(account(number))));

        let err = AccountService::new(Arc::new(store))
            .create_account("111")
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::DuplicateDocumentNumber("111".into()));
    }

    #[tokio::test]
    async fn test_create_account_maps_insert_race() {
        let mut store = MockLedgerStore::new();
        store
            .expect_find_account_by_document_number()
            .returning(|_| Ok(None));
        store
            .expect_insert_account()
            .returning(|new| Err(StoreError::DuplicateDocumentNumber(new.document_number)));

        let err = AccountService::new(Arc::new(store))
            .create_account("222")
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::DuplicateDocumentNumber("222".into()));
        assert_eq!(err.http_status_code(), 409);
    }

    #[tokio::test]
    async fn test_get_account_not_found() {
        let id = AccountId::new();
        let mut store = MockLedgerStore::new();
        store.expect_find_account().returning(|_| Ok(None));

        let err = AccountService::new(Arc::new(store))
            .get_account(id)
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::AccountNotFound(id));
    }

    #[tokio::test]
    async fn test_get_account_storage_failure() {
        let mut store = MockLedgerStore::new();
        store
            .expect_find_account()
            .returning(|_| Err(StoreError::Unavailable("down".into())));

        let err = AccountService::new(Arc::new(store))
            .get_account(AccountId::new())
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::Storage("down".into()));
    }
}
