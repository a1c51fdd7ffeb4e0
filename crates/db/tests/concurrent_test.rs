//! Concurrent admission stress tests.
//!
//! These tests verify that:
//! - Racing requests with one idempotency key commit exactly one transaction
//! - Concurrent payments on one account never discharge the same debt twice
//! - Remaining balances always sum to the sum of original amounts

#![allow(clippy::items_after_statements)]

use std::sync::Arc;

use futures::future::join_all;
use payline_core::ledger::{
    AccountService, CreateTransactionRequest, LedgerService, LedgerStore, TransactionRecord,
};
use payline_db::MemoryLedgerStore;
use payline_shared::LedgerConfig;
use payline_shared::types::{AccountId, PageRequest};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Barrier;

fn setup() -> (Arc<MemoryLedgerStore>, LedgerService, AccountService) {
    let store = Arc::new(MemoryLedgerStore::new());
    let ledger = LedgerService::new(store.clone(), LedgerConfig::default());
    let accounts = AccountService::new(store.clone());
    (store, ledger, accounts)
}

fn request(account_id: AccountId, code: i32, amount: Decimal, key: String) -> CreateTransactionRequest {
    CreateTransactionRequest {
        account_id: Some(account_id),
        operation_code: Some(code),
        amount: Some(amount),
        idempotency_key: Some(key),
    }
}

/// Asserts that discharge conserved value across the whole account history.
async fn assert_conserved(store: &MemoryLedgerStore, account_id: AccountId) {
    let (transactions, _) = store
        .list_account_transactions(account_id, PageRequest::new(1, 100))
        .await
        .unwrap();
    let amounts: Decimal = transactions.iter().map(|t| t.amount).sum();
    let remaining: Decimal = transactions.iter().map(|t| t.remaining_balance).sum();
    assert_eq!(amounts, remaining, "discharge must move value, not create it");

    for t in &transactions {
        if t.operation_kind.is_debit() {
            assert!(t.remaining_balance <= Decimal::ZERO && t.remaining_balance >= t.amount);
        } else {
            assert!(t.remaining_balance >= Decimal::ZERO && t.remaining_balance <= t.amount);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_key_races_commit_once() {
    let (store, ledger, accounts) = setup();
    let account = accounts.create_account("12345678900").await.unwrap().id;

    const CONCURRENT: usize = 50;
    let barrier = Arc::new(Barrier::new(CONCURRENT));

    let handles: Vec<_> = (0..CONCURRENT)
        .map(|_| {
            let ledger = ledger.clone();
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                ledger
                    .create_transaction(request(account, 1, dec!(-75.25), "shared-key".into()))
                    .await
            })
        })
        .collect();

    let records: Vec<TransactionRecord> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let first = &records[0];
    assert!(records.iter().all(|r| r == first));
    assert_eq!(store.transaction_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_payments_never_double_discharge() {
    let (store, ledger, accounts) = setup();
    let account = accounts.create_account("12345678900").await.unwrap().id;

    for i in 0..10 {
        ledger
            .create_transaction(request(account, 1, dec!(-10), format!("debt-{i}")))
            .await
            .unwrap();
    }

    const PAYMENTS: usize = 20;
    let barrier = Arc::new(Barrier::new(PAYMENTS));
    let handles: Vec<_> = (0..PAYMENTS)
        .map(|i| {
            let ledger = ledger.clone();
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                ledger
                    .create_transaction(request(account, 4, dec!(10), format!("payment-{i}")))
                    .await
            })
        })
        .collect();

    for joined in join_all(handles).await {
        joined.unwrap().unwrap();
    }

    let position = ledger.account_position(account).await.unwrap();
    assert_eq!(position.outstanding_debt, dec!(0));
    assert_eq!(position.available_credit, dec!(100));
    assert_conserved(&store, account).await;
    assert!(ledger.locks().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interleaved_debits_and_credits_conserve_value() {
    let (store, ledger, accounts) = setup();
    let account = accounts.create_account("12345678900").await.unwrap().id;

    const REQUESTS: usize = 60;
    let barrier = Arc::new(Barrier::new(REQUESTS));
    let handles: Vec<_> = (0..REQUESTS)
        .map(|i| {
            let ledger = ledger.clone();
            let barrier = Arc::clone(&barrier);
            let (code, amount) = match i % 3 {
                0 => (1, dec!(-12.34)),
                1 => (3, dec!(-5.5)),
                _ => (4, dec!(9.99)),
            };
            tokio::spawn(async move {
                barrier.wait().await;
                ledger
                    .create_transaction(request(account, code, amount, format!("mixed-{i}")))
                    .await
            })
        })
        .collect();

    for joined in join_all(handles).await {
        joined.unwrap().unwrap();
    }

    assert_eq!(store.transaction_count().await, REQUESTS);
    assert_conserved(&store, account).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_accounts_do_not_block_each_other() {
    let (store, ledger, accounts) = setup();

    let mut ids = Vec::new();
    for i in 0..8 {
        ids.push(accounts.create_account(&format!("doc-{i}")).await.unwrap().id);
    }

    let handles: Vec<_> = ids
        .iter()
        .flat_map(|&account| {
            let ledger = ledger.clone();
            (0..5).map(move |i| {
                let ledger = ledger.clone();
                let (code, amount) = if i % 2 == 0 { (2, dec!(-20)) } else { (4, dec!(15)) };
                tokio::spawn(async move {
                    ledger
                        .create_transaction(request(
                            account,
                            code,
                            amount,
                            format!("{account}-{i}"),
                        ))
                        .await
                })
            })
        })
        .collect();

    for joined in join_all(handles).await {
        joined.unwrap().unwrap();
    }

    for account in ids {
        // admission order varies, the net never does
        let position = ledger.account_position(account).await.unwrap();
        assert_eq!(position.net(), dec!(-30));
        assert_conserved(&store, account).await;
    }
}
