//! Demo seeder for Payline development.
//!
//! Builds an in-memory ledger, opens one account, replays a short card
//! history through the admission pipeline and prints the resulting ledger
//! as JSON.
//!
//! Usage: cargo run --bin payline-seeder

use std::sync::Arc;

use anyhow::Context;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use payline_core::ledger::{
    AccountService, CreateTransactionRequest, LedgerService, OperationKind, TransactionRecord,
};
use payline_db::MemoryLedgerStore;
use payline_shared::{AppConfig, LogConfig};
use payline_shared::types::{AccountId, PageRequest};

/// Document number of the demo account.
const DEMO_DOCUMENT_NUMBER: &str = "12345678900";

/// Card history replayed in order: (idempotency key, operation, amount).
const HISTORY: [(&str, OperationKind, Decimal); 6] = [
    ("seed-purchase-1", OperationKind::Purchase, dec!(-50.0)),
    ("seed-installment-1", OperationKind::InstallmentPurchase, dec!(-23.5)),
    ("seed-withdrawal-1", OperationKind::Withdrawal, dec!(-18.7)),
    ("seed-payment-1", OperationKind::Payment, dec!(60.0)),
    // replayed key: returns the first payment, writes nothing
    ("seed-payment-1", OperationKind::Payment, dec!(60.0)),
    ("seed-payment-2", OperationKind::Payment, dec!(100.0)),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.log);

    let store = Arc::new(MemoryLedgerStore::new());
    let ledger = LedgerService::new(store.clone(), config.ledger);
    let accounts = AccountService::new(store);

    let account = accounts.create_account(DEMO_DOCUMENT_NUMBER).await?;
    info!(account_id = %account.id, "Seeded demo account");

    for (key, kind, amount) in HISTORY {
        let record = post(&ledger, account.id, key, kind, amount).await?;
        info!(
            transaction_id = %record.transaction_id,
            operation = %record.operation_kind,
            amount = %record.amount,
            "Seeded transaction"
        );
    }

    let transactions = ledger
        .list_transactions(account.id, PageRequest::default())
        .await?;
    let position = ledger.account_position(account.id).await?;

    let summary = serde_json::json!({
        "account": account,
        "transactions": transactions,
        "position": position,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

async fn post(
    ledger: &LedgerService,
    account_id: AccountId,
    idempotency_key: &str,
    kind: OperationKind,
    amount: Decimal,
) -> anyhow::Result<TransactionRecord> {
    let request = CreateTransactionRequest {
        account_id: Some(account_id),
        operation_code: Some(kind.code()),
        amount: Some(amount),
        idempotency_key: Some(idempotency_key.to_string()),
    };
    ledger
        .create_transaction(request)
        .await
        .with_context(|| format!("failed to seed transaction '{idempotency_key}'"))
}

/// Installs the global subscriber. `RUST_LOG` wins over the configured filter.
fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| log.filter.as_str().into());

    tracing_subscriber::registry()
        .with(filter)
        .with(log.json.then(|| fmt::layer().json()))
        .with((!log.json).then(fmt::layer))
        .init();
}
