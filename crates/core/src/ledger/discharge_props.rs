//! Property-based tests for the discharge engine.
//!
//! - Conservation: discharged debt plus the credit's remainder equals the credit
//! - Determinism: the same snapshot always produces the same outcome
//! - FIFO: only a prefix of the debits is touched and all but the last touched one are settled

use chrono::Utc;
use payline_shared::types::{AccountId, TransactionId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::discharge::DischargeEngine;
use super::types::{OperationKind, Transaction};

/// Strategy to generate positive decimal amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a list of outstanding debt amounts (negative).
fn debts() -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec(positive_amount().prop_map(|amount| -amount), 0..12)
}

/// Strategy to generate a debit operation kind.
fn debit_kind() -> impl Strategy<Value = OperationKind> {
    prop_oneof![
        Just(OperationKind::Purchase),
        Just(OperationKind::InstallmentPurchase),
        Just(OperationKind::Withdrawal),
    ]
}

fn make_debts(account_id: AccountId, amounts: &[Decimal]) -> Vec<Transaction> {
    amounts
        .iter()
        .enumerate()
        .map(|(index, amount)| Transaction {
            id: TransactionId::new(),
            account_id,
            operation_kind: OperationKind::Purchase,
            amount: *amount,
            remaining_balance: *amount,
            idempotency_key: format!("debt-{index}"),
            event_date: Utc::now(),
            sequence: index as u64 + 1,
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_discharge_conserves_credit(
        amounts in debts(),
        payment in positive_amount(),
    ) {
        let account_id = AccountId::new();
        let outstanding = make_debts(account_id, &amounts);

        let outcome = DischargeEngine::discharge(
            account_id,
            OperationKind::Payment,
            payment,
            &outstanding,
        ).unwrap();

        prop_assert_eq!(outcome.discharged() + outcome.remaining_balance, payment);
        prop_assert!(outcome.remaining_balance >= Decimal::ZERO);

        let total_debt: Decimal = amounts.iter().map(|a| -*a).sum();
        prop_assert_eq!(outcome.discharged(), payment.min(total_debt));
    }

    #[test]
    fn prop_discharge_is_deterministic(
        amounts in debts(),
        payment in positive_amount(),
    ) {
        let account_id = AccountId::new();
        let outstanding = make_debts(account_id, &amounts);

        let first = DischargeEngine::discharge(account_id, OperationKind::Payment, payment, &outstanding).unwrap();
        let second = DischargeEngine::discharge(account_id, OperationKind::Payment, payment, &outstanding).unwrap();

        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_discharge_is_fifo(
        amounts in debts(),
        payment in positive_amount(),
    ) {
        let account_id = AccountId::new();
        let outstanding = make_debts(account_id, &amounts);

        let outcome = DischargeEngine::discharge(
            account_id,
            OperationKind::Payment,
            payment,
            &outstanding,
        ).unwrap();

        for (update, debit) in outcome.updates.iter().zip(&outstanding) {
            prop_assert_eq!(update.transaction_id, debit.id);
            prop_assert!(update.new_remaining <= Decimal::ZERO);
            prop_assert!(update.new_remaining > update.expected_previous);
        }

        if let Some((_, settled)) = outcome.updates.split_last() {
            prop_assert!(settled.iter().all(|u| u.new_remaining.is_zero()));
        }

        if outcome.remaining_balance > Decimal::ZERO {
            prop_assert_eq!(outcome.updates.len(), outstanding.len());
        }
    }

    #[test]
    fn prop_debits_never_discharge(
        amounts in debts(),
        kind in debit_kind(),
        amount in positive_amount(),
    ) {
        let account_id = AccountId::new();
        let outstanding = make_debts(account_id, &amounts);

        let outcome = DischargeEngine::discharge(account_id, kind, -amount, &outstanding).unwrap();

        prop_assert_eq!(outcome.remaining_balance, -amount);
        prop_assert!(outcome.updates.is_empty());
    }
}
