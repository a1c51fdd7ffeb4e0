//! Property-based tests for operation/sign validation.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::OperationKind;
use super::validation::{normalize_amount, validate_operation};

/// Strategy to generate non-negative amounts, zero included.
fn non_negative_amount() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a debit operation kind.
fn debit_kind() -> impl Strategy<Value = OperationKind> {
    prop_oneof![
        Just(OperationKind::Purchase),
        Just(OperationKind::InstallmentPurchase),
        Just(OperationKind::Withdrawal),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Debit kinds reject every amount >= 0.
    #[test]
    fn prop_debit_rejects_non_negative(
        kind in debit_kind(),
        amount in non_negative_amount(),
    ) {
        let result = validate_operation(kind.code(), amount);
        prop_assert!(matches!(result, Err(LedgerError::SignMismatch { .. })), "expected SignMismatch, got {:?}", result);
    }

    /// Payment rejects every amount <= 0.
    #[test]
    fn prop_payment_rejects_non_positive(amount in non_negative_amount()) {
        let result = validate_operation(OperationKind::Payment.code(), -amount);
        prop_assert!(matches!(result, Err(LedgerError::SignMismatch { .. })), "expected SignMismatch, got {:?}", result);
    }

    /// Codes outside 1..=4 are always rejected, whatever the amount.
    #[test]
    fn prop_unknown_codes_rejected(
        code in prop_oneof![i32::MIN..1i32, 5i32..i32::MAX],
        cents in -1_000_000i64..1_000_000i64,
    ) {
        let result = validate_operation(code, Decimal::new(cents, 2));
        prop_assert_eq!(result, Err(LedgerError::InvalidOperationKind(code)));
    }

    /// Normalization never changes the sign of a non-zero result.
    #[test]
    fn prop_normalize_preserves_sign(cents in -1_000_000i64..1_000_000i64, scale in 0u32..6) {
        let amount = Decimal::new(cents, 3);
        let normalized = normalize_amount(amount, scale);
        if !normalized.is_zero() {
            prop_assert_eq!(normalized.is_sign_negative(), amount.is_sign_negative());
        }
        prop_assert!(normalized.scale() <= scale.max(amount.scale()));
    }
}
