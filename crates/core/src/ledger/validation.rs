//! Request well-formedness and operation/sign validation.
//!
//! Both checks are pure. `require_fields` runs at the boundary before the
//! pipeline is entered; `validate_operation` runs inside the pipeline, after
//! idempotency resolution and before any account lookup.

use rust_decimal::{Decimal, RoundingStrategy};

use super::error::LedgerError;
use super::types::{CreateTransactionInput, CreateTransactionRequest, OperationKind};

/// Turns a raw request into pipeline input.
///
/// # Errors
///
/// Returns `MissingField` if the idempotency key or account ID is absent or
/// empty, the operation code is absent, or the amount is absent or zero.
pub fn require_fields(
    request: CreateTransactionRequest,
) -> Result<CreateTransactionInput, LedgerError> {
    let idempotency_key = request
        .idempotency_key
        .filter(|key| !key.trim().is_empty())
        .ok_or(LedgerError::MissingField("idempotency_key"))?;
    let account_id = request
        .account_id
        .filter(|id| !id.is_nil())
        .ok_or(LedgerError::MissingField("account_id"))?;
    let operation_code = request
        .operation_code
        .ok_or(LedgerError::MissingField("operation_type_id"))?;
    let amount = request
        .amount
        .filter(|amount| !amount.is_zero())
        .ok_or(LedgerError::MissingField("amount"))?;

    Ok(CreateTransactionInput {
        account_id,
        operation_code,
        amount,
        idempotency_key,
    })
}

/// Rounds an amount to `scale` decimal places with banker's rounding.
#[must_use]
pub fn normalize_amount(amount: Decimal, scale: u32) -> Decimal {
    amount.round_dp_with_strategy(scale, RoundingStrategy::MidpointNearestEven)
}

/// Resolves the operation code and checks the amount carries the kind's sign.
///
/// # Errors
///
/// Returns `InvalidOperationKind` for unknown codes and `SignMismatch` when
/// the amount is zero or has the wrong sign.
pub fn validate_operation(operation_code: i32, amount: Decimal) -> Result<OperationKind, LedgerError> {
    let kind = OperationKind::from_code(operation_code)
        .ok_or(LedgerError::InvalidOperationKind(operation_code))?;

    if !kind.required_sign().admits(amount) {
        return Err(LedgerError::SignMismatch { kind, amount });
    }

    Ok(kind)
}
