//! Balance discharge: applying credits against outstanding debt.
//!
//! Debits enter the ledger fully outstanding and never consume anything.
//! A credit walks the account's outstanding debits oldest first (by store
//! sequence) and moves each one toward zero until the credit is used up;
//! whatever is left becomes the credit's own remaining balance.
//!
//! The engine is pure. It computes the remaining balance of the incoming
//! transaction plus one compare-and-swap update per debit it touched, and the
//! caller commits them together.

use payline_shared::types::AccountId;
use rust_decimal::Decimal;
use tracing::debug;

use super::error::LedgerError;
use super::types::{BalanceUpdate, OperationKind, Transaction};

/// Result of running discharge for one incoming transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DischargeOutcome {
    /// Remaining balance to store on the incoming transaction.
    pub remaining_balance: Decimal,
    /// Updates to earlier debits, in discharge order.
    pub updates: Vec<BalanceUpdate>,
}

impl DischargeOutcome {
    /// Total amount of debt this outcome discharges.
    #[must_use]
    pub fn discharged(&self) -> Decimal {
        self.updates
            .iter()
            .map(|update| update.new_remaining - update.expected_previous)
            .sum()
    }
}

/// Stateless discharge calculator.
pub struct DischargeEngine;

impl DischargeEngine {
    /// Computes the effect of admitting `amount` of `kind` on `account_id`.
    ///
    /// `outstanding_debits` is the account's unsettled debit set as read from
    /// the store. It is walked in ascending `sequence` order regardless of the
    /// order it arrives in, so the same snapshot always yields the same outcome.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if the amount does not carry the kind's
    /// sign, or if any outstanding debit belongs to another account, is not a
    /// debit, has a non-negative remaining balance, owes more than its
    /// original amount, or shares a sequence number with another debit.
    pub fn discharge(
        account_id: AccountId,
        kind: OperationKind,
        amount: Decimal,
        outstanding_debits: &[Transaction],
    ) -> Result<DischargeOutcome, LedgerError> {
        if !kind.required_sign().admits(amount) {
            return Err(LedgerError::InvariantViolation(format!(
                "{kind} amount {amount} reached discharge with the wrong sign"
            )));
        }

        if kind.is_debit() {
            return Ok(DischargeOutcome {
                remaining_balance: amount,
                updates: Vec::new(),
            });
        }

        let ordered = Self::ordered_debits(account_id, outstanding_debits)?;

        let mut available = amount;
        let mut updates = Vec::new();

        for debit in ordered {
            if available.is_zero() {
                break;
            }

            let owed = -debit.remaining_balance;
            let offset = available.min(owed);
            let new_remaining = debit.remaining_balance + offset;
            available -= offset;

            debug!(
                debit_id = %debit.id,
                sequence = debit.sequence,
                %offset,
                %new_remaining,
                %available,
                "Discharged debit"
            );

            updates.push(BalanceUpdate {
                transaction_id: debit.id,
                expected_previous: debit.remaining_balance,
                new_remaining,
            });
        }

        if available < Decimal::ZERO {
            return Err(LedgerError::InvariantViolation(format!(
                "available credit went negative ({available})"
            )));
        }

        Ok(DischargeOutcome {
            remaining_balance: available,
            updates,
        })
    }

    /// Checks every outstanding debit and returns them in discharge order.
    fn ordered_debits(
        account_id: AccountId,
        outstanding_debits: &[Transaction],
    ) -> Result<Vec<&Transaction>, LedgerError> {
        for debit in outstanding_debits {
            if debit.account_id != account_id {
                return Err(LedgerError::InvariantViolation(format!(
                    "outstanding debit {} belongs to account {}, not {account_id}",
                    debit.id, debit.account_id
                )));
            }
            if !debit.operation_kind.is_debit() {
                return Err(LedgerError::InvariantViolation(format!(
                    "transaction {} of kind {} listed as outstanding debit",
                    debit.id, debit.operation_kind
                )));
            }
            if debit.remaining_balance >= Decimal::ZERO {
                return Err(LedgerError::InvariantViolation(format!(
                    "outstanding debit {} has non-negative remaining balance {}",
                    debit.id, debit.remaining_balance
                )));
            }
            if debit.remaining_balance < debit.amount {
                return Err(LedgerError::InvariantViolation(format!(
                    "outstanding debit {} owes {} but its amount is {}",
                    debit.id, debit.remaining_balance, debit.amount
                )));
            }
        }

        let mut ordered: Vec<&Transaction> = outstanding_debits.iter().collect();
        ordered.sort_by_key(|debit| debit.sequence);

        if let Some(pair) = ordered.windows(2).find(|pair| pair[0].sequence == pair[1].sequence) {
            return Err(LedgerError::InvariantViolation(format!(
                "debits {} and {} share sequence {}",
                pair[0].id, pair[1].id, pair[0].sequence
            )));
        }

        Ok(ordered)
    }
}
