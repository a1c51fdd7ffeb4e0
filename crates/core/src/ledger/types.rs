//! Ledger domain types for accounts, transactions and admission.
//!
//! Amounts are signed: debits (money owed by the account) are negative and
//! credits (money paid into the account) are positive. A transaction's
//! `remaining_balance` is the part of its amount not yet offset by discharge.

use chrono::{DateTime, Utc};
use payline_shared::types::{AccountId, TransactionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sign an operation kind requires of its amount. Zero satisfies neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountSign {
    /// Strictly below zero.
    Negative,
    /// Strictly above zero.
    Positive,
}

impl AmountSign {
    /// Returns true if `amount` carries this sign.
    #[must_use]
    pub fn admits(self, amount: Decimal) -> bool {
        match self {
            Self::Negative => amount < Decimal::ZERO,
            Self::Positive => amount > Decimal::ZERO,
        }
    }
}

/// The closed set of operations a transaction can record.
///
/// Adding a kind means adding a code, a name and a required sign below;
/// every table is an exhaustive `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    /// Card purchase paid in full.
    Purchase,
    /// Card purchase paid in installments.
    InstallmentPurchase,
    /// Cash withdrawal.
    Withdrawal,
    /// Payment into the account.
    Payment,
}

impl OperationKind {
    /// Every operation kind, in code order.
    pub const ALL: [Self; 4] = [
        Self::Purchase,
        Self::InstallmentPurchase,
        Self::Withdrawal,
        Self::Payment,
    ];

    /// Stable numeric code used by callers.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Purchase => 1,
            Self::InstallmentPurchase => 2,
            Self::Withdrawal => 3,
            Self::Payment => 4,
        }
    }

    /// Looks up a kind by its numeric code.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Purchase),
            2 => Some(Self::InstallmentPurchase),
            3 => Some(Self::Withdrawal),
            4 => Some(Self::Payment),
            _ => None,
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Purchase => "PURCHASE",
            Self::InstallmentPurchase => "INSTALLMENT PURCHASE",
            Self::Withdrawal => "WITHDRAWAL",
            Self::Payment => "PAYMENT",
        }
    }

    /// Sign the amount of this kind must carry.
    #[must_use]
    pub const fn required_sign(self) -> AmountSign {
        match self {
            Self::Purchase | Self::InstallmentPurchase | Self::Withdrawal => AmountSign::Negative,
            Self::Payment => AmountSign::Positive,
        }
    }

    /// Returns true for kinds that record debt.
    #[must_use]
    pub const fn is_debit(self) -> bool {
        matches!(self.required_sign(), AmountSign::Negative)
    }

    /// Returns true for kinds that record money paid in.
    #[must_use]
    pub const fn is_credit(self) -> bool {
        matches!(self.required_sign(), AmountSign::Positive)
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A customer account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The account ID.
    pub id: AccountId,
    /// External document number, unique across accounts.
    pub document_number: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// Input for inserting an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    /// External document number.
    pub document_number: String,
}

/// A committed ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// The transaction ID, assigned by the store.
    pub id: TransactionId,
    /// The owning account.
    pub account_id: AccountId,
    /// What kind of operation this records.
    pub operation_kind: OperationKind,
    /// Original signed amount.
    pub amount: Decimal,
    /// Portion of `amount` not yet offset by discharge.
    pub remaining_balance: Decimal,
    /// Client-supplied deduplication key.
    pub idempotency_key: String,
    /// When the transaction was admitted.
    pub event_date: DateTime<Utc>,
    /// Store-wide insertion sequence; the discharge order.
    pub sequence: u64,
}

impl Transaction {
    /// Returns true if part of the amount is still unconsumed.
    #[must_use]
    pub fn is_outstanding(&self) -> bool {
        !self.remaining_balance.is_zero()
    }

    /// Returns true for outstanding debt this account still owes.
    #[must_use]
    pub fn is_outstanding_debit(&self) -> bool {
        self.operation_kind.is_debit() && self.is_outstanding()
    }

    /// Returns true for a credit with an unconsumed positive remainder.
    #[must_use]
    pub fn is_outstanding_credit(&self) -> bool {
        self.operation_kind.is_credit() && self.remaining_balance > Decimal::ZERO
    }
}

/// A transaction ready to be inserted; the store assigns `id` and `sequence`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    /// The owning account.
    pub account_id: AccountId,
    /// What kind of operation this records.
    pub operation_kind: OperationKind,
    /// Original signed amount.
    pub amount: Decimal,
    /// Remaining balance computed by discharge.
    pub remaining_balance: Decimal,
    /// Client-supplied deduplication key.
    pub idempotency_key: String,
    /// When the transaction was admitted.
    pub event_date: DateTime<Utc>,
}

/// Compare-and-swap update of one transaction's remaining balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceUpdate {
    /// The transaction being discharged.
    pub transaction_id: TransactionId,
    /// Remaining balance the update was computed from.
    pub expected_previous: Decimal,
    /// Remaining balance after discharge.
    pub new_remaining: Decimal,
}

/// Everything one admission writes, applied all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionCommit {
    /// The transaction being admitted.
    pub transaction: NewTransaction,
    /// Discharge applied to earlier debits.
    pub balance_updates: Vec<BalanceUpdate>,
}

/// Raw transaction request as handed over by the transport layer.
///
/// Every field is optional here; `validation::require_fields` turns it into a
/// `CreateTransactionInput` or rejects it with `MissingField`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateTransactionRequest {
    /// The account to post to.
    pub account_id: Option<AccountId>,
    /// Numeric operation kind code.
    pub operation_code: Option<i32>,
    /// Signed amount.
    pub amount: Option<Decimal>,
    /// Client-supplied deduplication key.
    pub idempotency_key: Option<String>,
}

/// Well-formed input entering the admission pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTransactionInput {
    /// The account to post to.
    pub account_id: AccountId,
    /// Numeric operation kind code, checked by the validator.
    pub operation_code: i32,
    /// Signed amount, checked by the validator.
    pub amount: Decimal,
    /// Client-supplied deduplication key.
    pub idempotency_key: String,
}

/// Boundary view of a transaction returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// The transaction ID.
    pub transaction_id: TransactionId,
    /// The owning account.
    pub account_id: AccountId,
    /// What kind of operation this records.
    pub operation_kind: OperationKind,
    /// Original signed amount.
    pub amount: Decimal,
}

impl From<&Transaction> for TransactionRecord {
    fn from(transaction: &Transaction) -> Self {
        Self {
            transaction_id: transaction.id,
            account_id: transaction.account_id,
            operation_kind: transaction.operation_kind,
            amount: transaction.amount,
        }
    }
}

impl From<Transaction> for TransactionRecord {
    fn from(transaction: Transaction) -> Self {
        Self::from(&transaction)
    }
}

/// Outstanding position of an account derived from remaining balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPosition {
    /// The account ID.
    pub account_id: AccountId,
    /// Sum of remaining debit balances (zero or negative).
    pub outstanding_debt: Decimal,
    /// Sum of unconsumed credit balances (zero or positive).
    pub available_credit: Decimal,
}

impl AccountPosition {
    /// Net position: available credit minus outstanding debt.
    #[must_use]
    pub fn net(&self) -> Decimal {
        self.available_credit + self.outstanding_debt
    }
}
