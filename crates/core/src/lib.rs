//! Core business logic for Payline.
//!
//! This crate contains the ledger rules with no transport or database
//! dependencies. Storage is reached only through the [`ledger::LedgerStore`]
//! trait.
//!
//! # Modules
//!
//! - `ledger` - Transaction admission, validation and FIFO discharge

pub mod ledger;
