//! Ledger store implementations.
//!
//! This crate provides:
//! - `MemoryLedgerStore`, an in-process store satisfying the
//!   [`LedgerStore`](payline_core::ledger::LedgerStore) contract
//! - Fault injection hooks used to exercise infrastructure failures

pub mod memory;

pub use memory::MemoryLedgerStore;
