//! Shared types, errors, and configuration for Payline.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Pagination types for ledger listings
//! - Caller-facing error classification
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, LedgerConfig, LogConfig};
pub use error::AppError;
