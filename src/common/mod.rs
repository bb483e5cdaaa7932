//! Common types and utilities shared across pagelock.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`BufferPoolConfig`]
//! - Error types
//! - Identifiers ([`PageIdentity`], [`TableId`], [`TransactionId`])

pub mod config;
pub mod error;
mod page_id;
mod txn_id;

pub use config::BufferPoolConfig;
pub use error::{Error, Result};
pub use page_id::{PageIdentity, TableId};
pub use txn_id::TransactionId;
