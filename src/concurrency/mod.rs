//! Concurrency control: page locks and transaction handles.
//!
//! - [`LockManager`] - Non-blocking shared/exclusive page lock table
//! - [`Permission`] - Lock modes
//! - [`Transaction`] - RAII transaction over a buffer pool

mod lock_manager;
mod permission;
mod transaction;

pub use lock_manager::LockManager;
pub use permission::Permission;
pub use transaction::Transaction;
