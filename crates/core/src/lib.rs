//! Core ledger primitives for tracechain.
//!
//! This crate provides the fundamental types used throughout the system:
//! - Hashing (blake3) and difficulty checks
//! - Transaction records for product actions
//! - Blocks and their canonical hashing
//! - Product records

pub mod block;
pub mod hash;
pub mod product;
pub mod transaction;

// Re-export commonly used types at the crate root
pub use block::Block;
pub use hash::{hash, hash_concat, Hash, H256};
pub use product::{PlannedRoute, Product, MAX_QUALITY, QUALITY_FLOOR};
pub use transaction::{Action, Payload, TransactionError, TransactionRecord};
