//! Proof of Work consensus for tracechain.
//!
//! This crate provides:
//! - Leading-zero-digit proof of work over block hashes
//! - Transaction validation (required fields, value ranges)
//! - Block and chain validation (hash links, content hashes, work, batch size)
//!
//! # Example
//!
//! ```rust
//! use tracechain_consensus::{BlockValidator, ChainRules, ProofOfWork};
//! use tracechain_core::{Block, TransactionRecord};
//!
//! let pow = ProofOfWork::new(1).unwrap();
//! let genesis = Block::genesis();
//!
//! let tx = TransactionRecord::transfer("farm1", "factory1", "p-1", 95);
//! let mut block = Block::new(1, genesis.hash(), vec![tx]);
//! pow.mine(&mut block);
//!
//! let rules = ChainRules { pow, max_block_transactions: 10 };
//! BlockValidator::validate_chain(&[genesis, block], &rules).unwrap();
//! ```

pub mod pow;
pub mod validator;

// Re-export commonly used types
pub use pow::{ConsensusError, MiningReport, ProofOfWork, MAX_DIFFICULTY};
pub use validator::{BlockValidator, ChainRules, TransactionValidator, ValidationError};
