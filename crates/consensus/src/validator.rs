//! Transaction and chain validation rules.
//!
//! Transactions are checked for structural well-formedness before they enter
//! the pending queue. Blocks and whole chains are checked for hash-link
//! integrity and proof of work.

use crate::pow::ProofOfWork;
use thiserror::Error;
use tracechain_core::{Block, Hash, Payload, TransactionRecord, MAX_QUALITY};

/// Errors that can occur during validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("transaction is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("quality score {0} is outside 0..=100")]
    QualityOutOfRange(u8),

    #[error("genesis block is malformed")]
    InvalidGenesis,

    #[error("block index mismatch (expected {expected}, got {got})")]
    InvalidIndex { expected: u64, got: u64 },

    #[error("block {index} previous_hash does not match its parent")]
    InvalidPrevHash { index: u64 },

    #[error("block {index} stored hash does not match its content")]
    HashMismatch { index: u64 },

    #[error("block {index} hash has {found} leading zero digits, {required} required")]
    InsufficientWork {
        index: u64,
        required: u32,
        found: u32,
    },

    #[error("block {index} holds {got} transactions, maximum is {max}")]
    TooManyTransactions { index: u64, max: usize, got: usize },

    #[error("block {index} contains no transactions and is not genesis")]
    EmptyBlock { index: u64 },
}

pub type Result<T> = std::result::Result<T, ValidationError>;

fn require(value: &str, field: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

fn check_quality(score: u8) -> Result<()> {
    if score > MAX_QUALITY {
        return Err(ValidationError::QualityOutOfRange(score));
    }
    Ok(())
}

/// Transaction validator.
pub struct TransactionValidator;

impl TransactionValidator {
    /// Structural validation: every required field is present and in range.
    pub fn validate_transaction(tx: &TransactionRecord) -> Result<()> {
        require(tx.from(), "from")?;
        require(tx.to(), "to")?;
        require(tx.product_id(), "product_id")?;

        match tx.payload() {
            Payload::Create {
                name,
                batch_number,
                origin,
                quality_score,
            } => {
                require(name, "name")?;
                require(batch_number, "batch_number")?;
                require(origin, "origin")?;
                check_quality(*quality_score)?;
            }
            Payload::Transfer { quality_score } | Payload::QualityCheck { quality_score, .. } => {
                check_quality(*quality_score)?;
            }
            Payload::Deliver { recipient } => require(recipient, "recipient")?,
        }

        Ok(())
    }
}

/// Rules a chain is checked against.
#[derive(Debug, Clone, Copy)]
pub struct ChainRules {
    pub pow: ProofOfWork,
    pub max_block_transactions: usize,
}

/// Block and chain validator.
pub struct BlockValidator;

impl BlockValidator {
    /// Validate the genesis block: index 0, zero parent, hash consistent with content.
    pub fn validate_genesis(block: &Block) -> Result<()> {
        if block.index() != 0 || block.previous_hash() != Hash::ZERO {
            return Err(ValidationError::InvalidGenesis);
        }
        if !block.has_valid_hash() {
            return Err(ValidationError::HashMismatch { index: 0 });
        }
        Ok(())
    }

    /// Validate a mined block against its parent.
    pub fn validate_block(block: &Block, parent: &Block, rules: &ChainRules) -> Result<()> {
        let expected = parent.index() + 1;
        if block.index() != expected {
            return Err(ValidationError::InvalidIndex {
                expected,
                got: block.index(),
            });
        }

        if block.previous_hash() != parent.calculate_hash() {
            return Err(ValidationError::InvalidPrevHash {
                index: block.index(),
            });
        }

        if !block.has_valid_hash() {
            return Err(ValidationError::HashMismatch {
                index: block.index(),
            });
        }

        if !rules.pow.meets_target(&block.hash()) {
            return Err(ValidationError::InsufficientWork {
                index: block.index(),
                required: rules.pow.difficulty(),
                found: block.hash().leading_zero_digits(),
            });
        }

        if block.transactions().is_empty() {
            return Err(ValidationError::EmptyBlock {
                index: block.index(),
            });
        }

        if block.tx_count() > rules.max_block_transactions {
            return Err(ValidationError::TooManyTransactions {
                index: block.index(),
                max: rules.max_block_transactions,
                got: block.tx_count(),
            });
        }

        Ok(())
    }

    /// Validate an entire chain from genesis to tail.
    ///
    /// Returns the first inconsistency found.
    pub fn validate_chain(chain: &[Block], rules: &ChainRules) -> Result<()> {
        let Some(genesis) = chain.first() else {
            return Err(ValidationError::InvalidGenesis);
        };
        Self::validate_genesis(genesis)?;

        for pair in chain.windows(2) {
            Self::validate_block(&pair[1], &pair[0], rules)?;
        }

        Ok(())
    }
}
