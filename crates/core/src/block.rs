//! Blocks and their canonical hashing.
//!
//! A block hash is `blake3(bincode(index, transactions, timestamp, previous_hash) || nonce_le)`.
//! The content prefix is computed once per block so proof-of-work only re-hashes
//! the trailing nonce bytes.

use crate::hash::{hash_concat, Hash};
use crate::transaction::TransactionRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Borrowed view of the hashed block fields, in canonical order.
#[derive(Serialize)]
struct BlockContent<'a> {
    index: u64,
    transactions: &'a [TransactionRecord],
    timestamp: &'a DateTime<Utc>,
    previous_hash: &'a Hash,
}

/// An ordered batch of transactions linked to its predecessor by hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    index: u64,
    transactions: Vec<TransactionRecord>,
    timestamp: DateTime<Utc>,
    previous_hash: Hash,
    nonce: u64,
    hash: Hash,
}

impl Block {
    /// Create a new unmined block (nonce 0) stamped with the current time.
    pub fn new(index: u64, previous_hash: Hash, transactions: Vec<TransactionRecord>) -> Self {
        Self::with_timestamp(index, previous_hash, transactions, Utc::now())
    }

    /// Create a new unmined block with an explicit timestamp.
    pub fn with_timestamp(
        index: u64,
        previous_hash: Hash,
        transactions: Vec<TransactionRecord>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let mut block = Self {
            index,
            transactions,
            timestamp,
            previous_hash,
            nonce: 0,
            hash: Hash::ZERO,
        };
        block.hash = block.calculate_hash();
        block
    }

    /// Create the genesis block: index 0, no transactions, zero previous hash.
    pub fn genesis() -> Self {
        Self::new(0, Hash::ZERO, Vec::new())
    }

    /// Canonical encoding of every hashed field except the nonce.
    pub fn content_bytes(&self) -> Vec<u8> {
        let content = BlockContent {
            index: self.index,
            transactions: &self.transactions,
            timestamp: &self.timestamp,
            previous_hash: &self.previous_hash,
        };
        bincode::serialize(&content).expect("serialization should not fail")
    }

    /// Hash a content prefix (from [`Block::content_bytes`]) with a candidate nonce.
    pub fn hash_with_nonce(content: &[u8], nonce: u64) -> Hash {
        hash_concat(&[content, &nonce.to_le_bytes()])
    }

    /// Recompute the hash from the block's current content.
    pub fn calculate_hash(&self) -> Hash {
        Self::hash_with_nonce(&self.content_bytes(), self.nonce)
    }

    /// Set the nonce and refresh the stored hash.
    pub fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
        self.hash = self.calculate_hash();
    }

    /// Check that the stored hash matches the content.
    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.calculate_hash()
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn transactions(&self) -> &[TransactionRecord] {
        &self.transactions
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn previous_hash(&self) -> Hash {
        self.previous_hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// Check if this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.previous_hash == Hash::ZERO
    }

    /// Get the number of transactions in this block.
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    /// Give the transactions back, consuming the block.
    pub fn into_transactions(self) -> Vec<TransactionRecord> {
        self.transactions
    }
}
