//! Pending transaction queue.
//!
//! Transactions wait here, in arrival order, until a block drains them.

use std::collections::{HashSet, VecDeque};
use thiserror::Error;
use tracechain_core::TransactionRecord;
use uuid::Uuid;

/// Errors that can occur during mempool operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MempoolError {
    #[error("transaction {0} already in mempool")]
    DuplicateTransaction(Uuid),

    #[error("mempool is full (capacity: {0})")]
    MempoolFull(usize),
}

pub type Result<T> = std::result::Result<T, MempoolError>;

/// Configuration for the mempool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MempoolConfig {
    /// Maximum number of transactions waiting at once.
    pub max_transactions: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_transactions: 10_000,
        }
    }
}

/// FIFO transaction mempool.
pub struct Mempool {
    /// Configuration.
    config: MempoolConfig,
    /// Transactions in arrival order.
    queue: VecDeque<TransactionRecord>,
    /// Ids of queued transactions for duplicate detection.
    ids: HashSet<Uuid>,
}

impl Mempool {
    /// Create a new mempool with default configuration.
    pub fn new() -> Self {
        Self::with_config(MempoolConfig::default())
    }

    /// Create a new mempool with the given configuration.
    pub fn with_config(config: MempoolConfig) -> Self {
        Self {
            config,
            queue: VecDeque::new(),
            ids: HashSet::new(),
        }
    }

    /// Get the number of transactions in the mempool.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if the mempool is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Check if a transaction is in the mempool.
    pub fn contains(&self, id: &Uuid) -> bool {
        self.ids.contains(id)
    }

    /// Append a transaction to the tail of the queue.
    pub fn add(&mut self, tx: TransactionRecord) -> Result<()> {
        if self.contains(&tx.id()) {
            return Err(MempoolError::DuplicateTransaction(tx.id()));
        }

        if self.queue.len() >= self.config.max_transactions {
            return Err(MempoolError::MempoolFull(self.config.max_transactions));
        }

        self.ids.insert(tx.id());
        self.queue.push_back(tx);
        Ok(())
    }

    /// Remove up to `limit` transactions from the head of the queue, oldest first.
    pub fn drain_front(&mut self, limit: usize) -> Vec<TransactionRecord> {
        let take = limit.min(self.queue.len());
        let batch: Vec<_> = self.queue.drain(..take).collect();
        for tx in &batch {
            self.ids.remove(&tx.id());
        }
        batch
    }

    /// Put a previously drained batch back at the head of the queue, keeping its order.
    ///
    /// Capacity is not enforced: these transactions were already admitted once.
    pub fn requeue_front(&mut self, batch: Vec<TransactionRecord>) {
        for tx in batch.into_iter().rev() {
            if self.ids.insert(tx.id()) {
                self.queue.push_front(tx);
            }
        }
    }

    /// Copy of the queue in FIFO order.
    pub fn pending(&self) -> Vec<TransactionRecord> {
        self.queue.iter().cloned().collect()
    }

    /// Get mempool statistics.
    pub fn stats(&self) -> MempoolStats {
        MempoolStats {
            total_transactions: self.len(),
            capacity: self.config.max_transactions,
        }
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new()
    }
}

/// Mempool statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MempoolStats {
    /// Total number of transactions.
    pub total_transactions: usize,
    /// Mempool capacity.
    pub capacity: usize,
}
