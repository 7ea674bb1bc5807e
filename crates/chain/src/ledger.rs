//! The ledger: hash-linked chain, pending queue and mining.
//!
//! Mining is split in three steps so a caller can release its lock while the
//! nonce search runs:
//!
//! 1. [`Ledger::prepare_block`] drains a batch and builds the candidate block
//! 2. [`ProofOfWork::mine`] seals it (no ledger access needed)
//! 3. [`Ledger::commit_block`] re-validates and appends it
//!
//! [`Ledger::mine_pending_transactions`] runs all three in one call.

use crate::mempool::{Mempool, MempoolConfig, MempoolError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracechain_consensus::{
    BlockValidator, ChainRules, ConsensusError, ProofOfWork, TransactionValidator, ValidationError,
};
use tracechain_core::{Block, Hash, TransactionRecord};
use uuid::Uuid;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("malformed transaction: {0}")]
    MalformedTransaction(#[source] ValidationError),

    #[error("chain corruption: {0}")]
    ChainCorruption(#[source] ValidationError),

    #[error("block {index} no longer extends the chain tail at height {height}")]
    StaleBlock { index: u64, height: u64 },

    #[error("mempool error: {0}")]
    Mempool(#[from] MempoolError),

    #[error("consensus error: {0}")]
    Consensus(#[from] ConsensusError),

    #[error("invalid ledger configuration: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Leading zero hex digits required in a mined block hash.
    pub difficulty: u32,
    /// Maximum transactions drained into one block.
    pub max_block_transactions: usize,
    /// Pending queue configuration.
    pub mempool: MempoolConfig,
    /// Reward advertised per mined block. Never credited anywhere.
    pub mining_reward: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: 2,
            max_block_transactions: 10,
            mempool: MempoolConfig::default(),
            mining_reward: 10,
        }
    }
}

/// Receives every block appended to the chain.
pub trait BlockObserver: Send + Sync {
    fn on_block_mined(&self, block: &Block);
}

impl<F> BlockObserver for F
where
    F: Fn(&Block) + Send + Sync,
{
    fn on_block_mined(&self, block: &Block) {
        self(block)
    }
}

/// A transaction found by a product trace, with the block that holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub block_index: u64,
    pub transaction: TransactionRecord,
}

/// Ledger statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    /// Index of the chain tail.
    pub height: u64,
    /// Number of blocks including genesis.
    pub block_count: usize,
    /// Transactions recorded across all blocks.
    pub total_transactions: usize,
    /// Transactions waiting to be mined.
    pub pending_transactions: usize,
    /// Maximum number of transactions the pending queue accepts.
    pub mempool_capacity: usize,
    pub difficulty: u32,
    pub latest_hash: Hash,
    pub mining_reward: u64,
    /// Whether mining is halted by detected corruption.
    pub halted: bool,
    /// The inconsistency that halted mining.
    pub halt_reason: Option<String>,
}

/// Owns the chain and the pending queue.
pub struct Ledger {
    config: LedgerConfig,
    rules: ChainRules,
    /// Blocks in order; index 0 is genesis.
    chain: Vec<Block>,
    mempool: Mempool,
    observers: Vec<Arc<dyn BlockObserver>>,
    /// Set when validation finds an inconsistency; blocks mining until cleared.
    corruption: Option<ValidationError>,
}

impl Ledger {
    /// Create a ledger holding only a fresh genesis block.
    pub fn new(config: LedgerConfig) -> Result<Self> {
        if config.max_block_transactions == 0 {
            return Err(LedgerError::InvalidConfig(
                "max_block_transactions must be at least 1",
            ));
        }
        let rules = ChainRules {
            pow: ProofOfWork::new(config.difficulty)?,
            max_block_transactions: config.max_block_transactions,
        };
        let mempool = Mempool::with_config(config.mempool.clone());

        Ok(Self {
            config,
            rules,
            chain: vec![Block::genesis()],
            mempool,
            observers: Vec::new(),
            corruption: None,
        })
    }

    /// Register an observer for mined blocks.
    pub fn subscribe(&mut self, observer: Arc<dyn BlockObserver>) {
        self.observers.push(observer);
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn proof_of_work(&self) -> ProofOfWork {
        self.rules.pow
    }

    pub fn difficulty(&self) -> u32 {
        self.rules.pow.difficulty()
    }

    // =========================================================================
    // Pending queue
    // =========================================================================

    /// Validate a transaction and append it to the pending queue.
    pub fn add_transaction(&mut self, tx: TransactionRecord) -> Result<Uuid> {
        TransactionValidator::validate_transaction(&tx).map_err(LedgerError::MalformedTransaction)?;

        let id = tx.id();
        self.mempool.add(tx)?;
        tracing::debug!(tx_id = %id, pending = self.mempool.len(), "transaction queued");
        Ok(id)
    }

    pub fn pending_count(&self) -> usize {
        self.mempool.len()
    }

    /// Copy of the pending queue, oldest first.
    pub fn pending(&self) -> Vec<TransactionRecord> {
        self.mempool.pending()
    }

    /// Put a drained batch back at the head of the queue.
    ///
    /// Used when a nonce search for a prepared block does not complete.
    /// Transactions already recorded on the chain are dropped.
    pub fn requeue(&mut self, transactions: Vec<TransactionRecord>) {
        let recorded: HashSet<Uuid> = self
            .chain
            .iter()
            .flat_map(|block| block.transactions().iter().map(TransactionRecord::id))
            .collect();
        let unrecorded: Vec<_> = transactions
            .into_iter()
            .filter(|tx| !recorded.contains(&tx.id()))
            .collect();

        if unrecorded.is_empty() {
            return;
        }
        tracing::warn!(count = unrecorded.len(), "requeueing unmined transactions");
        self.mempool.requeue_front(unrecorded);
    }

    // =========================================================================
    // Mining
    // =========================================================================

    /// Drain up to one batch of pending transactions into an unmined block.
    ///
    /// Returns `None` when there is nothing to mine.
    pub fn prepare_block(&mut self) -> Result<Option<Block>> {
        self.ensure_not_halted()?;

        if self.mempool.is_empty() {
            return Ok(None);
        }

        let transactions = self.mempool.drain_front(self.config.max_block_transactions);
        let tail = self.latest_block();
        let block = Block::new(self.chain.len() as u64, tail.hash(), transactions);
        Ok(Some(block))
    }

    /// Append a sealed block prepared by [`Ledger::prepare_block`].
    ///
    /// The block must extend the current tail and meet the difficulty target.
    /// A block built on an earlier tail is stale: it is discarded and its
    /// unrecorded transactions go back to the queue. Any other failure is
    /// treated as corruption and halts mining.
    pub fn commit_block(&mut self, block: Block) -> Result<Block> {
        if let Err(err) = self.ensure_not_halted() {
            self.requeue(block.into_transactions());
            return Err(err);
        }

        let tail = self.latest_block();
        if block.index() != tail.index() + 1 || block.previous_hash() != tail.hash() {
            let (index, height) = (block.index(), tail.index());
            tracing::warn!(block_index = index, height, "discarded stale block");
            self.requeue(block.into_transactions());
            return Err(LedgerError::StaleBlock { index, height });
        }

        if let Err(err) = BlockValidator::validate_block(&block, tail, &self.rules) {
            tracing::error!(error = %err, block_index = block.index(), "rejected mined block");
            self.requeue(block.into_transactions());
            self.corruption = Some(err.clone());
            return Err(LedgerError::ChainCorruption(err));
        }

        tracing::info!(
            block_index = block.index(),
            tx_count = block.tx_count(),
            nonce = block.nonce(),
            hash = %block.hash(),
            pending = self.mempool.len(),
            "block mined"
        );

        self.chain.push(block.clone());
        for observer in &self.observers {
            observer.on_block_mined(&block);
        }
        Ok(block)
    }

    /// Mine one block from the head of the pending queue.
    ///
    /// Returns `None` when the queue is empty; the chain is left untouched.
    pub fn mine_pending_transactions(&mut self) -> Result<Option<Block>> {
        let Some(mut block) = self.prepare_block()? else {
            return Ok(None);
        };
        self.rules.pow.mine(&mut block);
        self.commit_block(block).map(Some)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// All blocks, genesis first.
    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// The chain tail. The chain always holds at least the genesis block.
    pub fn latest_block(&self) -> &Block {
        &self.chain[self.chain.len() - 1]
    }

    pub fn block(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.chain.get(i))
    }

    /// Index of the chain tail.
    pub fn height(&self) -> u64 {
        self.latest_block().index()
    }

    /// Every transaction for `product_id`, by ascending block index then in-block order.
    pub fn trace_product(&self, product_id: &str) -> Vec<TraceEntry> {
        self.chain
            .iter()
            .flat_map(|block| {
                block
                    .transactions()
                    .iter()
                    .filter(move |tx| tx.product_id() == product_id)
                    .map(move |tx| TraceEntry {
                        block_index: block.index(),
                        transaction: tx.clone(),
                    })
            })
            .collect()
    }

    pub fn stats(&self) -> LedgerStats {
        let mempool = self.mempool.stats();
        LedgerStats {
            height: self.height(),
            block_count: self.chain.len(),
            total_transactions: self.chain.iter().map(Block::tx_count).sum(),
            pending_transactions: mempool.total_transactions,
            mempool_capacity: mempool.capacity,
            difficulty: self.difficulty(),
            latest_hash: self.latest_block().hash(),
            mining_reward: self.config.mining_reward,
            halted: self.is_halted(),
            halt_reason: self.corruption().map(ToString::to_string),
        }
    }

    // =========================================================================
    // Integrity
    // =========================================================================

    /// Re-check every hash link, content hash and proof of work.
    ///
    /// A failure halts mining; a later successful validation lifts the halt.
    pub fn validate_chain(&mut self) -> Result<()> {
        match BlockValidator::validate_chain(&self.chain, &self.rules) {
            Ok(()) => {
                if self.corruption.take().is_some() {
                    tracing::info!("chain validated, mining resumed");
                }
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "chain corruption detected, mining halted");
                self.corruption = Some(err.clone());
                Err(LedgerError::ChainCorruption(err))
            }
        }
    }

    pub fn is_halted(&self) -> bool {
        self.corruption.is_some()
    }

    /// The inconsistency that halted mining, if any.
    pub fn corruption(&self) -> Option<&ValidationError> {
        self.corruption.as_ref()
    }

    fn ensure_not_halted(&self) -> Result<()> {
        match &self.corruption {
            Some(err) => Err(LedgerError::ChainCorruption(err.clone())),
            None => Ok(()),
        }
    }

    #[cfg(test)]
    pub(crate) fn chain_mut(&mut self) -> &mut Vec<Block> {
        &mut self.chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tracechain_core::Payload;

    fn ledger(difficulty: u32) -> Ledger {
        Ledger::new(LedgerConfig {
            difficulty,
            ..LedgerConfig::default()
        })
        .unwrap()
    }

    fn transfer(product: &str) -> TransactionRecord {
        TransactionRecord::transfer("farm1", "factory1", product, 90)
    }

    fn tampered(block: &Block, field: &str, value: serde_json::Value) -> Block {
        let mut json = serde_json::to_value(block).unwrap();
        json[field] = value;
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_new_ledger_has_genesis() {
        let ledger = ledger(2);
        assert_eq!(ledger.chain().len(), 1);
        assert!(ledger.latest_block().is_genesis());
        assert_eq!(ledger.height(), 0);
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn test_rejects_bad_config() {
        let zero_batch = LedgerConfig {
            max_block_transactions: 0,
            ..LedgerConfig::default()
        };
        assert!(matches!(
            Ledger::new(zero_batch),
            Err(LedgerError::InvalidConfig(_))
        ));

        let impossible = LedgerConfig {
            difficulty: 17,
            ..LedgerConfig::default()
        };
        assert!(matches!(
            Ledger::new(impossible),
            Err(LedgerError::Consensus(_))
        ));
    }

    #[test]
    fn test_add_transaction_rejects_malformed_without_mutation() {
        let mut ledger = ledger(1);
        let bad = TransactionRecord::transfer("farm1", "", "p", 90);

        let err = ledger.add_transaction(bad).unwrap_err();

        assert!(matches!(
            err,
            LedgerError::MalformedTransaction(ValidationError::MissingField("to"))
        ));
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn test_mine_empty_queue_is_nothing_to_mine() {
        let mut ledger = ledger(2);
        assert!(ledger.mine_pending_transactions().unwrap().is_none());
        assert_eq!(ledger.chain().len(), 1);
    }

    #[test]
    fn test_mine_consumes_first_ten_fifo() {
        let mut ledger = ledger(1);
        for i in 0..15 {
            ledger.add_transaction(transfer(&format!("p{}", i))).unwrap();
        }

        let block = ledger.mine_pending_transactions().unwrap().unwrap();

        let mined: Vec<&str> = block.transactions().iter().map(|t| t.product_id()).collect();
        let expected: Vec<String> = (0..10).map(|i| format!("p{}", i)).collect();
        assert_eq!(mined, expected);

        let left: Vec<String> = ledger
            .pending()
            .iter()
            .map(|t| t.product_id().to_string())
            .collect();
        let expected_left: Vec<String> = (10..15).map(|i| format!("p{}", i)).collect();
        assert_eq!(left, expected_left);
    }

    #[test]
    fn test_mined_blocks_link_and_meet_difficulty() {
        let mut ledger = ledger(2);
        for round in 0..3 {
            ledger.add_transaction(transfer(&format!("p{}", round))).unwrap();
            ledger.mine_pending_transactions().unwrap().unwrap();
        }

        let chain = ledger.chain();
        assert_eq!(chain.len(), 4);
        for i in 1..chain.len() {
            assert_eq!(chain[i].index(), i as u64);
            assert_eq!(chain[i].previous_hash(), chain[i - 1].hash());
            assert_eq!(chain[i].hash(), chain[i].calculate_hash());
            assert!(chain[i].hash().to_hex().starts_with("00"));
        }
        assert!(ledger.validate_chain().is_ok());
    }

    #[test]
    fn test_custom_batch_size() {
        let mut ledger = Ledger::new(LedgerConfig {
            difficulty: 1,
            max_block_transactions: 3,
            ..LedgerConfig::default()
        })
        .unwrap();
        for i in 0..7 {
            ledger.add_transaction(transfer(&format!("p{}", i))).unwrap();
        }

        let sizes: Vec<usize> = std::iter::from_fn(|| ledger.mine_pending_transactions().unwrap())
            .map(|b| b.tx_count())
            .collect();

        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[test]
    fn test_trace_product_in_chain_order() {
        let mut ledger = ledger(1);
        ledger
            .add_transaction(TransactionRecord::create("farm1", "apple", "Apples", "OA001", 95))
            .unwrap();
        ledger.add_transaction(transfer("milk")).unwrap();
        ledger
            .add_transaction(TransactionRecord::transfer("farm1", "factory1", "apple", 93))
            .unwrap();
        ledger.mine_pending_transactions().unwrap();
        ledger
            .add_transaction(TransactionRecord::deliver("factory1", "retail1", "apple"))
            .unwrap();
        ledger.mine_pending_transactions().unwrap();

        let trace = ledger.trace_product("apple");

        let summary: Vec<(u64, &str)> = trace
            .iter()
            .map(|e| (e.block_index, e.transaction.action().as_str()))
            .collect();
        assert_eq!(summary, vec![(1, "create"), (1, "transfer"), (2, "deliver")]);
        assert!(ledger.trace_product("unknown").is_empty());
    }

    #[test]
    fn test_trace_ignores_pending() {
        let mut ledger = ledger(1);
        ledger.add_transaction(transfer("apple")).unwrap();
        assert!(ledger.trace_product("apple").is_empty());
    }

    #[test]
    fn test_observers_receive_mined_block() {
        let mut ledger = ledger(1);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        ledger.subscribe(Arc::new(move |block: &Block| {
            sink.lock().unwrap().push(block.index());
        }));

        ledger.add_transaction(transfer("p")).unwrap();
        ledger.mine_pending_transactions().unwrap();
        ledger.mine_pending_transactions().unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_validate_detects_tampered_transaction() {
        let mut ledger = ledger(1);
        ledger.add_transaction(transfer("p")).unwrap();
        ledger.mine_pending_transactions().unwrap();

        let forged = TransactionRecord::new(
            "farm1",
            "factory1",
            "p",
            Payload::Transfer { quality_score: 100 },
        );
        let block = &ledger.chain()[1];
        let replacement = tampered(
            block,
            "transactions",
            serde_json::to_value(vec![forged]).unwrap(),
        );
        ledger.chain_mut()[1] = replacement;

        assert!(matches!(
            ledger.validate_chain(),
            Err(LedgerError::ChainCorruption(ValidationError::HashMismatch { index: 1 }))
        ));
    }

    #[test]
    fn test_corruption_halts_mining_until_resolved() {
        let mut ledger = ledger(1);
        ledger.add_transaction(transfer("p1")).unwrap();
        ledger.mine_pending_transactions().unwrap();

        let original = ledger.chain()[1].clone();
        ledger.chain_mut()[1] = tampered(&original, "nonce", serde_json::json!(u64::MAX));
        assert!(ledger.validate_chain().is_err());
        assert!(ledger.is_halted());

        ledger.add_transaction(transfer("p2")).unwrap();
        assert!(matches!(
            ledger.mine_pending_transactions(),
            Err(LedgerError::ChainCorruption(_))
        ));
        assert_eq!(ledger.pending_count(), 1);
        assert!(ledger.stats().halted);

        ledger.chain_mut()[1] = original;
        assert!(ledger.validate_chain().is_ok());
        assert!(!ledger.is_halted());
        assert!(ledger.mine_pending_transactions().unwrap().is_some());
    }

    #[test]
    fn test_commit_discards_stale_block_without_duplicates() {
        let mut ledger = ledger(1);
        ledger.add_transaction(transfer("p1")).unwrap();

        // Built on genesis, then the chain moves on with the same transaction.
        let mut stale = Block::new(1, ledger.latest_block().hash(), ledger.pending());
        ledger.proof_of_work().mine(&mut stale);
        ledger.mine_pending_transactions().unwrap().unwrap();

        let err = ledger.commit_block(stale).unwrap_err();

        assert!(matches!(err, LedgerError::StaleBlock { index: 1, height: 1 }));
        assert!(!ledger.is_halted());
        assert_eq!(ledger.pending_count(), 0);
        assert!(ledger.validate_chain().is_ok());
        assert!(ledger.mine_pending_transactions().unwrap().is_none());
        assert_eq!(ledger.trace_product("p1").len(), 1);
    }

    #[test]
    fn test_stale_block_requeues_only_unrecorded() {
        let mut ledger = Ledger::new(LedgerConfig {
            difficulty: 1,
            max_block_transactions: 2,
            ..LedgerConfig::default()
        })
        .unwrap();
        for i in 1..=3 {
            ledger.add_transaction(transfer(&format!("p{}", i))).unwrap();
        }

        let mut stale = Block::new(1, ledger.latest_block().hash(), ledger.pending());
        ledger.proof_of_work().mine(&mut stale);
        ledger.mine_pending_transactions().unwrap().unwrap();
        let late = ledger.pending()[0].id();

        // p1 and p2 are on the chain; p3 is still queued.
        assert!(matches!(
            ledger.commit_block(stale),
            Err(LedgerError::StaleBlock { .. })
        ));

        let pending: Vec<Uuid> = ledger.pending().iter().map(|t| t.id()).collect();
        assert_eq!(pending, vec![late]);
        ledger.mine_pending_transactions().unwrap().unwrap();
        for product in ["p1", "p2", "p3"] {
            assert_eq!(ledger.trace_product(product).len(), 1);
        }
    }

    #[test]
    fn test_commit_rejects_insufficient_work_and_halts() {
        let mut ledger = ledger(3);
        ledger.add_transaction(transfer("p1")).unwrap();
        let mut block = ledger.prepare_block().unwrap().unwrap();
        let queued: Vec<Uuid> = block.transactions().iter().map(|t| t.id()).collect();

        let pow = ledger.proof_of_work();
        let content = block.content_bytes();
        let weak = (0..)
            .find(|n| !pow.meets_target(&Block::hash_with_nonce(&content, *n)))
            .unwrap();
        block.set_nonce(weak);

        let err = ledger.commit_block(block).unwrap_err();

        assert!(matches!(
            err,
            LedgerError::ChainCorruption(ValidationError::InsufficientWork { index: 1, .. })
        ));
        assert!(ledger.is_halted());
        assert!(ledger.stats().halt_reason.is_some());
        let pending: Vec<Uuid> = ledger.pending().iter().map(|t| t.id()).collect();
        assert_eq!(pending, queued);
    }

    #[test]
    fn test_prepare_and_requeue_round_trip() {
        let mut ledger = ledger(1);
        for i in 0..3 {
            ledger.add_transaction(transfer(&format!("p{}", i))).unwrap();
        }

        let block = ledger.prepare_block().unwrap().unwrap();
        assert_eq!(block.index(), 1);
        assert_eq!(block.previous_hash(), ledger.latest_block().hash());
        assert_eq!(ledger.pending_count(), 0);

        ledger.requeue(block.into_transactions());
        let order: Vec<String> = ledger
            .pending()
            .iter()
            .map(|t| t.product_id().to_string())
            .collect();
        assert_eq!(order, vec!["p0", "p1", "p2"]);
    }

    #[test]
    fn test_stats() {
        let mut ledger = ledger(1);
        ledger.add_transaction(transfer("p1")).unwrap();
        ledger.add_transaction(transfer("p2")).unwrap();
        ledger.mine_pending_transactions().unwrap();
        ledger.add_transaction(transfer("p3")).unwrap();

        let stats = ledger.stats();
        assert_eq!(stats.height, 1);
        assert_eq!(stats.block_count, 2);
        assert_eq!(stats.total_transactions, 2);
        assert_eq!(stats.pending_transactions, 1);
        assert_eq!(stats.mempool_capacity, 10_000);
        assert!(!stats.halted);
        assert_eq!(stats.halt_reason, None);
        assert_eq!(stats.difficulty, 1);
        assert_eq!(stats.mining_reward, 10);
        assert_eq!(stats.latest_hash, ledger.latest_block().hash());
    }
}
