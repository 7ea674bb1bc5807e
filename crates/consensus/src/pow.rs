//! Proof of Work nonce search.
//!
//! A block satisfies difficulty `d` when its hex hash starts with at least `d`
//! zero digits. The search starts at nonce 0 and increments by one; there is no
//! attempt limit, so callers that need bounded latency must impose their own
//! timeout around [`ProofOfWork::mine`], or use [`ProofOfWork::mine_until`]
//! with a cancel flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracechain_core::{Block, Hash};

/// Highest supported difficulty.
///
/// The nonce is a `u64`, which spans 16^16 values, so a target of more than
/// 16 zero hex digits may have no solution in the nonce space.
pub const MAX_DIFFICULTY: u32 = 16;

/// How many hashes are computed between checks of the cancel flag.
const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// Errors that can occur while configuring proof of work.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("difficulty {difficulty} exceeds the maximum of {max}")]
    InvalidDifficulty { difficulty: u32, max: u32 },
}

pub type Result<T> = std::result::Result<T, ConsensusError>;

/// Outcome of a successful nonce search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningReport {
    /// Winning nonce.
    pub nonce: u64,
    /// Resulting block hash.
    pub hash: Hash,
    /// Number of hashes computed.
    pub attempts: u64,
    /// Wall-clock time spent searching.
    pub elapsed: Duration,
}

/// Leading-zero-digit proof of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty: u32,
}

impl ProofOfWork {
    /// Create a proof-of-work engine for the given difficulty.
    pub fn new(difficulty: u32) -> Result<Self> {
        if difficulty > MAX_DIFFICULTY {
            return Err(ConsensusError::InvalidDifficulty {
                difficulty,
                max: MAX_DIFFICULTY,
            });
        }
        Ok(Self { difficulty })
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Check whether a hash meets the target.
    pub fn meets_target(&self, hash: &Hash) -> bool {
        hash.meets_difficulty(self.difficulty)
    }

    /// Check a block's stored hash against both its content and the target.
    pub fn verify(&self, block: &Block) -> bool {
        block.has_valid_hash() && self.meets_target(&block.hash())
    }

    /// Search for a nonce that makes `block` meet the target, then seal it.
    pub fn mine(&self, block: &mut Block) -> MiningReport {
        let never = AtomicBool::new(false);
        loop {
            if let Some(report) = self.mine_until(block, &never) {
                return report;
            }
        }
    }

    /// Like [`ProofOfWork::mine`], but gives up once `cancel` is set.
    ///
    /// Returns `None` when cancelled; the block is left unsealed.
    pub fn mine_until(&self, block: &mut Block, cancel: &AtomicBool) -> Option<MiningReport> {
        let started = Instant::now();
        let content = block.content_bytes();
        let mut nonce = 0u64;
        let mut attempts = 1u64;

        loop {
            let hash = Block::hash_with_nonce(&content, nonce);
            if self.meets_target(&hash) {
                break;
            }
            if attempts % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
                tracing::debug!(block_index = block.index(), attempts, "nonce search cancelled");
                return None;
            }
            nonce = nonce.wrapping_add(1);
            attempts = attempts.saturating_add(1);
        }

        block.set_nonce(nonce);
        let report = MiningReport {
            nonce,
            hash: block.hash(),
            attempts,
            elapsed: started.elapsed(),
        };

        tracing::debug!(
            block_index = block.index(),
            nonce,
            attempts,
            difficulty = self.difficulty,
            hash = %report.hash,
            "proof of work found"
        );

        Some(report)
    }
}
