//! Ledger orchestration for tracechain.
//!
//! This crate brings the core types, proof of work and the network together:
//! - **Ledger**: hash-linked chain, FIFO pending queue and block mining
//! - **Mempool**: queue of transactions waiting for a block
//! - **Products**: current product state and the transactions describing it
//!
//! # Example
//!
//! ```rust
//! use tracechain_chain::{Ledger, LedgerConfig, NewProduct, ProductRegistry};
//!
//! let mut ledger = Ledger::new(LedgerConfig { difficulty: 1, ..LedgerConfig::default() }).unwrap();
//! let mut products = ProductRegistry::with_seed(1);
//!
//! let (apples, create) = products
//!     .create(NewProduct::new("Organic Apples", "OA001", "farm1"))
//!     .unwrap();
//! ledger.add_transaction(create).unwrap();
//! ledger.add_transaction(products.transfer(&apples.id, "farm1", "factory1").unwrap()).unwrap();
//!
//! let block = ledger.mine_pending_transactions().unwrap().unwrap();
//! assert_eq!(block.tx_count(), 2);
//! assert_eq!(ledger.trace_product(&apples.id).len(), 2);
//! ledger.validate_chain().unwrap();
//! ```

pub mod ledger;
pub mod mempool;
pub mod products;

// Re-export commonly used types
pub use ledger::{BlockObserver, Ledger, LedgerConfig, LedgerError, LedgerStats, TraceEntry};
pub use mempool::{Mempool, MempoolConfig, MempoolError, MempoolStats};
pub use products::{NewProduct, ProductError, ProductRegistry, SAMPLE_PRODUCTS};
