//! Shared, thread-safe supply-chain service.
//!
//! [`SupplyChain`] owns the ledger, the network graph and the product registry
//! behind separate read/write locks. Handlers clone it freely.
//!
//! Mining is serialised by an async gate so at most one block is in flight.
//! The nonce search runs on the blocking pool with no ledger lock held, so
//! reads and new transactions are served while a block is being mined.
//!
//! Locks are always taken in the order network, products, ledger.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracechain_chain::{
    BlockObserver, Ledger, LedgerError, LedgerStats, NewProduct, ProductError, ProductRegistry,
    TraceEntry,
};
use tracechain_core::{Block, PlannedRoute, Product, TransactionRecord};
use tracechain_network::{
    Company, NetworkError, NetworkGraph, NetworkSnapshot, NetworkStats, PathFinder, ShortestPath,
    Vulnerability, VulnerabilityAnalyzer, WeightKey,
};
use uuid::Uuid;

/// Capacity of the event channel; slow subscribers lag rather than block mining.
const EVENT_BUFFER: usize = 64;

/// Errors surfaced by the service layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Product(#[from] ProductError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("mining task did not complete: {0}")]
    MiningAborted(String),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Notifications pushed to subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ChainEvent {
    BlockMined(Block),
}

/// Forwards committed blocks onto the broadcast channel.
struct BroadcastObserver {
    sender: broadcast::Sender<ChainEvent>,
}

impl BlockObserver for BroadcastObserver {
    fn on_block_mined(&self, block: &Block) {
        // No subscribers is not an error.
        let _ = self.sender.send(ChainEvent::BlockMined(block.clone()));
    }
}

/// Shortest path with the display names of the companies along it.
#[derive(Debug, Clone, Serialize)]
pub struct RouteReport {
    pub path: Vec<String>,
    pub total: f64,
    pub path_details: Vec<String>,
}

/// A product with its recorded history.
#[derive(Debug, Clone, Serialize)]
pub struct ProductTrace {
    pub product: Product,
    pub transactions: Vec<TraceEntry>,
}

/// Puts a drained batch back in the queue unless the block was committed.
///
/// Also covers the caller dropping the mining future mid-search, in which
/// case the nonce search on the blocking pool is told to stop.
struct RequeueGuard {
    ledger: Arc<RwLock<Ledger>>,
    batch: Option<Vec<TransactionRecord>>,
    cancel: Arc<AtomicBool>,
}

impl RequeueGuard {
    fn disarm(&mut self) {
        self.batch = None;
    }
}

impl Drop for RequeueGuard {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(batch) = self.batch.take() {
            self.ledger.write().requeue(batch);
        }
    }
}

#[derive(Clone)]
pub struct SupplyChain {
    ledger: Arc<RwLock<Ledger>>,
    network: Arc<RwLock<NetworkGraph>>,
    products: Arc<RwLock<ProductRegistry>>,
    mining: Arc<Mutex<()>>,
    events: broadcast::Sender<ChainEvent>,
}

impl SupplyChain {
    pub fn new(mut ledger: Ledger, network: NetworkGraph, products: ProductRegistry) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        ledger.subscribe(Arc::new(BroadcastObserver {
            sender: events.clone(),
        }));

        Self {
            ledger: Arc::new(RwLock::new(ledger)),
            network: Arc::new(RwLock::new(network)),
            products: Arc::new(RwLock::new(products)),
            mining: Arc::new(Mutex::new(())),
            events,
        }
    }

    /// Receive every block mined from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChainEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    /// Mine one block from the pending queue.
    ///
    /// Concurrent callers wait their turn; each sees the queue as the previous
    /// miner left it. Returns `None` when there is nothing to mine.
    ///
    /// Dropping the returned future stops the search and requeues the batch.
    pub async fn mine(&self) -> Result<Option<Block>> {
        let _gate = self.mining.lock().await;

        let (prepared, pow) = {
            let mut ledger = self.ledger.write();
            (ledger.prepare_block()?, ledger.proof_of_work())
        };
        let Some(mut block) = prepared else {
            return Ok(None);
        };

        let cancel = Arc::new(AtomicBool::new(false));
        let mut guard = RequeueGuard {
            ledger: Arc::clone(&self.ledger),
            batch: Some(block.transactions().to_vec()),
            cancel: Arc::clone(&cancel),
        };

        let index = block.index();
        let sealed = tokio::task::spawn_blocking(move || {
            pow.mine_until(&mut block, &cancel)
                .map(|report| (block, report))
        })
        .await;

        let (block, report) = match sealed {
            Ok(Some(result)) => result,
            Ok(None) => {
                return Err(ServiceError::MiningAborted("nonce search cancelled".into()));
            }
            Err(err) => {
                tracing::error!(block_index = index, error = %err, "nonce search failed");
                return Err(ServiceError::MiningAborted(err.to_string()));
            }
        };
        tracing::debug!(
            block_index = index,
            attempts = report.attempts,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "nonce found"
        );

        // commit_block requeues the batch itself when it rejects the block.
        guard.disarm();
        let block = self.ledger.write().commit_block(block)?;
        Ok(Some(block))
    }

    /// Queue an externally built transaction.
    pub fn submit_transaction(&self, tx: TransactionRecord) -> Result<Uuid> {
        Ok(self.ledger.write().add_transaction(tx)?)
    }

    pub fn chain(&self) -> Vec<Block> {
        self.ledger.read().chain().to_vec()
    }

    pub fn block(&self, index: u64) -> Option<Block> {
        self.ledger.read().block(index).cloned()
    }

    pub fn pending(&self) -> Vec<TransactionRecord> {
        self.ledger.read().pending()
    }

    pub fn ledger_stats(&self) -> LedgerStats {
        self.ledger.read().stats()
    }

    /// Re-validate the whole chain. Success also lifts a mining halt.
    pub fn validate_chain(&self) -> Result<()> {
        Ok(self.ledger.write().validate_chain()?)
    }

    // =========================================================================
    // Network
    // =========================================================================

    pub fn network_snapshot(&self) -> NetworkSnapshot {
        self.network.read().snapshot()
    }

    pub fn network_stats(&self) -> NetworkStats {
        self.network.read().stats()
    }

    /// Shortest path, or `None` when `end` cannot be reached.
    pub fn shortest_path(&self, start: &str, end: &str, weight: WeightKey) -> Result<Option<RouteReport>> {
        let network = self.network.read();
        let ShortestPath { path, total } = PathFinder::new(&network).shortest_path(start, end, weight)?;
        if path.is_empty() {
            return Ok(None);
        }

        let path_details = path
            .iter()
            .filter_map(|id| network.company(id).map(|c| c.name.clone()))
            .collect();
        Ok(Some(RouteReport {
            path,
            total,
            path_details,
        }))
    }

    pub fn all_paths(&self, start: &str, end: &str) -> Result<Vec<Vec<String>>> {
        let network = self.network.read();
        Ok(PathFinder::new(&network).all_simple_paths(start, end)?)
    }

    /// Add or replace a company. Returns `true` if it was new.
    pub fn add_company(&self, company: Company) -> bool {
        self.network.write().add_node(company)
    }

    /// Add or replace the route `from -> to`.
    pub fn add_route(&self, from: &str, to: &str, cost: f64, time: f64, distance: f64) -> Result<()> {
        Ok(self.network.write().add_edge(from, to, cost, time, distance)?)
    }

    pub fn vulnerabilities(&self) -> Vec<Vulnerability> {
        let network = self.network.read();
        VulnerabilityAnalyzer::new(&network).detect_vulnerabilities()
    }

    pub fn articulation_points(&self) -> Vec<String> {
        let network = self.network.read();
        VulnerabilityAnalyzer::new(&network).articulation_points()
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub fn products(&self) -> Vec<Product> {
        self.products.read().list().into_iter().cloned().collect()
    }

    /// Register a product and queue its `create` transaction.
    ///
    /// When `route` is given, a path from the origin is planned and stored on
    /// the product. An unreachable destination leaves the product without a route.
    pub fn create_product(
        &self,
        request: NewProduct,
        route: Option<(&str, WeightKey)>,
    ) -> Result<Product> {
        let network = self.network.read();
        let mut products = self.products.write();

        if let Some((destination, _)) = route {
            for id in [request.origin.as_str(), destination] {
                if !network.contains(id) {
                    return Err(NetworkError::NodeNotFound(id.to_string()).into());
                }
            }
        }

        let (product, tx) = products.create(request)?;
        if let Err(err) = self.ledger.write().add_transaction(tx) {
            products.remove(&product.id);
            return Err(err.into());
        }

        let planned: Option<PlannedRoute> = match route {
            Some((destination, weight)) => products.plan_route(&product.id, destination, weight, &network)?,
            None => None,
        };
        if route.is_some() && planned.is_none() {
            tracing::warn!(product_id = %product.id, "no route from origin to requested destination");
        }

        tracing::info!(product_id = %product.id, name = %product.name, origin = %product.origin, "product created");
        Ok(products.get(&product.id)?.clone())
    }

    /// Move a product and queue the `transfer` transaction.
    pub fn transfer_product(&self, product_id: &str, from: &str, to: &str) -> Result<Uuid> {
        let mut products = self.products.write();
        let snapshot = products.get(product_id)?.clone();

        let tx = products.transfer(product_id, from, to)?;
        match self.ledger.write().add_transaction(tx) {
            Ok(id) => {
                tracing::info!(product_id, from, to, tx_id = %id, "product transferred");
                Ok(id)
            }
            Err(err) => {
                products.insert(snapshot);
                Err(err.into())
            }
        }
    }

    /// A product and every mined transaction that mentions it.
    pub fn trace_product(&self, product_id: &str) -> Result<ProductTrace> {
        let product = self.products.read().get(product_id)?.clone();
        let transactions = self.ledger.read().trace_product(product_id);
        Ok(ProductTrace {
            product,
            transactions,
        })
    }

    /// Create the sample products. Their transactions are left pending.
    pub fn seed_sample_products(&self) -> Result<Vec<Product>> {
        NewProduct::samples()
            .into_iter()
            .map(|request| self.create_product(request, None))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;
    use tracechain_chain::LedgerConfig;
    use tracechain_network::demo_network;

    fn service() -> SupplyChain {
        let ledger = Ledger::new(LedgerConfig {
            difficulty: 1,
            ..LedgerConfig::default()
        })
        .unwrap();
        SupplyChain::new(ledger, demo_network(), ProductRegistry::with_seed(11))
    }

    fn queue(service: &SupplyChain, count: usize) {
        for i in 0..count {
            let tx = TransactionRecord::transfer("farm1", "factory1", format!("p{}", i), 90);
            service.submit_transaction(tx).unwrap();
        }
    }

    #[tokio::test]
    async fn test_mine_empty_queue() {
        let service = service();
        assert!(service.mine().await.unwrap().is_none());
        assert_eq!(service.chain().len(), 1);
    }

    #[tokio::test]
    async fn test_mine_broadcasts_block() {
        let service = service();
        let mut events = service.subscribe();
        queue(&service, 3);

        let block = service.mine().await.unwrap().unwrap();

        let ChainEvent::BlockMined(announced) = events.recv().await.unwrap();
        assert_eq!(announced, block);
        assert!(service.pending().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_miners_never_fork() {
        let service = service();
        queue(&service, 35);

        let miners: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.mine().await })
            })
            .collect();

        let mut mined = 0;
        for miner in miners {
            if miner.await.unwrap().unwrap().is_some() {
                mined += 1;
            }
        }

        let chain = service.chain();
        assert_eq!(mined, 4);
        assert_eq!(chain.len(), 5);
        let indices: HashSet<u64> = chain.iter().map(Block::index).collect();
        assert_eq!(indices.len(), chain.len());
        for pair in chain.windows(2) {
            assert_eq!(pair[1].previous_hash(), pair[0].hash());
        }

        let sizes: Vec<usize> = chain[1..].iter().map(Block::tx_count).collect();
        assert_eq!(sizes, vec![10, 10, 10, 5]);
        assert!(service.validate_chain().is_ok());
    }

    #[tokio::test]
    async fn test_reads_during_mining() {
        let ledger = Ledger::new(LedgerConfig {
            difficulty: 4,
            ..LedgerConfig::default()
        })
        .unwrap();
        let service = SupplyChain::new(ledger, demo_network(), ProductRegistry::with_seed(1));
        queue(&service, 1);

        let miner = {
            let service = service.clone();
            tokio::spawn(async move { service.mine().await })
        };
        // Readers and writers proceed whether or not the search has finished.
        assert_eq!(service.network_snapshot().nodes.len(), 6);
        queue(&service, 1);

        miner.await.unwrap().unwrap().unwrap();
        let chain = service.chain();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[1].tx_count() + service.pending().len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_mine_requeues_batch() {
        let ledger = Ledger::new(LedgerConfig {
            difficulty: 12,
            ..LedgerConfig::default()
        })
        .unwrap();
        let service = SupplyChain::new(ledger, demo_network(), ProductRegistry::with_seed(3));
        queue(&service, 3);

        let outcome = tokio::time::timeout(Duration::from_millis(50), service.mine()).await;

        assert!(outcome.is_err());
        let pending: Vec<String> = service
            .pending()
            .iter()
            .map(|t| t.product_id().to_string())
            .collect();
        assert_eq!(pending, vec!["p0", "p1", "p2"]);
        assert_eq!(service.chain().len(), 1);
        assert!(service.mining.try_lock().is_ok());
        assert!(!service.ledger_stats().halted);
    }

    #[tokio::test]
    async fn test_block_lookup() {
        let service = service();
        queue(&service, 1);
        let mined = service.mine().await.unwrap().unwrap();

        assert_eq!(service.block(1), Some(mined));
        assert!(service.block(0).unwrap().is_genesis());
        assert_eq!(service.block(2), None);
    }

    #[tokio::test]
    async fn test_product_flow_and_trace() {
        let service = service();
        let product = service
            .create_product(
                NewProduct::new("Organic Apples", "OA001", "farm1"),
                Some(("retail1", WeightKey::Time)),
            )
            .unwrap();
        let route = product.route.clone().unwrap();
        assert_eq!(route.path.first().map(String::as_str), Some("farm1"));
        assert_eq!(route.path.last().map(String::as_str), Some("retail1"));

        service
            .transfer_product(&product.id, "farm1", "factory1")
            .unwrap();
        service.mine().await.unwrap().unwrap();

        let trace = service.trace_product(&product.id).unwrap();
        assert_eq!(trace.product.current_location, "factory1");
        let actions: Vec<&str> = trace
            .transactions
            .iter()
            .map(|e| e.transaction.action().as_str())
            .collect();
        assert_eq!(actions, vec!["create", "transfer"]);
    }

    #[test]
    fn test_unknown_product_and_destination() {
        let service = service();
        assert!(matches!(
            service.trace_product("missing"),
            Err(ServiceError::Product(ProductError::ProductNotFound(_)))
        ));
        assert!(matches!(
            service.transfer_product("missing", "farm1", "factory1"),
            Err(ServiceError::Product(ProductError::ProductNotFound(_)))
        ));
        assert!(matches!(
            service.create_product(
                NewProduct::new("Apples", "OA001", "farm1"),
                Some(("mars", WeightKey::Cost))
            ),
            Err(ServiceError::Network(NetworkError::NodeNotFound(_)))
        ));
        assert!(service.products().is_empty());
        assert!(service.pending().is_empty());
    }

    #[test]
    fn test_full_mempool_rolls_back_product() {
        let ledger = Ledger::new(LedgerConfig {
            difficulty: 1,
            mempool: tracechain_chain::MempoolConfig {
                max_transactions: 1,
            },
            ..LedgerConfig::default()
        })
        .unwrap();
        let service = SupplyChain::new(ledger, demo_network(), ProductRegistry::with_seed(2));

        let first = service
            .create_product(NewProduct::new("Apples", "OA001", "farm1"), None)
            .unwrap();
        let quality = first.quality_score;

        assert!(matches!(
            service.create_product(NewProduct::new("Milk", "PM001", "farm1"), None),
            Err(ServiceError::Ledger(LedgerError::Mempool(_)))
        ));
        assert_eq!(service.products().len(), 1);

        assert!(service.transfer_product(&first.id, "farm1", "factory1").is_err());
        let unchanged = service.trace_product(&first.id).unwrap().product;
        assert_eq!(unchanged.current_location, "farm1");
        assert_eq!(unchanged.quality_score, quality);
    }

    #[test]
    fn test_network_writes_change_analysis() {
        let service = service();
        assert_eq!(service.articulation_points(), vec!["factory1", "factory2", "dist1"]);

        service.add_route("factory1", "dist1", 15.0, 3.0, 40.0).unwrap();
        assert_eq!(service.articulation_points(), vec!["factory1", "dist1"]);
        assert_eq!(service.all_paths("farm1", "dist1").unwrap().len(), 2);

        let added = service.add_company(Company::new(
            "retail3",
            "Harbour Market",
            tracechain_network::CompanyCategory::Retailer,
            (95.0, 5.0),
        ));
        assert!(added);
        assert!(matches!(
            service.add_route("retail3", "mars", 1.0, 1.0, 1.0),
            Err(ServiceError::Network(NetworkError::NodeNotFound(_)))
        ));
        assert_eq!(service.network_stats().node_count, 7);
    }

    #[test]
    fn test_shortest_path_details() {
        let service = service();
        let report = service
            .shortest_path("farm1", "retail2", WeightKey::Cost)
            .unwrap()
            .unwrap();
        assert_eq!(report.total, 29.0);
        assert_eq!(report.path_details.first().map(String::as_str), Some("Green Valley Farm"));
        assert_eq!(report.path_details.last().map(String::as_str), Some("Corner Store"));

        assert!(service
            .shortest_path("retail2", "farm1", WeightKey::Cost)
            .unwrap()
            .is_none());
    }
}
