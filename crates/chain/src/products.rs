//! Product registry.
//!
//! Keeps the current state of every tracked product and produces the ledger
//! transactions describing each change. The registry never touches the ledger
//! itself; callers queue the returned records.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracechain_core::{PlannedRoute, Product, TransactionRecord, QUALITY_FLOOR};
use tracechain_network::{NetworkError, NetworkGraph, PathFinder, WeightKey};
use uuid::Uuid;

/// Errors that can occur during product operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProductError {
    #[error("product not found: {0}")]
    ProductNotFound(String),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

pub type Result<T> = std::result::Result<T, ProductError>;

/// Initial quality range of a freshly created product.
const INITIAL_QUALITY: std::ops::RangeInclusive<u8> = 85..=100;

/// Largest quality loss caused by one transfer.
const MAX_TRANSFER_DEGRADATION: u8 = 5;

/// Sample products seeded at start-up: (name, batch number, origin).
pub const SAMPLE_PRODUCTS: [(&str, &str, &str); 3] = [
    ("Organic Apples", "OA001", "farm1"),
    ("Processed Apple Juice", "PAJ001", "factory1"),
    ("Packaged Milk", "PM001", "farm1"),
];

/// Request to register a new product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub batch_number: String,
    /// Company where the product enters the supply chain.
    pub origin: String,
}

impl NewProduct {
    pub fn new(
        name: impl Into<String>,
        batch_number: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            batch_number: batch_number.into(),
            origin: origin.into(),
        }
    }

    pub fn samples() -> Vec<NewProduct> {
        SAMPLE_PRODUCTS
            .iter()
            .map(|(name, batch, origin)| NewProduct::new(*name, *batch, *origin))
            .collect()
    }
}

/// In-memory registry of tracked products.
pub struct ProductRegistry {
    products: HashMap<String, Product>,
    /// Ids in creation order.
    order: Vec<String>,
    rng: StdRng,
}

impl ProductRegistry {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Registry with a deterministic quality generator.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            products: HashMap::new(),
            order: Vec::new(),
            rng,
        }
    }

    /// Register a product at its origin with a random initial quality.
    ///
    /// Returns the product and its `create` transaction.
    pub fn create(&mut self, request: NewProduct) -> Result<(Product, TransactionRecord)> {
        require(&request.name, "name")?;
        require(&request.batch_number, "batch_number")?;
        require(&request.origin, "origin")?;

        let id = Uuid::new_v4().to_string();
        let quality = self.rng.gen_range(INITIAL_QUALITY);
        let product = Product::new(
            id.clone(),
            request.name,
            request.batch_number,
            request.origin,
            quality,
        );
        let tx = TransactionRecord::create(
            product.origin.clone(),
            id.clone(),
            product.name.clone(),
            product.batch_number.clone(),
            quality,
        )
        .with_timestamp(product.created_at);

        tracing::debug!(product_id = %id, quality, origin = %product.origin, "product created");
        self.insert(product.clone());
        Ok((product, tx))
    }

    /// Move a product from `from` to `to`, losing up to five quality points.
    ///
    /// Quality never drops below [`QUALITY_FLOOR`] because of a transfer.
    pub fn transfer(&mut self, product_id: &str, from: &str, to: &str) -> Result<TransactionRecord> {
        require(from, "from")?;
        require(to, "to")?;

        let degradation = self.rng.gen_range(0..=MAX_TRANSFER_DEGRADATION);
        let product = self.get_mut(product_id)?;
        let quality = product.apply_transfer(to, degradation);

        tracing::debug!(product_id, from, to, quality, "product transferred");
        Ok(TransactionRecord::transfer(from, to, product_id, quality))
    }

    /// Record an inspection. The check passes when the score reaches the quality floor.
    pub fn record_quality_check(
        &mut self,
        product_id: &str,
        inspector: &str,
        score: u8,
    ) -> Result<TransactionRecord> {
        require(inspector, "inspector")?;

        let product = self.get_mut(product_id)?;
        let quality = product.record_quality(score);
        let passed = quality >= QUALITY_FLOOR;
        Ok(TransactionRecord::quality_check(
            inspector, product_id, quality, passed,
        ))
    }

    /// Hand a product from its current location to its final recipient.
    pub fn deliver(&mut self, product_id: &str, recipient: &str) -> Result<TransactionRecord> {
        require(recipient, "recipient")?;

        let product = self.get_mut(product_id)?;
        let from = std::mem::replace(&mut product.current_location, recipient.to_string());
        Ok(TransactionRecord::deliver(from, recipient, product_id))
    }

    /// Plan a route from the product's current location to `destination`.
    ///
    /// The route is stored on the product. Returns `None`, leaving any earlier
    /// route in place, when the destination cannot be reached.
    pub fn plan_route(
        &mut self,
        product_id: &str,
        destination: &str,
        weight: WeightKey,
        graph: &NetworkGraph,
    ) -> Result<Option<PlannedRoute>> {
        let start = self.get(product_id)?.current_location.clone();
        let shortest = PathFinder::new(graph).shortest_path(&start, destination, weight)?;
        if !shortest.is_found() {
            return Ok(None);
        }

        let route = PlannedRoute {
            destination: destination.to_string(),
            weight: weight.to_string(),
            path: shortest.path,
            total: shortest.total,
        };
        self.get_mut(product_id)?.route = Some(route.clone());
        Ok(Some(route))
    }

    pub fn get(&self, product_id: &str) -> Result<&Product> {
        self.products
            .get(product_id)
            .ok_or_else(|| ProductError::ProductNotFound(product_id.to_string()))
    }

    fn get_mut(&mut self, product_id: &str) -> Result<&mut Product> {
        self.products
            .get_mut(product_id)
            .ok_or_else(|| ProductError::ProductNotFound(product_id.to_string()))
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.products.contains_key(product_id)
    }

    /// All products in creation order.
    pub fn list(&self) -> Vec<&Product> {
        self.order
            .iter()
            .filter_map(|id| self.products.get(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Insert or overwrite a product. A new id goes to the end of the listing.
    ///
    /// Used to restore a snapshot when the matching transaction was not queued.
    pub fn insert(&mut self, product: Product) {
        if !self.products.contains_key(&product.id) {
            self.order.push(product.id.clone());
        }
        self.products.insert(product.id.clone(), product);
    }

    /// Forget a product entirely.
    pub fn remove(&mut self, product_id: &str) -> Option<Product> {
        let product = self.products.remove(product_id)?;
        self.order.retain(|id| id != product_id);
        Some(product)
    }
}

impl Default for ProductRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn require(value: &str, field: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ProductError::MissingField(field));
    }
    Ok(())
}
