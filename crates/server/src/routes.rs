//! HTTP routes for the ledger, the network and product tracking.

use crate::error::ApiError;
use crate::service::{ServiceError, SupplyChain};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracechain_chain::{LedgerError, LedgerStats, NewProduct};
use tracechain_core::{Block, Product};
use tracechain_network::{NetworkSnapshot, NetworkStats, Vulnerability, WeightKey};

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Build the application router.
pub fn router(service: SupplyChain) -> Router {
    Router::new()
        .route("/api/blockchain", get(get_blockchain))
        .route("/api/blocks/:index", get(get_block))
        .route("/api/pending", get(get_pending))
        .route("/api/stats", get(get_stats))
        .route("/api/validate", get(validate_chain))
        .route("/api/mine", get(mine).post(mine))
        .route("/api/network", get(get_network))
        .route("/api/network_stats", get(get_network_stats))
        .route("/api/shortest_path", get(shortest_path))
        .route("/api/all_paths", get(all_paths))
        .route("/api/vulnerabilities", get(get_vulnerabilities))
        .route("/api/articulation_points", get(get_articulation_points))
        .route("/api/products", get(get_products))
        .route("/api/create_product", post(create_product))
        .route("/api/transfer_product", post(transfer_product))
        .route("/api/trace_product/:id", get(trace_product))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}

// =============================================================================
// Ledger
// =============================================================================

/// GET /api/blockchain
async fn get_blockchain(State(service): State<SupplyChain>) -> Json<Vec<Block>> {
    Json(service.chain())
}

/// GET /api/blocks/:index
async fn get_block(
    State(service): State<SupplyChain>,
    Path(index): Path<u64>,
) -> ApiResult<Json<Block>> {
    service
        .block(index)
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("block {} not found", index)))
}

/// GET /api/pending
async fn get_pending(State(service): State<SupplyChain>) -> Json<Value> {
    let pending = service.pending();
    Json(json!({
        "count": pending.len(),
        "transactions": pending,
    }))
}

/// GET /api/stats
async fn get_stats(State(service): State<SupplyChain>) -> Json<LedgerStats> {
    Json(service.ledger_stats())
}

/// GET /api/validate
///
/// Corruption is reported in the body; the request itself succeeded.
async fn validate_chain(State(service): State<SupplyChain>) -> ApiResult<Json<Value>> {
    let length = service.chain().len();
    match service.validate_chain() {
        Ok(()) => Ok(Json(json!({ "valid": true, "length": length }))),
        Err(ServiceError::Ledger(LedgerError::ChainCorruption(err))) => Ok(Json(json!({
            "valid": false,
            "length": length,
            "error": err.to_string(),
        }))),
        Err(err) => Err(err.into()),
    }
}

/// GET|POST /api/mine
async fn mine(State(service): State<SupplyChain>) -> ApiResult<Json<Value>> {
    match service.mine().await? {
        Some(block) => Ok(Json(json!({ "success": true, "block": block }))),
        None => Ok(Json(json!({
            "success": false,
            "message": "No transactions to mine",
        }))),
    }
}

// =============================================================================
// Network
// =============================================================================

/// GET /api/network
async fn get_network(State(service): State<SupplyChain>) -> Json<NetworkSnapshot> {
    Json(service.network_snapshot())
}

/// GET /api/network_stats
async fn get_network_stats(State(service): State<SupplyChain>) -> Json<NetworkStats> {
    Json(service.network_stats())
}

#[derive(Deserialize)]
pub struct PathQuery {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub weight: Option<String>,
}

/// GET /api/shortest_path?start=..&end=..&weight=cost|time|distance
async fn shortest_path(
    State(service): State<SupplyChain>,
    Query(query): Query<PathQuery>,
) -> ApiResult<Json<Value>> {
    let weight: WeightKey = query.weight.as_deref().unwrap_or("cost").parse()?;

    match service.shortest_path(&query.start, &query.end, weight)? {
        Some(report) => Ok(Json(json!({
            "success": true,
            "path": report.path,
            "cost": report.total,
            "path_details": report.path_details,
        }))),
        None => Ok(Json(json!({ "success": false, "error": "No path found" }))),
    }
}

/// GET /api/all_paths?start=..&end=..
async fn all_paths(
    State(service): State<SupplyChain>,
    Query(query): Query<PathQuery>,
) -> ApiResult<Json<Value>> {
    let paths = service.all_paths(&query.start, &query.end)?;
    Ok(Json(json!({
        "success": true,
        "count": paths.len(),
        "paths": paths,
    })))
}

/// GET /api/vulnerabilities
async fn get_vulnerabilities(State(service): State<SupplyChain>) -> Json<Vec<Vulnerability>> {
    Json(service.vulnerabilities())
}

/// GET /api/articulation_points
async fn get_articulation_points(State(service): State<SupplyChain>) -> Json<Value> {
    let points = service.articulation_points();
    Json(json!({ "count": points.len(), "points": points }))
}

// =============================================================================
// Products
// =============================================================================

/// GET /api/products
async fn get_products(State(service): State<SupplyChain>) -> Json<Vec<Product>> {
    Json(service.products())
}

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub batch_number: String,
    pub origin: String,
    /// Plan a route to this company right away.
    #[serde(default)]
    pub destination: Option<String>,
    /// Weight for the planned route; defaults to cost.
    #[serde(default)]
    pub metric: Option<String>,
}

/// POST /api/create_product
async fn create_product(
    State(service): State<SupplyChain>,
    Json(request): Json<CreateProductRequest>,
) -> ApiResult<Json<Value>> {
    let weight: WeightKey = request.metric.as_deref().unwrap_or("cost").parse()?;
    let route = request.destination.as_deref().map(|dest| (dest, weight));

    let product = service.create_product(
        NewProduct::new(request.name, request.batch_number, request.origin),
        route,
    )?;

    Ok(Json(json!({
        "success": true,
        "product_id": product.id,
        "product": product,
    })))
}

#[derive(Deserialize)]
pub struct TransferRequest {
    pub product_id: String,
    pub from: String,
    pub to: String,
}

/// POST /api/transfer_product
async fn transfer_product(
    State(service): State<SupplyChain>,
    Json(request): Json<TransferRequest>,
) -> ApiResult<Json<Value>> {
    let tx_id = service.transfer_product(&request.product_id, &request.from, &request.to)?;
    Ok(Json(json!({ "success": true, "transaction_id": tx_id })))
}

/// GET /api/trace_product/:id
async fn trace_product(
    State(service): State<SupplyChain>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let trace = service.trace_product(&product_id)?;
    Ok(Json(json!({
        "success": true,
        "product": trace.product,
        "transactions": trace.transactions,
    })))
}

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "tracechain",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
