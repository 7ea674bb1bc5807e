//! Supply-chain network model for tracechain.
//!
//! This crate provides:
//! - **NetworkGraph**: companies (nodes) and weighted directed routes (edges)
//! - **PathFinder**: Dijkstra shortest paths and simple-path enumeration
//! - **VulnerabilityAnalyzer**: articulation points on the undirected projection
//!
//! # Example
//!
//! ```rust
//! use tracechain_network::{fixtures, PathFinder, VulnerabilityAnalyzer, WeightKey};
//!
//! let network = fixtures::demo_network();
//!
//! let route = PathFinder::new(&network)
//!     .shortest_path("farm1", "retail2", WeightKey::Cost)
//!     .unwrap();
//! assert_eq!(route.total, 29.0);
//!
//! let critical = VulnerabilityAnalyzer::new(&network).articulation_points();
//! assert!(critical.contains(&"dist1".to_string()));
//! ```

pub mod fixtures;
pub mod graph;
pub mod pathfinding;
pub mod vulnerability;

// Re-export commonly used types
pub use fixtures::demo_network;
pub use graph::{
    Company, CompanyCategory, Location, NetworkError, NetworkGraph, NetworkSnapshot, NetworkStats,
    NodeView, Result, Route, WeightKey,
};
pub use pathfinding::{PathFinder, ShortestPath};
pub use vulnerability::{UndirectedProjection, Vulnerability, VulnerabilityAnalyzer, VulnerabilityKind};
