//! Directed, attributed graph of supply-chain participants.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during network operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NetworkError {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("invalid weight key: {0} (expected cost, time or distance)")]
    InvalidWeightKey(String),

    #[error("route {from} -> {to} has invalid {key} weight {value}")]
    InvalidWeight {
        from: String,
        to: String,
        key: WeightKey,
        value: f64,
    },
}

pub type Result<T> = std::result::Result<T, NetworkError>;

/// Role a company plays in the supply chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CompanyCategory {
    Supplier,
    Manufacturer,
    Distributor,
    Retailer,
    Other(String),
}

impl CompanyCategory {
    pub fn as_str(&self) -> &str {
        match self {
            CompanyCategory::Supplier => "supplier",
            CompanyCategory::Manufacturer => "manufacturer",
            CompanyCategory::Distributor => "distributor",
            CompanyCategory::Retailer => "retailer",
            CompanyCategory::Other(other) => other,
        }
    }
}

impl From<String> for CompanyCategory {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "supplier" => CompanyCategory::Supplier,
            "manufacturer" => CompanyCategory::Manufacturer,
            "distributor" => CompanyCategory::Distributor,
            "retailer" => CompanyCategory::Retailer,
            _ => CompanyCategory::Other(value),
        }
    }
}

impl From<CompanyCategory> for String {
    fn from(value: CompanyCategory) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for CompanyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 2D position of a company, used only for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

/// A supply-chain participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub category: CompanyCategory,
    pub location: Location,
}

impl Company {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: CompanyCategory,
        (x, y): (f64, f64),
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            location: Location { x, y },
        }
    }
}

/// Which route attribute a path is optimised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightKey {
    Cost,
    Time,
    Distance,
}

impl WeightKey {
    pub const ALL: [WeightKey; 3] = [WeightKey::Cost, WeightKey::Time, WeightKey::Distance];

    pub fn as_str(&self) -> &'static str {
        match self {
            WeightKey::Cost => "cost",
            WeightKey::Time => "time",
            WeightKey::Distance => "distance",
        }
    }
}

impl fmt::Display for WeightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightKey {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self> {
        WeightKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| NetworkError::InvalidWeightKey(s.to_string()))
    }
}

/// A directed edge between two companies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub from: String,
    pub to: String,
    pub cost: f64,
    pub time: f64,
    pub distance: f64,
}

impl Route {
    /// The weight of this route for the given key.
    pub fn weight(&self, key: WeightKey) -> f64 {
        match key {
            WeightKey::Cost => self.cost,
            WeightKey::Time => self.time,
            WeightKey::Distance => self.distance,
        }
    }
}

/// Node as presented to the view layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub category: CompanyCategory,
    pub x: f64,
    pub y: f64,
}

/// Immutable copy of the whole network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<Route>,
}

/// Aggregate route statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub avg_cost: f64,
    pub avg_time: f64,
    pub avg_distance: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Directed supply-chain graph.
///
/// Nodes and edges keep insertion order; both are upserted by id.
#[derive(Debug, Clone, Default)]
pub struct NetworkGraph {
    companies: Vec<Company>,
    /// Company id -> position in `companies`.
    index: HashMap<String, usize>,
    routes: Vec<Route>,
    /// (from, to) node positions -> position in `routes`.
    route_index: HashMap<(usize, usize), usize>,
    /// Per node: (target node, route position).
    outgoing: Vec<Vec<(usize, usize)>>,
}

impl NetworkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a company, or replace the attributes of an existing one with the same id.
    ///
    /// Returns `true` if the company is new.
    pub fn add_node(&mut self, company: Company) -> bool {
        match self.index.get(&company.id) {
            Some(&i) => {
                self.companies[i] = company;
                false
            }
            None => {
                self.index.insert(company.id.clone(), self.companies.len());
                self.companies.push(company);
                self.outgoing.push(Vec::new());
                true
            }
        }
    }

    /// Insert a directed route, or replace the weights of the existing `from -> to` route.
    ///
    /// Both endpoints must already exist. Weights must be finite and non-negative.
    pub fn add_edge(
        &mut self,
        from: &str,
        to: &str,
        cost: f64,
        time: f64,
        distance: f64,
    ) -> Result<()> {
        let u = self.require(from)?;
        let v = self.require(to)?;

        let route = Route {
            from: from.to_string(),
            to: to.to_string(),
            cost,
            time,
            distance,
        };
        for key in WeightKey::ALL {
            let value = route.weight(key);
            if !value.is_finite() || value < 0.0 {
                return Err(NetworkError::InvalidWeight {
                    from: route.from,
                    to: route.to,
                    key,
                    value,
                });
            }
        }

        match self.route_index.get(&(u, v)) {
            Some(&r) => self.routes[r] = route,
            None => {
                let r = self.routes.len();
                self.routes.push(route);
                self.route_index.insert((u, v), r);
                self.outgoing[u].push((v, r));
            }
        }
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn company(&self, id: &str) -> Option<&Company> {
        self.index.get(id).map(|&i| &self.companies[i])
    }

    pub fn companies(&self) -> &[Company] {
        &self.companies
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Look up the directed route `from -> to`.
    pub fn route(&self, from: &str, to: &str) -> Option<&Route> {
        let u = *self.index.get(from)?;
        let v = *self.index.get(to)?;
        self.route_index.get(&(u, v)).map(|&r| &self.routes[r])
    }

    pub fn node_count(&self) -> usize {
        self.companies.len()
    }

    pub fn edge_count(&self) -> usize {
        self.routes.len()
    }

    /// Ids of the direct successors of `id`, in route insertion order.
    pub fn neighbours(&self, id: &str) -> Result<Vec<&str>> {
        let u = self.require(id)?;
        Ok(self.outgoing[u]
            .iter()
            .map(|&(v, _)| self.companies[v].id.as_str())
            .collect())
    }

    /// Copy of all nodes and edges for rendering.
    pub fn snapshot(&self) -> NetworkSnapshot {
        let nodes = self
            .companies
            .iter()
            .map(|c| NodeView {
                id: c.id.clone(),
                label: c.name.clone(),
                category: c.category.clone(),
                x: c.location.x,
                y: c.location.y,
            })
            .collect();

        NetworkSnapshot {
            nodes,
            edges: self.routes.clone(),
        }
    }

    /// Average route weights, rounded to two decimals. Zero on an edgeless graph.
    pub fn stats(&self) -> NetworkStats {
        let edge_count = self.routes.len();
        let avg = |key: WeightKey| {
            if edge_count == 0 {
                return 0.0;
            }
            let total: f64 = self.routes.iter().map(|r| r.weight(key)).sum();
            round2(total / edge_count as f64)
        };

        NetworkStats {
            node_count: self.companies.len(),
            edge_count,
            avg_cost: avg(WeightKey::Cost),
            avg_time: avg(WeightKey::Time),
            avg_distance: avg(WeightKey::Distance),
        }
    }

    // =========================================================================
    // Index-level access for the algorithms
    // =========================================================================

    pub(crate) fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub(crate) fn require(&self, id: &str) -> Result<usize> {
        self.position(id)
            .ok_or_else(|| NetworkError::NodeNotFound(id.to_string()))
    }

    pub(crate) fn company_at(&self, i: usize) -> &Company {
        &self.companies[i]
    }

    pub(crate) fn successors(&self, i: usize) -> &[(usize, usize)] {
        &self.outgoing[i]
    }

    pub(crate) fn route_at(&self, r: usize) -> &Route {
        &self.routes[r]
    }
}
