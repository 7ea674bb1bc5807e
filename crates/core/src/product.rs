//! Product records referenced by ledger transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Highest possible quality score.
pub const MAX_QUALITY: u8 = 100;

/// Transfers never push quality below this floor.
pub const QUALITY_FLOOR: u8 = 80;

/// A route planned for a product through the supply-chain network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedRoute {
    /// Final participant of the route.
    pub destination: String,
    /// Weight the route was optimised for (`cost`, `time` or `distance`).
    pub weight: String,
    /// Participant ids from origin to destination, inclusive.
    pub path: Vec<String>,
    /// Total weight along the path.
    pub total: f64,
}

/// A tracked product batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub batch_number: String,
    pub origin: String,
    pub current_location: String,
    /// Quality in `0..=100`.
    pub quality_score: u8,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<PlannedRoute>,
}

impl Product {
    /// Create a product sitting at its origin.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        batch_number: impl Into<String>,
        origin: impl Into<String>,
        quality_score: u8,
    ) -> Self {
        let origin = origin.into();
        Self {
            id: id.into(),
            name: name.into(),
            batch_number: batch_number.into(),
            current_location: origin.clone(),
            origin,
            quality_score: quality_score.min(MAX_QUALITY),
            created_at: Utc::now(),
            route: None,
        }
    }

    /// Move the product and degrade its quality by `degradation` points.
    ///
    /// Quality is clamped at [`QUALITY_FLOOR`] but a transfer never raises it.
    /// Returns the new quality score.
    pub fn apply_transfer(&mut self, to: impl Into<String>, degradation: u8) -> u8 {
        let floor = QUALITY_FLOOR.min(self.quality_score);
        self.quality_score = self.quality_score.saturating_sub(degradation).max(floor);
        self.current_location = to.into();
        self.quality_score
    }

    /// Overwrite the quality score with an inspection result.
    pub fn record_quality(&mut self, score: u8) -> u8 {
        self.quality_score = score.min(MAX_QUALITY);
        self.quality_score
    }
}
