//! Transaction records describing product actions.

use crate::hash::{hash, Hash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while interpreting transaction data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("unknown action: {0}")]
    UnknownAction(String),
}

/// The kind of product action a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Transfer,
    QualityCheck,
    Deliver,
}

impl Action {
    /// All actions, in lifecycle order.
    pub const ALL: [Action; 4] = [
        Action::Create,
        Action::Transfer,
        Action::QualityCheck,
        Action::Deliver,
    ];

    /// The wire name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Transfer => "transfer",
            Action::QualityCheck => "quality_check",
            Action::Deliver => "deliver",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| TransactionError::UnknownAction(s.to_string()))
    }
}

/// Action-specific data carried by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "snake_case")]
pub enum Payload {
    /// A product entered the supply chain.
    Create {
        name: String,
        batch_number: String,
        origin: String,
        quality_score: u8,
    },
    /// A product moved between participants; carries the quality after the move.
    Transfer { quality_score: u8 },
    /// A product was inspected.
    QualityCheck { quality_score: u8, passed: bool },
    /// A product reached its final recipient.
    Deliver { recipient: String },
}

impl Payload {
    /// The action tag of this payload.
    pub fn action(&self) -> Action {
        match self {
            Payload::Create { .. } => Action::Create,
            Payload::Transfer { .. } => Action::Transfer,
            Payload::QualityCheck { .. } => Action::QualityCheck,
            Payload::Deliver { .. } => Action::Deliver,
        }
    }

    /// The quality score recorded by this payload, if any.
    pub fn quality_score(&self) -> Option<u8> {
        match self {
            Payload::Create { quality_score, .. }
            | Payload::Transfer { quality_score }
            | Payload::QualityCheck { quality_score, .. } => Some(*quality_score),
            Payload::Deliver { .. } => None,
        }
    }
}

/// An immutable record of a single product action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    id: Uuid,
    from: String,
    to: String,
    product_id: String,
    payload: Payload,
    /// Opaque action-specific extras. Ordered so hashing is deterministic.
    metadata: BTreeMap<String, String>,
    timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    /// Create a new record with a fresh id and the current time.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        product_id: impl Into<String>,
        payload: Payload,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from: from.into(),
            to: to.into(),
            product_id: product_id.into(),
            payload,
            metadata: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create a product creation record.
    pub fn create(
        to: impl Into<String>,
        product_id: impl Into<String>,
        name: impl Into<String>,
        batch_number: impl Into<String>,
        quality_score: u8,
    ) -> Self {
        let to = to.into();
        let payload = Payload::Create {
            name: name.into(),
            batch_number: batch_number.into(),
            origin: to.clone(),
            quality_score,
        };
        Self::new("system", to, product_id, payload)
    }

    /// Create a transfer record.
    pub fn transfer(
        from: impl Into<String>,
        to: impl Into<String>,
        product_id: impl Into<String>,
        quality_score: u8,
    ) -> Self {
        Self::new(from, to, product_id, Payload::Transfer { quality_score })
    }

    /// Create a quality check record. The inspector is both sender and receiver.
    pub fn quality_check(
        inspector: impl Into<String>,
        product_id: impl Into<String>,
        quality_score: u8,
        passed: bool,
    ) -> Self {
        let inspector = inspector.into();
        Self::new(
            inspector.clone(),
            inspector,
            product_id,
            Payload::QualityCheck {
                quality_score,
                passed,
            },
        )
    }

    /// Create a delivery record.
    pub fn deliver(
        from: impl Into<String>,
        to: impl Into<String>,
        product_id: impl Into<String>,
    ) -> Self {
        let to = to.into();
        let payload = Payload::Deliver {
            recipient: to.clone(),
        };
        Self::new(from, to, product_id, payload)
    }

    /// Attach an opaque metadata entry. Only meaningful before the record is queued.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Override the creation time. Used when replaying externally timestamped events.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The action tag, derived from the payload.
    pub fn action(&self) -> Action {
        self.payload.action()
    }

    /// Content hash of the record.
    pub fn hash(&self) -> Hash {
        let encoded = bincode::serialize(self).expect("serialization should not fail");
        hash(&encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_round_trips_through_str() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
        assert_eq!(
            "ship".parse::<Action>(),
            Err(TransactionError::UnknownAction("ship".into()))
        );
    }

    #[test]
    fn test_create_record() {
        let tx = TransactionRecord::create("farm1", "p-1", "Organic Apples", "OA001", 92);

        assert_eq!(tx.from(), "system");
        assert_eq!(tx.to(), "farm1");
        assert_eq!(tx.product_id(), "p-1");
        assert_eq!(tx.action(), Action::Create);
        assert_eq!(tx.payload().quality_score(), Some(92));
        match tx.payload() {
            Payload::Create { origin, .. } => assert_eq!(origin, "farm1"),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_records_get_unique_ids() {
        let a = TransactionRecord::transfer("a", "b", "p", 90);
        let b = TransactionRecord::transfer("a", "b", "p", 90);
        assert_ne!(a.id(), b.id());
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_hash_deterministic() {
        let tx = TransactionRecord::deliver("dist1", "retail1", "p").with_metadata("dock", "3");
        assert_eq!(tx.hash(), tx.clone().hash());
    }

    #[test]
    fn test_metadata_order_does_not_change_hash() {
        let base = TransactionRecord::quality_check("lab", "p", 88, true);
        let a = base.clone().with_metadata("x", "1").with_metadata("y", "2");
        let b = base.with_metadata("y", "2").with_metadata("x", "1");
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_payload_json_shape() {
        let tx = TransactionRecord::transfer("factory1", "dist1", "p", 87);
        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["payload"]["action"], "transfer");
        assert_eq!(value["payload"]["data"]["quality_score"], 87);
        assert_eq!(value["from"], "factory1");
    }
}
