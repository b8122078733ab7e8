//! Core domain types for the Trellis graph.
//!
//! The graph is a single-tenant set of typed nodes and directed edges,
//! anchored at a permanent root node. These types carry no storage logic;
//! trellis-store owns all reads and writes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Identity ──────────────────────────────────────────────────────

/// Unique identifier for a node in the graph.
///
/// Ids are assigned by the storage layer, monotonically increasing, and
/// never reused after deletion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The reserved root node. Always present, never deletable.
pub const ROOT_NODE: NodeId = NodeId(1);

// ── Relations ─────────────────────────────────────────────────────

/// Relation type carried by an edge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    /// A direct, user-created parent→child link.
    Adjacent,
    /// Reserved for derived transitive links (materialized closure).
    /// No write path currently emits this variant.
    Ancestor,
}

impl RelationType {
    /// The string form stored in the `relation_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adjacent => "adjacent",
            Self::Ancestor => "ancestor",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "adjacent" => Ok(Self::Adjacent),
            "ancestor" => Ok(Self::Ancestor),
            other => Err(format!("unknown relation type: {other}")),
        }
    }
}

// ── Records ───────────────────────────────────────────────────────

/// A node in the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Type tag, e.g. "generic". Not validated against any schema.
    #[serde(rename = "type")]
    pub node_type: String,
    /// Opaque payload. Stored serialized; the engine never inspects its
    /// structure.
    pub properties: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// A directed edge between two nodes.
///
/// The ordered pair (from_id, to_id) is the edge's identity: at most one
/// relation type exists per pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from_id: NodeId,
    pub to_id: NodeId,
    pub relation_type: RelationType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_type_round_trips_through_storage_form() {
        assert_eq!(RelationType::Adjacent.as_str(), "adjacent");
        assert_eq!(RelationType::Ancestor.as_str(), "ancestor");
        assert_eq!(
            "adjacent".parse::<RelationType>().unwrap(),
            RelationType::Adjacent
        );
        assert_eq!(
            "ancestor".parse::<RelationType>().unwrap(),
            RelationType::Ancestor
        );
        assert!("sibling".parse::<RelationType>().is_err());
    }

    #[test]
    fn root_node_is_id_one() {
        assert_eq!(ROOT_NODE, NodeId(1));
    }
}
