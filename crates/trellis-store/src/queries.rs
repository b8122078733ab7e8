//! Read operations: transitive closure traversal and list queries.
//!
//! Both closure directions are computed by a single recursive CTE, so each
//! traversal is one statement over one snapshot — it never observes a graph
//! mutated between hops. The closure follows `adjacent` edges only and is
//! reflexive: the starting id is always a member. `UNION` deduplication is
//! the fixed-point condition, which makes cyclic graphs safe to walk.

use std::time::Instant;

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use trellis_core::{Edge, Node, NodeId, RelationType};

use crate::client::{GraphStore, Result, StoreError};

// ── SQL ──────────────────────────────────────────────────────────

/// Reflexive-transitive closure over outgoing adjacent edges.
const DESCENDANTS_CTE: &str = "\
WITH RECURSIVE closure (id) AS (
    SELECT ?
    UNION
    SELECT e.to_id
    FROM edges e
    JOIN closure c ON e.from_id = c.id
    WHERE e.relation_type = 'adjacent'
)";

/// Same closure with the edge direction mirrored.
const ANCESTORS_CTE: &str = "\
WITH RECURSIVE closure (id) AS (
    SELECT ?
    UNION
    SELECT e.from_id
    FROM edges e
    JOIN closure c ON e.to_id = c.id
    WHERE e.relation_type = 'adjacent'
)";

const LIST_NODES_SQL: &str = "\
SELECT id, type, properties, created_at FROM nodes ORDER BY id";

const LIST_EDGES_SQL: &str = "\
SELECT from_id, to_id, relation_type FROM edges ORDER BY from_id, to_id";

const GET_NODE_SQL: &str = "\
SELECT id, type, properties, created_at FROM nodes WHERE id = ?";

/// Materialize the closure against the node table. The type filter is
/// applied after the closure, never during it: membership is decided by
/// reachability alone.
fn closure_sql(cte: &str, filter_len: usize) -> String {
    let mut sql = format!(
        "{cte}
SELECT n.id, n.type, n.properties, n.created_at
FROM nodes n
JOIN closure c ON n.id = c.id"
    );
    if filter_len > 0 {
        let placeholders = vec!["?"; filter_len].join(", ");
        sql.push_str(&format!("\nWHERE n.type IN ({placeholders})"));
    }
    sql.push_str("\nORDER BY n.id");
    sql
}

// ── Rows ─────────────────────────────────────────────────────────

#[derive(FromRow)]
struct NodeRow {
    id: i64,
    #[sqlx(rename = "type")]
    node_type: String,
    properties: Option<String>,
    created_at: DateTime<Utc>,
}

impl NodeRow {
    fn into_node(self) -> Result<Node> {
        let properties = match self.properties {
            Some(raw) => Some(
                serde_json::from_str(&raw)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?,
            ),
            None => None,
        };
        Ok(Node {
            id: NodeId(self.id),
            node_type: self.node_type,
            properties,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct EdgeRow {
    from_id: i64,
    to_id: i64,
    relation_type: String,
}

impl EdgeRow {
    fn into_edge(self) -> Result<Edge> {
        let relation_type = self
            .relation_type
            .parse::<RelationType>()
            .map_err(StoreError::Serialization)?;
        Ok(Edge {
            from_id: NodeId(self.from_id),
            to_id: NodeId(self.to_id),
            relation_type,
        })
    }
}

// ── Reads ────────────────────────────────────────────────────────

impl GraphStore {
    /// All nodes reachable from `start` via adjacent edges, including
    /// `start` itself.
    ///
    /// A non-empty `type_filter` restricts the result to nodes whose type
    /// is in the set. A `start` with no node row yields an empty result;
    /// callers that must distinguish "no such node" from "no descendants"
    /// should probe with [`GraphStore::get_node`].
    pub async fn descendants_of(
        &self,
        start: NodeId,
        type_filter: &[String],
    ) -> Result<Vec<Node>> {
        self.closure_of("descendants_of", DESCENDANTS_CTE, start, type_filter)
            .await
    }

    /// All nodes that reach `start` via adjacent edges, including `start`
    /// itself. Mirror of [`GraphStore::descendants_of`].
    pub async fn ancestors_of(&self, start: NodeId, type_filter: &[String]) -> Result<Vec<Node>> {
        self.closure_of("ancestors_of", ANCESTORS_CTE, start, type_filter)
            .await
    }

    async fn closure_of(
        &self,
        name: &'static str,
        cte: &str,
        start: NodeId,
        type_filter: &[String],
    ) -> Result<Vec<Node>> {
        let started = Instant::now();
        let sql = closure_sql(cte, type_filter.len());

        let mut query = sqlx::query_as::<_, NodeRow>(&sql).bind(start.0);
        for node_type in type_filter {
            query = query.bind(node_type);
        }
        let rows = query.fetch_all(self.pool()).await?;

        log_query(name, started, rows.len());
        rows.into_iter().map(NodeRow::into_node).collect()
    }

    /// List every node, ordered by id.
    pub async fn list_nodes(&self) -> Result<Vec<Node>> {
        let started = Instant::now();
        let rows = sqlx::query_as::<_, NodeRow>(LIST_NODES_SQL)
            .fetch_all(self.pool())
            .await?;
        log_query("list_nodes", started, rows.len());
        rows.into_iter().map(NodeRow::into_node).collect()
    }

    /// List every edge, ordered by (from_id, to_id).
    pub async fn list_edges(&self) -> Result<Vec<Edge>> {
        let started = Instant::now();
        let rows = sqlx::query_as::<_, EdgeRow>(LIST_EDGES_SQL)
            .fetch_all(self.pool())
            .await?;
        log_query("list_edges", started, rows.len());
        rows.into_iter().map(EdgeRow::into_edge).collect()
    }

    /// Fetch a single node, or `None` if no row exists for the id.
    pub async fn get_node(&self, id: NodeId) -> Result<Option<Node>> {
        let row = sqlx::query_as::<_, NodeRow>(GET_NODE_SQL)
            .bind(id.0)
            .fetch_optional(self.pool())
            .await?;
        row.map(NodeRow::into_node).transpose()
    }

    /// Total node count, root included.
    pub async fn count_nodes(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM nodes")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    /// Total edge count.
    pub async fn count_edges(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM edges")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}

fn log_query(query: &'static str, started: Instant, rows: usize) {
    tracing::debug!(
        query,
        rows,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Executed query"
    );
}
