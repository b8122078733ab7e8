//! Write operations for the graph.
//!
//! Every mutation runs inside a single transaction: either all of its
//! writes commit or none do, and the connection returns to the pool on
//! every exit path. Failures are logged and propagated; retry policy
//! belongs to the caller.

use chrono::Utc;

use trellis_core::{NodeId, RelationType, ROOT_NODE};

use crate::client::{GraphStore, Result, StoreError};

impl GraphStore {
    // ── Nodes ────────────────────────────────────────────────────

    /// Insert a new node and return its generated id.
    ///
    /// The properties payload is stored serialized and never inspected.
    pub async fn insert_node(
        &self,
        node_type: &str,
        properties: Option<&serde_json::Value>,
    ) -> Result<NodeId> {
        let result = self.insert_node_tx(node_type, properties).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, node_type, "insert_node failed");
        }
        result
    }

    async fn insert_node_tx(
        &self,
        node_type: &str,
        properties: Option<&serde_json::Value>,
    ) -> Result<NodeId> {
        let payload = properties
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut guard = self.begin().await?;
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO nodes (type, properties, created_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(node_type)
        .bind(payload)
        .bind(Utc::now())
        .fetch_one(&mut *guard.tx)
        .await?;
        guard.commit().await?;

        tracing::debug!(id, node_type, "Node inserted");
        Ok(NodeId(id))
    }

    /// Delete a node. The root node is protected and cannot be deleted.
    ///
    /// All edges touching the node are removed by the storage cascade.
    /// This is a local delete: children of the deleted node are NOT
    /// re-linked to its parents, so any subtree reachable only through
    /// this node becomes unreachable from the root.
    ///
    /// Deleting an id with no node row is a no-op.
    pub async fn delete_node(&self, id: NodeId) -> Result<()> {
        if id == ROOT_NODE {
            return Err(StoreError::RootDelete);
        }
        let result = self.delete_node_tx(id).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, node = %id, "delete_node failed");
        }
        result
    }

    async fn delete_node_tx(&self, id: NodeId) -> Result<()> {
        let mut guard = self.begin().await?;
        let deleted = sqlx::query("DELETE FROM nodes WHERE id = ?")
            .bind(id.0)
            .execute(&mut *guard.tx)
            .await?
            .rows_affected();
        guard.commit().await?;

        tracing::debug!(node = %id, deleted, "Node delete committed");
        Ok(())
    }

    /// Delete every node except the root, cascading all edges. Full reset.
    pub async fn delete_all(&self) -> Result<()> {
        let result = self.delete_all_tx().await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "delete_all failed");
        }
        result
    }

    async fn delete_all_tx(&self) -> Result<()> {
        let mut guard = self.begin().await?;
        sqlx::query("DELETE FROM edges")
            .execute(&mut *guard.tx)
            .await?;
        sqlx::query("DELETE FROM nodes WHERE id <> ?")
            .bind(ROOT_NODE.0)
            .execute(&mut *guard.tx)
            .await?;
        guard.commit().await?;

        tracing::debug!("Graph reset to root");
        Ok(())
    }

    // ── Edges ────────────────────────────────────────────────────

    /// Link `child` under `parent` with an adjacent edge.
    ///
    /// Idempotent: re-linking an existing pair leaves a single edge row.
    /// Fails if either endpoint does not exist.
    pub async fn link_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let result = self.upsert_edge(parent, child, RelationType::Adjacent).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, %parent, %child, "link_child failed");
        }
        result
    }

    /// Upsert an edge. The ordered pair is the identity: a conflicting
    /// insert overwrites the relation type instead of adding a row.
    async fn upsert_edge(
        &self,
        from: NodeId,
        to: NodeId,
        relation_type: RelationType,
    ) -> Result<()> {
        let mut guard = self.begin().await?;
        sqlx::query(
            "INSERT INTO edges (from_id, to_id, relation_type) VALUES (?, ?, ?)
             ON CONFLICT (from_id, to_id) DO UPDATE SET relation_type = excluded.relation_type",
        )
        .bind(from.0)
        .bind(to.0)
        .bind(relation_type.as_str())
        .execute(&mut *guard.tx)
        .await?;
        guard.commit().await?;

        tracing::debug!(%from, %to, %relation_type, "Edge upserted");
        Ok(())
    }

    /// Remove the edge for the exact (parent, child) pair.
    ///
    /// A missing pair is a no-op, not an error.
    pub async fn unlink_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let result = self.unlink_child_tx(parent, child).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, %parent, %child, "unlink_child failed");
        }
        result
    }

    async fn unlink_child_tx(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let mut guard = self.begin().await?;
        let removed = sqlx::query("DELETE FROM edges WHERE from_id = ? AND to_id = ?")
            .bind(parent.0)
            .bind(child.0)
            .execute(&mut *guard.tx)
            .await?
            .rows_affected();
        guard.commit().await?;

        tracing::debug!(%parent, %child, removed, "Edge unlink committed");
        Ok(())
    }

    // ── Batch Operations ─────────────────────────────────────────

    /// Populate a demo graph: `num_nodes` generic nodes arranged as a
    /// binary tree of adjacent edges under the root, in one transaction.
    ///
    /// `num_edges` is capped at `num_nodes`; pass equal counts to make
    /// every seeded node reachable from the root.
    pub async fn seed_graph(&self, num_nodes: u32, num_edges: u32) -> Result<()> {
        let result = self.seed_graph_tx(num_nodes, num_edges).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, num_nodes, num_edges, "seed_graph failed");
        }
        result
    }

    async fn seed_graph_tx(&self, num_nodes: u32, num_edges: u32) -> Result<()> {
        let mut guard = self.begin().await?;

        let mut ids = Vec::with_capacity(num_nodes as usize + 1);
        ids.push(ROOT_NODE);
        for _ in 0..num_nodes {
            let (id,): (i64,) = sqlx::query_as(
                "INSERT INTO nodes (type, properties, created_at) VALUES (?, NULL, ?) RETURNING id",
            )
            .bind("generic")
            .bind(Utc::now())
            .fetch_one(&mut *guard.tx)
            .await?;
            ids.push(NodeId(id));
        }

        let num_edges = num_edges.min(num_nodes) as usize;
        for i in 1..=num_edges {
            let from = ids[i / 2];
            let to = ids[i];
            sqlx::query(
                "INSERT INTO edges (from_id, to_id, relation_type) VALUES (?, ?, ?)
                 ON CONFLICT (from_id, to_id) DO UPDATE SET relation_type = excluded.relation_type",
            )
            .bind(from.0)
            .bind(to.0)
            .bind(RelationType::Adjacent.as_str())
            .execute(&mut *guard.tx)
            .await?;
        }

        guard.commit().await?;

        tracing::info!(num_nodes, num_edges, "Seeded demo graph");
        Ok(())
    }
}
