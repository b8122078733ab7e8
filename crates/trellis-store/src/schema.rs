//! Schema bootstrap for the graph database.
//!
//! All DDL is idempotent: `init` runs on every connect and is a no-op on an
//! already-initialized database. Edge endpoints are foreign keys with
//! cascading deletes, so removing a node clears its edges at the storage
//! layer rather than in engine code.

use chrono::Utc;
use sqlx::SqlitePool;

use trellis_core::ROOT_NODE;

use crate::client::Result;

/// Nodes: generated integer identity, type tag, opaque properties payload.
///
/// AUTOINCREMENT keeps ids monotonic; SQLite will not reuse an id after its
/// row is deleted.
const CREATE_NODES: &str = "\
CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    type TEXT NOT NULL,
    properties TEXT,
    created_at TEXT NOT NULL
)";

/// Edges: the ordered pair is the primary key, so at most one relation type
/// exists between any ordered pair of nodes.
const CREATE_EDGES: &str = "\
CREATE TABLE IF NOT EXISTS edges (
    from_id INTEGER NOT NULL REFERENCES nodes (id) ON DELETE CASCADE,
    to_id INTEGER NOT NULL REFERENCES nodes (id) ON DELETE CASCADE,
    relation_type TEXT NOT NULL,
    PRIMARY KEY (from_id, to_id)
)";

/// Ancestor walks join on to_id; the primary key only covers from_id-first
/// lookups.
const CREATE_EDGES_TO_INDEX: &str = "\
CREATE INDEX IF NOT EXISTS edges_to_id ON edges (to_id)";

const SEED_ROOT: &str = "\
INSERT OR IGNORE INTO nodes (id, type, properties, created_at)
VALUES (?, 'root', NULL, ?)";

/// Create tables and indexes, and seed the reserved root node.
pub(crate) async fn init(pool: &SqlitePool) -> Result<()> {
    sqlx::query(CREATE_NODES).execute(pool).await?;
    sqlx::query(CREATE_EDGES).execute(pool).await?;
    sqlx::query(CREATE_EDGES_TO_INDEX).execute(pool).await?;
    sqlx::query(SEED_ROOT)
        .bind(ROOT_NODE.0)
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(())
}
