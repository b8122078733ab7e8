//! Integration tests for trellis-store against in-process SQLite.
//!
//! Run with: cargo test --package trellis-store --test integration

use std::collections::BTreeSet;

use trellis_core::{NodeId, RelationType, ROOT_NODE};
use trellis_store::{GraphStore, StoreConfig, StoreError};

async fn memory_store() -> GraphStore {
    GraphStore::connect(&StoreConfig::default()).await.unwrap()
}

fn ids(nodes: &[trellis_core::Node]) -> BTreeSet<i64> {
    nodes.iter().map(|n| n.id.0).collect()
}

#[tokio::test]
async fn root_is_seeded_on_connect() {
    let store = memory_store().await;

    let root = store.get_node(ROOT_NODE).await.unwrap().unwrap();
    assert_eq!(root.id, ROOT_NODE);
    assert_eq!(root.node_type, "root");
    assert_eq!(store.count_nodes().await.unwrap(), 1);
    assert_eq!(store.count_edges().await.unwrap(), 0);
}

#[tokio::test]
async fn insert_assigns_monotonic_ids_never_reused() {
    let store = memory_store().await;

    let a = store.insert_node("generic", None).await.unwrap();
    let b = store.insert_node("generic", None).await.unwrap();
    assert!(b > a);

    store.delete_node(b).await.unwrap();
    let c = store.insert_node("generic", None).await.unwrap();
    assert!(c > b, "deleted id must not be reused");
}

#[tokio::test]
async fn closure_is_reflexive() {
    let store = memory_store().await;
    let a = store.insert_node("generic", None).await.unwrap();

    let descendants = store.descendants_of(a, &[]).await.unwrap();
    assert_eq!(ids(&descendants), BTreeSet::from([a.0]));

    let ancestors = store.ancestors_of(a, &[]).await.unwrap();
    assert_eq!(ids(&ancestors), BTreeSet::from([a.0]));
}

#[tokio::test]
async fn link_is_idempotent() {
    let store = memory_store().await;
    let a = store.insert_node("generic", None).await.unwrap();

    store.link_child(ROOT_NODE, a).await.unwrap();
    store.link_child(ROOT_NODE, a).await.unwrap();

    assert_eq!(store.count_edges().await.unwrap(), 1);
    let edges = store.list_edges().await.unwrap();
    assert_eq!(edges[0].from_id, ROOT_NODE);
    assert_eq!(edges[0].to_id, a);
    assert_eq!(edges[0].relation_type, RelationType::Adjacent);
}

#[tokio::test]
async fn root_cannot_be_deleted() {
    let store = memory_store().await;
    let a = store.insert_node("generic", None).await.unwrap();
    store.link_child(ROOT_NODE, a).await.unwrap();

    let err = store.delete_node(ROOT_NODE).await.unwrap_err();
    assert!(matches!(err, StoreError::RootDelete));

    // Graph unmodified.
    assert_eq!(store.count_nodes().await.unwrap(), 2);
    assert_eq!(store.count_edges().await.unwrap(), 1);
    assert!(store.get_node(ROOT_NODE).await.unwrap().is_some());
}

#[tokio::test]
async fn delete_cascades_both_edge_directions() {
    let store = memory_store().await;
    let a = store.insert_node("generic", None).await.unwrap();
    let b = store.insert_node("generic", None).await.unwrap();
    store.link_child(ROOT_NODE, a).await.unwrap();
    store.link_child(a, b).await.unwrap();

    store.delete_node(a).await.unwrap();

    let edges = store.list_edges().await.unwrap();
    assert!(
        edges.iter().all(|e| e.from_id != a && e.to_id != a),
        "no edge may reference the deleted node"
    );
    assert_eq!(edges.len(), 0);
}

#[tokio::test]
async fn delete_orphans_children_without_reparenting() {
    let store = memory_store().await;
    let a = store.insert_node("generic", None).await.unwrap();
    let b = store.insert_node("generic", None).await.unwrap();
    store.link_child(ROOT_NODE, a).await.unwrap();
    store.link_child(a, b).await.unwrap();

    store.delete_node(a).await.unwrap();

    // b still exists but is no longer reachable from the root.
    assert!(store.get_node(b).await.unwrap().is_some());
    let reachable = store.descendants_of(ROOT_NODE, &[]).await.unwrap();
    assert_eq!(ids(&reachable), BTreeSet::from([ROOT_NODE.0]));
}

#[tokio::test]
async fn cyclic_graph_closure_terminates() {
    let store = memory_store().await;
    let a = store.insert_node("generic", None).await.unwrap();
    let b = store.insert_node("generic", None).await.unwrap();
    let c = store.insert_node("generic", None).await.unwrap();
    store.link_child(a, b).await.unwrap();
    store.link_child(b, c).await.unwrap();
    store.link_child(c, a).await.unwrap();

    let descendants = store.descendants_of(a, &[]).await.unwrap();
    assert_eq!(ids(&descendants), BTreeSet::from([a.0, b.0, c.0]));

    let ancestors = store.ancestors_of(a, &[]).await.unwrap();
    assert_eq!(ids(&ancestors), BTreeSet::from([a.0, b.0, c.0]));
}

#[tokio::test]
async fn type_filter_restricts_post_closure() {
    let store = memory_store().await;
    let t1 = store.insert_node("t1", None).await.unwrap();
    let t2 = store.insert_node("t2", None).await.unwrap();
    let t3 = store.insert_node("t3", None).await.unwrap();
    store.link_child(ROOT_NODE, t1).await.unwrap();
    store.link_child(t1, t2).await.unwrap();
    store.link_child(t2, t3).await.unwrap();

    let filtered = store
        .descendants_of(ROOT_NODE, &["t1".to_string()])
        .await
        .unwrap();
    assert_eq!(ids(&filtered), BTreeSet::from([t1.0]));

    // Filtering never changes closure membership, only the projection:
    // t3 is still found through the t1/t2 chain.
    let filtered = store
        .descendants_of(ROOT_NODE, &["t3".to_string()])
        .await
        .unwrap();
    assert_eq!(ids(&filtered), BTreeSet::from([t3.0]));

    let multi = store
        .descendants_of(ROOT_NODE, &["t1".to_string(), "t3".to_string()])
        .await
        .unwrap();
    assert_eq!(ids(&multi), BTreeSet::from([t1.0, t3.0]));
}

#[tokio::test]
async fn delete_all_resets_to_root() {
    let store = memory_store().await;
    store.seed_graph(20, 20).await.unwrap();
    assert!(store.count_nodes().await.unwrap() > 1);

    store.delete_all().await.unwrap();

    let nodes = store.list_nodes().await.unwrap();
    assert_eq!(ids(&nodes), BTreeSet::from([ROOT_NODE.0]));
    assert_eq!(store.list_edges().await.unwrap().len(), 0);
}

#[tokio::test]
async fn worked_example_from_both_directions() {
    // Nodes {1(root), 2, 3, 4}, adjacent edges 1→2, 2→3, 2→4.
    let store = memory_store().await;
    let n2 = store.insert_node("generic", None).await.unwrap();
    let n3 = store.insert_node("generic", None).await.unwrap();
    let n4 = store.insert_node("generic", None).await.unwrap();
    store.link_child(ROOT_NODE, n2).await.unwrap();
    store.link_child(n2, n3).await.unwrap();
    store.link_child(n2, n4).await.unwrap();

    let down = store.descendants_of(ROOT_NODE, &[]).await.unwrap();
    assert_eq!(ids(&down), BTreeSet::from([1, n2.0, n3.0, n4.0]));

    let up = store.ancestors_of(n4, &[]).await.unwrap();
    assert_eq!(ids(&up), BTreeSet::from([n4.0, n2.0, 1]));

    let leaf = store.descendants_of(n3, &[]).await.unwrap();
    assert_eq!(ids(&leaf), BTreeSet::from([n3.0]));
}

#[tokio::test]
async fn missing_start_yields_empty_result() {
    let store = memory_store().await;

    let result = store.descendants_of(NodeId(9999), &[]).await.unwrap();
    assert!(result.is_empty());

    let result = store.ancestors_of(NodeId(9999), &[]).await.unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn unlink_missing_pair_is_noop() {
    let store = memory_store().await;
    let a = store.insert_node("generic", None).await.unwrap();
    store.link_child(ROOT_NODE, a).await.unwrap();

    store.unlink_child(a, ROOT_NODE).await.unwrap();
    assert_eq!(store.count_edges().await.unwrap(), 1);

    store.unlink_child(ROOT_NODE, a).await.unwrap();
    assert_eq!(store.count_edges().await.unwrap(), 0);
}

#[tokio::test]
async fn link_requires_both_endpoints() {
    let store = memory_store().await;

    let err = store.link_child(ROOT_NODE, NodeId(9999)).await.unwrap_err();
    assert!(matches!(err, StoreError::Database(_)));
    assert_eq!(store.count_edges().await.unwrap(), 0);
}

#[tokio::test]
async fn properties_pass_through_opaquely() {
    let store = memory_store().await;
    let payload = serde_json::json!({
        "label": "web-01",
        "weights": [1, 2, 3],
        "nested": { "deep": true }
    });

    let a = store.insert_node("generic", Some(&payload)).await.unwrap();
    let node = store.get_node(a).await.unwrap().unwrap();
    assert_eq!(node.properties, Some(payload));

    let bare = store.insert_node("generic", None).await.unwrap();
    let node = store.get_node(bare).await.unwrap().unwrap();
    assert_eq!(node.properties, None);
}

#[tokio::test]
async fn seeded_graph_is_fully_reachable() {
    let store = memory_store().await;
    store.seed_graph(10, 10).await.unwrap();

    assert_eq!(store.count_nodes().await.unwrap(), 11);
    assert_eq!(store.count_edges().await.unwrap(), 10);

    let reachable = store.descendants_of(ROOT_NODE, &[]).await.unwrap();
    assert_eq!(reachable.len(), 11);
}

#[tokio::test]
async fn file_backed_store_persists_across_connects() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        url: format!("sqlite://{}/graph.db", dir.path().display()),
        ..StoreConfig::default()
    };

    let store = GraphStore::connect(&config).await.unwrap();
    let a = store.insert_node("generic", None).await.unwrap();
    store.link_child(ROOT_NODE, a).await.unwrap();

    let reopened = GraphStore::connect(&config).await.unwrap();
    assert!(reopened.get_node(a).await.unwrap().is_some());
    assert_eq!(reopened.count_edges().await.unwrap(), 1);
    // Root seeding is idempotent across connects.
    assert_eq!(reopened.count_nodes().await.unwrap(), 2);
}

#[tokio::test]
async fn concurrent_links_on_same_pair_converge_to_one_edge() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        url: format!("sqlite://{}/graph.db", dir.path().display()),
        max_connections: 4,
        ..StoreConfig::default()
    };
    let store = GraphStore::connect(&config).await.unwrap();
    let a = store.insert_node("generic", None).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(
            async move { store.link_child(ROOT_NODE, a).await },
        ));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.count_edges().await.unwrap(), 1);
}
