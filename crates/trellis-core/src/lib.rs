//! trellis-core: Shared domain types for the Trellis graph store.
//!
//! This crate provides the types used across all Trellis components:
//! - Node and edge records for the rooted graph
//! - Relation types distinguishing direct from derived links
//! - The reserved root node identity

pub mod types;

pub use types::{Edge, Node, NodeId, RelationType, ROOT_NODE};
