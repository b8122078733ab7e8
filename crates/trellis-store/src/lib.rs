//! trellis-store — SQLite-backed engine for the Trellis graph.
//!
//! This crate is the single mutation point for the graph. All reads and
//! writes flow through [`GraphStore`]: mutations run as single atomic
//! transactions, traversals run as single-statement recursive queries.

pub mod client;
pub mod mutations;
pub mod queries;

mod schema;

pub use client::{GraphStore, Result, StoreConfig, StoreError};
