//! Graphcache
//!
//! A concurrency-safe, in-memory typed graph for use as an embedded cache.
//!
//! # Data model
//!
//! - Every node and edge is identified by a (type, id) pair
//! - Nodes and edges carry a shared, mutable attribute payload
//! - Edges are directed from one node to another; mutual connections are
//!   stored as two undirected-flagged edges
//! - Outbound and inbound edges are indexed per node and grouped by edge type
//!
//! # Concurrency
//!
//! All operations take `&self`; share a [`Graph`] across threads with
//! `Arc<Graph>`. Structural mutations are serialized, reads are not.
//!
//! ## Example Usage
//!
//! ```rust
//! use graphcache::graph::{Entity, Graph, Node, TypedId};
//! use graphcache::props;
//!
//! let graph = Graph::new();
//!
//! let coleman = graph
//!     .add_node(Node::with_properties(
//!         TypedId::new("user", "coleman"),
//!         props! { "name" => "coleman" },
//!     ))
//!     .unwrap();
//! let charlie = graph.add_node(Node::with_id("dog", "charlie")).unwrap();
//!
//! graph
//!     .connect(coleman.typed_id(), charlie.typed_id(), "pet", false)
//!     .unwrap();
//!
//! let mut pets = Vec::new();
//! graph.edges_from("pet", coleman.typed_id(), |edge| {
//!     pets.push(edge.to().clone());
//!     true
//! });
//! assert_eq!(pets, vec![TypedId::new("dog", "charlie")]);
//!
//! // deleting a node removes its edges
//! graph.del_node(charlie.typed_id());
//! assert_eq!(graph.edge_count(), 0);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod graph;

// Re-export main types for convenience
pub use graph::{
    Attributes, CascadeMode, Edge, Entity, Graph, GraphConfig, GraphError, GraphResult, ImportMode,
    ImportSummary, Node, PropertyMap, PropertyValue, Snapshot, SnapshotEntry, SnapshotError,
    TypedId, ANY_TYPE,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
