//! Core graph implementation
//!
//! This module implements the typed, attributed graph:
//! - Nodes and edges identified by (type, id) with shared attribute payloads
//! - Outbound and inbound adjacency indices grouped by edge type
//! - Namespaced concurrent maps backing every index
//! - Snapshot export and import

pub mod adjacency;
pub mod config;
pub mod edge;
pub mod node;
pub mod property;
pub mod snapshot;
pub mod storage;
pub mod store;
pub mod types;

// Re-export main types
pub use adjacency::AdjacencyList;
pub use config::{CascadeMode, GraphConfig, ImportMode};
pub use edge::Edge;
pub use node::{Entity, Node};
pub use property::{
    Attributes, PropertyMap, PropertyValue, DIRECTED_KEY, FROM_KEY, ID_KEY, TO_KEY, TYPE_KEY,
};
pub use snapshot::{ImportSummary, Snapshot, SnapshotEntry, SnapshotError, SnapshotResult};
pub use storage::NamespacedMap;
pub use store::{Graph, GraphError, GraphResult};
pub use types::{IdGenerator, TypedId, UuidGenerator, ANY_TYPE};
