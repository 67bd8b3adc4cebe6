//! In-memory graph storage implementation
//!
//! Four [`NamespacedMap`] indices, each namespaced by type:
//! - nodes: node type -> node id -> Node
//! - edges: edge type -> edge id -> Edge
//! - edges_from: node type -> node id -> AdjacencyList of outbound edges
//! - edges_to: node type -> node id -> AdjacencyList of inbound edges
//!
//! # Consistency
//!
//! Structural mutations (adding or deleting nodes and edges, import, close)
//! are serialized by a single mutex, so an endpoint check and the index
//! updates that follow it can never interleave with a cascade delete. Reads
//! and iteration skip that mutex and go straight to the indices; a reader
//! racing a mutation may see it half applied, e.g. an edge already in
//! `edges` but not yet in the inbound adjacency of its target.

use super::adjacency::AdjacencyList;
use super::config::{CascadeMode, GraphConfig, ImportMode};
use super::edge::Edge;
use super::node::{Entity, Node};
use super::snapshot::{ImportSummary, Snapshot, SnapshotEntry};
use super::storage::NamespacedMap;
use super::types::{IdGenerator, TypedId, UuidGenerator, ANY_TYPE};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during graph operations
#[derive(Error, Debug, PartialEq)]
pub enum GraphError {
    #[error("Invalid node: {0}")]
    InvalidNode(String),

    #[error("Invalid edge: {0}")]
    InvalidEdge(String),

    #[error("Node {0} does not exist")]
    NodeNotFound(TypedId),

    #[error("Invalid attributes: {0}")]
    InvalidAttributes(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Snapshot {entry} rejected: {reason}")]
    ImportRejected {
        entry: SnapshotEntry,
        #[source]
        reason: Box<GraphError>,
    },
}

impl GraphError {
    /// The input itself was malformed.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            GraphError::InvalidNode(_)
                | GraphError::InvalidEdge(_)
                | GraphError::InvalidAttributes(_)
        )
    }

    /// The input referenced a node that is not in the graph.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GraphError::NodeNotFound(_))
    }
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Concurrency-safe, mutable, in-memory directed graph
///
/// Share it between threads with `Arc<Graph>`; every method takes `&self`.
pub struct Graph {
    nodes: NamespacedMap<Node>,
    edges: NamespacedMap<Edge>,
    edges_from: NamespacedMap<AdjacencyList>,
    edges_to: NamespacedMap<AdjacencyList>,
    /// Held for the full duration of every structural mutation.
    write_lock: Mutex<()>,
    config: GraphConfig,
    id_generator: Arc<dyn IdGenerator>,
}

impl Graph {
    /// Create a new empty graph with the default configuration
    pub fn new() -> Self {
        Self::build(GraphConfig::default(), Arc::new(UuidGenerator))
    }

    pub fn with_config(config: GraphConfig) -> GraphResult<Self> {
        Self::with_id_generator(config, Arc::new(UuidGenerator))
    }

    /// Create a graph that draws ids for id-less nodes and edges from `id_generator`.
    pub fn with_id_generator(
        config: GraphConfig,
        id_generator: Arc<dyn IdGenerator>,
    ) -> GraphResult<Self> {
        config.validate()?;
        Ok(Self::build(config, id_generator))
    }

    fn build(config: GraphConfig, id_generator: Arc<dyn IdGenerator>) -> Self {
        Graph {
            nodes: NamespacedMap::with_shard_amount(config.shard_amount),
            edges: NamespacedMap::with_shard_amount(config.shard_amount),
            edges_from: NamespacedMap::with_shard_amount(config.shard_amount),
            edges_to: NamespacedMap::with_shard_amount(config.shard_amount),
            write_lock: Mutex::new(()),
            config,
            id_generator,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    fn ensure_id<E: Entity>(&self, entity: &mut E) {
        if entity.id().is_empty() {
            entity.set_id(self.id_generator.generate());
        }
    }

    // ============================================================
    // Nodes
    // ============================================================

    /// Store `node` under its (type, id), generating the id if it is empty.
    /// Re-adding an existing (type, id) replaces the stored node.
    ///
    /// Fails with [`GraphError::InvalidNode`] if the type is empty or the
    /// [`ANY_TYPE`] wildcard. Returns the stored handle; it shares
    /// attributes with the graph's copy.
    pub fn add_node(&self, mut node: Node) -> GraphResult<Node> {
        self.ensure_id(&mut node);
        node.validate()?;
        let _guard = self.write_lock.lock();
        Ok(self.insert_node_locked(node))
    }

    /// Add nodes in order, stopping at the first failure.
    pub fn add_nodes(&self, nodes: impl IntoIterator<Item = Node>) -> GraphResult<Vec<Node>> {
        nodes.into_iter().map(|node| self.add_node(node)).collect()
    }

    fn insert_node_locked(&self, node: Node) -> Node {
        self.nodes.set(node.typ(), node.id(), node.clone());
        debug!("Stored node {}", node.typed_id());
        node
    }

    pub fn get_node(&self, id: &TypedId) -> Option<Node> {
        self.nodes.get(id.typ(), id.id())
    }

    pub fn has_node(&self, id: &TypedId) -> bool {
        self.nodes.exists(id.typ(), id.id())
    }

    /// Visit every node until `f` returns false
    pub fn range_nodes(&self, f: impl FnMut(&Node) -> bool) {
        self.range_node_types(ANY_TYPE, f);
    }

    /// Visit the nodes of `node_type` ([`ANY_TYPE`] for all) until `f` returns false
    pub fn range_node_types(&self, node_type: &str, mut f: impl FnMut(&Node) -> bool) {
        self.nodes.range(node_type, |_, node| f(node));
    }

    /// Delete a node and its incident edges. Missing nodes are ignored.
    ///
    /// Outbound edges are always removed; inbound edges too unless the graph
    /// runs with [`CascadeMode::Outbound`].
    pub fn del_node(&self, id: &TypedId) {
        let _guard = self.write_lock.lock();
        self.del_node_locked(id);
    }

    fn del_node_locked(&self, id: &TypedId) {
        let mut incident = adjacent_edge_ids(&self.edges_from, id);
        if self.config.cascade == CascadeMode::Both {
            incident.extend(adjacent_edge_ids(&self.edges_to, id));
        }
        let mut removed = 0;
        for edge_id in &incident {
            if self.del_edge_locked(edge_id).is_some() {
                removed += 1;
            }
        }
        if self.nodes.delete(id.typ(), id.id()).is_some() {
            debug!("Deleted node {} and {} incident edges", id, removed);
        }
    }

    // ============================================================
    // Edges
    // ============================================================

    /// Add `edge`, generating its id if empty.
    ///
    /// Fails with [`GraphError::InvalidEdge`] if the type or an endpoint is
    /// empty and with [`GraphError::NodeNotFound`] if an endpoint is not in
    /// the graph; the graph is unchanged on failure. Re-adding an existing
    /// (type, id) replaces the old edge in every index.
    pub fn add_edge(&self, mut edge: Edge) -> GraphResult<Edge> {
        self.ensure_id(&mut edge);
        edge.validate()?;
        let _guard = self.write_lock.lock();
        self.insert_edge_locked(edge)
    }

    /// Add edges in order, stopping at the first failure.
    pub fn add_edges(&self, edges: impl IntoIterator<Item = Edge>) -> GraphResult<Vec<Edge>> {
        edges.into_iter().map(|edge| self.add_edge(edge)).collect()
    }

    /// Connect `from` to `to` with a new edge of `edge_type`. With `mutual`,
    /// also adds the reverse edge; both are then flagged undirected. Both
    /// edges are added or neither is.
    pub fn connect(
        &self,
        from: &TypedId,
        to: &TypedId,
        edge_type: &str,
        mutual: bool,
    ) -> GraphResult<Vec<Edge>> {
        let mut planned = vec![Edge::new(edge_type, from.clone(), to.clone())];
        if mutual {
            planned = vec![
                Edge::new(edge_type, from.clone(), to.clone()).undirected(),
                Edge::new(edge_type, to.clone(), from.clone()).undirected(),
            ];
        }
        for edge in &mut planned {
            self.ensure_id(edge);
            edge.validate()?;
        }
        let _guard = self.write_lock.lock();
        self.check_endpoints(&planned[0])?;
        planned
            .into_iter()
            .map(|edge| self.insert_edge_locked(edge))
            .collect()
    }

    fn check_endpoints(&self, edge: &Edge) -> GraphResult<()> {
        for endpoint in [edge.from(), edge.to()] {
            if !self.has_node(endpoint) {
                return Err(GraphError::NodeNotFound(endpoint.clone()));
            }
        }
        Ok(())
    }

    fn insert_edge_locked(&self, edge: Edge) -> GraphResult<Edge> {
        self.check_endpoints(&edge)?;
        let id = edge.typed_id().clone();
        if self.edges.exists(id.typ(), id.id()) {
            self.del_edge_locked(&id);
        }

        self.edges.set(id.typ(), id.id(), edge.clone());
        let (from, to) = (edge.from(), edge.to());
        self.edges_from
            .upsert(from.typ(), from.id(), AdjacencyList::new, |adj| adj.add(edge.clone()));
        self.edges_to
            .upsert(to.typ(), to.id(), AdjacencyList::new, |adj| adj.add(edge.clone()));

        debug!("Stored edge {} ({} -> {})", id, from, to);
        Ok(edge)
    }

    pub fn get_edge(&self, id: &TypedId) -> Option<Edge> {
        self.edges.get(id.typ(), id.id())
    }

    pub fn has_edge(&self, id: &TypedId) -> bool {
        self.edges.exists(id.typ(), id.id())
    }

    /// Delete an edge from every index. Missing edges are ignored.
    pub fn del_edge(&self, id: &TypedId) {
        let _guard = self.write_lock.lock();
        self.del_edge_locked(id);
    }

    fn del_edge_locked(&self, id: &TypedId) -> Option<Edge> {
        let edge = self.edges.get(id.typ(), id.id())?;
        detach(&self.edges_from, edge.from(), id);
        detach(&self.edges_to, edge.to(), id);
        self.edges.delete(id.typ(), id.id());
        debug!("Deleted edge {}", id);
        Some(edge)
    }

    /// Visit every edge until `f` returns false
    pub fn range_edges(&self, f: impl FnMut(&Edge) -> bool) {
        self.range_edge_types(ANY_TYPE, f);
    }

    /// Visit the edges of `edge_type` ([`ANY_TYPE`] for all) until `f` returns false
    pub fn range_edge_types(&self, edge_type: &str, mut f: impl FnMut(&Edge) -> bool) {
        self.edges.range(edge_type, |_, edge| f(edge));
    }

    /// Visit the outbound edges of `node` of `edge_type` ([`ANY_TYPE`] for
    /// all) until `f` returns false. `f` may mutate the graph.
    pub fn edges_from(&self, edge_type: &str, node: &TypedId, f: impl FnMut(&Edge) -> bool) {
        visit_adjacent(&self.edges_from, edge_type, node, f);
    }

    /// Visit the inbound edges of `node`; see [`edges_from`](Self::edges_from).
    pub fn edges_to(&self, edge_type: &str, node: &TypedId, f: impl FnMut(&Edge) -> bool) {
        visit_adjacent(&self.edges_to, edge_type, node, f);
    }

    // ============================================================
    // Statistics
    // ============================================================

    /// Node types seen so far (a type stays listed after its last node is deleted)
    pub fn node_types(&self) -> Vec<String> {
        self.nodes.namespaces()
    }

    /// Edge types seen so far
    pub fn edge_types(&self) -> Vec<String> {
        self.edges.namespaces()
    }

    /// Get total number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.total_len()
    }

    /// Get total number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.total_len()
    }

    // ============================================================
    // Export / Import
    // ============================================================

    /// Flatten the graph into a [`Snapshot`].
    ///
    /// Blocks structural mutations while it runs, so every exported edge
    /// refers to exported nodes. The snapshot shares attribute payloads with
    /// the graph.
    pub fn export(&self) -> Snapshot {
        let _guard = self.write_lock.lock();
        let mut snapshot = Snapshot::default();
        self.range_nodes(|node| {
            snapshot.nodes.push(node.clone());
            true
        });
        self.range_edges(|edge| {
            snapshot.edges.push(edge.clone());
            true
        });
        info!(
            "Exported {} nodes and {} edges",
            snapshot.nodes.len(),
            snapshot.edges.len()
        );
        snapshot
    }

    /// Add every node, then every edge, of `snapshot`.
    ///
    /// Imported entities get their own attribute payloads. Failure handling
    /// follows [`GraphConfig::import_mode`]: `Strict` checks every entry
    /// before touching the graph and fails with
    /// [`GraphError::ImportRejected`] on the first bad one; `BestEffort`
    /// skips bad entries and lists them in the returned summary.
    pub fn import(&self, snapshot: &Snapshot) -> GraphResult<ImportSummary> {
        let nodes: Vec<Node> = snapshot
            .nodes
            .iter()
            .map(|node| {
                let mut node = node.deep_clone();
                self.ensure_id(&mut node);
                node
            })
            .collect();
        let edges: Vec<Edge> = snapshot
            .edges
            .iter()
            .map(|edge| {
                let mut edge = edge.deep_clone();
                self.ensure_id(&mut edge);
                edge
            })
            .collect();

        let _guard = self.write_lock.lock();
        if self.config.import_mode == ImportMode::Strict {
            self.check_snapshot_locked(&nodes, &edges)?;
        }

        let mut summary = ImportSummary::default();
        for (index, node) in nodes.into_iter().enumerate() {
            match node.validate() {
                Ok(()) => {
                    self.insert_node_locked(node);
                    summary.nodes += 1;
                }
                Err(err) => {
                    warn!("Skipping snapshot node #{} {}: {}", index, node.typed_id(), err);
                    summary.rejected.push((SnapshotEntry::Node(index), err));
                }
            }
        }
        for (index, edge) in edges.into_iter().enumerate() {
            let typed_id = edge.typed_id().clone();
            match edge.validate().and_then(|_| self.insert_edge_locked(edge)) {
                Ok(_) => summary.edges += 1,
                Err(err) => {
                    warn!("Skipping snapshot edge #{} {}: {}", index, typed_id, err);
                    summary.rejected.push((SnapshotEntry::Edge(index), err));
                }
            }
        }

        info!(
            "Imported {} nodes and {} edges ({} rejected)",
            summary.nodes,
            summary.edges,
            summary.rejected.len()
        );
        Ok(summary)
    }

    /// Every node valid, every edge valid with endpoints in the graph or
    /// among `nodes`.
    fn check_snapshot_locked(&self, nodes: &[Node], edges: &[Edge]) -> GraphResult<()> {
        let reject = |entry: SnapshotEntry, typed_id: &TypedId, reason: GraphError| {
            warn!("Rejecting snapshot: {} {}: {}", entry, typed_id, reason);
            GraphError::ImportRejected {
                entry,
                reason: Box::new(reason),
            }
        };

        for (index, node) in nodes.iter().enumerate() {
            if let Err(reason) = node.validate() {
                return Err(reject(SnapshotEntry::Node(index), node.typed_id(), reason));
            }
        }
        let incoming: HashSet<&TypedId> = nodes.iter().map(|node| node.typed_id()).collect();
        for (index, edge) in edges.iter().enumerate() {
            let checked = edge.validate().and_then(|_| {
                match [edge.from(), edge.to()]
                    .into_iter()
                    .find(|end| !incoming.contains(end) && !self.has_node(end))
                {
                    Some(missing) => Err(GraphError::NodeNotFound(missing.clone())),
                    None => Ok(()),
                }
            });
            if let Err(reason) = checked {
                return Err(reject(SnapshotEntry::Edge(index), edge.typed_id(), reason));
            }
        }
        Ok(())
    }

    /// Release all four indices. Only the first call has an effect; returns
    /// whether this call performed the teardown.
    pub fn close(&self) -> bool {
        let _guard = self.write_lock.lock();
        let first = self.nodes.close();
        self.edges.close();
        self.edges_from.close();
        self.edges_to.close();
        if first {
            info!("Graph closed");
        }
        first
    }
}

/// Ids of every edge in `node`'s entry of an adjacency index.
fn adjacent_edge_ids(index: &NamespacedMap<AdjacencyList>, node: &TypedId) -> Vec<TypedId> {
    index
        .read(node.typ(), node.id(), |adj| {
            let mut ids = Vec::with_capacity(adj.len());
            adj.range_by_type(ANY_TYPE, |edge| {
                ids.push(edge.typed_id().clone());
                true
            });
            ids
        })
        .unwrap_or_default()
}

/// Remove `edge_id` from `node`'s adjacency list, dropping the list once empty.
fn detach(index: &NamespacedMap<AdjacencyList>, node: &TypedId, edge_id: &TypedId) {
    index.update(node.typ(), node.id(), |adj| adj.delete(edge_id));
    index.remove_if(node.typ(), node.id(), AdjacencyList::is_empty);
}

/// Copies the selected edges out before calling `f`, so no index lock is
/// held during the callback.
fn visit_adjacent(
    index: &NamespacedMap<AdjacencyList>,
    edge_type: &str,
    node: &TypedId,
    mut f: impl FnMut(&Edge) -> bool,
) {
    let edges = index
        .read(node.typ(), node.id(), |adj| adj.edges_of_type(edge_type))
        .unwrap_or_default();
    for edge in &edges {
        if !f(edge) {
            break;
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes)
            .field("edges", &self.edges)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
