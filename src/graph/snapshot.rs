//! Flat, serializable picture of a graph
//!
//! [`Graph::export`](super::Graph::export) produces a [`Snapshot`] and
//! [`Graph::import`](super::Graph::import) replays one. The JSON helpers
//! here are what a caller uses to move snapshots through files or sockets;
//! the graph itself never does I/O.

use super::edge::Edge;
use super::node::Node;
use super::store::GraphError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};
use thiserror::Error;

/// Snapshot I/O errors
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Ordered nodes followed by ordered edges
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Snapshot {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Snapshot { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn write_json<W: Write>(&self, writer: W) -> SnapshotResult<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    pub fn read_json<R: Read>(reader: R) -> SnapshotResult<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn to_json_string(&self) -> SnapshotResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json_str(json: &str) -> SnapshotResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Position of a node or edge inside a [`Snapshot`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotEntry {
    Node(usize),
    Edge(usize),
}

impl fmt::Display for SnapshotEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotEntry::Node(index) => write!(f, "node #{}", index),
            SnapshotEntry::Edge(index) => write!(f, "edge #{}", index),
        }
    }
}

/// Outcome of a successful import
#[derive(Debug, Default, PartialEq)]
pub struct ImportSummary {
    /// Nodes written
    pub nodes: usize,
    /// Edges written
    pub edges: usize,
    /// Every entry left out and why (best-effort mode only)
    pub rejected: Vec<(SnapshotEntry, GraphError)>,
}

impl ImportSummary {
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}
