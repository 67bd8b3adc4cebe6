//! Per-node adjacency list.
//!
//! Holds the edges incident to one node on one side (outbound or inbound),
//! grouped by edge type so that a type-filtered traversal only touches the
//! matching group.

use super::edge::Edge;
use super::node::Entity;
use super::types::{TypedId, ANY_TYPE};
use indexmap::IndexMap;

/// Edges of one node: edge type -> edge id -> edge.
#[derive(Debug, Clone, Default)]
pub struct AdjacencyList {
    groups: IndexMap<String, IndexMap<String, Edge>>,
}

impl AdjacencyList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `edge` under its type; an edge with the same (type, id) is replaced.
    pub fn add(&mut self, edge: Edge) {
        self.groups
            .entry(edge.typ().to_string())
            .or_default()
            .insert(edge.id().to_string(), edge);
    }

    /// Remove the edge identified by `id`; `None` if it is not here.
    pub fn delete(&mut self, id: &TypedId) -> Option<Edge> {
        let group = self.groups.get_mut(id.typ())?;
        let removed = group.swap_remove(id.id());
        if group.is_empty() {
            self.groups.swap_remove(id.typ());
        }
        removed
    }

    pub fn contains(&self, id: &TypedId) -> bool {
        self.groups
            .get(id.typ())
            .is_some_and(|group| group.contains_key(id.id()))
    }

    /// Call `f` for every edge of `edge_type` ([`ANY_TYPE`] for all types).
    /// Returns false if `f` stopped the iteration.
    pub fn range_by_type(&self, edge_type: &str, mut f: impl FnMut(&Edge) -> bool) -> bool {
        if edge_type == ANY_TYPE {
            for group in self.groups.values() {
                for edge in group.values() {
                    if !f(edge) {
                        return false;
                    }
                }
            }
        } else if let Some(group) = self.groups.get(edge_type) {
            for edge in group.values() {
                if !f(edge) {
                    return false;
                }
            }
        }
        true
    }

    /// Owned copy of the edges selected by `edge_type`.
    pub fn edges_of_type(&self, edge_type: &str) -> Vec<Edge> {
        let mut out = Vec::new();
        self.range_by_type(edge_type, |edge| {
            out.push(edge.clone());
            true
        });
        out
    }

    /// Edge types with at least one edge.
    pub fn edge_types(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(typ: &str, id: &str, to: &str) -> Edge {
        let mut e = Edge::new(typ, TypedId::new("user", "a"), TypedId::new("user", to));
        e.set_id(id.to_string());
        e
    }

    #[test]
    fn test_add_and_range_by_type() {
        let mut adj = AdjacencyList::new();
        adj.add(edge("friend", "1", "b"));
        adj.add(edge("friend", "2", "c"));
        adj.add(edge("pet", "3", "d"));

        assert_eq!(adj.len(), 3);
        assert_eq!(adj.edges_of_type("friend").len(), 2);
        assert_eq!(adj.edges_of_type("pet").len(), 1);
        assert_eq!(adj.edges_of_type(ANY_TYPE).len(), 3);
        assert!(adj.edges_of_type("owner").is_empty());

        let mut types = adj.edge_types();
        types.sort();
        assert_eq!(types, vec!["friend".to_string(), "pet".to_string()]);
    }

    #[test]
    fn test_add_replaces_same_id() {
        let mut adj = AdjacencyList::new();
        adj.add(edge("friend", "1", "b"));
        adj.add(edge("friend", "1", "c"));

        assert_eq!(adj.len(), 1);
        assert_eq!(adj.edges_of_type("friend")[0].to().id(), "c");
    }

    #[test]
    fn test_delete() {
        let mut adj = AdjacencyList::new();
        adj.add(edge("friend", "1", "b"));
        adj.add(edge("pet", "1", "d"));

        let removed = adj.delete(&TypedId::new("friend", "1")).unwrap();
        assert_eq!(removed.to().id(), "b");
        assert!(!adj.contains(&TypedId::new("friend", "1")));
        assert!(adj.contains(&TypedId::new("pet", "1")));
        assert_eq!(adj.edge_types(), vec!["pet".to_string()]);

        assert!(adj.delete(&TypedId::new("friend", "1")).is_none());
        assert!(adj.delete(&TypedId::new("owner", "9")).is_none());

        adj.delete(&TypedId::new("pet", "1"));
        assert!(adj.is_empty());
    }

    #[test]
    fn test_range_early_stop() {
        let mut adj = AdjacencyList::new();
        for i in 0..5 {
            adj.add(edge("friend", &i.to_string(), "b"));
        }
        let mut seen = 0;
        let completed = adj.range_by_type(ANY_TYPE, |_| {
            seen += 1;
            seen < 2
        });
        assert!(!completed);
        assert_eq!(seen, 2);
    }
}
