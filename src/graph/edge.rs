//! Edge implementation for the graph cache
//!
//! An edge has its own (type, id), the [`TypedId`]s of its endpoints, a
//! directionality flag and a shared attribute payload.

use super::node::{take_identity, Entity};
use super::property::{
    Attributes, PropertyMap, PropertyValue, DIRECTED_KEY, FROM_KEY, ID_KEY, TO_KEY, TYPE_KEY,
};
use super::store::{GraphError, GraphResult};
use super::types::{unstorable_type, TypedId};
use serde::{Deserialize, Serialize};

/// Keys an edge payload may not use; they carry structure on the wire.
const RESERVED_KEYS: [&str; 5] = [TYPE_KEY, ID_KEY, FROM_KEY, TO_KEY, DIRECTED_KEY];

/// A relationship between two nodes
///
/// `directed` is false for edges created as one half of a mutual
/// connection; traversal is always by the stored `from`/`to` orientation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "EdgeRecord", from = "EdgeRecord")]
pub struct Edge {
    id: TypedId,
    from: TypedId,
    to: TypedId,
    directed: bool,
    attributes: Attributes,
}

impl Edge {
    /// Create a new directed edge without an id.
    pub fn new(edge_type: impl Into<String>, from: TypedId, to: TypedId) -> Self {
        Edge {
            id: TypedId::unassigned(edge_type),
            from,
            to,
            directed: true,
            attributes: Attributes::new(),
        }
    }

    /// Create a new edge with a caller-chosen id and properties
    pub fn with_properties(
        id: TypedId,
        from: TypedId,
        to: TypedId,
        properties: PropertyMap,
    ) -> Self {
        Edge {
            id,
            from,
            to,
            directed: true,
            attributes: Attributes::from_map(properties),
        }
    }

    /// Build an edge between `from` and `to` from a raw map carrying `_type`
    /// (required) and `_id` (optional). The other reserved keys are refused.
    pub fn from_attributes(from: TypedId, to: TypedId, mut raw: PropertyMap) -> GraphResult<Self> {
        let id = take_identity(&mut raw)?;
        if let Some(key) = [FROM_KEY, TO_KEY, DIRECTED_KEY]
            .into_iter()
            .find(|key| raw.contains_key(*key))
        {
            return Err(GraphError::InvalidAttributes(format!(
                "edge {} uses reserved key {} as an attribute",
                id, key
            )));
        }
        Ok(Edge::with_properties(id, from, to, raw))
    }

    /// Marks the edge as one half of a mutual connection.
    pub fn undirected(mut self) -> Self {
        self.directed = false;
        self
    }

    pub fn from(&self) -> &TypedId {
        &self.from
    }

    pub fn to(&self) -> &TypedId {
        &self.to
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Copy of this edge with its own attribute payload.
    pub fn deep_clone(&self) -> Self {
        Edge {
            id: self.id.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
            directed: self.directed,
            attributes: Attributes::from_map(self.attributes.snapshot()),
        }
    }

    /// Check that the type is concrete, both endpoints are filled in and the
    /// payload uses no reserved key.
    pub fn validate(&self) -> GraphResult<()> {
        if let Some(reason) = unstorable_type(self.id.typ()) {
            return Err(GraphError::InvalidEdge(format!("edge {}: {}", self.id, reason)));
        }
        if !self.from.is_complete() {
            return Err(GraphError::InvalidEdge(format!(
                "edge {} has an incomplete from endpoint",
                self.id
            )));
        }
        if !self.to.is_complete() {
            return Err(GraphError::InvalidEdge(format!(
                "edge {} has an incomplete to endpoint",
                self.id
            )));
        }
        if let Some(key) = self.attributes.first_reserved_key(&RESERVED_KEYS) {
            return Err(GraphError::InvalidAttributes(format!(
                "edge {} uses reserved key {} as an attribute",
                self.id, key
            )));
        }
        Ok(())
    }

    /// Set a property value
    pub fn set_property(
        &self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.attributes.set(key, value)
    }

    /// Get a property value
    pub fn get_property(&self, key: &str) -> Option<PropertyValue> {
        self.attributes.get(key)
    }
}

impl Entity for Edge {
    fn typed_id(&self) -> &TypedId {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id.set_id(id);
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Edge {}

impl std::hash::Hash for Edge {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

fn default_directed() -> bool {
    true
}

/// Wire shape of an edge: reserved structural keys plus flattened attributes.
#[derive(Serialize, Deserialize)]
struct EdgeRecord {
    #[serde(rename = "_type")]
    typ: String,
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(rename = "_from")]
    from: TypedId,
    #[serde(rename = "_to")]
    to: TypedId,
    #[serde(rename = "_directed", default = "default_directed")]
    directed: bool,
    #[serde(flatten)]
    attributes: PropertyMap,
}

impl From<Edge> for EdgeRecord {
    fn from(edge: Edge) -> Self {
        let mut attributes = edge.attributes.snapshot();
        for key in RESERVED_KEYS {
            attributes.remove(key);
        }
        EdgeRecord {
            typ: edge.id.typ().to_string(),
            id: Some(edge.id.id().to_string()),
            from: edge.from,
            to: edge.to,
            directed: edge.directed,
            attributes,
        }
    }
}

impl From<EdgeRecord> for Edge {
    fn from(record: EdgeRecord) -> Self {
        Edge {
            id: TypedId::new(record.typ, record.id.unwrap_or_default()),
            from: record.from,
            to: record.to,
            directed: record.directed,
            attributes: Attributes::from_map(record.attributes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ANY_TYPE;
    use crate::props;

    fn user(id: &str) -> TypedId {
        TypedId::new("user", id)
    }

    #[test]
    fn test_create_edge() {
        let edge = Edge::new("friend", user("a"), user("b"));

        assert_eq!(edge.typ(), "friend");
        assert_eq!(edge.id(), "");
        assert_eq!(edge.from(), &user("a"));
        assert_eq!(edge.to(), &user("b"));
        assert!(edge.is_directed());
        assert!(!edge.clone().undirected().is_directed());
    }

    #[test]
    fn test_edge_validation() {
        assert!(Edge::new("friend", user("a"), user("b")).validate().is_ok());

        let err = Edge::new("", user("a"), user("b")).validate().unwrap_err();
        assert!(err.is_validation());

        let err = Edge::new("friend", TypedId::default(), user("b")).validate().unwrap_err();
        assert!(err.is_validation());

        let err = Edge::new("friend", user("a"), TypedId::unassigned("user"))
            .validate()
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_edge_validation_rejects_wildcard_type() {
        let err = Edge::new(ANY_TYPE, user("a"), user("b")).validate().unwrap_err();
        assert!(matches!(err, GraphError::InvalidEdge(_)));
    }

    #[test]
    fn test_edge_validation_rejects_reserved_payload_keys() {
        let edge = Edge::new("flight", user("a"), user("b"));
        edge.set_property("from", "JFK");
        assert!(edge.validate().is_ok());

        edge.set_property(FROM_KEY, "JFK");
        let err = edge.validate().unwrap_err();
        assert!(matches!(err, GraphError::InvalidAttributes(_)));

        let err = Edge::from_attributes(
            user("a"),
            user("b"),
            props! { "_type" => "flight", "_directed" => false },
        )
        .unwrap_err();
        assert!(matches!(err, GraphError::InvalidAttributes(_)));
    }

    #[test]
    fn test_edge_from_attributes() {
        let edge = Edge::from_attributes(
            user("a"),
            TypedId::new("dog", "charlie"),
            props! { "_type" => "pet", "name" => "charlie" },
        )
        .unwrap();

        assert_eq!(edge.typ(), "pet");
        assert_eq!(edge.id(), "");
        assert_eq!(edge.attributes().get_string("name").as_deref(), Some("charlie"));
        assert!(!edge.attributes().contains("_type"));
    }

    #[test]
    fn test_edge_json_shape() {
        let edge = Edge::with_properties(
            TypedId::new("friend", "e1"),
            user("a"),
            user("b"),
            props! { "since" => 2020i64 },
        )
        .undirected();

        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "_type": "friend",
                "_id": "e1",
                "_from": {"type": "user", "id": "a"},
                "_to": {"type": "user", "id": "b"},
                "_directed": false,
                "since": 2020,
            })
        );

        let back: Edge = serde_json::from_value(json).unwrap();
        assert_eq!(back, edge);
        assert!(!back.is_directed());
        assert_eq!(back.get_property("since"), Some(PropertyValue::Integer(2020)));
    }

    #[test]
    fn test_edge_json_keeps_structural_looking_attributes() {
        let edge = Edge::with_properties(
            TypedId::new("flight", "f1"),
            TypedId::new("airport", "jfk"),
            TypedId::new("airport", "lax"),
            props! { "from" => "JFK", "to" => "LAX", "directed" => "north" },
        );

        let json = serde_json::to_string(&edge).unwrap();
        let back: Edge = serde_json::from_str(&json).unwrap();

        assert_eq!(back.attributes().get_string("from").as_deref(), Some("JFK"));
        assert_eq!(back.attributes().get_string("to").as_deref(), Some("LAX"));
        assert_eq!(back.attributes().get_string("directed").as_deref(), Some("north"));
        assert_eq!(back.from(), &TypedId::new("airport", "jfk"));
        assert!(back.is_directed());
    }

    #[test]
    fn test_edge_json_directed_defaults_true() {
        let json = serde_json::json!({
            "_type": "owner",
            "_id": null,
            "_from": {"type": "dog", "id": "charlie"},
            "_to": {"type": "user", "id": "a"},
        });
        let edge: Edge = serde_json::from_value(json).unwrap();
        assert!(edge.is_directed());
        assert_eq!(edge.id(), "");
    }
}
