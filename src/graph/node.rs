//! Node implementation for the graph cache
//!
//! A node is a [`TypedId`] plus a shared [`Attributes`] payload. The
//! [`Entity`] trait is the capability set the graph relies on for both nodes
//! and edges: report a type, read and assign an id, expose attributes.

use super::property::{Attributes, PropertyMap, PropertyValue, ID_KEY, TYPE_KEY};
use super::store::{GraphError, GraphResult};
use super::types::{unstorable_type, TypedId};
use serde::{Deserialize, Serialize};

/// Capabilities shared by everything the graph stores.
pub trait Entity {
    fn typed_id(&self) -> &TypedId;

    /// Assigns the id part; called by the graph when the id is empty.
    fn set_id(&mut self, id: String);

    fn attributes(&self) -> &Attributes;

    fn typ(&self) -> &str {
        self.typed_id().typ()
    }

    fn id(&self) -> &str {
        self.typed_id().id()
    }
}

/// A node in the graph
///
/// Clones share the same attribute payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "NodeRecord", from = "NodeRecord")]
pub struct Node {
    id: TypedId,
    attributes: Attributes,
}

impl Node {
    /// Create a node of `typ` without an id; the graph assigns one on insert.
    pub fn new(typ: impl Into<String>) -> Self {
        Node {
            id: TypedId::unassigned(typ),
            attributes: Attributes::new(),
        }
    }

    pub fn with_id(typ: impl Into<String>, id: impl Into<String>) -> Self {
        Node {
            id: TypedId::new(typ, id),
            attributes: Attributes::new(),
        }
    }

    pub fn with_properties(id: TypedId, properties: PropertyMap) -> Self {
        Node {
            id,
            attributes: Attributes::from_map(properties),
        }
    }

    /// Build a node from a raw map whose `_type` (required) and `_id`
    /// (optional) entries carry its identity. The reserved keys are not
    /// kept as attributes.
    pub fn from_attributes(mut raw: PropertyMap) -> GraphResult<Self> {
        let id = take_identity(&mut raw)?;
        Ok(Node::with_properties(id, raw))
    }

    /// Check that the node can be stored: a concrete type, and no reserved
    /// key in the payload (the wire format would drop it).
    pub fn validate(&self) -> GraphResult<()> {
        if let Some(reason) = unstorable_type(self.id.typ()) {
            return Err(GraphError::InvalidNode(format!("node {}: {}", self.id, reason)));
        }
        if let Some(key) = self.attributes.first_reserved_key(&[TYPE_KEY, ID_KEY]) {
            return Err(GraphError::InvalidAttributes(format!(
                "node {} uses reserved key {} as an attribute",
                self.id, key
            )));
        }
        Ok(())
    }

    /// Copy of this node with its own attribute payload.
    pub fn deep_clone(&self) -> Self {
        Node::with_properties(self.id.clone(), self.attributes.snapshot())
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

    /// Check if property exists
    pub fn has_property(&self, key: &str) -> bool {
        self.attributes.contains(key)
    }

    /// Get number of properties
    pub fn property_count(&self) -> usize {
        self.attributes.len()
    }
}

impl Entity for Node {
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

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Pulls `_type` and `_id` out of a raw attribute map.
pub(super) fn take_identity(raw: &mut PropertyMap) -> GraphResult<TypedId> {
    let typ = match raw.remove(TYPE_KEY) {
        Some(PropertyValue::String(s)) if !s.is_empty() => s,
        Some(other) => {
            return Err(GraphError::InvalidAttributes(format!(
                "{} must be a non-empty string, got {}",
                TYPE_KEY,
                other.type_name()
            )))
        }
        None => return Err(GraphError::InvalidAttributes(format!("missing {}", TYPE_KEY))),
    };
    let id = match raw.remove(ID_KEY) {
        Some(PropertyValue::String(s)) => s,
        Some(PropertyValue::Null) | None => String::new(),
        Some(other) => {
            return Err(GraphError::InvalidAttributes(format!(
                "{} must be a string, got {}",
                ID_KEY,
                other.type_name()
            )))
        }
    };
    Ok(TypedId::new(typ, id))
}

/// Wire shape of a node: identity plus flattened attributes.
#[derive(Serialize, Deserialize)]
struct NodeRecord {
    #[serde(rename = "_type")]
    typ: String,
    /// Missing or null means "let the graph assign one".
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(flatten)]
    attributes: PropertyMap,
}

impl From<Node> for NodeRecord {
    fn from(node: Node) -> Self {
        let mut attributes = node.attributes.snapshot();
        attributes.remove(TYPE_KEY);
        attributes.remove(ID_KEY);
        NodeRecord {
            typ: node.id.typ().to_string(),
            id: Some(node.id.id().to_string()),
            attributes,
        }
    }
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        let id = TypedId::new(record.typ, record.id.unwrap_or_default());
        Node::with_properties(id, record.attributes)
    }
}
