//! Core type definitions for the graph cache

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wildcard type filter: matches every node or edge type.
///
/// Accepted anywhere a type or namespace is taken as a filter
/// (`range`, `range_node_types`, `edges_from`, ...).
pub const ANY_TYPE: &str = "*";

/// Why `typ` cannot be the type of a stored node or edge, if it cannot.
///
/// The wildcard is a filter, never a type: an entity stored under it could
/// not be selected on its own by a type-scoped scan.
pub(crate) fn unstorable_type(typ: &str) -> Option<&'static str> {
    if typ.is_empty() {
        Some("empty type")
    } else if typ == ANY_TYPE {
        Some("the wildcard type is reserved for filters")
    } else {
        None
    }
}

/// Identifies a node or edge: an id that is unique within its type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord, Default)]
pub struct TypedId {
    #[serde(rename = "type")]
    typ: String,
    id: String,
}

impl TypedId {
    pub fn new(typ: impl Into<String>, id: impl Into<String>) -> Self {
        TypedId {
            typ: typ.into(),
            id: id.into(),
        }
    }

    /// A typed id whose id part is still unassigned.
    pub fn unassigned(typ: impl Into<String>) -> Self {
        TypedId::new(typ, String::new())
    }

    pub fn typ(&self) -> &str {
        &self.typ
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Both the type and the id are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.typ.is_empty() && !self.id.is_empty()
    }
}

impl fmt::Display for TypedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.typ, self.id)
    }
}

impl<T: Into<String>, I: Into<String>> From<(T, I)> for TypedId {
    fn from((typ, id): (T, I)) -> Self {
        TypedId::new(typ, id)
    }
}

/// Source of fresh ids for nodes and edges added without one.
///
/// Ids must be unique for the lifetime of the process.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random UUID v4 ids, rendered without hyphens.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}
