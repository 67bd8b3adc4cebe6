//! Attribute payload for graph nodes and edges
//!
//! Values are a small dynamically-typed vocabulary ([`PropertyValue`]).
//! Entities carry them through [`Attributes`], a shared handle: every clone of a
//! node or edge points at the same map, so a patch made through one handle is
//! seen by the graph and by every other reader.

use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Reserved attribute key carrying an entity's type in raw maps.
pub const TYPE_KEY: &str = "_type";

/// Reserved attribute key carrying an entity's id in raw maps.
pub const ID_KEY: &str = "_id";

/// Reserved keys carrying an edge's endpoints and direction on the wire.
pub const FROM_KEY: &str = "_from";
pub const TO_KEY: &str = "_to";
pub const DIRECTED_KEY: &str = "_directed";

/// Property value type supporting multiple data types
///
/// Serialized untagged, so the JSON form is the plain JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<PropertyValue>),
    Map(HashMap<String, PropertyValue>),
}

impl PropertyValue {
    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// Get string value if this is a string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get integer value if this is an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get float value; integers widen
    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get boolean value if this is a boolean
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get array value if this is an array
    pub fn as_array(&self) -> Option<&Vec<PropertyValue>> {
        match self {
            PropertyValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Get map value if this is a map
    pub fn as_map(&self) -> Option<&HashMap<String, PropertyValue>> {
        match self {
            PropertyValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Get type name as string
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "String",
            PropertyValue::Integer(_) => "Integer",
            PropertyValue::Float(_) => "Float",
            PropertyValue::Boolean(_) => "Boolean",
            PropertyValue::Array(_) => "Array",
            PropertyValue::Map(_) => "Map",
            PropertyValue::Null => "Null",
        }
    }
}

// Convenience conversions
impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Integer(i as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(arr: Vec<PropertyValue>) -> Self {
        PropertyValue::Array(arr)
    }
}

impl From<HashMap<String, PropertyValue>> for PropertyValue {
    fn from(map: HashMap<String, PropertyValue>) -> Self {
        PropertyValue::Map(map)
    }
}

/// Property map for storing node and edge properties
pub type PropertyMap = HashMap<String, PropertyValue>;

/// Builds a [`PropertyMap`] from `key => value` pairs.
///
/// ```
/// let props = graphcache::props! { "_type" => "user", "name" => "coleman" };
/// assert_eq!(props.len(), 2);
/// ```
#[macro_export]
macro_rules! props {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut map = $crate::graph::PropertyMap::new();
        $(
            map.insert(
                ::std::string::String::from($key),
                $crate::graph::PropertyValue::from($value),
            );
        )*
        map
    }};
}

/// Shared, interior-mutable attribute bag.
///
/// Cloning is cheap and yields a handle onto the same map.
#[derive(Clone, Default)]
pub struct Attributes(Arc<RwLock<PropertyMap>>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: PropertyMap) -> Self {
        Attributes(Arc::new(RwLock::new(map)))
    }

    pub fn get(&self, key: &str) -> Option<PropertyValue> {
        self.0.read().get(key).cloned()
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.0.read().get(key).and_then(|v| v.as_string()).map(str::to_string)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.0.read().get(key).and_then(PropertyValue::as_integer)
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.0.read().get(key).and_then(PropertyValue::as_float)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.read().get(key).and_then(PropertyValue::as_boolean)
    }

    /// Set a property value, returning the previous one
    pub fn set(
        &self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.0.write().insert(key.into(), value.into())
    }

    pub fn remove(&self, key: &str) -> Option<PropertyValue> {
        self.0.write().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Merge `fields` into the bag: listed keys are overwritten, others kept.
    pub fn patch(&self, fields: PropertyMap) {
        let mut map = self.0.write();
        for (key, value) in fields {
            map.insert(key, value);
        }
    }

    /// Point-in-time copy of every attribute.
    pub fn snapshot(&self) -> PropertyMap {
        self.0.read().clone()
    }

    /// Run `f` against the current contents without copying them.
    pub fn with<R>(&self, f: impl FnOnce(&PropertyMap) -> R) -> R {
        f(&self.0.read())
    }

    /// First of `reserved` that is present as an attribute key.
    pub(crate) fn first_reserved_key(&self, reserved: &[&'static str]) -> Option<&'static str> {
        let map = self.0.read();
        reserved.iter().copied().find(|key| map.contains_key(*key))
    }

    /// Both handles point at the same underlying map.
    pub fn shares_with(&self, other: &Attributes) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.read().iter()).finish()
    }
}

impl From<PropertyMap> for Attributes {
    fn from(map: PropertyMap) -> Self {
        Attributes::from_map(map)
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.read().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        PropertyMap::deserialize(deserializer).map(Attributes::from_map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_value_types() {
        assert_eq!(
            PropertyValue::String("test".to_string()).type_name(),
            "String"
        );
        assert_eq!(PropertyValue::Integer(42).type_name(), "Integer");
        assert_eq!(PropertyValue::Float(3.5).type_name(), "Float");
        assert_eq!(PropertyValue::Boolean(true).type_name(), "Boolean");
        assert_eq!(PropertyValue::Array(vec![]).type_name(), "Array");
        assert_eq!(PropertyValue::Map(HashMap::new()).type_name(), "Map");
        assert_eq!(PropertyValue::Null.type_name(), "Null");
    }

    #[test]
    fn test_untagged_json_values() {
        let value: PropertyValue = serde_json::from_str("25").unwrap();
        assert_eq!(value, PropertyValue::Integer(25));
        let value: PropertyValue = serde_json::from_str("19.5").unwrap();
        assert_eq!(value, PropertyValue::Float(19.5));
        let value: PropertyValue = serde_json::from_str("\"charlie\"").unwrap();
        assert_eq!(value, PropertyValue::String("charlie".into()));
        let value: PropertyValue = serde_json::from_str("null").unwrap();
        assert!(value.is_null());
        let value: PropertyValue = serde_json::from_str("{\"a\": [1, true]}").unwrap();
        let inner = value.as_map().unwrap().get("a").unwrap().as_array().unwrap();
        assert_eq!(inner[1], PropertyValue::Boolean(true));

        assert_eq!(serde_json::to_string(&PropertyValue::from("x")).unwrap(), "\"x\"");
    }

    #[test]
    fn test_typed_accessors() {
        let attrs = Attributes::from_map(props! {
            "name" => "charlie",
            "weight" => 25i64,
            "ratio" => 0.5,
            "good" => true,
        });

        assert_eq!(attrs.get_string("name").as_deref(), Some("charlie"));
        assert_eq!(attrs.get_int("weight"), Some(25));
        assert_eq!(attrs.get_float("weight"), Some(25.0));
        assert_eq!(attrs.get_float("ratio"), Some(0.5));
        assert_eq!(attrs.get_bool("good"), Some(true));
        assert_eq!(attrs.get_int("name"), None);
        assert_eq!(attrs.get_string("missing"), None);
    }

    #[test]
    fn test_patch_updates_subset() {
        let attrs = Attributes::from_map(props! { "name" => "charlie", "weight" => 25i64 });
        attrs.patch(props! { "weight" => 19i64, "color" => "brown" });

        assert_eq!(attrs.get_int("weight"), Some(19));
        assert_eq!(attrs.get_string("name").as_deref(), Some("charlie"));
        assert_eq!(attrs.get_string("color").as_deref(), Some("brown"));
        assert_eq!(attrs.len(), 3);
    }

    #[test]
    fn test_clones_share_payload() {
        let attrs = Attributes::new();
        let other = attrs.clone();
        other.set("k", "v");

        assert!(attrs.shares_with(&other));
        assert_eq!(attrs.get_string("k").as_deref(), Some("v"));
        assert!(!attrs.shares_with(&Attributes::new()));

        assert_eq!(attrs.remove("k"), Some(PropertyValue::from("v")));
        assert!(other.is_empty());
    }

    #[test]
    fn test_first_reserved_key() {
        let attrs = Attributes::from_map(props! { "from" => "JFK", "_to" => "LAX" });
        assert_eq!(attrs.first_reserved_key(&[FROM_KEY, TO_KEY]), Some(TO_KEY));
        assert_eq!(attrs.first_reserved_key(&[TYPE_KEY, ID_KEY]), None);
    }
}
