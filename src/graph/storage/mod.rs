//! Backing maps for the graph indices

pub mod namespaced;

pub use namespaced::NamespacedMap;
