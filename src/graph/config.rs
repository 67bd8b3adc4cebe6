//! Graph configuration

use super::store::{GraphError, GraphResult};
use serde::{Deserialize, Serialize};

/// Which incident edges `del_node` removes along with the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeMode {
    /// Outbound and inbound edges.
    #[default]
    Both,
    /// Only edges whose `from` endpoint is the deleted node. Inbound edges
    /// stay in the graph and keep pointing at the missing node.
    Outbound,
}

/// How `import` treats edges it cannot add.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Validate the whole snapshot first; apply nothing if any edge is bad.
    #[default]
    Strict,
    /// Apply everything that is valid and report the rejected edges.
    BestEffort,
}

/// Graph configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Cascade rule for node deletion
    pub cascade: CascadeMode,
    /// Failure policy for snapshot import
    pub import_mode: ImportMode,
    /// Shards per namespace map (power of two, > 1); `None` = dashmap default
    pub shard_amount: Option<usize>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            cascade: CascadeMode::Both,
            import_mode: ImportMode::Strict,
            shard_amount: None,
        }
    }
}

impl GraphConfig {
    pub fn with_cascade(mut self, cascade: CascadeMode) -> Self {
        self.cascade = cascade;
        self
    }

    pub fn with_import_mode(mut self, import_mode: ImportMode) -> Self {
        self.import_mode = import_mode;
        self
    }

    pub fn with_shard_amount(mut self, shard_amount: usize) -> Self {
        self.shard_amount = Some(shard_amount);
        self
    }

    pub fn validate(&self) -> GraphResult<()> {
        if let Some(shards) = self.shard_amount {
            if shards < 2 || !shards.is_power_of_two() {
                return Err(GraphError::InvalidConfig(format!(
                    "shard_amount must be a power of two greater than 1, got {}",
                    shards
                )));
            }
        }
        Ok(())
    }
}
