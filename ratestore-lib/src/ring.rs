//! Cluster membership as seen by the rate store.

use crate::config::NodeConfig;
use crate::error::{RateStoreError, Result};

/// Network address of a storage node, used as the client pool key
pub type NodeAddr = String;

/// Class of operation a node set is requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

/// Source of the current healthy node set
pub trait Membership: Send + Sync {
    fn healthy_nodes(&self, op: Operation) -> Result<Vec<NodeAddr>>;
}

/// Fixed node list taken from configuration
#[derive(Debug, Clone)]
pub struct StaticMembership {
    nodes: Vec<NodeConfig>,
}

impl StaticMembership {
    pub fn new(nodes: Vec<NodeConfig>) -> Self {
        Self { nodes }
    }
}

impl Membership for StaticMembership {
    fn healthy_nodes(&self, _op: Operation) -> Result<Vec<NodeAddr>> {
        let healthy: Vec<NodeAddr> = self
            .nodes
            .iter()
            .filter(|n| n.healthy)
            .map(|n| n.address.clone())
            .collect();

        if healthy.is_empty() && !self.nodes.is_empty() {
            return Err(RateStoreError::Membership(format!(
                "none of the {} configured nodes is healthy",
                self.nodes.len()
            )));
        }

        Ok(healthy)
    }
}
