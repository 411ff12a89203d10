//! Exclusion filters: by node identity and by network.
//!
//! Both are backed by hash sets so the per-node cost stays constant however
//! many nodes an upload has already picked.

use std::collections::HashSet;
use std::fmt;

use crate::filter::NodeFilter;
use crate::types::{NodeId, SelectedNode};

/// Rejects nodes whose id is in the exclusion set.
#[derive(Debug, Clone, Default)]
pub struct ExcludedIds {
    ids: HashSet<NodeId>,
}

impl ExcludedIds {
    pub fn new(ids: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl NodeFilter for ExcludedIds {
    fn match_node(&self, node: &SelectedNode) -> bool {
        !self.ids.contains(&node.id)
    }
}

impl fmt::Display for ExcludedIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exclude_ids({})", self.ids.len())
    }
}

/// Rejects nodes on the same network as any of a set of reference nodes.
///
/// Typically built from the nodes already chosen for a segment, so that no two
/// pieces land behind the same network path. A reference node is rejected by
/// its own filter just like any other node on its subnet.
#[derive(Debug, Clone, Default)]
pub struct ExcludedNodeNetworks {
    networks: HashSet<String>,
}

impl ExcludedNodeNetworks {
    /// Exclude the networks of `nodes`.
    pub fn new(nodes: &[SelectedNode]) -> Self {
        Self::from_keys(nodes.iter().map(|n| n.last_net.clone()))
    }

    /// Exclude the given network keys directly.
    pub fn from_keys(keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            networks: keys.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

impl NodeFilter for ExcludedNodeNetworks {
    fn match_node(&self, node: &SelectedNode) -> bool {
        !self.networks.contains(&node.last_net)
    }
}

impl fmt::Display for ExcludedNodeNetworks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exclude_networks({})", self.networks.len())
    }
}

// --- tests -------------------------------------------------------------------
