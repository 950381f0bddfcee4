//! # Identity Resolution
//!
//! Decides when two nodes (or edges) from different networks denote the
//! same entity.
//!
//! - A node's identity key is the string form of its matching attribute;
//!   list values are joined with [`LIST_DELIMITER`].
//! - An edge's identity key is the unordered pair of its endpoint keys plus
//!   its interaction label: edges are undirected for matching.
//! - Nodes without a usable matching value have no key and never match.

use crate::network::NetworkRecord;
use crate::primitives::LIST_DELIMITER;
use crate::{AttributeValue, ElementKind, MergeError, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// KEYS
// =============================================================================

/// Canonical identity of a node across networks.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(pub String);

impl NodeKey {
    /// Get the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Undirected identity of an edge: `low <= high` always holds.
///
/// `K` is a [`NodeKey`] when comparing edges across networks, or a merged
/// [`NodeId`] once both endpoints have been resolved.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey<K> {
    pub low: K,
    pub high: K,
    pub interaction: String,
}

impl<K: Ord> EdgeKey<K> {
    /// Build a key from two endpoints in either order.
    #[must_use]
    pub fn new(a: K, b: K, interaction: impl Into<String>) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self {
            low,
            high,
            interaction: interaction.into(),
        }
    }

    /// Whether the edge touches `endpoint`.
    #[must_use]
    pub fn touches(&self, endpoint: &K) -> bool {
        &self.low == endpoint || &self.high == endpoint
    }
}

// =============================================================================
// MATCHING INDEX
// =============================================================================

/// Side index from identity key to merged node, next to the node arena.
#[derive(Debug, Clone, Default)]
pub struct MatchingIndex {
    entries: BTreeMap<NodeKey, NodeId>,
}

impl MatchingIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merged node currently registered for `key`.
    #[must_use]
    pub fn get(&self, key: &NodeKey) -> Option<NodeId> {
        self.entries.get(key).copied()
    }

    /// Register `key` for a merged node. The first registration wins.
    pub fn insert(&mut self, key: NodeKey, node: NodeId) {
        self.entries.entry(key).or_insert(node);
    }

    /// Remove a key so that later networks cannot match it.
    pub fn evict(&mut self, key: &NodeKey) -> Option<NodeId> {
        self.entries.remove(key)
    }

    /// Keep only keys contained in `keep`; returns the evicted nodes.
    pub fn retain_keys(&mut self, keep: &BTreeSet<NodeKey>) -> Vec<NodeId> {
        let dropped: Vec<NodeKey> = self
            .entries
            .keys()
            .filter(|key| !keep.contains(*key))
            .cloned()
            .collect();
        dropped
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .collect()
    }

    /// Whether `key` is registered.
    #[must_use]
    pub fn contains(&self, key: &NodeKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of registered keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no key is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered keys and nodes, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeKey, NodeId)> {
        self.entries.iter().map(|(k, v)| (k, *v))
    }
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Identity key computation and per-network id checks.
pub struct IdentityResolver;

impl IdentityResolver {
    /// Identity key of a matching-attribute value.
    ///
    /// Lists join their non-missing elements with the list delimiter.
    /// Missing markers, empty strings and empty lists produce no key.
    #[must_use]
    pub fn compute_node_key(value: &AttributeValue) -> Option<NodeKey> {
        if value.is_missing() {
            return None;
        }
        let key = match value {
            AttributeValue::List(items) => items
                .iter()
                .filter(|item| !item.is_missing())
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(LIST_DELIMITER),
            scalar => scalar.to_string(),
        };
        (!key.is_empty()).then_some(NodeKey(key))
    }

    /// Identity key of an edge from its endpoint keys and interaction label.
    #[must_use]
    pub fn compute_edge_key<K: Ord>(source: K, target: K, interaction: &str) -> EdgeKey<K> {
        EdgeKey::new(source, target, interaction)
    }

    /// Look a key up in the running index.
    #[must_use]
    pub fn match_node(key: &NodeKey, index: &MatchingIndex) -> Option<NodeId> {
        index.get(key)
    }

    /// Identity key of one source node, read from its matching column.
    #[must_use]
    pub fn source_node_key(network: &NetworkRecord, node_id: &str, column: &str) -> Option<NodeKey> {
        network
            .node_table
            .value(node_id, column)
            .and_then(Self::compute_node_key)
    }

    /// Interaction label of one source edge; empty when absent or missing.
    #[must_use]
    pub fn interaction_label(network: &NetworkRecord, edge_id: &str, column: &str) -> String {
        match network.edge_table.value(edge_id, column) {
            Some(value) if !value.is_missing() => value.to_string(),
            _ => String::new(),
        }
    }

    /// Identity keys of every keyed node of a network, by source node id.
    #[must_use]
    pub fn node_keys<'n>(network: &'n NetworkRecord, column: &str) -> BTreeMap<&'n str, NodeKey> {
        network
            .nodes
            .iter()
            .filter_map(|node| {
                Self::source_node_key(network, &node.id, column).map(|key| (node.id.as_str(), key))
            })
            .collect()
    }

    /// Identity keys of every edge of a network whose endpoints both have
    /// node keys.
    #[must_use]
    pub fn edge_keys(
        network: &NetworkRecord,
        node_keys: &BTreeMap<&str, NodeKey>,
        interaction_column: &str,
    ) -> BTreeSet<EdgeKey<NodeKey>> {
        network
            .edges
            .iter()
            .filter_map(|edge| {
                let source = node_keys.get(edge.source.as_str())?;
                let target = node_keys.get(edge.target.as_str())?;
                let interaction = Self::interaction_label(network, &edge.id, interaction_column);
                Some(Self::compute_edge_key(
                    source.clone(),
                    target.clone(),
                    &interaction,
                ))
            })
            .collect()
    }

    /// Check that node and edge ids are unique within a network and that
    /// every edge endpoint is a node of the same network.
    pub fn check_unique_ids(network: &NetworkRecord) -> Result<(), MergeError> {
        let mut node_ids = BTreeSet::new();
        for node in &network.nodes {
            if !node_ids.insert(node.id.as_str()) {
                return Err(MergeError::DuplicateElementId {
                    network: network.id.clone(),
                    kind: ElementKind::Node,
                    id: node.id.clone(),
                });
            }
        }

        let mut edge_ids = BTreeSet::new();
        for edge in &network.edges {
            if !edge_ids.insert(edge.id.as_str()) {
                return Err(MergeError::DuplicateElementId {
                    network: network.id.clone(),
                    kind: ElementKind::Edge,
                    id: edge.id.clone(),
                });
            }
            for endpoint in [&edge.source, &edge.target] {
                if !node_ids.contains(endpoint.as_str()) {
                    return Err(MergeError::InvalidInput(format!(
                        "edge '{}' of network {} references unknown node '{}'",
                        edge.id, network.id, endpoint
                    )));
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
