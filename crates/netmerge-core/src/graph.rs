//! # Merged Graph
//!
//! Output records of a merge and the arena they are built in.
//!
//! `GraphBuilder` keeps nodes and edges in dense vectors addressed by
//! [`NodeId`]/[`EdgeId`], plus a [`MatchingIndex`] from identity key to node
//! and an edge index from resolved endpoint pair to edge. Removal only
//! tombstones a slot; `finish` compacts the arena so the emitted record has
//! sequential ids starting at 0.

use crate::identity::{EdgeKey, MatchingIndex, NodeKey};
use crate::policy::ConflictPolicy;
use crate::{AttributeMap, AttributeValue, ColumnRef, EdgeId, MergeError, NetworkId, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// OUTPUT RECORDS
// =============================================================================

/// A node of a merged graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedNode {
    pub id: NodeId,
}

/// An edge of a merged graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
}

/// Merged topology. Element ids equal their index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedGraph {
    pub nodes: Vec<MergedNode>,
    pub edges: Vec<MergedEdge>,
}

impl MergedGraph {
    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges touching `node`, in id order.
    pub fn incident_edges(&self, node: NodeId) -> impl Iterator<Item = &MergedEdge> {
        self.edges
            .iter()
            .filter(move |e| e.source == node || e.target == node)
    }
}

/// Attribute table of a merged graph, keyed by merged element id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedTable {
    pub columns: Vec<ColumnRef>,
    pub rows: BTreeMap<u64, AttributeMap>,
}

impl MergedTable {
    /// Create an empty table with the given columns.
    #[must_use]
    pub fn new(columns: Vec<ColumnRef>) -> Self {
        Self {
            columns,
            rows: BTreeMap::new(),
        }
    }

    /// Attribute row of an element.
    #[must_use]
    pub fn row(&self, id: u64) -> Option<&AttributeMap> {
        self.rows.get(&id)
    }

    /// A single cell.
    #[must_use]
    pub fn value(&self, id: u64, column: &str) -> Option<&AttributeValue> {
        self.rows.get(&id)?.get(column)
    }
}

/// The result of a merge: a new network with fresh ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedGraphRecord {
    pub id: NetworkId,
    pub graph: MergedGraph,
    pub node_table: MergedTable,
    pub edge_table: MergedTable,
}

impl MergedGraphRecord {
    /// Number of merged nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of merged edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// First node whose `column` holds `value`.
    #[must_use]
    pub fn find_node(&self, column: &str, value: &AttributeValue) -> Option<NodeId> {
        self.graph
            .nodes
            .iter()
            .find(|n| self.node_table.value(n.id.0, column) == Some(value))
            .map(|n| n.id)
    }

    /// Values of `column` over all nodes, in id order. Nodes without the
    /// column are skipped.
    #[must_use]
    pub fn node_values(&self, column: &str) -> Vec<&AttributeValue> {
        self.graph
            .nodes
            .iter()
            .filter_map(|n| self.node_table.value(n.id.0, column))
            .collect()
    }
}

// =============================================================================
// BUILDER
// =============================================================================

#[derive(Debug, Clone)]
struct NodeSlot {
    key: Option<NodeKey>,
    attributes: AttributeMap,
    sources: BTreeSet<NetworkId>,
    live: bool,
}

#[derive(Debug, Clone)]
struct EdgeSlot {
    key: EdgeKey<NodeId>,
    source: NodeId,
    target: NodeId,
    attributes: AttributeMap,
    sources: BTreeSet<NetworkId>,
    live: bool,
}

/// Where an inserted element ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement<I> {
    /// A new merged element was created.
    Created(I),
    /// The element was absorbed into an existing merged element.
    Absorbed(I),
}

impl<I: Copy> Placement<I> {
    /// The merged element id.
    #[must_use]
    pub fn id(self) -> I {
        match self {
            Self::Created(id) | Self::Absorbed(id) => id,
        }
    }

    /// Whether the element matched an existing one.
    #[must_use]
    pub fn is_absorbed(self) -> bool {
        matches!(self, Self::Absorbed(_))
    }
}

/// Tombstoning arena for a merged graph under construction.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    nodes: Vec<NodeSlot>,
    edges: Vec<EdgeSlot>,
    index: MatchingIndex,
    edge_index: BTreeMap<EdgeKey<NodeId>, EdgeId>,
    merge_within_network: bool,
}

impl GraphBuilder {
    /// Create an empty builder.
    ///
    /// With `merge_within_network`, elements of one source network that share
    /// an identity are folded together; otherwise a merged element absorbs
    /// at most one element per source network.
    #[must_use]
    pub fn new(merge_within_network: bool) -> Self {
        Self {
            merge_within_network,
            ..Self::default()
        }
    }

    /// The running identity index.
    #[must_use]
    pub fn index(&self) -> &MatchingIndex {
        &self.index
    }

    /// Insert a node, or fold it into the node already registered for `key`.
    pub fn add_node(
        &mut self,
        key: Option<NodeKey>,
        network: &NetworkId,
        attributes: AttributeMap,
    ) -> Result<Placement<NodeId>, MergeError> {
        if let Some(existing) = key.as_ref().and_then(|k| self.index.get(k)) {
            let within = self.merge_within_network;
            if let Some(slot) = self.node_slot_mut(existing) {
                if within || !slot.sources.contains(network) {
                    ConflictPolicy::merge_into(&mut slot.attributes, &attributes)?;
                    slot.sources.insert(network.clone());
                    return Ok(Placement::Absorbed(existing));
                }
            }
        }

        let id = NodeId(self.nodes.len() as u64);
        if let Some(k) = &key {
            self.index.insert(k.clone(), id);
        }
        self.nodes.push(NodeSlot {
            key,
            attributes,
            sources: BTreeSet::from([network.clone()]),
            live: true,
        });
        Ok(Placement::Created(id))
    }

    /// Insert an edge between two merged nodes, or fold it into the edge
    /// already registered for the same undirected pair and interaction.
    pub fn add_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        interaction: &str,
        network: &NetworkId,
        attributes: AttributeMap,
    ) -> Result<Placement<EdgeId>, MergeError> {
        if !self.is_live(source) || !self.is_live(target) {
            return Err(MergeError::InvalidInput(format!(
                "edge endpoint {} or {} is not a live merged node",
                source.0, target.0
            )));
        }

        let key = EdgeKey::new(source, target, interaction);
        if let Some(existing) = self.edge_index.get(&key).copied() {
            let within = self.merge_within_network;
            if let Some(slot) = self.edges.get_mut(existing.0 as usize) {
                if slot.live && (within || !slot.sources.contains(network)) {
                    ConflictPolicy::merge_into(&mut slot.attributes, &attributes)?;
                    slot.sources.insert(network.clone());
                    return Ok(Placement::Absorbed(existing));
                }
            }
        }

        let id = EdgeId(self.edges.len() as u64);
        self.edge_index.entry(key.clone()).or_insert(id);
        self.edges.push(EdgeSlot {
            key,
            source,
            target,
            attributes,
            sources: BTreeSet::from([network.clone()]),
            live: true,
        });
        Ok(Placement::Created(id))
    }

    /// Whether `node` exists and has not been removed.
    #[must_use]
    pub fn is_live(&self, node: NodeId) -> bool {
        self.nodes.get(node.0 as usize).is_some_and(|slot| slot.live)
    }

    /// Tombstone a node together with its incident edges.
    pub fn remove_node(&mut self, node: NodeId) {
        let Some(slot) = self.node_slot_mut(node) else {
            return;
        };
        slot.live = false;
        if let Some(key) = slot.key.clone() {
            if self.index.get(&key) == Some(node) {
                self.index.evict(&key);
            }
        }
        for edge in &mut self.edges {
            if edge.live && edge.key.touches(&node) {
                edge.live = false;
                self.edge_index.remove(&edge.key);
            }
        }
    }

    /// Remove every node whose identity key is not in `keep`, keyless nodes
    /// included. Returns the number of nodes removed.
    pub fn retain_nodes_by_key(&mut self, keep: &BTreeSet<NodeKey>) -> usize {
        self.index.retain_keys(keep);
        let doomed: Vec<NodeId> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.live && slot.key.as_ref().is_none_or(|k| !keep.contains(k)))
            .map(|(i, _)| NodeId(i as u64))
            .collect();
        for node in &doomed {
            self.remove_node(*node);
        }
        doomed.len()
    }

    /// Number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.live).count()
    }

    /// Number of live edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.iter().filter(|slot| slot.live).count()
    }

    /// Compact the arena into an output record with sequential ids.
    #[must_use]
    pub fn finish(
        self,
        id: NetworkId,
        node_columns: Vec<ColumnRef>,
        edge_columns: Vec<ColumnRef>,
    ) -> MergedGraphRecord {
        let mut graph = MergedGraph::default();
        let mut node_table = MergedTable::new(node_columns);
        let mut edge_table = MergedTable::new(edge_columns);
        let mut remap: BTreeMap<NodeId, NodeId> = BTreeMap::new();

        for (old, slot) in self.nodes.into_iter().enumerate() {
            if !slot.live {
                continue;
            }
            let new = NodeId(graph.nodes.len() as u64);
            remap.insert(NodeId(old as u64), new);
            graph.nodes.push(MergedNode { id: new });
            node_table.rows.insert(new.0, slot.attributes);
        }

        for slot in self.edges.into_iter().filter(|slot| slot.live) {
            let (Some(source), Some(target)) = (remap.get(&slot.source), remap.get(&slot.target))
            else {
                continue;
            };
            let new = EdgeId(graph.edges.len() as u64);
            graph.edges.push(MergedEdge {
                id: new,
                source: *source,
                target: *target,
            });
            edge_table.rows.insert(new.0, slot.attributes);
        }

        MergedGraphRecord {
            id,
            graph,
            node_table,
            edge_table,
        }
    }

    fn node_slot_mut(&mut self, node: NodeId) -> Option<&mut NodeSlot> {
        self.nodes.get_mut(node.0 as usize).filter(|slot| slot.live)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Option<NodeKey> {
        Some(NodeKey(s.to_string()))
    }

    fn named(name: &str) -> AttributeMap {
        AttributeMap::from([("name".to_string(), AttributeValue::from(name))])
    }

    #[test]
    fn matching_keys_absorb_across_networks() {
        let a = NetworkId::new("a");
        let b = NetworkId::new("b");
        let mut builder = GraphBuilder::new(false);

        let first = builder.add_node(key("x"), &a, named("x")).expect("add");
        let second = builder.add_node(key("x"), &b, named("x")).expect("add");
        assert_eq!(first, Placement::Created(NodeId(0)));
        assert_eq!(second, Placement::Absorbed(NodeId(0)));
        assert_eq!(builder.node_count(), 1);
    }

    #[test]
    fn duplicates_within_network_need_folding_flag() {
        let a = NetworkId::new("a");

        let mut separate = GraphBuilder::new(false);
        separate.add_node(key("x"), &a, named("x")).expect("add");
        let dup = separate.add_node(key("x"), &a, named("x")).expect("add");
        assert!(!dup.is_absorbed());
        assert_eq!(separate.node_count(), 2);

        let mut folded = GraphBuilder::new(true);
        folded.add_node(key("x"), &a, named("x")).expect("add");
        let dup = folded.add_node(key("x"), &a, named("x")).expect("add");
        assert!(dup.is_absorbed());
        assert_eq!(folded.node_count(), 1);
    }

    #[test]
    fn keyless_nodes_never_match() {
        let a = NetworkId::new("a");
        let b = NetworkId::new("b");
        let mut builder = GraphBuilder::new(true);
        builder.add_node(None, &a, AttributeMap::new()).expect("add");
        builder.add_node(None, &b, AttributeMap::new()).expect("add");
        assert_eq!(builder.node_count(), 2);
        assert!(builder.index().is_empty());
    }

    #[test]
    fn reversed_edges_fold_into_one() {
        let a = NetworkId::new("a");
        let b = NetworkId::new("b");
        let mut builder = GraphBuilder::new(false);
        let x = builder.add_node(key("x"), &a, named("x")).expect("x").id();
        let y = builder.add_node(key("y"), &a, named("y")).expect("y").id();

        builder.add_edge(x, y, "pp", &a, AttributeMap::new()).expect("e1");
        let back = builder.add_edge(y, x, "pp", &b, AttributeMap::new()).expect("e2");
        let other = builder.add_edge(y, x, "pd", &b, AttributeMap::new()).expect("e3");
        assert!(back.is_absorbed());
        assert!(!other.is_absorbed());
        assert_eq!(builder.edge_count(), 2);
    }

    #[test]
    fn edge_to_removed_node_is_rejected() {
        let a = NetworkId::new("a");
        let mut builder = GraphBuilder::new(false);
        let x = builder.add_node(key("x"), &a, named("x")).expect("x").id();
        let y = builder.add_node(key("y"), &a, named("y")).expect("y").id();
        builder.remove_node(y);
        assert!(builder.add_edge(x, y, "", &a, AttributeMap::new()).is_err());
    }

    #[test]
    fn finish_compacts_ids_and_drops_dangling_edges() {
        let a = NetworkId::new("a");
        let mut builder = GraphBuilder::new(false);
        let x = builder.add_node(key("x"), &a, named("x")).expect("x").id();
        let y = builder.add_node(key("y"), &a, named("y")).expect("y").id();
        let z = builder.add_node(key("z"), &a, named("z")).expect("z").id();
        builder.add_edge(x, y, "", &a, AttributeMap::new()).expect("xy");
        builder.add_edge(y, z, "", &a, AttributeMap::new()).expect("yz");

        builder.remove_node(x);
        assert!(!builder.index().contains(&NodeKey("x".to_string())));

        let record = builder.finish(
            NetworkId::new("out"),
            vec![ColumnRef::new("name", crate::ValueType::STRING)],
            Vec::new(),
        );
        assert_eq!(record.node_count(), 2);
        assert_eq!(record.edge_count(), 1);
        assert_eq!(record.graph.nodes[0].id, NodeId(0));
        assert_eq!(record.node_table.value(0, "name"), Some(&"y".into()));
        assert_eq!(
            record.graph.edges[0],
            MergedEdge {
                id: EdgeId(0),
                source: NodeId(0),
                target: NodeId(1)
            }
        );
        assert_eq!(record.find_node("name", &"z".into()), Some(NodeId(1)));
        assert_eq!(record.graph.incident_edges(NodeId(0)).count(), 1);
    }

    #[test]
    fn retain_by_key_removes_keyless_and_dropped() {
        let a = NetworkId::new("a");
        let mut builder = GraphBuilder::new(false);
        builder.add_node(key("x"), &a, named("x")).expect("x");
        builder.add_node(key("y"), &a, named("y")).expect("y");
        builder.add_node(None, &a, AttributeMap::new()).expect("keyless");

        let removed = builder.retain_nodes_by_key(&BTreeSet::from([NodeKey("y".to_string())]));
        assert_eq!(removed, 2);
        assert_eq!(builder.node_count(), 1);
        assert_eq!(builder.index().len(), 1);
    }
}
