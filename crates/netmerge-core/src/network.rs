//! # Source Networks
//!
//! The read-only input records of a merge: one `NetworkRecord` per source
//! network, holding its topology, its node and edge attribute tables and
//! its summary metadata.
//!
//! Records are built by collaborators (file loaders, caches) before a merge
//! and are never mutated by the engine.

use crate::{AttributeMap, AttributeValue, ColumnRef, NetworkId, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// TOPOLOGY
// =============================================================================

/// A node of a source network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceNode {
    pub id: String,
}

/// An edge of a source network. Endpoints are source node ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

// =============================================================================
// ATTRIBUTE TABLES
// =============================================================================

/// A typed attribute table: a column catalogue plus one row per element.
///
/// Rows are sparse: a missing row or a missing cell means "no value".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeTable {
    #[serde(default)]
    pub columns: Vec<ColumnRef>,
    #[serde(default)]
    pub rows: BTreeMap<String, AttributeMap>,
}

impl AttributeTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnRef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get the attribute row of an element.
    #[must_use]
    pub fn row(&self, element_id: &str) -> Option<&AttributeMap> {
        self.rows.get(element_id)
    }

    /// Get a single cell.
    #[must_use]
    pub fn value(&self, element_id: &str, column: &str) -> Option<&AttributeValue> {
        self.rows.get(element_id)?.get(column)
    }
}

// =============================================================================
// SUMMARY
// =============================================================================

/// Whole-network metadata: name, description, version and free-form
/// network-level properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub properties: AttributeMap,
}

// =============================================================================
// NETWORK RECORD
// =============================================================================

/// One source network: topology, node table, edge table and summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub id: NetworkId,
    #[serde(default)]
    pub summary: NetworkSummary,
    #[serde(default)]
    pub nodes: Vec<SourceNode>,
    #[serde(default)]
    pub edges: Vec<SourceEdge>,
    #[serde(default)]
    pub node_table: AttributeTable,
    #[serde(default)]
    pub edge_table: AttributeTable,
}

impl NetworkRecord {
    /// Create an empty network with the given id and name.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: NetworkId::new(id),
            summary: NetworkSummary {
                name: name.into(),
                ..NetworkSummary::default()
            },
            nodes: Vec::new(),
            edges: Vec::new(),
            node_table: AttributeTable::new(),
            edge_table: AttributeTable::new(),
        }
    }

    /// Declare a node table column.
    #[must_use]
    pub fn with_node_column(mut self, name: &str, value_type: ValueType) -> Self {
        self.node_table.columns.push(ColumnRef::new(name, value_type));
        self
    }

    /// Declare an edge table column.
    #[must_use]
    pub fn with_edge_column(mut self, name: &str, value_type: ValueType) -> Self {
        self.edge_table.columns.push(ColumnRef::new(name, value_type));
        self
    }

    /// Append a node and its attribute row.
    pub fn add_node(&mut self, id: &str, attributes: AttributeMap) {
        self.nodes.push(SourceNode { id: id.to_string() });
        if !attributes.is_empty() {
            self.node_table.rows.insert(id.to_string(), attributes);
        }
    }

    /// Append an edge and its attribute row.
    pub fn add_edge(&mut self, id: &str, source: &str, target: &str, attributes: AttributeMap) {
        self.edges.push(SourceEdge {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
        });
        if !attributes.is_empty() {
            self.edge_table.rows.insert(id.to_string(), attributes);
        }
    }

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
}

// =============================================================================
// TESTS
// =============================================================================
