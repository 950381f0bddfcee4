//! # netmerge-core
//!
//! The deterministic network merge engine.
//!
//! This crate combines several attributed graphs into one under union,
//! intersection or difference semantics. It aligns the attribute schemas of
//! the participating networks, resolves node and edge identity from a
//! chosen matching attribute, and emits a fresh merged record.
//!
//! ## Architectural Constraints
//!
//! - Pure and synchronous: NO async, NO I/O, NO network dependencies
//! - Deterministic: `BTreeMap`/`BTreeSet` only, output never depends on hashing
//! - Read-only inputs: every merge builds a new `MergedGraphRecord`
//! - Fail fast: all preconditions are checked before any output exists
//!
//! ## Example
//!
//! ```
//! use netmerge_core::{
//!     AttributeMap, MatchingTable, MergeOptions, MergeRequest, NetworkId, NetworkMerger,
//!     NetworkRecord, ValueType,
//! };
//! use std::collections::BTreeMap;
//!
//! let mut a = NetworkRecord::new("a", "A").with_node_column("name", ValueType::STRING);
//! a.add_node("n1", AttributeMap::from([("name".to_string(), "x".into())]));
//! let mut b = NetworkRecord::new("b", "B").with_node_column("name", ValueType::STRING);
//! b.add_node("n1", AttributeMap::from([("name".to_string(), "x".into())]));
//!
//! let mut nodes = MatchingTable::for_nodes();
//! let mut edges = MatchingTable::for_edges();
//! for net in [&a, &b] {
//!     nodes.add_network(net.id.clone(), &net.node_table.columns).expect("nodes");
//!     nodes.set_matching_column(&net.id, "name").expect("identity");
//!     edges.add_network(net.id.clone(), &net.edge_table.columns).expect("edges");
//! }
//!
//! let networks = BTreeMap::from([(a.id.clone(), a), (b.id.clone(), b)]);
//! let request = MergeRequest {
//!     result_id: NetworkId::new("merged"),
//!     participants: vec![NetworkId::new("a"), NetworkId::new("b")],
//!     networks: &networks,
//!     node_table: &nodes,
//!     edge_table: &edges,
//!     network_table: None,
//!     options: MergeOptions::default(),
//! };
//! let outcome = NetworkMerger::merge(&request).expect("merge");
//! assert_eq!(outcome.record.node_count(), 1);
//! ```

// =============================================================================
// MODULES
// =============================================================================

pub mod caster;
pub mod graph;
pub mod identity;
pub mod lattice;
pub mod matching;
pub mod merge;
pub mod network;
pub mod policy;
pub mod primitives;
pub mod summary;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    AttributeMap, AttributeValue, ColumnRef, EdgeId, ElementKind, ErrorCategory, MergeError,
    NetworkId, NodeId, ScalarType, ValueType,
};

// =============================================================================
// RE-EXPORTS: Merge Engine
// =============================================================================

pub use caster::AttributeCaster;
pub use graph::{
    GraphBuilder, MergedEdge, MergedGraph, MergedGraphRecord, MergedNode, MergedTable, Placement,
};
pub use identity::{EdgeKey, IdentityResolver, MatchingIndex, NodeKey};
pub use lattice::TypeLattice;
pub use matching::{MatchingTable, MatchingTableRow};
pub use merge::{
    MergeOperation, MergeOptions, MergeOutcome, MergeRequest, MergeStats, NetworkMerger,
};
pub use network::{AttributeTable, NetworkRecord, NetworkSummary, SourceEdge, SourceNode};
pub use policy::ConflictPolicy;
pub use summary::SummaryMerger;
