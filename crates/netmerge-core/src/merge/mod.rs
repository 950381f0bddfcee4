//! # Merge Orchestration
//!
//! Entry point of the engine. [`NetworkMerger::merge`] validates a
//! [`MergeRequest`], runs one of three strategies and returns the merged
//! record, its summary and counters.
//!
//! ## Failure Semantics
//!
//! Every precondition (network count, unknown ids, identity mappings,
//! duplicate element ids, merged-name collisions) is checked before the
//! first merged element is built. Any later error (cast, conflict) discards
//! the builder; no partial output is ever returned.

mod difference;
mod intersection;
mod union;

use crate::caster::AttributeCaster;
use crate::graph::{GraphBuilder, MergedGraphRecord};
use crate::identity::{EdgeKey, IdentityResolver, NodeKey};
use crate::matching::MatchingTable;
use crate::network::{NetworkRecord, NetworkSummary, SourceEdge, SourceNode};
use crate::primitives::{DEFAULT_INTERACTION_COLUMN, DIFFERENCE_NETWORKS, MIN_INTERSECTION_NETWORKS};
use crate::summary::SummaryMerger;
use crate::{AttributeMap, ColumnRef, MergeError, NetworkId, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

// =============================================================================
// OPTIONS
// =============================================================================

/// Set semantics of a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeOperation {
    /// Every node and edge of every network.
    #[default]
    Union,
    /// Nodes present in every network, edges present in every network.
    Intersection,
    /// Base network minus the second network.
    Difference,
}

impl MergeOperation {
    /// Human-readable label, used in default result names.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Union => "Union",
            Self::Intersection => "Intersection",
            Self::Difference => "Difference",
        }
    }
}

impl fmt::Display for MergeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label().to_ascii_lowercase())
    }
}

impl FromStr for MergeOperation {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "union" => Ok(Self::Union),
            "intersection" => Ok(Self::Intersection),
            "difference" => Ok(Self::Difference),
            other => Err(MergeError::InvalidInput(format!(
                "Unknown merge operation '{}'",
                other
            ))),
        }
    }
}

/// Options of one merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    pub operation: MergeOperation,
    /// Fold elements sharing an identity inside one source network.
    pub merge_within_network: bool,
    /// Skip edges entirely (intersection only).
    pub merge_only_nodes: bool,
    /// Difference: remove every matched base node regardless of edges.
    pub strict_remove_mode: bool,
    /// Edge attribute holding the interaction label.
    pub interaction_column: String,
    /// Name of the merged network; derived from the sources when unset.
    pub result_name: Option<String>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            operation: MergeOperation::Union,
            merge_within_network: false,
            merge_only_nodes: false,
            strict_remove_mode: false,
            interaction_column: DEFAULT_INTERACTION_COLUMN.to_string(),
            result_name: None,
        }
    }
}

// =============================================================================
// REQUEST / OUTCOME
// =============================================================================

/// Everything a merge consumes. Inputs are borrowed and never mutated.
#[derive(Debug, Clone)]
pub struct MergeRequest<'a> {
    /// Id of the network to create.
    pub result_id: NetworkId,
    /// Participating networks; the first one is the base.
    pub participants: Vec<NetworkId>,
    pub networks: &'a BTreeMap<NetworkId, NetworkRecord>,
    pub node_table: &'a MatchingTable,
    pub edge_table: &'a MatchingTable,
    pub network_table: Option<&'a MatchingTable>,
    pub options: MergeOptions,
}

/// Counters describing what a merge did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    pub input_nodes: usize,
    pub input_edges: usize,
    pub merged_nodes: usize,
    pub merged_edges: usize,
    /// Source nodes folded into an existing merged node.
    pub matched_nodes: usize,
    /// Source edges folded into an existing merged edge.
    pub matched_edges: usize,
    /// Nodes dropped by intersection or difference.
    pub removed_nodes: usize,
}

/// Result of a successful merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub record: MergedGraphRecord,
    pub summary: NetworkSummary,
    pub stats: MergeStats,
}

// =============================================================================
// ORCHESTRATOR
// =============================================================================

/// The merge orchestrator.
pub struct NetworkMerger;

impl NetworkMerger {
    /// Run a merge.
    pub fn merge(request: &MergeRequest<'_>) -> Result<MergeOutcome, MergeError> {
        let ctx = MergeContext::prepare(request)?;
        let options = &request.options;

        if options.merge_only_nodes && options.operation != MergeOperation::Intersection {
            warn!(
                operation = %options.operation,
                "merge_only_nodes only applies to intersection; ignoring"
            );
        }

        let (builder, mut stats) = match options.operation {
            MergeOperation::Union => union::run(&ctx)?,
            MergeOperation::Intersection => intersection::run(&ctx)?,
            MergeOperation::Difference => difference::run(&ctx)?,
        };

        let record = builder.finish(
            request.result_id.clone(),
            request.node_table.output_columns(),
            request.edge_table.output_columns(),
        );
        stats.input_nodes = ctx.networks.iter().map(|n| n.node_count()).sum();
        stats.input_edges = ctx.networks.iter().map(|n| n.edge_count()).sum();
        stats.merged_nodes = record.node_count();
        stats.merged_edges = record.edge_count();

        let (base, others) = ctx.split_base()?;
        let name = options
            .result_name
            .clone()
            .unwrap_or_else(|| SummaryMerger::default_name(options.operation.label(), &ctx.networks));
        let summary = SummaryMerger::merge(name, base, others, request.network_table)?;

        info!(
            operation = %options.operation,
            networks = ctx.networks.len(),
            nodes = stats.merged_nodes,
            edges = stats.merged_edges,
            matched_nodes = stats.matched_nodes,
            removed_nodes = stats.removed_nodes,
            "merge complete"
        );

        Ok(MergeOutcome {
            record,
            summary,
            stats,
        })
    }
}

// =============================================================================
// SHARED CONTEXT
// =============================================================================

/// Validated view of a request, shared by the strategies.
struct MergeContext<'a> {
    networks: Vec<&'a NetworkRecord>,
    node_table: &'a MatchingTable,
    edge_table: &'a MatchingTable,
    /// Output identity column: row 0's merged name and resolved type.
    identity: ColumnRef,
    options: &'a MergeOptions,
}

impl<'a> MergeContext<'a> {
    /// Check every precondition, in order, before anything is built.
    fn prepare(request: &'a MergeRequest<'a>) -> Result<Self, MergeError> {
        let operation = request.options.operation;
        let count = request.participants.len();
        match operation {
            MergeOperation::Union if count == 0 => {
                return Err(MergeError::NetworkCount {
                    operation: operation.label(),
                    expected: "at least 1",
                    actual: count,
                });
            }
            MergeOperation::Intersection if count < MIN_INTERSECTION_NETWORKS => {
                return Err(MergeError::NetworkCount {
                    operation: operation.label(),
                    expected: "at least 2",
                    actual: count,
                });
            }
            MergeOperation::Difference if count != DIFFERENCE_NETWORKS => {
                return Err(MergeError::NetworkCount {
                    operation: operation.label(),
                    expected: "exactly 2",
                    actual: count,
                });
            }
            _ => {}
        }

        let mut seen = BTreeSet::new();
        let mut networks = Vec::with_capacity(count);
        for id in &request.participants {
            if !seen.insert(id) {
                return Err(MergeError::InvalidInput(format!(
                    "network {} is listed twice",
                    id
                )));
            }
            let network = request
                .networks
                .get(id)
                .ok_or_else(|| MergeError::UnknownNetwork(id.clone()))?;
            networks.push(network);
        }

        request.node_table.validate(&request.participants)?;
        request.edge_table.validate(&request.participants)?;
        if let Some(table) = request.network_table {
            table.validate(&request.participants)?;
        }

        for network in &networks {
            IdentityResolver::check_unique_ids(network)?;
        }

        let identity = request
            .node_table
            .identity_row()
            .map(|row| ColumnRef::new(row.merged_name.clone(), row.resolved_type))
            .ok_or_else(|| {
                MergeError::InvalidInput("node matching table has no identity row".to_string())
            })?;

        Ok(Self {
            networks,
            node_table: request.node_table,
            edge_table: request.edge_table,
            identity,
            options: &request.options,
        })
    }

    fn builder(&self) -> GraphBuilder {
        GraphBuilder::new(self.options.merge_within_network)
    }

    fn split_base(&self) -> Result<(&'a NetworkRecord, &[&'a NetworkRecord]), MergeError> {
        self.networks
            .split_first()
            .map(|(base, others)| (*base, others))
            .ok_or_else(|| MergeError::InvalidInput("no participating networks".to_string()))
    }

    fn identity_column(&self, network: &NetworkRecord) -> Result<&'a ColumnRef, MergeError> {
        self.node_table
            .identity_column(&network.id)
            .ok_or_else(|| MergeError::MissingIdentityMapping(network.id.clone()))
    }

    /// Identity keys of a network's nodes, by source node id.
    fn node_keys(&self, network: &'a NetworkRecord) -> Result<BTreeMap<&'a str, NodeKey>, MergeError> {
        let column = self.identity_column(network)?;
        Ok(IdentityResolver::node_keys(network, &column.name))
    }

    /// Identity keys of a network's edges.
    fn edge_keys(
        &self,
        network: &NetworkRecord,
        node_keys: &BTreeMap<&str, NodeKey>,
    ) -> BTreeSet<EdgeKey<NodeKey>> {
        IdentityResolver::edge_keys(network, node_keys, &self.options.interaction_column)
    }

    fn interaction(&self, network: &NetworkRecord, edge: &SourceEdge) -> String {
        IdentityResolver::interaction_label(network, &edge.id, &self.options.interaction_column)
    }

    /// Identity key of one source edge, if both endpoints have node keys.
    fn source_edge_key(
        &self,
        network: &NetworkRecord,
        node_keys: &BTreeMap<&str, NodeKey>,
        edge: &SourceEdge,
    ) -> Option<EdgeKey<NodeKey>> {
        let source = node_keys.get(edge.source.as_str())?;
        let target = node_keys.get(edge.target.as_str())?;
        Some(IdentityResolver::compute_edge_key(
            source.clone(),
            target.clone(),
            &self.interaction(network, edge),
        ))
    }

    fn node_attributes(&self, network: &NetworkRecord, node: &SourceNode) -> Result<AttributeMap, MergeError> {
        let mut casted = AttributeCaster::cast_attributes(
            network.node_table.row(&node.id),
            &network.id,
            self.node_table.attribute_rows(),
        )?;
        let column = self.identity_column(network)?;
        AttributeCaster::add_merged_attribute(
            &mut casted,
            network.node_table.value(&node.id, &column.name),
            &self.identity,
        )?;
        Ok(casted)
    }

    fn edge_attributes(&self, network: &NetworkRecord, edge: &SourceEdge) -> Result<AttributeMap, MergeError> {
        AttributeCaster::cast_attributes(
            network.edge_table.row(&edge.id),
            &network.id,
            self.edge_table.rows(),
        )
    }

    /// Feed a network's nodes accepted by `keep` into the builder.
    ///
    /// Returns source node id -> merged node for every ingested node.
    fn ingest_nodes<F>(
        &self,
        builder: &mut GraphBuilder,
        network: &'a NetworkRecord,
        node_keys: &BTreeMap<&'a str, NodeKey>,
        keep: F,
        stats: &mut MergeStats,
    ) -> Result<BTreeMap<&'a str, NodeId>, MergeError>
    where
        F: Fn(&SourceNode, Option<&NodeKey>) -> bool,
    {
        let mut placed = BTreeMap::new();
        for node in &network.nodes {
            let key = node_keys.get(node.id.as_str());
            if !keep(node, key) {
                continue;
            }
            let attributes = self.node_attributes(network, node)?;
            let placement = builder.add_node(key.cloned(), &network.id, attributes)?;
            if placement.is_absorbed() {
                stats.matched_nodes += 1;
            }
            placed.insert(node.id.as_str(), placement.id());
        }
        debug!(network = %network.id, nodes = placed.len(), "nodes ingested");
        Ok(placed)
    }

    /// Feed a network's edges accepted by `keep` into the builder. Edges
    /// with an endpoint that was not ingested, or is no longer live, are
    /// skipped. `keep` receives the edge and its interaction label.
    fn ingest_edges<F>(
        &self,
        builder: &mut GraphBuilder,
        network: &NetworkRecord,
        placed: &BTreeMap<&str, NodeId>,
        keep: F,
        stats: &mut MergeStats,
    ) -> Result<(), MergeError>
    where
        F: Fn(&SourceEdge) -> bool,
    {
        let mut ingested = 0usize;
        for edge in &network.edges {
            let (Some(&source), Some(&target)) = (
                placed.get(edge.source.as_str()),
                placed.get(edge.target.as_str()),
            ) else {
                continue;
            };
            if !builder.is_live(source) || !builder.is_live(target) || !keep(edge) {
                continue;
            }
            let interaction = self.interaction(network, edge);
            let attributes = self.edge_attributes(network, edge)?;
            let placement = builder.add_edge(source, target, &interaction, &network.id, attributes)?;
            if placement.is_absorbed() {
                stats.matched_edges += 1;
            }
            ingested += 1;
        }
        debug!(network = %network.id, edges = ingested, "edges ingested");
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
