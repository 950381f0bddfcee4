//! Difference: the base network minus the second network.
//!
//! - Unmatched base nodes are always kept.
//! - Strict mode removes every base node whose key occurs in the second
//!   network.
//! - Edge-aware mode removes a matched base node only when every one of its
//!   incident edges also occurs in the second network. A matched node
//!   without incident edges is removed.
//! - An edge is dropped when its key occurs in the second network or when
//!   one of its endpoints was removed.

use super::{MergeContext, MergeStats};
use crate::MergeError;
use crate::graph::GraphBuilder;
use crate::identity::{EdgeKey, NodeKey};
use crate::network::{NetworkRecord, SourceEdge};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

pub(super) fn run(ctx: &MergeContext<'_>) -> Result<(GraphBuilder, MergeStats), MergeError> {
    let mut builder = ctx.builder();
    let mut stats = MergeStats::default();

    let (base, others) = ctx.split_base()?;
    let &[second] = others else {
        return Err(MergeError::InvalidInput(
            "difference needs exactly one network to subtract".to_string(),
        ));
    };

    let base_keys = ctx.node_keys(base)?;
    let second_keys = ctx.node_keys(second)?;
    let second_nodes: BTreeSet<&NodeKey> = second_keys.values().collect();
    let second_edges = ctx.edge_keys(second, &second_keys);

    let incident = incident_edges(base);
    let mut removed: BTreeSet<&str> = BTreeSet::new();
    for node in &base.nodes {
        let Some(key) = base_keys.get(node.id.as_str()) else {
            continue;
        };
        if !second_nodes.contains(key) {
            continue;
        }
        let subtract = ctx.options.strict_remove_mode
            || incident
                .get(node.id.as_str())
                .into_iter()
                .flatten()
                .all(|edge| {
                    ctx.source_edge_key(base, &base_keys, edge)
                        .is_some_and(|k| second_edges.contains(&k))
                });
        if subtract {
            removed.insert(node.id.as_str());
        }
    }
    stats.removed_nodes = removed.len();
    debug!(
        base = %base.id,
        second = %second.id,
        strict = ctx.options.strict_remove_mode,
        removed = removed.len(),
        "difference node pass"
    );

    let placed = ctx.ingest_nodes(
        &mut builder,
        base,
        &base_keys,
        |node, _| !removed.contains(node.id.as_str()),
        &mut stats,
    )?;
    ctx.ingest_edges(
        &mut builder,
        base,
        &placed,
        |edge| !shared_edge(ctx, base, &base_keys, &second_edges, edge),
        &mut stats,
    )?;

    Ok((builder, stats))
}

fn incident_edges(network: &NetworkRecord) -> BTreeMap<&str, Vec<&SourceEdge>> {
    let mut incident: BTreeMap<&str, Vec<&SourceEdge>> = BTreeMap::new();
    for edge in &network.edges {
        incident.entry(edge.source.as_str()).or_default().push(edge);
        if edge.target != edge.source {
            incident.entry(edge.target.as_str()).or_default().push(edge);
        }
    }
    incident
}

fn shared_edge(
    ctx: &MergeContext<'_>,
    base: &NetworkRecord,
    base_keys: &BTreeMap<&str, NodeKey>,
    second_edges: &BTreeSet<EdgeKey<NodeKey>>,
    edge: &SourceEdge,
) -> bool {
    ctx.source_edge_key(base, base_keys, edge)
        .is_some_and(|key| second_edges.contains(&key))
}
