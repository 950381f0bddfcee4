//! Intersection: nodes whose identity key occurs in every network, and
//! edges whose identity key occurs in every network.
//!
//! The surviving key set starts as the base network's keys and shrinks with
//! each later network. Merged nodes whose key drops out are removed and
//! evicted from the matching index, so no later network can match them.
//!
//! A merged node absorbs at most one node per network unless
//! `merge_within_network` is set: `a{x}` intersected with `b{x, x}` yields
//! two `x` nodes without it and one with it.

use super::{MergeContext, MergeStats};
use crate::MergeError;
use crate::graph::GraphBuilder;
use crate::identity::{EdgeKey, NodeKey};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

pub(super) fn run(ctx: &MergeContext<'_>) -> Result<(GraphBuilder, MergeStats), MergeError> {
    let mut builder = ctx.builder();
    let mut stats = MergeStats::default();

    let mut keys = Vec::with_capacity(ctx.networks.len());
    let mut placements = Vec::with_capacity(ctx.networks.len());
    let mut surviving: Option<BTreeSet<NodeKey>> = None;

    for &network in &ctx.networks {
        let network_keys = ctx.node_keys(network)?;
        let present: BTreeSet<NodeKey> = network_keys.values().cloned().collect();
        let running = match surviving.take() {
            None => present,
            Some(mut previous) => {
                previous.retain(|key| present.contains(key));
                stats.removed_nodes += builder.retain_nodes_by_key(&previous);
                previous
            }
        };

        let placed = ctx.ingest_nodes(
            &mut builder,
            network,
            &network_keys,
            |_, key| key.is_some_and(|k| running.contains(k)),
            &mut stats,
        )?;
        debug!(
            network = %network.id,
            surviving = running.len(),
            index = builder.index().len(),
            "intersection step"
        );

        surviving = Some(running);
        keys.push(network_keys);
        placements.push(placed);
    }

    if ctx.options.merge_only_nodes {
        return Ok((builder, stats));
    }

    let common = common_edges(ctx, &keys);
    for ((&network, network_keys), placed) in ctx.networks.iter().zip(&keys).zip(&placements) {
        ctx.ingest_edges(
            &mut builder,
            network,
            placed,
            |edge| {
                ctx.source_edge_key(network, network_keys, edge)
                    .is_some_and(|key| common.contains(&key))
            },
            &mut stats,
        )?;
    }

    Ok((builder, stats))
}

/// Edge keys present in every network.
fn common_edges(
    ctx: &MergeContext<'_>,
    keys: &[BTreeMap<&str, NodeKey>],
) -> BTreeSet<EdgeKey<NodeKey>> {
    let mut per_network = ctx
        .networks
        .iter()
        .zip(keys)
        .map(|(network, node_keys)| ctx.edge_keys(network, node_keys));
    let Some(mut common) = per_network.next() else {
        return BTreeSet::new();
    };
    for edges in per_network {
        common.retain(|key| edges.contains(key));
    }
    common
}
