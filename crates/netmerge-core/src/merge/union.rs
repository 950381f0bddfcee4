//! Union: every node and edge of every network, matched nodes and edges
//! folded together.

use super::{MergeContext, MergeStats};
use crate::graph::GraphBuilder;
use crate::MergeError;

pub(super) fn run(ctx: &MergeContext<'_>) -> Result<(GraphBuilder, MergeStats), MergeError> {
    let mut builder = ctx.builder();
    let mut stats = MergeStats::default();

    for &network in &ctx.networks {
        let keys = ctx.node_keys(network)?;
        let placed = ctx.ingest_nodes(&mut builder, network, &keys, |_, _| true, &mut stats)?;
        ctx.ingest_edges(&mut builder, network, &placed, |_| true, &mut stats)?;
    }

    Ok((builder, stats))
}
