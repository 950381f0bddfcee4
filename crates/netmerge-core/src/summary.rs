//! # Summary Merge
//!
//! Builds the network-level summary of a merge result. Description and
//! version come from the base network; properties of all participants are
//! combined with the [`ConflictPolicy`], base first.

use crate::caster::AttributeCaster;
use crate::matching::MatchingTable;
use crate::network::{NetworkRecord, NetworkSummary};
use crate::policy::ConflictPolicy;
use crate::{AttributeMap, MergeError};

/// Merges the summaries of the participating networks.
pub struct SummaryMerger;

impl SummaryMerger {
    /// Merge summaries into one named `name`.
    ///
    /// With a network matching table, properties are renamed and cast
    /// through its rows first; without one they are combined as-is.
    pub fn merge(
        name: String,
        base: &NetworkRecord,
        others: &[&NetworkRecord],
        network_table: Option<&MatchingTable>,
    ) -> Result<NetworkSummary, MergeError> {
        let mut properties = Self::properties_of(base, network_table)?;
        for other in others {
            let incoming = Self::properties_of(other, network_table)?;
            ConflictPolicy::merge_into(&mut properties, &incoming)?;
        }

        Ok(NetworkSummary {
            name,
            description: base.summary.description.clone(),
            version: base.summary.version.clone(),
            properties,
        })
    }

    /// Default result name: `"<Operation> of <name>, <name>, ..."`.
    #[must_use]
    pub fn default_name(operation: &str, networks: &[&NetworkRecord]) -> String {
        let names: Vec<&str> = networks
            .iter()
            .map(|n| {
                if n.summary.name.is_empty() {
                    n.id.as_str()
                } else {
                    n.summary.name.as_str()
                }
            })
            .collect();
        format!("{} of {}", operation, names.join(", "))
    }

    fn properties_of(
        network: &NetworkRecord,
        table: Option<&MatchingTable>,
    ) -> Result<AttributeMap, MergeError> {
        match table {
            Some(table) => AttributeCaster::cast_attributes(
                Some(&network.summary.properties),
                &network.id,
                table.rows(),
            ),
            None => Ok(network.summary.properties.clone()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
