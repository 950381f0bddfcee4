//! # Matching Table
//!
//! Schema alignment for one merge session. Each row is a merged attribute:
//! an output column that consolidates one source column from each
//! participating network (or none, where a network lacks it).
//!
//! A node table reserves row 0 for the identity ("matching") attribute,
//! which must map every participating network to a present column.
//!
//! Invariants kept by every mutating operation:
//! - `resolved_type` is the least compatible type of the row's live mappings
//! - merged names are pairwise unique
//! - rows without any live mapping are removed (except the identity row)

use crate::lattice::TypeLattice;
use crate::primitives::{IDENTITY_ROW, MATCHING_ATTRIBUTE_NAME};
use crate::{ColumnRef, ElementKind, MergeError, NetworkId, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// ROW
// =============================================================================

/// One merged attribute and its per-network source columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingTableRow {
    /// Output column name.
    pub merged_name: String,
    /// Type every mapped source value is cast to.
    pub resolved_type: ValueType,
    /// Network -> source column. `None` marks a slot with no column mapped.
    /// A network missing from the map has no slot in this row at all.
    pub mappings: BTreeMap<NetworkId, Option<ColumnRef>>,
    /// Whether the live source columns disagree on type.
    pub has_conflicts: bool,
}

impl MatchingTableRow {
    fn new(merged_name: impl Into<String>, resolved_type: ValueType) -> Self {
        Self {
            merged_name: merged_name.into(),
            resolved_type,
            mappings: BTreeMap::new(),
            has_conflicts: false,
        }
    }

    /// The live source column for a network, if any.
    #[must_use]
    pub fn mapping(&self, network: &NetworkId) -> Option<&ColumnRef> {
        self.mappings.get(network).and_then(Option::as_ref)
    }

    /// Whether the row has a slot (mapped or not) for a network.
    #[must_use]
    pub fn has_slot(&self, network: &NetworkId) -> bool {
        self.mappings.contains_key(network)
    }

    /// All live mappings in network id order.
    pub fn live_mappings(&self) -> impl Iterator<Item = (&NetworkId, &ColumnRef)> {
        self.mappings
            .iter()
            .filter_map(|(network, column)| column.as_ref().map(|c| (network, c)))
    }

    /// Whether any network maps a column into this row.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live_mappings().next().is_some()
    }

    /// Recompute `resolved_type` and `has_conflicts` from the live mappings.
    ///
    /// A row without live mappings keeps its previous type.
    fn recompute(&mut self) {
        let types: BTreeSet<ValueType> = self.live_mappings().map(|(_, c)| c.value_type).collect();
        if let Ok(resolved) = TypeLattice::least_compatible_type(types.iter().copied()) {
            self.resolved_type = resolved;
        }
        self.has_conflicts = types.len() > 1;
    }
}

// =============================================================================
// TABLE
// =============================================================================

/// Alignment of merged attributes to source columns for one element kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingTable {
    kind: ElementKind,
    reserves_identity: bool,
    rows: Vec<MatchingTableRow>,
    /// Participating networks in the order they were added.
    networks: Vec<NetworkId>,
    /// Source column catalogue per network, used to type `set_attribute`.
    catalog: BTreeMap<NetworkId, Vec<ColumnRef>>,
}

impl MatchingTable {
    /// A node table, with row 0 reserved for the identity attribute.
    #[must_use]
    pub fn for_nodes() -> Self {
        Self {
            kind: ElementKind::Node,
            reserves_identity: true,
            rows: vec![MatchingTableRow::new(MATCHING_ATTRIBUTE_NAME, ValueType::STRING)],
            networks: Vec::new(),
            catalog: BTreeMap::new(),
        }
    }

    /// An edge table.
    #[must_use]
    pub fn for_edges() -> Self {
        Self::without_identity(ElementKind::Edge)
    }

    /// A whole-network attribute table.
    #[must_use]
    pub fn for_networks() -> Self {
        Self::without_identity(ElementKind::Network)
    }

    fn without_identity(kind: ElementKind) -> Self {
        Self {
            kind,
            reserves_identity: false,
            rows: Vec::new(),
            networks: Vec::new(),
            catalog: BTreeMap::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Element kind this table aligns.
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// All rows, identity row first for node tables.
    #[must_use]
    pub fn rows(&self) -> &[MatchingTableRow] {
        &self.rows
    }

    /// A single row.
    #[must_use]
    pub fn row(&self, row_id: usize) -> Option<&MatchingTableRow> {
        self.rows.get(row_id)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Networks aligned by this table, in insertion order.
    #[must_use]
    pub fn networks(&self) -> &[NetworkId] {
        &self.networks
    }

    /// The reserved identity row, for node tables.
    #[must_use]
    pub fn identity_row(&self) -> Option<&MatchingTableRow> {
        if self.reserves_identity {
            self.rows.get(IDENTITY_ROW)
        } else {
            None
        }
    }

    /// The matching column chosen for a network, for node tables.
    #[must_use]
    pub fn identity_column(&self, network: &NetworkId) -> Option<&ColumnRef> {
        self.identity_row()?.mapping(network)
    }

    /// Rows holding regular (non-identity) attributes.
    pub fn attribute_rows(&self) -> impl Iterator<Item = &MatchingTableRow> {
        let skip = usize::from(self.reserves_identity);
        self.rows.iter().skip(skip)
    }

    /// Rows whose source columns disagree on type, with their row ids.
    pub fn conflicting_rows(&self) -> impl Iterator<Item = (usize, &MatchingTableRow)> {
        self.rows.iter().enumerate().filter(|(_, row)| row.has_conflicts)
    }

    /// Output columns: merged names with their resolved types.
    #[must_use]
    pub fn output_columns(&self) -> Vec<ColumnRef> {
        self.rows
            .iter()
            .map(|row| ColumnRef::new(row.merged_name.clone(), row.resolved_type))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Align a network's columns into the table.
    ///
    /// Each column joins the first free row whose merged name equals the
    /// column name, falling back to a row that already maps a column of that
    /// name from another network. Unmatched columns open new rows; a merged
    /// name that is already taken gets a numeric suffix (`name_1`, ...).
    pub fn add_network(&mut self, network: NetworkId, columns: &[ColumnRef]) -> Result<(), MergeError> {
        if self.catalog.contains_key(&network) {
            return Err(MergeError::InvalidInput(format!(
                "network {} is already aligned in the {} table",
                network, self.kind
            )));
        }

        for row in &mut self.rows {
            row.mappings.insert(network.clone(), None);
        }

        for column in columns {
            let target = self.find_free_row(&network, &column.name);
            match target {
                Some(row_id) => {
                    let row = &mut self.rows[row_id];
                    row.mappings.insert(network.clone(), Some(column.clone()));
                    row.recompute();
                }
                None => {
                    let name = self.unique_name(&column.name);
                    let mut row = MatchingTableRow::new(name, column.value_type);
                    for other in &self.networks {
                        row.mappings.insert(other.clone(), None);
                    }
                    row.mappings.insert(network.clone(), Some(column.clone()));
                    row.recompute();
                    self.rows.push(row);
                }
            }
        }

        self.networks.push(network.clone());
        self.catalog.insert(network, columns.to_vec());
        Ok(())
    }

    /// Drop a network from every row, then remove rows left without any
    /// live mapping.
    pub fn remove_network(&mut self, network: &NetworkId) -> Result<(), MergeError> {
        if self.catalog.remove(network).is_none() {
            return Err(MergeError::UnknownNetwork(network.clone()));
        }
        self.networks.retain(|n| n != network);
        for row in &mut self.rows {
            row.mappings.remove(network);
            row.recompute();
        }
        self.pack();
        Ok(())
    }

    /// Choose the matching (identity) column of a network.
    pub fn set_matching_column(
        &mut self,
        network: &NetworkId,
        column_name: &str,
    ) -> Result<(), MergeError> {
        if !self.reserves_identity {
            return Err(MergeError::InvalidInput(format!(
                "the {} table has no identity row",
                self.kind
            )));
        }
        let column = self.catalog_column(network, column_name)?;
        let row = &mut self.rows[IDENTITY_ROW];
        row.mappings.insert(network.clone(), Some(column));
        row.recompute();
        Ok(())
    }

    /// Map (or unmap, with `None`) a network's source column into a row.
    ///
    /// A no-op when the row has no slot for the network. Unmapping the last
    /// live column of a regular row removes the row, shifting later row ids.
    pub fn set_attribute(
        &mut self,
        row_id: usize,
        network: &NetworkId,
        original_name: Option<&str>,
    ) -> Result<(), MergeError> {
        let has_slot = self
            .rows
            .get(row_id)
            .ok_or_else(|| MergeError::InvalidInput(format!("no row {} in the {} table", row_id, self.kind)))?
            .has_slot(network);
        if !has_slot {
            return Ok(());
        }

        let column = match original_name {
            Some(name) => Some(self.catalog_column(network, name)?),
            None => None,
        };

        let row = &mut self.rows[row_id];
        row.mappings.insert(network.clone(), column);
        row.recompute();
        self.pack();
        Ok(())
    }

    /// Rename a merged attribute. Names must stay unique.
    pub fn set_merged_name(&mut self, row_id: usize, name: &str) -> Result<(), MergeError> {
        if self
            .rows
            .iter()
            .enumerate()
            .any(|(i, row)| i != row_id && row.merged_name == name)
        {
            return Err(MergeError::DuplicateMergedName(name.to_string()));
        }
        let row = self
            .rows
            .get_mut(row_id)
            .ok_or_else(|| MergeError::InvalidInput(format!("no row {} in the {} table", row_id, self.kind)))?;
        row.merged_name = name.to_string();
        Ok(())
    }

    /// Check the table is usable for a merge of `participants`.
    ///
    /// Fails on duplicate merged names, on rows whose resolved type is not
    /// the least compatible type of their live mappings, on participants the
    /// table has never seen and, for node tables, on participants without a
    /// matching column. Tables built through the mutating methods always
    /// pass the first two checks; deserialized ones may not.
    pub fn validate(&self, participants: &[NetworkId]) -> Result<(), MergeError> {
        let mut seen = BTreeSet::new();
        for row in &self.rows {
            if !seen.insert(row.merged_name.as_str()) {
                return Err(MergeError::DuplicateMergedName(row.merged_name.clone()));
            }
        }

        for row in &self.rows {
            let types = row.live_mappings().map(|(_, c)| c.value_type);
            match TypeLattice::least_compatible_type(types) {
                Ok(expected) if expected != row.resolved_type => {
                    return Err(MergeError::InvalidInput(format!(
                        "attribute '{}' in the {} table resolves to {} but is typed {}",
                        row.merged_name, self.kind, expected, row.resolved_type
                    )));
                }
                _ => {}
            }
        }

        for network in participants {
            if !self.catalog.contains_key(network) {
                return Err(MergeError::InvalidInput(format!(
                    "network {} is not aligned in the {} table",
                    network, self.kind
                )));
            }
            if self.reserves_identity && self.identity_column(network).is_none() {
                return Err(MergeError::MissingIdentityMapping(network.clone()));
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn find_free_row(&self, network: &NetworkId, column_name: &str) -> Option<usize> {
        let is_free = |row: &MatchingTableRow| row.mapping(network).is_none();
        let first_regular = usize::from(self.reserves_identity);
        let candidates = || self.rows.iter().enumerate().skip(first_regular);

        candidates()
            .find(|(_, row)| row.merged_name == column_name && is_free(row))
            .or_else(|| {
                candidates().find(|(_, row)| {
                    is_free(row) && row.live_mappings().any(|(_, c)| c.name == column_name)
                })
            })
            .map(|(i, _)| i)
    }

    fn unique_name(&self, base: &str) -> String {
        let taken = |name: &str| self.rows.iter().any(|row| row.merged_name == name);
        if !taken(base) {
            return base.to_string();
        }
        let mut suffix = 1usize;
        loop {
            let candidate = format!("{}_{}", base, suffix);
            if !taken(&candidate) {
                return candidate;
            }
            suffix = suffix.saturating_add(1);
        }
    }

    fn catalog_column(&self, network: &NetworkId, name: &str) -> Result<ColumnRef, MergeError> {
        let columns = self
            .catalog
            .get(network)
            .ok_or_else(|| MergeError::UnknownNetwork(network.clone()))?;
        columns
            .iter()
            .find(|c| c.name == name)
            .cloned()
            .ok_or_else(|| {
                MergeError::InvalidInput(format!("network {} has no column '{}'", network, name))
            })
    }

    fn pack(&mut self) {
        let first_regular = usize::from(self.reserves_identity);
        let mut index = 0usize;
        self.rows.retain(|row| {
            let keep = index < first_regular || row.is_live();
            index += 1;
            keep
        });
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScalarType;

    fn net(id: &str) -> NetworkId {
        NetworkId::new(id)
    }

    fn col(name: &str, value_type: ValueType) -> ColumnRef {
        ColumnRef::new(name, value_type)
    }

    fn two_network_table() -> MatchingTable {
        let mut table = MatchingTable::for_nodes();
        table
            .add_network(
                net("a"),
                &[col("name", ValueType::STRING), col("score", ValueType::INTEGER)],
            )
            .expect("add a");
        table
            .add_network(
                net("b"),
                &[col("name", ValueType::STRING), col("score", ValueType::DOUBLE)],
            )
            .expect("add b");
        table
    }

    #[test]
    fn node_table_reserves_identity_row() {
        let table = MatchingTable::for_nodes();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.identity_row().map(|r| r.merged_name.as_str()),
            Some(MATCHING_ATTRIBUTE_NAME)
        );
        assert!(MatchingTable::for_edges().identity_row().is_none());
    }

    #[test]
    fn add_network_aligns_by_name() {
        let table = two_network_table();
        assert_eq!(table.len(), 3);

        let score = table.row(2).expect("score row");
        assert_eq!(score.merged_name, "score");
        assert_eq!(score.resolved_type, ValueType::DOUBLE);
        assert!(score.has_conflicts);
        assert_eq!(
            score.mapping(&net("a")).map(|c| c.value_type),
            Some(ValueType::INTEGER)
        );

        let name = table.row(1).expect("name row");
        assert!(!name.has_conflicts);
        assert_eq!(table.conflicting_rows().count(), 1);
    }

    #[test]
    fn unmatched_columns_get_new_rows_with_unique_names() {
        let mut table = MatchingTable::for_nodes();
        table
            .add_network(
                net("a"),
                &[col(MATCHING_ATTRIBUTE_NAME, ValueType::STRING), col("x", ValueType::LONG)],
            )
            .expect("add");
        let names: Vec<_> = table.rows().iter().map(|r| r.merged_name.as_str()).collect();
        assert_eq!(names, vec![MATCHING_ATTRIBUTE_NAME, "Matching.Attribute_1", "x"]);
    }

    #[test]
    fn new_rows_get_absent_slots_for_earlier_networks() {
        let mut table = MatchingTable::for_edges();
        table.add_network(net("a"), &[col("w", ValueType::DOUBLE)]).expect("a");
        table.add_network(net("b"), &[col("label", ValueType::STRING)]).expect("b");

        let label = table.row(1).expect("label row");
        assert!(label.has_slot(&net("a")));
        assert!(label.mapping(&net("a")).is_none());
        assert!(label.mapping(&net("b")).is_some());
    }

    #[test]
    fn adding_the_same_network_twice_fails() {
        let mut table = two_network_table();
        assert!(table.add_network(net("a"), &[]).is_err());
    }

    #[test]
    fn remove_network_packs_dead_rows() {
        let mut table = MatchingTable::for_nodes();
        table.add_network(net("a"), &[col("name", ValueType::STRING)]).expect("a");
        table
            .add_network(net("b"), &[col("name", ValueType::STRING), col("only_b", ValueType::BOOLEAN)])
            .expect("b");
        assert_eq!(table.len(), 3);

        table.remove_network(&net("b")).expect("remove");
        assert_eq!(table.len(), 2);
        assert!(table.rows().iter().all(|r| !r.has_slot(&net("b"))));
        assert_eq!(table.networks(), &[net("a")]);
        assert!(matches!(
            table.remove_network(&net("b")),
            Err(MergeError::UnknownNetwork(_))
        ));
    }

    #[test]
    fn remove_network_recomputes_type() {
        let mut table = two_network_table();
        table.remove_network(&net("b")).expect("remove");
        let score = table.row(2).expect("score");
        assert_eq!(score.resolved_type, ValueType::INTEGER);
        assert!(!score.has_conflicts);
    }

    #[test]
    fn set_attribute_without_slot_is_noop() {
        let mut table = two_network_table();
        let before = table.clone();
        table
            .set_attribute(1, &net("zzz"), Some("name"))
            .expect("noop");
        assert_eq!(table, before);
    }

    #[test]
    fn set_attribute_updates_type_and_packs() {
        let mut table = two_network_table();
        table.set_attribute(2, &net("b"), Some("name")).expect("remap");
        let row = table.row(2).expect("row");
        assert_eq!(row.resolved_type, ValueType::STRING);

        table.set_attribute(2, &net("a"), None).expect("unmap a");
        table.set_attribute(2, &net("b"), None).expect("unmap b");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn set_attribute_rejects_unknown_column() {
        let mut table = two_network_table();
        let result = table.set_attribute(1, &net("a"), Some("missing"));
        assert!(matches!(result, Err(MergeError::InvalidInput(_))));
    }

    #[test]
    fn matching_column_resolves_identity_type() {
        let mut table = MatchingTable::for_nodes();
        table
            .add_network(net("a"), &[col("id", ValueType::INTEGER)])
            .expect("a");
        table
            .add_network(net("b"), &[col("key", ValueType::LONG)])
            .expect("b");
        table.set_matching_column(&net("a"), "id").expect("a id");
        table.set_matching_column(&net("b"), "key").expect("b key");

        let identity = table.identity_row().expect("identity");
        assert_eq!(identity.resolved_type, ValueType::LONG);
        assert!(identity.has_conflicts);
        assert!(table.validate(&[net("a"), net("b")]).is_ok());
    }

    #[test]
    fn validate_requires_identity_for_every_participant() {
        let mut table = two_network_table();
        table.set_matching_column(&net("a"), "name").expect("a");
        let result = table.validate(&[net("a"), net("b")]);
        assert!(matches!(result, Err(MergeError::MissingIdentityMapping(n)) if n == net("b")));
    }

    #[test]
    fn merged_names_stay_unique() {
        let mut table = two_network_table();
        let result = table.set_merged_name(2, "name");
        assert!(matches!(result, Err(MergeError::DuplicateMergedName(_))));
        table.set_merged_name(2, "weight").expect("rename");
        assert_eq!(table.row(2).map(|r| r.merged_name.as_str()), Some("weight"));
    }

    #[test]
    fn validate_rejects_rows_edited_out_of_shape() {
        let mut table = two_network_table();
        table.set_matching_column(&net("a"), "name").expect("a");
        table.set_matching_column(&net("b"), "name").expect("b");
        let participants = [net("a"), net("b")];

        let mut renamed = table.clone();
        renamed.rows[2].merged_name = "name".to_string();
        let result = renamed.validate(&participants);
        assert!(matches!(result, Err(MergeError::DuplicateMergedName(ref n)) if n == "name"));

        let mut retyped = table;
        retyped.rows[2].resolved_type = ValueType::INTEGER;
        let err = retyped.validate(&participants).expect_err("stale type");
        assert_eq!(err.category(), crate::ErrorCategory::Precondition);
    }

    #[test]
    fn list_and_scalar_columns_resolve_to_list_of_string() {
        let mut table = MatchingTable::for_networks();
        table
            .add_network(net("a"), &[col("tags", ValueType::List(ScalarType::Integer))])
            .expect("a");
        table.add_network(net("b"), &[col("tags", ValueType::STRING)]).expect("b");
        assert_eq!(table.row(0).map(|r| r.resolved_type), Some(ValueType::LIST_OF_STRING));
    }
}
