//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::MergeArgs;
use crate::config::NetmergeConfig;
use netmerge_core::{
    ColumnRef, MatchingTable, MergeError, MergeOperation, MergeOptions, MergeOutcome, MergeRequest,
    NetworkId, NetworkMerger, NetworkRecord, NetworkSummary, ValueType,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE ACCESS
// =============================================================================

/// Largest network file `load_network` accepts (500 MB).
const MAX_NETWORK_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Read a network file. Directories and oversized files are refused before
/// any bytes are read.
fn read_input(path: &Path) -> Result<Vec<u8>, MergeError> {
    let io_error = |e: std::io::Error| MergeError::IoError(format!("{}: {}", path.display(), e));
    let metadata = std::fs::metadata(path).map_err(io_error)?;

    if !metadata.is_file() {
        return Err(MergeError::IoError(format!(
            "{} is not a network file",
            path.display()
        )));
    }
    if metadata.len() > MAX_NETWORK_FILE_SIZE {
        return Err(MergeError::IoError(format!(
            "{} holds {} bytes, over the {} byte limit for networks",
            path.display(),
            metadata.len(),
            MAX_NETWORK_FILE_SIZE
        )));
    }

    std::fs::read(path).map_err(io_error)
}

/// Write a result or config file. Missing directories are not created.
fn write_output(path: &Path, contents: &str) -> Result<(), MergeError> {
    std::fs::write(path, contents)
        .map_err(|e| MergeError::IoError(format!("Write {}: {}", path.display(), e)))
}

// =============================================================================
// LOADING & ALIGNMENT
// =============================================================================

/// Load one network record from a JSON file.
pub fn load_network(path: &Path) -> Result<NetworkRecord, MergeError> {
    let contents = read_input(path)?;
    let record: NetworkRecord = serde_json::from_slice(&contents).map_err(|e| {
        MergeError::SerializationError(format!("Parse network '{}': {}", path.display(), e))
    })?;

    tracing::info!(
        network = %record.id,
        nodes = record.node_count(),
        edges = record.edge_count(),
        "Loaded {:?}",
        path
    );
    Ok(record)
}

/// Loaded networks and their aligned matching tables.
#[derive(Debug, Clone)]
pub struct Alignment {
    /// Participants in file order.
    pub participants: Vec<NetworkId>,
    pub networks: BTreeMap<NetworkId, NetworkRecord>,
    pub node_table: MatchingTable,
    pub edge_table: MatchingTable,
    pub network_table: MatchingTable,
}

/// Align the schemas of `records` and pick each network's identity column.
///
/// `identity_for` maps network ids to identity columns and wins over the
/// config.
pub fn align_networks(
    records: Vec<NetworkRecord>,
    config: &NetmergeConfig,
    identity_for: &BTreeMap<String, String>,
) -> Result<Alignment, MergeError> {
    let mut alignment = Alignment {
        participants: Vec::with_capacity(records.len()),
        networks: BTreeMap::new(),
        node_table: MatchingTable::for_nodes(),
        edge_table: MatchingTable::for_edges(),
        network_table: MatchingTable::for_networks(),
    };

    for record in records {
        let id = record.id.clone();
        if alignment.networks.contains_key(&id) {
            return Err(MergeError::InvalidInput(format!(
                "network {} is loaded twice",
                id
            )));
        }

        let identity = identity_for
            .get(id.as_str())
            .map_or_else(|| config.identity_column_for(&id), String::as_str);

        alignment
            .node_table
            .add_network(id.clone(), &record.node_table.columns)?;
        alignment.node_table.set_matching_column(&id, identity)?;
        alignment
            .edge_table
            .add_network(id.clone(), &record.edge_table.columns)?;
        alignment
            .network_table
            .add_network(id.clone(), &property_columns(&record.summary))?;

        alignment.participants.push(id.clone());
        alignment.networks.insert(id, record);
    }

    Ok(alignment)
}

/// Columns describing a summary's properties, typed from their values.
///
/// Properties holding only missing-data markers carry no type and are left
/// out.
fn property_columns(summary: &NetworkSummary) -> Vec<ColumnRef> {
    summary
        .properties
        .iter()
        .filter_map(|(name, value)| {
            let value_type = if value.is_list() {
                value.list_element_type().map(ValueType::List)
            } else {
                value.scalar_type().map(ValueType::Scalar)
            };
            value_type.map(|t| ColumnRef::new(name.clone(), t))
        })
        .collect()
}

/// Apply the `--identity` flag. It names the identity column of every
/// network and replaces the per-network columns from the config; only
/// `--identity-for` overrides it.
fn with_identity_flag(config: &NetmergeConfig, identity: Option<&str>) -> NetmergeConfig {
    let mut config = config.clone();
    if let Some(identity) = identity {
        config.identity_column = identity.to_string();
        config.identity_columns.clear();
    }
    config
}

/// Parse `NETWORK=COLUMN` pairs.
fn parse_identity_overrides(pairs: &[String]) -> Result<BTreeMap<String, String>, MergeError> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .filter(|(network, column)| !network.is_empty() && !column.is_empty())
                .map(|(network, column)| (network.to_string(), column.to_string()))
                .ok_or_else(|| {
                    MergeError::InvalidInput(format!(
                        "Expected NETWORK=COLUMN, got '{}'",
                        pair
                    ))
                })
        })
        .collect()
}

/// Merge options: config defaults overridden by command-line flags.
pub fn resolve_options(config: &NetmergeConfig, args: &MergeArgs) -> Result<MergeOptions, MergeError> {
    let mut options = config.merge.clone();
    if let Some(operation) = &args.operation {
        options.operation = operation.parse::<MergeOperation>()?;
    }
    options.merge_within_network |= args.within_network;
    options.merge_only_nodes |= args.only_nodes;
    options.strict_remove_mode |= args.strict;
    if let Some(column) = &args.interaction_column {
        options.interaction_column.clone_from(column);
    }
    if args.name.is_some() {
        options.result_name.clone_from(&args.name);
    }
    Ok(options)
}

// =============================================================================
// MERGE COMMAND
// =============================================================================

/// Merge the networks named by `args` and write the outcome as JSON.
pub fn cmd_merge(
    config: &NetmergeConfig,
    args: &MergeArgs,
    json_mode: bool,
) -> Result<MergeOutcome, MergeError> {
    let options = resolve_options(config, args)?;
    let config = with_identity_flag(config, args.identity.as_deref());
    let overrides = parse_identity_overrides(&args.identity_for)?;

    let records = args
        .files
        .iter()
        .map(|path| load_network(path))
        .collect::<Result<Vec<_>, _>>()?;
    let alignment = align_networks(records, &config, &overrides)?;

    let outcome = NetworkMerger::merge(&MergeRequest {
        result_id: NetworkId::new(args.id.clone()),
        participants: alignment.participants.clone(),
        networks: &alignment.networks,
        node_table: &alignment.node_table,
        edge_table: &alignment.edge_table,
        network_table: Some(&alignment.network_table),
        options,
    })?;

    let rendered = serde_json::to_string_pretty(&outcome)
        .map_err(|e| MergeError::SerializationError(format!("Serialize result: {}", e)))?;

    match &args.output {
        Some(path) => {
            write_output(path, &rendered)?;
            report_merge(&outcome, Some(path), json_mode);
        }
        None => println!("{}", rendered),
    }

    Ok(outcome)
}

fn report_merge(outcome: &MergeOutcome, path: Option<&Path>, json_mode: bool) {
    let stats = &outcome.stats;
    if json_mode {
        let output = serde_json::json!({
            "success": true,
            "name": outcome.summary.name,
            "output": path.map(|p| p.to_string_lossy().to_string()),
            "stats": stats,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return;
    }

    println!("Merged network: {}", outcome.summary.name);
    println!("=================");
    if let Some(path) = path {
        println!("Output:        {:?}", path);
    }
    println!("Input nodes:   {}", stats.input_nodes);
    println!("Input edges:   {}", stats.input_edges);
    println!("Merged nodes:  {}", stats.merged_nodes);
    println!("Merged edges:  {}", stats.merged_edges);
    println!("Matched nodes: {}", stats.matched_nodes);
    println!("Matched edges: {}", stats.matched_edges);
    println!("Removed nodes: {}", stats.removed_nodes);
}

// =============================================================================
// INSPECT COMMAND
// =============================================================================

/// Print the aligned node, edge and network tables.
pub fn cmd_inspect(
    config: &NetmergeConfig,
    files: &[PathBuf],
    identity: Option<&str>,
    json_mode: bool,
) -> Result<(), MergeError> {
    let config = with_identity_flag(config, identity);
    let records = files
        .iter()
        .map(|path| load_network(path))
        .collect::<Result<Vec<_>, _>>()?;
    let alignment = align_networks(records, &config, &BTreeMap::new())?;

    let tables = [
        ("nodes", &alignment.node_table),
        ("edges", &alignment.edge_table),
        ("network", &alignment.network_table),
    ];

    if json_mode {
        let output: serde_json::Map<String, serde_json::Value> = tables
            .iter()
            .map(|(label, table)| {
                let conflicts: Vec<&str> = table
                    .conflicting_rows()
                    .map(|(_, row)| row.merged_name.as_str())
                    .collect();
                (
                    (*label).to_string(),
                    serde_json::json!({
                        "columns": table.output_columns(),
                        "conflicts": conflicts,
                        "table": table,
                    }),
                )
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    for (label, table) in tables {
        println!("{} table", label);
        println!("{}", "-".repeat(label.len() + 6));
        for (row_id, row) in table.rows().iter().enumerate() {
            let marker = if row.has_conflicts { " (conflict)" } else { "" };
            println!(
                "  [{}] {} : {}{}",
                row_id, row.merged_name, row.resolved_type, marker
            );
            for network in &alignment.participants {
                match row.mapping(network) {
                    Some(column) => {
                        println!("        {} <- {} ({})", network, column.name, column.value_type);
                    }
                    None => println!("        {} <- -", network),
                }
            }
        }
        println!();
    }

    Ok(())
}

// =============================================================================
// INIT-CONFIG COMMAND
// =============================================================================

/// Write a configuration file holding the defaults.
pub fn cmd_init_config(output: &Path, force: bool) -> Result<(), MergeError> {
    if output.exists() && !force {
        return Err(MergeError::InvalidInput(format!(
            "'{}' already exists (use --force to overwrite)",
            output.display()
        )));
    }

    let text = NetmergeConfig::default().to_toml()?;
    write_output(output, &text)?;

    println!("Wrote configuration to {:?}", output);
    Ok(())
}
