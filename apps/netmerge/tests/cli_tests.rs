//! CLI Integration Tests
//!
//! File-based tests of the merge, inspect and init-config commands.

use clap::Parser;
use netmerge::cli::{self, Cli, MergeArgs, align_networks, cmd_init_config, cmd_merge, load_network};
use netmerge::config::NetmergeConfig;
use netmerge_core::{
    AttributeMap, AttributeValue, ErrorCategory, MergeOutcome, NetworkRecord, ValueType,
};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =============================================================================
// TEST HELPERS
// =============================================================================

fn named(name: &str) -> AttributeMap {
    AttributeMap::from([("name".to_string(), AttributeValue::from(name))])
}

fn interaction(label: &str) -> AttributeMap {
    AttributeMap::from([("interaction".to_string(), AttributeValue::from(label))])
}

/// A: x - y. B: y - z.
fn scenario_networks() -> (NetworkRecord, NetworkRecord) {
    let mut a = NetworkRecord::new("A", "A")
        .with_node_column("name", ValueType::STRING)
        .with_edge_column("interaction", ValueType::STRING);
    a.add_node("n1", named("x"));
    a.add_node("n2", named("y"));
    a.add_edge("e1", "n1", "n2", interaction("a"));

    let mut b = NetworkRecord::new("B", "B")
        .with_node_column("name", ValueType::STRING)
        .with_edge_column("interaction", ValueType::STRING);
    b.add_node("n3", named("y"));
    b.add_node("n4", named("z"));
    b.add_edge("e1", "n3", "n4", interaction("a"));

    (a, b)
}

fn write_network(dir: &Path, file: &str, record: &NetworkRecord) -> PathBuf {
    let path = dir.join(file);
    let json = serde_json::to_vec_pretty(record).expect("serialize network");
    std::fs::write(&path, json).expect("write network");
    path
}

/// Temp dir holding `a.json` and `b.json` for the scenario networks.
fn scenario_files() -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let (a, b) = scenario_networks();
    let a_path = write_network(dir.path(), "a.json", &a);
    let b_path = write_network(dir.path(), "b.json", &b);
    (dir, a_path, b_path)
}

fn merge_args(files: Vec<PathBuf>, operation: &str, output: PathBuf) -> MergeArgs {
    MergeArgs {
        files,
        operation: Some(operation.to_string()),
        output: Some(output),
        id: "merged".to_string(),
        ..MergeArgs::default()
    }
}

fn names(outcome: &MergeOutcome) -> Vec<String> {
    outcome
        .record
        .node_values("name")
        .into_iter()
        .map(ToString::to_string)
        .collect()
}

// =============================================================================
// LOADING
// =============================================================================

#[test]
fn load_network_roundtrips_json() {
    let (dir, a_path, _) = scenario_files();
    let loaded = load_network(&a_path).expect("load");
    assert_eq!(loaded, scenario_networks().0);
    drop(dir);
}

#[test]
fn load_network_rejects_missing_and_malformed_files() {
    let dir = TempDir::new().expect("tempdir");
    let missing = load_network(&dir.path().join("nope.json")).expect_err("missing");
    assert_eq!(missing.category(), ErrorCategory::Io);

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, b"{ not json").expect("write");
    let malformed = load_network(&bad).expect_err("malformed");
    assert_eq!(malformed.category(), ErrorCategory::Io);

    let err = load_network(dir.path()).expect_err("directory");
    assert_eq!(err.category(), ErrorCategory::Io);
}

#[test]
fn alignment_uses_identity_overrides() {
    let (_, b) = scenario_networks();
    let mut c = NetworkRecord::new("C", "C").with_node_column("symbol", ValueType::STRING);
    c.add_node(
        "k1",
        AttributeMap::from([("symbol".to_string(), AttributeValue::from("y"))]),
    );

    let overrides = BTreeMap::from([("C".to_string(), "symbol".to_string())]);
    let alignment =
        align_networks(vec![b.clone(), c.clone()], &NetmergeConfig::default(), &overrides)
            .expect("align");
    let identity = alignment.node_table.identity_row().expect("identity row");
    assert_eq!(identity.live_mappings().count(), 2);

    let err = align_networks(vec![b, c], &NetmergeConfig::default(), &BTreeMap::new())
        .expect_err("C has no name column");
    assert_eq!(err.category(), ErrorCategory::Precondition);
}

// =============================================================================
// MERGE COMMAND
// =============================================================================

#[test]
fn merge_union_writes_output() {
    let (dir, a, b) = scenario_files();
    let output = dir.path().join("merged.json");

    let outcome = cmd_merge(
        &NetmergeConfig::default(),
        &merge_args(vec![a, b], "union", output.clone()),
        true,
    )
    .expect("merge");
    assert_eq!(names(&outcome), vec!["x", "y", "z"]);
    assert_eq!(outcome.summary.name, "Union of A, B");

    let written: MergeOutcome =
        serde_json::from_slice(&std::fs::read(&output).expect("read output")).expect("parse");
    assert_eq!(written.record.node_count(), 3);
    assert_eq!(written.record.edge_count(), 2);
}

#[test]
fn merge_operations_follow_file_order() {
    let (dir, a, b) = scenario_files();
    let output = dir.path().join("out.json");
    let config = NetmergeConfig::default();

    let intersection = cmd_merge(
        &config,
        &merge_args(vec![a.clone(), b.clone()], "intersection", output.clone()),
        true,
    )
    .expect("intersection");
    assert_eq!(names(&intersection), vec!["y"]);

    let difference = cmd_merge(
        &config,
        &merge_args(vec![b, a], "difference", output),
        true,
    )
    .expect("difference");
    assert_eq!(names(&difference), vec!["y", "z"]);
}

#[test]
fn merge_uses_config_defaults() {
    let (dir, a, b) = scenario_files();
    let config = NetmergeConfig::from_toml(
        "[merge]\noperation = \"difference\"\nstrict_remove_mode = true\nresult_name = \"Only A\"\n",
    )
    .expect("config");

    let args = MergeArgs {
        files: vec![a, b],
        output: Some(dir.path().join("out.json")),
        id: "merged".to_string(),
        ..MergeArgs::default()
    };
    let outcome = cmd_merge(&config, &args, true).expect("merge");
    assert_eq!(names(&outcome), vec!["x"]);
    assert_eq!(outcome.summary.name, "Only A");
}

#[test]
fn identity_flag_beats_configured_network_columns() {
    let (dir, a, b) = scenario_files();
    let config = NetmergeConfig::from_toml("[identity_columns]\nB = \"gene\"\n").expect("config");
    let args = MergeArgs {
        identity: Some("name".to_string()),
        ..merge_args(vec![a.clone(), b.clone()], "union", dir.path().join("out.json"))
    };
    let outcome = cmd_merge(&config, &args, true).expect("merge");
    assert_eq!(names(&outcome), vec!["x", "y", "z"]);

    let err = cmd_merge(
        &config,
        &merge_args(vec![a, b], "union", dir.path().join("out.json")),
        true,
    )
    .expect_err("B has no gene column");
    assert_eq!(err.category(), ErrorCategory::Precondition);
}

#[test]
fn merge_errors_surface_with_category() {
    let (dir, a, b) = scenario_files();
    let output = dir.path().join("out.json");

    let err = cmd_merge(
        &NetmergeConfig::default(),
        &merge_args(vec![a.clone()], "intersection", output.clone()),
        true,
    )
    .expect_err("one network");
    assert_eq!(err.category(), ErrorCategory::Precondition);

    let err = cmd_merge(
        &NetmergeConfig::default(),
        &merge_args(vec![a.clone(), a], "union", output.clone()),
        true,
    )
    .expect_err("same file twice");
    assert_eq!(err.category(), ErrorCategory::Precondition);
    assert!(!output.exists());

    let nested = dir.path().join("missing").join("out.json");
    let err = cmd_merge(
        &NetmergeConfig::default(),
        &merge_args(vec![b], "union", nested),
        true,
    )
    .expect_err("no such directory");
    assert_eq!(err.category(), ErrorCategory::Io);
}

// =============================================================================
// CLI ENTRY
// =============================================================================

#[test]
fn execute_parsed_command_line() {
    let (dir, a, b) = scenario_files();
    let output = dir.path().join("cli.json");
    let config_path = dir.path().join("netmerge.toml");
    std::fs::write(&config_path, "[merge]\noperation = \"intersection\"\n").expect("config");

    let argv: Vec<OsString> = vec![
        "netmerge".into(),
        "--json-mode".into(),
        "--config".into(),
        config_path.into_os_string(),
        "merge".into(),
        a.into_os_string(),
        b.into_os_string(),
        "-o".into(),
        output.clone().into_os_string(),
    ];
    let cli = Cli::try_parse_from(argv).expect("parse");
    cli::execute(cli).expect("execute");

    let written: MergeOutcome =
        serde_json::from_slice(&std::fs::read(&output).expect("read")).expect("parse");
    assert_eq!(written.record.node_count(), 1);
}

#[test]
fn inspect_runs_on_scenario() {
    let (_dir, a, b) = scenario_files();
    let argv: Vec<OsString> = vec![
        "netmerge".into(),
        "--json-mode".into(),
        "inspect".into(),
        a.into_os_string(),
        b.into_os_string(),
    ];
    let cli = Cli::try_parse_from(argv).expect("parse");
    cli::execute(cli).expect("inspect");
}

// =============================================================================
// INIT-CONFIG COMMAND
// =============================================================================

#[test]
fn init_config_writes_defaults_once() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("netmerge.toml");

    cmd_init_config(&path, false).expect("init");
    let config = NetmergeConfig::load(Some(path.as_path())).expect("load");
    assert_eq!(config, NetmergeConfig::default());

    let err = cmd_init_config(&path, false).expect_err("exists");
    assert_eq!(err.category(), ErrorCategory::Precondition);
    cmd_init_config(&path, true).expect("force");
}
