//! # netmerge
//!
//! Command-line front end of the netmerge-core engine: loads networks from
//! JSON files, aligns their attribute schemas, runs a merge and writes the
//! merged network back as JSON.

pub mod cli;
pub mod config;
