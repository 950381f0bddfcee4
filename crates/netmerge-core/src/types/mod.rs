//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the merge engine:
//! - Identifiers (`NetworkId`, `NodeId`, `EdgeId`)
//! - The attribute type system (`ScalarType`, `ValueType`)
//! - Attribute values (`AttributeValue`, `AttributeMap`)
//! - Column references (`ColumnRef`)
//! - Error types (`MergeError`, `ErrorCategory`)
//!
//! ## Determinism Guarantees
//!
//! All maps keyed by names or ids are `BTreeMap`s so that iteration order,
//! and therefore merge output, never depends on hashing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::primitives::{LIST_DELIMITER, MISSING_VALUE_SENTINELS};

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a source (or merged) network.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(pub String);

impl NetworkId {
    /// Create a network id from anything string-like.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a node in a merged graph.
///
/// Merged ids are dense: node `n` lives at index `n` of the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

/// Identifier of an edge in a merged graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub u64);

/// Which kind of graph element a table, id or error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Node,
    Edge,
    Network,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node => f.write_str("node"),
            Self::Edge => f.write_str("edge"),
            Self::Network => f.write_str("network"),
        }
    }
}

// =============================================================================
// TYPE SYSTEM
// =============================================================================

/// A scalar attribute type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScalarType {
    String,
    Boolean,
    Integer,
    Long,
    Double,
}

impl ScalarType {
    /// All scalar types, in declaration order.
    pub const ALL: [ScalarType; 5] = [
        ScalarType::String,
        ScalarType::Boolean,
        ScalarType::Integer,
        ScalarType::Long,
        ScalarType::Double,
    ];

    /// Canonical lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Double => "double",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

/// The type of an attribute column: a scalar or a homogeneous list of scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ValueType {
    Scalar(ScalarType),
    List(ScalarType),
}

impl ValueType {
    pub const STRING: ValueType = ValueType::Scalar(ScalarType::String);
    pub const BOOLEAN: ValueType = ValueType::Scalar(ScalarType::Boolean);
    pub const INTEGER: ValueType = ValueType::Scalar(ScalarType::Integer);
    pub const LONG: ValueType = ValueType::Scalar(ScalarType::Long);
    pub const DOUBLE: ValueType = ValueType::Scalar(ScalarType::Double);
    pub const LIST_OF_STRING: ValueType = ValueType::List(ScalarType::String);

    /// Whether this is a list type.
    #[must_use]
    pub const fn is_list(self) -> bool {
        matches!(self, Self::List(_))
    }

    /// The scalar type, or the element type of a list.
    #[must_use]
    pub const fn element(self) -> ScalarType {
        match self {
            Self::Scalar(t) | Self::List(t) => t,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(t) => f.write_str(t.name()),
            Self::List(t) => write!(f, "list_of_{}", t.name()),
        }
    }
}

impl FromStr for ValueType {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let parsed = match normalized.strip_prefix("list_of_") {
            Some(element) => ScalarType::from_name(element).map(ValueType::List),
            None => ScalarType::from_name(&normalized).map(ValueType::Scalar),
        };
        parsed.ok_or_else(|| MergeError::InvalidInput(format!("Unknown value type '{}'", s)))
    }
}

impl TryFrom<String> for ValueType {
    type Error = MergeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ValueType> for String {
    fn from(value: ValueType) -> Self {
        value.to_string()
    }
}

// =============================================================================
// ATTRIBUTE VALUES
// =============================================================================

/// A single attribute value as stored in a node, edge or network table.
///
/// The JSON form is untagged: `null`, `true`, `42`, `4294967296`, `1.5`,
/// `"text"` and `[...]` map onto the variants in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Double(f64),
    String(String),
    List(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Whether this value is a missing-data marker.
    ///
    /// Markers are `Null`, a NaN double, and the strings `null`, `nan` and
    /// `none` in any letter case.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Double(d) => d.is_nan(),
            Self::String(s) => {
                let trimmed = s.trim();
                MISSING_VALUE_SENTINELS
                    .iter()
                    .any(|sentinel| trimmed.eq_ignore_ascii_case(sentinel))
            }
            _ => false,
        }
    }

    /// The scalar type of this value, if it is a non-null scalar.
    #[must_use]
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            Self::Boolean(_) => Some(ScalarType::Boolean),
            Self::Integer(_) => Some(ScalarType::Integer),
            Self::Long(_) => Some(ScalarType::Long),
            Self::Double(_) => Some(ScalarType::Double),
            Self::String(_) => Some(ScalarType::String),
            Self::Null | Self::List(_) => None,
        }
    }

    /// Element type of a list value.
    ///
    /// Returns `None` for scalars and for lists whose elements are all
    /// missing (such lists are compatible with any other list).
    #[must_use]
    pub fn list_element_type(&self) -> Option<ScalarType> {
        match self {
            Self::List(items) => items
                .iter()
                .filter(|item| !item.is_missing())
                .find_map(AttributeValue::scalar_type),
            _ => None,
        }
    }

    /// Whether this value is a list.
    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Long(l) => write!(f, "{}", l),
            Self::Double(d) => write!(f, "{}", d),
            Self::String(s) => f.write_str(s),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(LIST_DELIMITER)?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Integer(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

/// Attribute name -> value, for one node, edge or network.
pub type AttributeMap = BTreeMap<String, AttributeValue>;

// =============================================================================
// COLUMNS
// =============================================================================

/// A named, typed column of a source attribute table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
}

impl ColumnRef {
    /// Create a new column reference.
    #[must_use]
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Broad class of a [`MergeError`], used by collaborators to decide how to
/// present the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad or missing inputs; nothing was attempted.
    Precondition,
    /// Duplicate element ids inside one source network.
    Identity,
    /// A value could not be coerced to its merged type.
    Cast,
    /// Two already-cast values could not be combined.
    Conflict,
    /// Merged attribute names collide.
    Naming,
    /// File or serialization failures outside the engine.
    Io,
}

/// Errors that can occur while preparing or running a merge.
///
/// - No partial output: any error discards the merge in progress
/// - The engine never panics; all errors propagate to the caller
#[derive(Debug, Error)]
pub enum MergeError {
    /// A participant id does not name any supplied network.
    #[error("Unknown network: {0}")]
    UnknownNetwork(NetworkId),

    /// A participant has no matching (identity) column in the node table.
    #[error("Network {0} has no matching attribute mapped")]
    MissingIdentityMapping(NetworkId),

    /// The operation was given the wrong number of networks.
    #[error("{operation} requires {expected} networks, got {actual}")]
    NetworkCount {
        operation: &'static str,
        expected: &'static str,
        actual: usize,
    },

    /// Any other malformed input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A node or edge id occurs twice inside one source network.
    #[error("Duplicate {kind} id '{id}' in network {network}")]
    DuplicateElementId {
        network: NetworkId,
        kind: ElementKind,
        id: String,
    },

    /// A raw value cannot be coerced to the merged attribute type.
    #[error("Cannot cast '{value}' to {target}")]
    CastFailed { value: String, target: ValueType },

    /// Two already-cast values of one attribute have incompatible shapes.
    #[error("Type mismatch merging attribute '{attribute}': {left} vs {right}")]
    TypeMismatch {
        attribute: String,
        left: String,
        right: String,
    },

    /// Two matching-table rows share a merged name.
    #[error("Duplicate merged attribute name '{0}'")]
    DuplicateMergedName(String),

    /// An I/O error occurred (CLI layer).
    #[error("I/O error: {0}")]
    IoError(String),

    /// A serialization or deserialization error occurred (CLI layer).
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl MergeError {
    /// The category this error belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownNetwork(_)
            | Self::MissingIdentityMapping(_)
            | Self::NetworkCount { .. }
            | Self::InvalidInput(_) => ErrorCategory::Precondition,
            Self::DuplicateElementId { .. } => ErrorCategory::Identity,
            Self::CastFailed { .. } => ErrorCategory::Cast,
            Self::TypeMismatch { .. } => ErrorCategory::Conflict,
            Self::DuplicateMergedName(_) => ErrorCategory::Naming,
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::Io,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
