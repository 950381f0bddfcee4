//! # Engine Primitives
//!
//! Fixed constants of the merge engine. These are compiled in and never
//! configurable at runtime: changing any of them changes which nodes and
//! edges are considered identical.

/// Delimiter used when a list value is flattened into one string.
///
/// Applies to identity keys built from list-typed matching attributes and to
/// the string form of list values.
pub const LIST_DELIMITER: &str = ",";

/// Case-insensitive string values treated as missing data.
///
/// Values equal to one of these (after trimming) are never coerced; they
/// pass through casting unchanged and never produce an identity key.
pub const MISSING_VALUE_SENTINELS: [&str; 3] = ["null", "nan", "none"];

/// Default merged name of the reserved identity row (row 0) of a node table.
pub const MATCHING_ATTRIBUTE_NAME: &str = "Matching.Attribute";

/// Default edge attribute holding the interaction label.
pub const DEFAULT_INTERACTION_COLUMN: &str = "interaction";

/// Index of the reserved identity row in a node matching table.
pub const IDENTITY_ROW: usize = 0;

/// Minimum number of networks for an intersection.
pub const MIN_INTERSECTION_NETWORKS: usize = 2;

/// Exact number of networks for a difference (base minus second).
pub const DIFFERENCE_NETWORKS: usize = 2;
