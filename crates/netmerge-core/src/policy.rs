//! # Conflict Policy
//!
//! Combines two already-cast attribute maps that describe the same merged
//! node, edge or network.
//!
//! - Key on one side only: kept.
//! - Missing-data marker on the existing side: replaced by the incoming value.
//! - Two lists of the same element type: deduplicated union, existing
//!   elements first.
//! - Two scalars: the first-seen value is kept. Type conflicts between
//!   source columns are surfaced earlier via `MatchingTableRow::has_conflicts`.
//! - A list against a scalar, or lists of different element types: error.
//!   Casting makes this unreachable for values of one merged attribute.

use crate::{AttributeMap, AttributeValue, MergeError};

/// The concrete merge rule for attribute maps.
pub struct ConflictPolicy;

impl ConflictPolicy {
    /// Merge `incoming` into `existing` in place.
    pub fn merge_into(existing: &mut AttributeMap, incoming: &AttributeMap) -> Result<(), MergeError> {
        for (name, value) in incoming {
            match existing.get_mut(name) {
                None => {
                    existing.insert(name.clone(), value.clone());
                }
                Some(current) => Self::merge_value(name, current, value)?,
            }
        }
        Ok(())
    }

    /// Merge two maps into a new one; `first` wins scalar conflicts.
    pub fn merge(first: &AttributeMap, second: &AttributeMap) -> Result<AttributeMap, MergeError> {
        let mut merged = first.clone();
        Self::merge_into(&mut merged, second)?;
        Ok(merged)
    }

    fn merge_value(
        name: &str,
        current: &mut AttributeValue,
        incoming: &AttributeValue,
    ) -> Result<(), MergeError> {
        if incoming.is_missing() {
            return Ok(());
        }
        if current.is_missing() {
            *current = incoming.clone();
            return Ok(());
        }

        let element_types = (current.list_element_type(), incoming.list_element_type());
        match (&mut *current, incoming) {
            (AttributeValue::List(items), AttributeValue::List(more)) => {
                let compatible = match element_types {
                    (Some(a), Some(b)) => a == b,
                    _ => true,
                };
                if !compatible {
                    let left = AttributeValue::List(items.clone());
                    return Err(Self::mismatch(name, &left, incoming));
                }
                for item in more {
                    if !items.contains(item) {
                        items.push(item.clone());
                    }
                }
                Ok(())
            }
            (AttributeValue::List(_), _) | (_, AttributeValue::List(_)) => {
                Err(Self::mismatch(name, current, incoming))
            }
            // Scalar vs scalar: first seen wins.
            _ => Ok(()),
        }
    }

    fn mismatch(name: &str, left: &AttributeValue, right: &AttributeValue) -> MergeError {
        MergeError::TypeMismatch {
            attribute: name.to_string(),
            left: Self::describe(left),
            right: Self::describe(right),
        }
    }

    fn describe(value: &AttributeValue) -> String {
        match value {
            AttributeValue::List(_) => match value.list_element_type() {
                Some(t) => format!("list_of_{}", t.name()),
                None => "list".to_string(),
            },
            scalar => scalar
                .scalar_type()
                .map(|t| t.name().to_string())
                .unwrap_or_else(|| "null".to_string()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
