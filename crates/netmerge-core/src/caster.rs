//! # Attribute Caster
//!
//! Converts raw source values to the resolved type of their merged
//! attribute. Missing-data markers (`null`, `NaN`, `none`) are never
//! coerced: they pass through so the output keeps the marker.

use crate::matching::MatchingTableRow;
use crate::{AttributeMap, AttributeValue, ColumnRef, MergeError, NetworkId, ScalarType, ValueType};

/// Value coercion into merged attribute types.
pub struct AttributeCaster;

impl AttributeCaster {
    /// Cast one element's source attributes into merged attributes.
    ///
    /// For every row with a live mapping for `network`, the source column is
    /// read from `source_row`; absent cells are skipped, missing-data markers
    /// are copied as-is and everything else is coerced to the row's
    /// resolved type. Output keys are merged names.
    pub fn cast_attributes<'a, I>(
        source_row: Option<&AttributeMap>,
        network: &NetworkId,
        rows: I,
    ) -> Result<AttributeMap, MergeError>
    where
        I: IntoIterator<Item = &'a MatchingTableRow>,
    {
        let mut casted = AttributeMap::new();
        let Some(source_row) = source_row else {
            return Ok(casted);
        };

        for row in rows {
            let Some(column) = row.mapping(network) else {
                continue;
            };
            let Some(raw) = source_row.get(&column.name) else {
                continue;
            };
            let value = if raw.is_missing() {
                raw.clone()
            } else {
                Self::type_coercion(raw, row.resolved_type)?
            };
            casted.insert(row.merged_name.clone(), value);
        }

        Ok(casted)
    }

    /// Set the identity attribute on an already-cast row.
    ///
    /// A missing matching value is recorded as an empty string, or an empty
    /// list when the identity type is a list type.
    pub fn add_merged_attribute(
        casted: &mut AttributeMap,
        matching_value: Option<&AttributeValue>,
        identity_column: &ColumnRef,
    ) -> Result<(), MergeError> {
        let value = match matching_value {
            Some(raw) if !raw.is_missing() => Self::type_coercion(raw, identity_column.value_type)?,
            _ if identity_column.value_type.is_list() => AttributeValue::List(Vec::new()),
            _ => AttributeValue::String(String::new()),
        };
        casted.insert(identity_column.name.clone(), value);
        Ok(())
    }

    /// Coerce a single value into `target`.
    ///
    /// Scalars targeting a list type become one-element lists; list elements
    /// are coerced one by one, keeping missing-data markers.
    pub fn type_coercion(
        value: &AttributeValue,
        target: ValueType,
    ) -> Result<AttributeValue, MergeError> {
        match target {
            ValueType::Scalar(scalar) => Self::coerce_scalar(value, scalar, target),
            ValueType::List(element) => match value {
                AttributeValue::List(items) => items
                    .iter()
                    .map(|item| {
                        if item.is_missing() {
                            Ok(item.clone())
                        } else {
                            Self::coerce_scalar(item, element, target)
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(AttributeValue::List),
                scalar => Ok(AttributeValue::List(vec![Self::coerce_scalar(
                    scalar, element, target,
                )?])),
            },
        }
    }

    fn coerce_scalar(
        value: &AttributeValue,
        scalar: ScalarType,
        target: ValueType,
    ) -> Result<AttributeValue, MergeError> {
        let fail = || MergeError::CastFailed {
            value: value.to_string(),
            target,
        };

        match scalar {
            ScalarType::String => Ok(AttributeValue::String(value.to_string())),
            ScalarType::Boolean => match value {
                AttributeValue::Boolean(b) => Ok(AttributeValue::Boolean(*b)),
                _ => Err(fail()),
            },
            ScalarType::Integer => Self::to_i64(value)
                .and_then(|v| i32::try_from(v).ok())
                .map(AttributeValue::Integer)
                .ok_or_else(fail),
            ScalarType::Long => Self::to_i64(value).map(AttributeValue::Long).ok_or_else(fail),
            ScalarType::Double => {
                let parsed = match value {
                    AttributeValue::Integer(i) => Some(f64::from(*i)),
                    AttributeValue::Long(l) => Some(*l as f64),
                    AttributeValue::Double(d) => Some(*d),
                    AttributeValue::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                };
                parsed
                    .filter(|d| !d.is_nan())
                    .map(AttributeValue::Double)
                    .ok_or_else(fail)
            }
        }
    }

    /// Integral view of a value: integers, whole doubles in range and
    /// base-10 strings.
    fn to_i64(value: &AttributeValue) -> Option<i64> {
        match value {
            AttributeValue::Integer(i) => Some(i64::from(*i)),
            AttributeValue::Long(l) => Some(*l),
            AttributeValue::Double(d) => {
                let in_range = *d >= i64::MIN as f64 && *d < i64::MAX as f64;
                (d.is_finite() && d.fract() == 0.0 && in_range).then_some(*d as i64)
            }
            AttributeValue::String(s) => s.trim().parse::<i64>().ok(),
            AttributeValue::Null | AttributeValue::Boolean(_) | AttributeValue::List(_) => None,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
