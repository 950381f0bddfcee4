//! # Type Lattice
//!
//! Convertibility rules between attribute types and the "least compatible
//! type" of a set of types.
//!
//! Scalars form the order `integer ⊑ long ⊑ double ⊑ string`, with
//! `boolean ⊑ string`. Lists follow their element types. `list_of_string`
//! is the top element: any value can be wrapped and stringified into it.
//!
//! The pairwise join is commutative and associative, so folding a set of
//! types gives the same answer for every iteration order.

use crate::{MergeError, ScalarType, ValueType};

/// Type promotion rules for merged attributes.
pub struct TypeLattice;

impl TypeLattice {
    /// Whether a value of scalar type `from` can be losslessly represented
    /// as scalar type `to`.
    #[must_use]
    pub fn scalar_convertible(from: ScalarType, to: ScalarType) -> bool {
        use ScalarType::{Boolean, Double, Integer, Long, String};

        match (from, to) {
            (a, b) if a == b => true,
            (_, String) => true,
            (Integer, Long | Double) => true,
            (Long, Double) => true,
            (Boolean | Integer | Long | Double | String, _) => false,
        }
    }

    /// Whether type `from` can be promoted to type `to`.
    #[must_use]
    pub fn is_convertible(from: ValueType, to: ValueType) -> bool {
        match (from, to) {
            (ValueType::Scalar(a), ValueType::Scalar(b)) => Self::scalar_convertible(a, b),
            (ValueType::List(a), ValueType::List(b)) => Self::scalar_convertible(a, b),
            (ValueType::Scalar(_), ValueType::List(ScalarType::String)) => true,
            (ValueType::Scalar(_), ValueType::List(_)) => false,
            (ValueType::List(_), ValueType::Scalar(_)) => false,
        }
    }

    /// Join of two types.
    ///
    /// Equal types join to themselves. If exactly one direction converts,
    /// its target wins. Otherwise two scalars fall back to `string` and any
    /// other pairing falls back to `list_of_string`.
    #[must_use]
    pub fn combine(a: ValueType, b: ValueType) -> ValueType {
        if a == b {
            return a;
        }
        if Self::is_convertible(a, b) {
            return b;
        }
        if Self::is_convertible(b, a) {
            return a;
        }
        match (a, b) {
            (ValueType::Scalar(_), ValueType::Scalar(_)) => ValueType::STRING,
            (ValueType::List(x), ValueType::List(y)) => {
                // Element types are incompatible scalars, e.g. boolean vs integer.
                ValueType::List(Self::scalar_join(x, y))
            }
            _ => ValueType::LIST_OF_STRING,
        }
    }

    /// Least compatible type of a non-empty set of types.
    ///
    /// Returns `MergeError::InvalidInput` for an empty input.
    pub fn least_compatible_type<I>(types: I) -> Result<ValueType, MergeError>
    where
        I: IntoIterator<Item = ValueType>,
    {
        types
            .into_iter()
            .reduce(Self::combine)
            .ok_or_else(|| {
                MergeError::InvalidInput(
                    "least compatible type requested for an empty set of types".to_string(),
                )
            })
    }

    fn scalar_join(a: ScalarType, b: ScalarType) -> ScalarType {
        if Self::scalar_convertible(a, b) {
            b
        } else if Self::scalar_convertible(b, a) {
            a
        } else {
            ScalarType::String
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
