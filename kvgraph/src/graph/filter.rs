// Copyright (c) 2024-2025 kvgraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Filter operators applied to neighbor data
//!
//! Each variant carries its operand in the shape the operator needs, so a
//! typed [`Filter`] is always well formed. [`Filter::parse`] builds one from an
//! operator name and an untyped [`Value`] and rejects shape mismatches.

use crate::storage::types::{GraphError, GraphResult};
use crate::storage::value::Value;
use std::fmt;

/// Predicate over a single field of a node's data
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Value is one of the set
    Eq(Vec<Value>),
    /// Value is none of the set
    Ne(Vec<Value>),
    /// Alias of `Eq`
    In(Vec<Value>),
    Lt(f64),
    Le(f64),
    Gt(f64),
    Ge(f64),
    /// `lo <= value <= hi`
    Range(f64, f64),
}

impl Filter {
    /// Build a filter from an operator name and an untyped operand.
    ///
    /// `eq`, `ne` and `in` take a list, the comparisons take a number and
    /// `range` takes a list of exactly two numbers with `lo <= hi`.
    pub fn parse(operator: &str, operand: Value) -> GraphResult<Filter> {
        let op = operator.to_ascii_lowercase();
        match op.as_str() {
            "eq" | "ne" | "in" => {
                let set = match operand {
                    Value::List(items) => items,
                    other => {
                        return Err(GraphError::validation(format!(
                            "Operator '{}' needs a list of values, {} given",
                            op, other
                        )))
                    }
                };
                Ok(match op.as_str() {
                    "eq" => Filter::Eq(set),
                    "ne" => Filter::Ne(set),
                    _ => Filter::In(set),
                })
            }
            "lt" | "le" | "gt" | "ge" => {
                let bound = operand.as_number().ok_or_else(|| {
                    GraphError::validation(format!(
                        "Operator '{}' needs a number, {} given",
                        op, operand
                    ))
                })?;
                Ok(match op.as_str() {
                    "lt" => Filter::Lt(bound),
                    "le" => Filter::Le(bound),
                    "gt" => Filter::Gt(bound),
                    _ => Filter::Ge(bound),
                })
            }
            "range" => {
                let bounds = match &operand {
                    Value::List(items) if items.len() == 2 => {
                        items[0].as_number().zip(items[1].as_number())
                    }
                    _ => None,
                };
                let (lo, hi) = bounds.ok_or_else(|| {
                    GraphError::validation(format!(
                        "Operator 'range' needs a list of two numbers, {} given",
                        operand
                    ))
                })?;
                if lo > hi {
                    return Err(GraphError::validation(format!(
                        "Range lower bound {} exceeds upper bound {}",
                        lo, hi
                    )));
                }
                Ok(Filter::Range(lo, hi))
            }
            _ => Err(GraphError::validation(format!(
                "Unknown filter operator '{}'",
                operator
            ))),
        }
    }

    pub fn operator(&self) -> &'static str {
        match self {
            Filter::Eq(_) => "eq",
            Filter::Ne(_) => "ne",
            Filter::In(_) => "in",
            Filter::Lt(_) => "lt",
            Filter::Le(_) => "le",
            Filter::Gt(_) => "gt",
            Filter::Ge(_) => "ge",
            Filter::Range(..) => "range",
        }
    }

    /// Test a field value. A missing field is treated as `Null`: it can be
    /// matched by set membership but never by a numeric comparison.
    pub fn matches(&self, value: Option<&Value>) -> bool {
        let value = value.unwrap_or(&Value::Null);
        match self {
            Filter::Eq(set) | Filter::In(set) => set.contains(value),
            Filter::Ne(set) => !set.contains(value),
            Filter::Lt(bound) => value.as_number().map_or(false, |v| v < *bound),
            Filter::Le(bound) => value.as_number().map_or(false, |v| v <= *bound),
            Filter::Gt(bound) => value.as_number().map_or(false, |v| v > *bound),
            Filter::Ge(bound) => value.as_number().map_or(false, |v| v >= *bound),
            Filter::Range(lo, hi) => value
                .as_number()
                .map_or(false, |v| *lo <= v && v <= *hi),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Eq(set) | Filter::Ne(set) | Filter::In(set) => {
                write!(f, "{} {}", self.operator(), Value::List(set.clone()))
            }
            Filter::Lt(b) | Filter::Le(b) | Filter::Gt(b) | Filter::Ge(b) => {
                write!(f, "{} {}", self.operator(), b)
            }
            Filter::Range(lo, hi) => write!(f, "range [{}, {}]", lo, hi),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_checks_operand_shape() {
        assert_eq!(
            Filter::parse("gt", Value::from(3)).unwrap(),
            Filter::Gt(3.0)
        );
        assert_eq!(
            Filter::parse("IN", Value::from(vec![1, 2])).unwrap(),
            Filter::In(vec![Value::from(1), Value::from(2)])
        );

        assert!(matches!(
            Filter::parse("eq", Value::from(3)),
            Err(GraphError::Validation(_))
        ));
        assert!(matches!(
            Filter::parse("lt", Value::from("three")),
            Err(GraphError::Validation(_))
        ));
        assert!(matches!(
            Filter::parse("range", Value::from(vec![1, 2, 3])),
            Err(GraphError::Validation(_))
        ));
        assert!(matches!(
            Filter::parse("range", Value::from(vec![9, 2])),
            Err(GraphError::Validation(_))
        ));
        assert!(matches!(
            Filter::parse("like", Value::from("x")),
            Err(GraphError::Validation(_))
        ));
    }

    #[test]
    fn test_range_is_inclusive() {
        let filter = Filter::Range(2.0, 4.0);
        assert!(filter.matches(Some(&Value::from(2))));
        assert!(filter.matches(Some(&Value::from(4))));
        assert!(!filter.matches(Some(&Value::from(4.0001))));
        assert!(!filter.matches(Some(&Value::from(1))));
    }

    #[test]
    fn test_missing_value_never_compares() {
        assert!(!Filter::Lt(100.0).matches(None));
        assert!(!Filter::Ge(-100.0).matches(Some(&Value::from("7"))));
        assert!(Filter::Eq(vec![Value::Null]).matches(None));
        assert!(Filter::Ne(vec![Value::from(1)]).matches(None));
    }

    #[test]
    fn test_set_membership() {
        let set = vec![Value::from(1), Value::from("a")];
        assert!(Filter::Eq(set.clone()).matches(Some(&Value::from("a"))));
        assert!(!Filter::Ne(set).matches(Some(&Value::from(1))));
    }
}
