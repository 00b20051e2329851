//! JSON filter parser.
//!
//! Turns filter documents such as `{"a": {"$gt": 2}, "$or": [...]}` into
//! [`MatchExpr`] trees. The produced tree is unnumbered; callers that plan
//! against it run [`MatchExpr::number`] first.

use mudstone_types::Value;

use crate::error::MatchParseError;
use crate::expr::{MatchExpr, MatchKind};

type Result<T> = std::result::Result<T, MatchParseError>;

/// Parses a filter document into a match expression.
///
/// Top-level clauses combine with an implicit `$and`; a single clause parses
/// to the clause itself, and the empty document parses to the match-all
/// empty conjunction.
pub fn parse_filter(json: &serde_json::Value) -> Result<MatchExpr> {
    let serde_json::Value::Object(map) = json else {
        return Err(MatchParseError::NotADocument(json.to_string()));
    };

    let mut clauses = Vec::with_capacity(map.len());
    for (key, value) in map {
        if let Some(op) = key.strip_prefix('$') {
            clauses.push(parse_logical(op, value)?);
        } else {
            clauses.extend(parse_field_clause(key, value)?);
        }
    }

    Ok(match clauses.len() {
        1 => clauses.pop().expect("one clause present"),
        _ => MatchExpr::and(clauses),
    })
}

fn parse_logical(op: &str, value: &serde_json::Value) -> Result<MatchExpr> {
    match op {
        "and" | "or" | "nor" => {
            let name = format!("${op}");
            let serde_json::Value::Array(elems) = value else {
                return Err(MatchParseError::BadLogicalArray(name));
            };
            if elems.is_empty() {
                return Err(MatchParseError::BadLogicalArray(name));
            }
            let children = elems
                .iter()
                .map(parse_filter)
                .collect::<Result<Vec<_>>>()?;
            Ok(match op {
                "and" => MatchExpr::and(children),
                "or" => MatchExpr::or(children),
                _ => MatchExpr::nor(children),
            })
        }
        other => Err(MatchParseError::UnknownOperator(format!("${other}"))),
    }
}

/// Parses one `field: value` clause, which may expand to several leaves
/// (an operator document lists one comparison per key).
fn parse_field_clause(field: &str, value: &serde_json::Value) -> Result<Vec<MatchExpr>> {
    let Some(ops) = operator_document(value) else {
        // Literal value: plain equality (including object and array values).
        return Ok(vec![MatchExpr::eq(field, Value::from_json(value))]);
    };
    if ops.is_empty() {
        return Err(MatchParseError::MixedOperatorDocument(field.to_string()));
    }

    // $near consumes its sibling $maxDistance.
    let max_distance = ops
        .iter()
        .find(|(op, _)| *op == "$maxDistance")
        .map(|(_, v)| {
            v.as_f64().ok_or_else(|| MatchParseError::BadOperand {
                op: "$maxDistance".into(),
                field: field.to_string(),
                detail: "expected a number".into(),
            })
        })
        .transpose()?;

    let mut leaves = Vec::with_capacity(ops.len());
    for &(op, operand) in &ops {
        match op {
            "$eq" => leaves.push(MatchExpr::eq(field, Value::from_json(operand))),
            "$gt" => leaves.push(MatchExpr::gt(field, Value::from_json(operand))),
            "$gte" => leaves.push(MatchExpr::gte(field, Value::from_json(operand))),
            "$lt" => leaves.push(MatchExpr::lt(field, Value::from_json(operand))),
            "$lte" => leaves.push(MatchExpr::lte(field, Value::from_json(operand))),
            "$ne" => leaves.push(MatchExpr::not(MatchExpr::eq(
                field,
                Value::from_json(operand),
            ))),
            "$in" => {
                let serde_json::Value::Array(elems) = operand else {
                    return Err(MatchParseError::BadOperand {
                        op: "$in".into(),
                        field: field.to_string(),
                        detail: "expected an array".into(),
                    });
                };
                leaves.push(MatchExpr::in_list(
                    field,
                    elems.iter().map(Value::from_json).collect(),
                ));
            }
            "$not" => {
                let negated = parse_field_clause(field, operand)?;
                if negated.is_empty() {
                    return Err(MatchParseError::BadOperand {
                        op: "$not".into(),
                        field: field.to_string(),
                        detail: "expected an operator document".into(),
                    });
                }
                let inner = if negated.len() == 1 {
                    negated.into_iter().next().expect("one clause present")
                } else {
                    MatchExpr::and(negated)
                };
                leaves.push(MatchExpr::not(inner));
            }
            "$elemMatch" => {
                let sub = parse_filter(operand)?;
                // A sub-filter parses to one expression; the array leaf
                // holds its clauses as direct children.
                let children = if matches!(sub.kind(), MatchKind::And(_)) {
                    sub.children().to_vec()
                } else {
                    vec![sub]
                };
                if children.is_empty() {
                    return Err(MatchParseError::BadOperand {
                        op: "$elemMatch".into(),
                        field: field.to_string(),
                        detail: "expected a non-empty filter".into(),
                    });
                }
                leaves.push(MatchExpr::elem_match(field, children));
            }
            "$near" => {
                let point = operand
                    .as_array()
                    .filter(|coords| coords.len() == 2)
                    .and_then(|coords| Some((coords[0].as_f64()?, coords[1].as_f64()?)))
                    .ok_or_else(|| MatchParseError::BadOperand {
                        op: "$near".into(),
                        field: field.to_string(),
                        detail: "expected a [longitude, latitude] pair".into(),
                    })?;
                leaves.push(MatchExpr::near(field, point, max_distance));
            }
            "$maxDistance" => {} // consumed alongside $near
            other => return Err(MatchParseError::UnknownOperator(other.to_string())),
        }
    }

    if leaves.is_empty() {
        return Err(MatchParseError::BadOperand {
            op: "$maxDistance".into(),
            field: field.to_string(),
            detail: "requires a sibling $near".into(),
        });
    }
    Ok(leaves)
}

/// Returns the `(operator, operand)` pairs of an operator document, or None
/// when the value is a literal. A document mixing `$` keys with plain keys
/// maps to an empty list, which callers reject.
fn operator_document(value: &serde_json::Value) -> Option<Vec<(&str, &serde_json::Value)>> {
    let serde_json::Value::Object(map) = value else {
        return None;
    };
    if map.is_empty() || !map.keys().any(|k| k.starts_with('$')) {
        return None;
    }
    if !map.keys().all(|k| k.starts_with('$')) {
        return Some(Vec::new());
    }
    Some(map.iter().map(|(k, v)| (k.as_str(), v)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::MatchKind;
    use serde_json::json;

    #[test]
    fn single_equality_parses_to_bare_leaf() {
        let expr = parse_filter(&json!({"a": 5})).unwrap();
        assert_eq!(expr, MatchExpr::eq("a", 5i64));
    }

    #[test]
    fn multiple_clauses_combine_with_implicit_and() {
        let expr = parse_filter(&json!({"a": 5, "b": {"$gt": 2}})).unwrap();
        assert!(matches!(expr.kind(), MatchKind::And(_)));
        assert_eq!(expr.children().len(), 2);
    }

    #[test]
    fn operator_document_expands_per_operator() {
        let expr = parse_filter(&json!({"a": {"$gt": 2, "$lt": 10}})).unwrap();
        assert!(matches!(expr.kind(), MatchKind::And(_)));
        assert_eq!(
            expr.children(),
            &[MatchExpr::gt("a", 2i64), MatchExpr::lt("a", 10i64)]
        );
    }

    #[test]
    fn or_parses_branch_documents() {
        let expr = parse_filter(&json!({"$or": [{"a": 1}, {"b": {"$lt": 3}}]})).unwrap();
        assert!(matches!(expr.kind(), MatchKind::Or(_)));
        assert_eq!(expr.children().len(), 2);
    }

    #[test]
    fn object_literal_is_equality_not_operators() {
        let expr = parse_filter(&json!({"a": {"b": 1}})).unwrap();
        assert!(matches!(expr.kind(), MatchKind::Compare(_)));
    }

    #[test]
    fn ne_parses_to_negated_equality() {
        let expr = parse_filter(&json!({"a": {"$ne": 3}})).unwrap();
        assert!(matches!(expr.kind(), MatchKind::Not(_)));
    }

    #[test]
    fn near_picks_up_max_distance() {
        let expr =
            parse_filter(&json!({"loc": {"$near": [1.5, 2.5], "$maxDistance": 10.0}})).unwrap();
        match expr.kind() {
            MatchKind::GeoNear(g) => {
                assert_eq!(g.point, (1.5, 2.5));
                assert_eq!(g.max_distance, Some(10.0));
            }
            other => panic!("expected geo-near leaf, got {other:?}"),
        }
    }

    #[test]
    fn empty_filter_is_match_all() {
        let expr = parse_filter(&json!({})).unwrap();
        assert!(matches!(expr.kind(), MatchKind::And(children) if children.is_empty()));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        assert!(matches!(
            parse_filter(&json!({"a": {"$regex": "x"}})),
            Err(MatchParseError::UnknownOperator(_))
        ));
        assert!(matches!(
            parse_filter(&json!({"$xor": [{"a": 1}]})),
            Err(MatchParseError::UnknownOperator(_))
        ));
    }

    #[test]
    fn logical_operators_require_document_arrays() {
        assert!(matches!(
            parse_filter(&json!({"$or": []})),
            Err(MatchParseError::BadLogicalArray(_))
        ));
        assert!(matches!(
            parse_filter(&json!({"$and": {"a": 1}})),
            Err(MatchParseError::BadLogicalArray(_))
        ));
    }

    #[test]
    fn mixed_operator_and_literal_keys_are_rejected() {
        assert!(matches!(
            parse_filter(&json!({"a": {"$gt": 1, "b": 2}})),
            Err(MatchParseError::MixedOperatorDocument(_))
        ));
    }

    #[test]
    fn parsed_filters_evaluate() {
        let expr = parse_filter(&json!({
            "$or": [
                {"a": {"$gt": 2, "$lt": 10}},
                {"b": {"$in": [1, 2, 3]}}
            ]
        }))
        .unwrap();
        assert!(expr.matches(&json!({"a": 5})));
        assert!(expr.matches(&json!({"a": 50, "b": 2})));
        assert!(!expr.matches(&json!({"a": 50, "b": 9})));
    }
}
