//! Structural and constraint validation of candidate instances.
//!
//! [`validate`] checks a parsed candidate against a [`Schema`]: shape
//! first (missing fields, type mismatches, unknown literal values), then
//! the per-field constraints. Both kinds of failure land in the same
//! [`ValidationOutcome::Invalid`] channel, each carrying the full dotted
//! field path (`address.street`, `subcomments[0].text`) so corrective
//! feedback can be precise.
//!
//! Recursive schemas validate structurally with no depth limit imposed
//! here; practical depth is bounded by the backend's own output size.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::{Field, FieldType, Schema};

/// Path used when the candidate itself (rather than a field) is at fault.
pub const ROOT_PATH: &str = "$";

/// A single validation failure: which field, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Dotted field path, with `[i]` segments for list elements.
    pub path: String,
    /// What the value must satisfy.
    pub message: String,
}

impl Violation {
    /// Create a new violation.
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Outcome of validating one candidate. Never both.
#[derive(Debug, Clone)]
pub enum ValidationOutcome {
    /// The candidate satisfies every declared constraint. Carries the
    /// normalized instance (omitted optional fields materialized as null).
    Valid(Value),
    /// One or more violations, in schema field order.
    Invalid(Vec<Violation>),
}

impl ValidationOutcome {
    /// Returns `true` for the `Valid` variant.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Validate a candidate instance against a schema.
#[must_use]
pub fn validate(schema: &Schema, candidate: &Value) -> ValidationOutcome {
    let resolver = schema.named_schemas();
    let mut violations = Vec::new();
    let normalized = check_object(schema, candidate, "", &resolver, &mut violations);

    if violations.is_empty() {
        ValidationOutcome::Valid(normalized)
    } else {
        ValidationOutcome::Invalid(violations)
    }
}

fn join_path(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_owned()
    } else {
        format!("{path}.{segment}")
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn check_object(
    schema: &Schema,
    candidate: &Value,
    path: &str,
    resolver: &BTreeMap<&str, &Schema>,
    violations: &mut Vec<Violation>,
) -> Value {
    let Value::Object(map) = candidate else {
        let at = if path.is_empty() { ROOT_PATH } else { path };
        violations.push(Violation::new(
            at,
            format!(
                "expected a {} object, got {}",
                schema.name,
                json_type_name(candidate)
            ),
        ));
        return Value::Null;
    };

    let mut normalized = Map::new();
    for field in &schema.fields {
        let field_path = join_path(path, &field.name);
        match map.get(&field.name) {
            Some(value) => {
                let value = check_field(field, value, &field_path, resolver, violations);
                normalized.insert(field.name.clone(), value);
            }
            None if matches!(field.ty, FieldType::Optional(_)) => {
                normalized.insert(field.name.clone(), Value::Null);
            }
            None => {
                violations.push(Violation::new(
                    field_path,
                    format!("missing required field ({})", field.ty.describe()),
                ));
            }
        }
    }

    Value::Object(normalized)
}

fn check_field(
    field: &Field,
    value: &Value,
    path: &str,
    resolver: &BTreeMap<&str, &Schema>,
    violations: &mut Vec<Violation>,
) -> Value {
    let before = violations.len();
    let normalized = check_value(&field.ty, value, path, resolver, violations);

    // Constraints only make sense once the value has the right shape,
    // and never apply to an absent optional.
    if violations.len() == before && !value.is_null() {
        for constraint in &field.constraints {
            if let Some(message) = constraint.check(value) {
                violations.push(Violation::new(path, message));
            }
        }
    }

    normalized
}

fn check_value(
    ty: &FieldType,
    value: &Value,
    path: &str,
    resolver: &BTreeMap<&str, &Schema>,
    violations: &mut Vec<Violation>,
) -> Value {
    match ty {
        FieldType::String => {
            if value.is_string() {
                value.clone()
            } else {
                mismatch(ty, value, path, violations)
            }
        }
        FieldType::Integer => {
            if value.is_i64() || value.is_u64() {
                value.clone()
            } else {
                mismatch(ty, value, path, violations)
            }
        }
        FieldType::Float => {
            if value.is_number() {
                value.clone()
            } else {
                mismatch(ty, value, path, violations)
            }
        }
        FieldType::Boolean => {
            if value.is_boolean() {
                value.clone()
            } else {
                mismatch(ty, value, path, violations)
            }
        }
        FieldType::Literal(allowed) => match value.as_str() {
            Some(s) if allowed.iter().any(|a| a == s) => value.clone(),
            Some(s) => {
                violations.push(Violation::new(
                    path,
                    format!("\"{s}\" is not allowed; must be exactly one of [{}]", allowed.join(", ")),
                ));
                Value::Null
            }
            None => mismatch(ty, value, path, violations),
        },
        FieldType::Optional(inner) => {
            if value.is_null() {
                Value::Null
            } else {
                check_value(inner, value, path, resolver, violations)
            }
        }
        FieldType::List(inner) => match value.as_array() {
            Some(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let item_path = format!("{path}[{i}]");
                        check_value(inner, item, &item_path, resolver, violations)
                    })
                    .collect(),
            ),
            None => mismatch(ty, value, path, violations),
        },
        FieldType::Nested(schema) => check_object(schema, value, path, resolver, violations),
        FieldType::Reference(name) => match resolver.get(name.as_str()) {
            Some(schema) => check_object(schema, value, path, resolver, violations),
            None => {
                violations.push(Violation::new(
                    path,
                    format!("unknown schema reference `{name}`"),
                ));
                Value::Null
            }
        },
    }
}

fn mismatch(
    ty: &FieldType,
    value: &Value,
    path: &str,
    violations: &mut Vec<Violation>,
) -> Value {
    violations.push(Violation::new(
        path,
        format!("expected {}, got {}", ty.describe(), json_type_name(value)),
    ));
    Value::Null
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::schema::Constraint;
    use serde_json::json;

    fn user_schema() -> Schema {
        Schema::new("UserInfo")
            .field(Field::new("name", FieldType::String))
            .field(Field::new("age", FieldType::Integer).constraint(Constraint::Positive))
    }

    fn comment_schema() -> Schema {
        Schema::new("Comment")
            .field(Field::new("text", FieldType::String).constraint(Constraint::NonEmpty))
            .field(Field::new(
                "subcomments",
                FieldType::list(FieldType::reference("Comment")),
            ))
    }

    fn expect_invalid(outcome: ValidationOutcome) -> Vec<Violation> {
        match outcome {
            ValidationOutcome::Invalid(violations) => violations,
            ValidationOutcome::Valid(value) => panic!("expected Invalid, got Valid({value})"),
        }
    }

    #[test]
    fn valid_candidate_passes() {
        let outcome = validate(&user_schema(), &json!({ "name": "John Doe", "age": 30 }));
        assert!(outcome.is_valid());
    }

    #[test]
    fn constraint_failure_names_field() {
        let violations = expect_invalid(validate(
            &user_schema(),
            &json!({ "name": "John Doe", "age": -10 }),
        ));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "age");
        assert_eq!(violations[0].message, "must be a positive number");
    }

    #[test]
    fn missing_required_field_is_reported() {
        let violations = expect_invalid(validate(&user_schema(), &json!({ "name": "John" })));
        assert_eq!(violations[0].path, "age");
        assert!(violations[0].message.contains("missing required field"));
    }

    #[test]
    fn type_mismatch_is_reported() {
        let violations = expect_invalid(validate(
            &user_schema(),
            &json!({ "name": 42, "age": 30 }),
        ));
        assert_eq!(violations[0].path, "name");
        assert_eq!(violations[0].message, "expected a string, got a number");
    }

    #[test]
    fn nested_failure_reports_dotted_path() {
        let address = Schema::new("Address")
            .field(Field::new("street", FieldType::optional(FieldType::String)))
            .field(Field::new("city", FieldType::String));
        let schema = Schema::new("UserInfo")
            .field(Field::new("name", FieldType::String))
            .field(Field::new("address", FieldType::Nested(address)));

        let violations = expect_invalid(validate(
            &schema,
            &json!({ "name": "John", "address": { "street": 5, "city": "New York" } }),
        ));
        assert_eq!(violations[0].path, "address.street");
    }

    #[test]
    fn deep_recursive_failure_reports_full_chain() {
        // Four levels of nesting; only the deepest node is invalid.
        let candidate = json!({
            "text": "root",
            "subcomments": [{
                "text": "level one",
                "subcomments": [{
                    "text": "level two",
                    "subcomments": [{
                        "text": "",
                        "subcomments": []
                    }]
                }]
            }]
        });

        let violations = expect_invalid(validate(&comment_schema(), &candidate));
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].path,
            "subcomments[0].subcomments[0].subcomments[0].text"
        );
    }

    #[test]
    fn recursive_candidate_validates_without_depth_limit() {
        let mut candidate = json!({ "text": "leaf", "subcomments": [] });
        for level in 0..64 {
            candidate = json!({ "text": format!("level {level}"), "subcomments": [candidate] });
        }
        assert!(validate(&comment_schema(), &candidate).is_valid());
    }

    #[test]
    fn literal_violation_cites_allowed_set() {
        let schema = Schema::new("Intent").field(Field::new(
            "type",
            FieldType::literal(["weather", "stocks", "generic"]),
        ));

        let violations = expect_invalid(validate(&schema, &json!({ "type": "sports" })));
        assert_eq!(violations[0].path, "type");
        assert!(violations[0].message.contains("weather, stocks, generic"));
    }

    #[test]
    fn optional_field_may_be_omitted_and_is_normalized_to_null() {
        let schema = Schema::new("Address")
            .field(Field::new("street", FieldType::optional(FieldType::String)))
            .field(Field::new("city", FieldType::String));

        let outcome = validate(&schema, &json!({ "city": "New York" }));
        match outcome {
            ValidationOutcome::Valid(value) => {
                assert_eq!(value["street"], Value::Null);
                assert_eq!(value["city"], "New York");
            }
            ValidationOutcome::Invalid(violations) => panic!("unexpected: {violations:?}"),
        }
    }

    #[test]
    fn non_object_candidate_reports_root_path() {
        let violations = expect_invalid(validate(&user_schema(), &json!([1, 2, 3])));
        assert_eq!(violations[0].path, ROOT_PATH);
        assert!(violations[0].message.contains("UserInfo"));
    }

    #[test]
    fn unknown_reference_is_a_violation_not_a_panic() {
        let schema = Schema::new("Node").field(Field::new(
            "child",
            FieldType::reference("Missing"),
        ));

        let violations = expect_invalid(validate(&schema, &json!({ "child": {} })));
        assert!(violations[0].message.contains("unknown schema reference"));
    }

    #[test]
    fn multiple_violations_are_all_reported() {
        let violations = expect_invalid(validate(
            &user_schema(),
            &json!({ "name": 1, "age": -3 }),
        ));
        assert_eq!(violations.len(), 2);
    }
}
