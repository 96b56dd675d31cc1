//! Target record definitions.
//!
//! A [`Schema`] describes the record an extraction call should produce:
//! named fields with semantic types and optional per-field constraints.
//! Schemas may reference themselves through [`FieldType::Reference`], a
//! named forward reference resolved lazily at validation and rendering
//! time, so recursive shapes (a comment tree, for example) never require
//! eager expansion.
//!
//! [`Schema::to_hint`] renders the definition into a JSON Schema document
//! suitable for a backend's structured-output mode.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value, json};

/// A named record definition.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Schema name, also used as the reference target for recursion.
    pub name: String,
    /// Optional description shown to the backend.
    pub description: Option<String>,
    /// Ordered field definitions.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema with the given name.
    ///
    /// Names must be unique within a tree of nested definitions: the
    /// name is the target for [`FieldType::Reference`] and the `$defs`
    /// key in rendered hints. When duplicates occur, the outermost
    /// definition wins.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: Vec::new(),
        }
    }

    /// Set the schema description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a field.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Collect every named schema reachable from this one, keyed by name.
    ///
    /// References do not expand during the walk, so the traversal
    /// terminates even for self-referential schemas. Duplicate names
    /// resolve to the definition encountered first, never a mix.
    pub(crate) fn named_schemas(&self) -> BTreeMap<&str, &Self> {
        let mut found = BTreeMap::new();
        let mut stack = vec![self];
        while let Some(schema) = stack.pop() {
            if let Entry::Vacant(slot) = found.entry(schema.name.as_str()) {
                slot.insert(schema);
                for field in &schema.fields {
                    field.ty.collect_nested(&mut stack);
                }
            }
        }
        found
    }

    /// Render this schema into a backend-consumable hint.
    #[must_use]
    pub fn to_hint(&self) -> SchemaHint {
        let mut body = self.render_object();

        // Recursive shapes need every named schema available under $defs
        // so that $ref targets resolve.
        if self.contains_reference()
            && let Value::Object(map) = &mut body
        {
            let defs: Map<String, Value> = self
                .named_schemas()
                .into_iter()
                .map(|(name, schema)| (name.to_owned(), schema.render_object()))
                .collect();
            map.insert("$defs".to_owned(), Value::Object(defs));
        }

        SchemaHint {
            name: self.name.clone(),
            schema: body,
        }
    }

    fn contains_reference(&self) -> bool {
        self.named_schemas()
            .values()
            .any(|schema| schema.fields.iter().any(|f| f.ty.has_reference()))
    }

    fn render_object(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in &self.fields {
            properties.insert(field.name.clone(), field.render());
            if !matches!(field.ty, FieldType::Optional(_)) {
                required.push(Value::String(field.name.clone()));
            }
        }

        let mut object = Map::new();
        object.insert("type".to_owned(), Value::String("object".to_owned()));
        if let Some(description) = &self.description {
            object.insert(
                "description".to_owned(),
                Value::String(description.clone()),
            );
        }
        object.insert("properties".to_owned(), Value::Object(properties));
        object.insert("required".to_owned(), Value::Array(required));
        object.insert("additionalProperties".to_owned(), Value::Bool(false));
        Value::Object(object)
    }
}

/// A rendered schema hint: the structural description handed to the
/// completion backend alongside the conversation.
#[derive(Debug, Clone)]
pub struct SchemaHint {
    /// Name of the target schema.
    pub name: String,
    /// JSON Schema document describing the target shape.
    pub schema: Value,
}

/// A single field in a [`Schema`].
#[derive(Debug, Clone)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Semantic type of the field.
    pub ty: FieldType,
    /// Optional description shown to the backend.
    pub description: Option<String>,
    /// Constraints the extracted value must satisfy.
    pub constraints: Vec<Constraint>,
}

impl Field {
    /// Create a new field with the given name and type.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            description: None,
            constraints: Vec::new(),
        }
    }

    /// Set the field description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a constraint.
    #[must_use]
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    fn render(&self) -> Value {
        let mut rendered = self.ty.render();

        if let Value::Object(map) = &mut rendered {
            // Fold constraint text into the description so text-mode
            // backends see the requirements too.
            let mut description = self.description.clone().unwrap_or_default();
            for constraint in &self.constraints {
                if !description.is_empty() {
                    description.push_str("; ");
                }
                description.push_str(&constraint.describe());
            }
            if !description.is_empty() {
                map.insert("description".to_owned(), Value::String(description));
            }

            for constraint in &self.constraints {
                constraint.render_keywords(map);
            }
        }

        rendered
    }
}

/// Semantic type of a schema field.
#[derive(Debug, Clone)]
pub enum FieldType {
    /// UTF-8 string.
    String,
    /// Integer number.
    Integer,
    /// Floating-point number.
    Float,
    /// Boolean.
    Boolean,
    /// Exactly one of a closed set of string values.
    Literal(Vec<String>),
    /// Present or null.
    Optional(Box<FieldType>),
    /// Homogeneous list of the inner type.
    List(Box<FieldType>),
    /// Inline nested record.
    Nested(Schema),
    /// Named reference to a schema, resolved lazily. This is how a
    /// schema refers to itself.
    Reference(String),
}

impl FieldType {
    /// Create a literal type from a set of allowed values.
    #[must_use]
    pub fn literal<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Literal(values.into_iter().map(Into::into).collect())
    }

    /// Wrap a type as optional.
    #[must_use]
    pub fn optional(inner: Self) -> Self {
        Self::Optional(Box::new(inner))
    }

    /// Create a list of the inner type.
    #[must_use]
    pub fn list(inner: Self) -> Self {
        Self::List(Box::new(inner))
    }

    /// Create a named reference.
    #[must_use]
    pub fn reference(name: impl Into<String>) -> Self {
        Self::Reference(name.into())
    }

    fn collect_nested<'a>(&'a self, stack: &mut Vec<&'a Schema>) {
        match self {
            Self::Nested(schema) => stack.push(schema),
            Self::Optional(inner) | Self::List(inner) => inner.collect_nested(stack),
            Self::String
            | Self::Integer
            | Self::Float
            | Self::Boolean
            | Self::Literal(_)
            | Self::Reference(_) => {}
        }
    }

    fn has_reference(&self) -> bool {
        match self {
            Self::Reference(_) => true,
            Self::Optional(inner) | Self::List(inner) => inner.has_reference(),
            Self::Nested(schema) => schema.fields.iter().any(|f| f.ty.has_reference()),
            Self::String | Self::Integer | Self::Float | Self::Boolean | Self::Literal(_) => false,
        }
    }

    fn render(&self) -> Value {
        match self {
            Self::String => json!({ "type": "string" }),
            Self::Integer => json!({ "type": "integer" }),
            Self::Float => json!({ "type": "number" }),
            Self::Boolean => json!({ "type": "boolean" }),
            Self::Literal(values) => json!({ "type": "string", "enum": values }),
            Self::Optional(inner) => json!({ "anyOf": [inner.render(), { "type": "null" }] }),
            Self::List(inner) => json!({ "type": "array", "items": inner.render() }),
            Self::Nested(schema) => schema.render_object(),
            Self::Reference(name) => json!({ "$ref": format!("#/$defs/{name}") }),
        }
    }

    /// Human-readable name of the type, used in violation messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::String => "a string".to_owned(),
            Self::Integer => "an integer".to_owned(),
            Self::Float => "a number".to_owned(),
            Self::Boolean => "a boolean".to_owned(),
            Self::Literal(values) => format!("one of [{}]", values.join(", ")),
            Self::Optional(inner) => format!("{} or null", inner.describe()),
            Self::List(inner) => format!("a list of {}", inner.describe()),
            Self::Nested(schema) => format!("a {} object", schema.name),
            Self::Reference(name) => format!("a {name} object"),
        }
    }
}

/// A per-field constraint on the extracted value.
///
/// Constraint sets are never checked for satisfiability: a field
/// constrained to be both greater than 18 and less than 0 is
/// representable and will simply fail validation on every attempt.
#[derive(Clone)]
pub enum Constraint {
    /// Value must be greater than or equal to the bound.
    Min(f64),
    /// Value must be less than or equal to the bound.
    Max(f64),
    /// Value must be strictly greater than the bound.
    ExclusiveMin(f64),
    /// Value must be strictly less than the bound.
    ExclusiveMax(f64),
    /// Value must be a positive number.
    Positive,
    /// String or list must be non-empty.
    NonEmpty,
    /// Arbitrary predicate over the candidate value.
    Predicate {
        /// Failure message, also shown to the backend as a requirement.
        description: String,
        /// The predicate itself.
        check: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
    },
}

impl Constraint {
    /// Create a custom predicate constraint.
    #[must_use]
    pub fn predicate<F>(description: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::Predicate {
            description: description.into(),
            check: Arc::new(check),
        }
    }

    /// Evaluate the constraint, returning the failure message if the
    /// value does not satisfy it.
    #[must_use]
    pub fn check(&self, value: &Value) -> Option<String> {
        let ok = match self {
            Self::Min(bound) => value.as_f64().is_some_and(|v| v >= *bound),
            Self::Max(bound) => value.as_f64().is_some_and(|v| v <= *bound),
            Self::ExclusiveMin(bound) => value.as_f64().is_some_and(|v| v > *bound),
            Self::ExclusiveMax(bound) => value.as_f64().is_some_and(|v| v < *bound),
            Self::Positive => value.as_f64().is_some_and(|v| v > 0.0),
            Self::NonEmpty => match value {
                Value::String(s) => !s.is_empty(),
                Value::Array(items) => !items.is_empty(),
                _ => false,
            },
            Self::Predicate { check, .. } => check(value),
        };

        if ok { None } else { Some(self.describe()) }
    }

    /// Human-readable requirement, used both in the schema hint and in
    /// violation messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Min(bound) => format!("must be greater than or equal to {bound}"),
            Self::Max(bound) => format!("must be less than or equal to {bound}"),
            Self::ExclusiveMin(bound) => format!("must be greater than {bound}"),
            Self::ExclusiveMax(bound) => format!("must be less than {bound}"),
            Self::Positive => "must be a positive number".to_owned(),
            Self::NonEmpty => "must not be empty".to_owned(),
            Self::Predicate { description, .. } => description.clone(),
        }
    }

    fn render_keywords(&self, map: &mut Map<String, Value>) {
        match self {
            Self::Min(bound) => {
                map.insert("minimum".to_owned(), json!(bound));
            }
            Self::Max(bound) => {
                map.insert("maximum".to_owned(), json!(bound));
            }
            Self::ExclusiveMin(bound) => {
                map.insert("exclusiveMinimum".to_owned(), json!(bound));
            }
            Self::ExclusiveMax(bound) => {
                map.insert("exclusiveMaximum".to_owned(), json!(bound));
            }
            Self::Positive => {
                map.insert("exclusiveMinimum".to_owned(), json!(0));
            }
            // No standard keyword that covers both strings and arrays;
            // the description carries the requirement.
            Self::NonEmpty | Self::Predicate { .. } => {}
        }
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Min(bound) => f.debug_tuple("Min").field(bound).finish(),
            Self::Max(bound) => f.debug_tuple("Max").field(bound).finish(),
            Self::ExclusiveMin(bound) => f.debug_tuple("ExclusiveMin").field(bound).finish(),
            Self::ExclusiveMax(bound) => f.debug_tuple("ExclusiveMax").field(bound).finish(),
            Self::Positive => f.write_str("Positive"),
            Self::NonEmpty => f.write_str("NonEmpty"),
            Self::Predicate { description, .. } => f
                .debug_struct("Predicate")
                .field("description", description)
                .finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
// The contradictory-constraint test deliberately uses an always-false
// predicate.
#[allow(clippy::unwrap_used, clippy::impossible_comparisons)]
mod tests {
    use super::*;

    fn user_schema() -> Schema {
        Schema::new("UserInfo")
            .field(Field::new("name", FieldType::String))
            .field(
                Field::new("age", FieldType::Integer)
                    .constraint(Constraint::Positive),
            )
    }

    #[test]
    fn hint_lists_properties_and_required() {
        let hint = user_schema().to_hint();
        assert_eq!(hint.name, "UserInfo");
        assert!(hint.schema["properties"]["name"].is_object());
        assert_eq!(hint.schema["properties"]["age"]["type"], "integer");
        let required = hint.schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 2);
        assert_eq!(hint.schema["additionalProperties"], false);
    }

    #[test]
    fn optional_fields_are_not_required() {
        let schema = Schema::new("Address")
            .field(Field::new(
                "street",
                FieldType::optional(FieldType::String),
            ))
            .field(Field::new("city", FieldType::String));

        let hint = schema.to_hint();
        let required = hint.schema["required"].as_array().unwrap();
        assert_eq!(required, &[Value::String("city".to_owned())]);
    }

    #[test]
    fn positive_constraint_renders_keyword_and_description() {
        let hint = user_schema().to_hint();
        let age = &hint.schema["properties"]["age"];
        assert_eq!(age["exclusiveMinimum"], 0);
        assert_eq!(age["description"], "must be a positive number");
    }

    #[test]
    fn recursive_schema_renders_defs() {
        let schema = Schema::new("Comment")
            .field(Field::new("text", FieldType::String))
            .field(Field::new(
                "subcomments",
                FieldType::list(FieldType::reference("Comment")),
            ));

        let hint = schema.to_hint();
        assert_eq!(
            hint.schema["properties"]["subcomments"]["items"]["$ref"],
            "#/$defs/Comment"
        );
        assert!(hint.schema["$defs"]["Comment"].is_object());
    }

    #[test]
    fn named_schemas_terminates_on_self_reference() {
        let schema = Schema::new("Comment").field(Field::new(
            "subcomments",
            FieldType::list(FieldType::reference("Comment")),
        ));

        let named = schema.named_schemas();
        assert_eq!(named.len(), 1);
        assert!(named.contains_key("Comment"));
    }

    #[test]
    fn nested_schema_names_are_collected() {
        let address = Schema::new("Address").field(Field::new("city", FieldType::String));
        let schema = Schema::new("UserInfo")
            .field(Field::new("address", FieldType::Nested(address)));

        let named = schema.named_schemas();
        assert!(named.contains_key("UserInfo"));
        assert!(named.contains_key("Address"));
    }

    #[test]
    fn duplicate_schema_names_resolve_to_the_outermost_definition() {
        let inner = Schema::new("Comment").field(Field::new("body", FieldType::String));
        let schema = Schema::new("Comment")
            .field(Field::new("text", FieldType::String))
            .field(Field::new("reply", FieldType::Nested(inner)));

        let named = schema.named_schemas();
        assert_eq!(named.len(), 1);
        assert_eq!(named["Comment"].fields.len(), 2);
        assert_eq!(named["Comment"].fields[0].name, "text");
    }

    #[test]
    fn constraint_checks() {
        assert!(Constraint::Positive.check(&json!(30)).is_none());
        assert_eq!(
            Constraint::Positive.check(&json!(-10)),
            Some("must be a positive number".to_owned())
        );
        assert!(Constraint::Min(0.0).check(&json!(0)).is_none());
        assert!(Constraint::ExclusiveMin(0.0).check(&json!(0)).is_some());
        assert!(Constraint::NonEmpty.check(&json!("x")).is_none());
        assert!(Constraint::NonEmpty.check(&json!("")).is_some());
        assert!(Constraint::NonEmpty.check(&json!([])).is_some());
    }

    #[test]
    fn contradictory_predicate_always_fails() {
        // The tutorial's `0 < value > 18` validator, preserved as-is.
        let constraint = Constraint::predicate("Age must be between 0 and 18", |v| {
            v.as_i64().is_some_and(|age| age > 18 && age < 0)
        });

        assert!(constraint.check(&json!(12)).is_some());
        assert!(constraint.check(&json!(-5)).is_some());
        assert!(constraint.check(&json!(100)).is_some());
    }

    #[test]
    fn literal_renders_enum() {
        let schema = Schema::new("Intent").field(Field::new(
            "type",
            FieldType::literal(["weather", "stocks", "generic"]),
        ));

        let hint = schema.to_hint();
        let allowed = hint.schema["properties"]["type"]["enum"].as_array().unwrap();
        assert_eq!(allowed.len(), 3);
    }
}
