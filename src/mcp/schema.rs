//! Input schema adapters.
//!
//! Every capability input is a key/value argument bag. An [`InputSchema`]
//! validates such a bag and describes itself as the JSON-Schema-shaped
//! object the protocol advertises:
//!
//! ```json
//! { "type": "object", "properties": { "name": { "type": "string" } }, "required": ["name"] }
//! ```
//!
//! Two adapters ship with the crate:
//!
//! - [`ObjectSchema`]: properties declared by hand, or parsed from a JSON
//!   Schema document with [`ObjectSchema::from_json`]
//! - [`TypedSchema`]: derived from a Rust type through `schemars` and
//!   validated by deserialising with `serde`
//!
//! Applications with their own validation library implement [`InputSchema`]
//! directly.

use std::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::mcp::error::{McpError, McpResult};

/// Maximum `$ref` / combinator nesting followed while typing a property.
const MAX_SCHEMA_DEPTH: usize = 8;

/// A validator for capability arguments.
pub trait InputSchema: Send + Sync {
    /// Checks `input` and returns the value handlers should see.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Invalid`] when the input does not fit the
    /// schema, or [`ValidationError::Protocol`] when the adapter wants a
    /// specific protocol error reported instead.
    fn validate(&self, input: &Value) -> Result<Value, ValidationError>;

    /// Describes the accepted input as an object-of-properties schema.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] when the schema cannot be expressed as an
    /// object of properties.
    fn describe(&self) -> Result<SchemaDescription, SchemaError>;
}

/// Input rejected by an [`InputSchema`].
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The input does not match the schema.
    #[error("{}", .issues.join("; "))]
    Invalid {
        /// One entry per problem found.
        issues: Vec<String>,
    },

    /// The adapter raised a protocol error of its own.
    #[error(transparent)]
    Protocol(#[from] McpError),
}

impl ValidationError {
    /// Creates a single-issue validation failure.
    #[must_use]
    pub fn invalid(issue: impl Into<String>) -> Self {
        Self::Invalid {
            issues: vec![issue.into()],
        }
    }
}

impl From<ValidationError> for McpError {
    fn from(error: ValidationError) -> Self {
        match error {
            ValidationError::Invalid { issues } => {
                Self::invalid_params(format!("Invalid arguments: {}", issues.join("; ")))
                    .with_data(json!({ "errors": issues }))
            }
            ValidationError::Protocol(e) => e,
        }
    }
}

/// A schema that cannot be advertised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The root is a scalar, an array, or otherwise not an object.
    #[error("schema root must be an object of properties, found {found}")]
    NonObjectRoot {
        /// What the root declared instead.
        found: String,
    },

    /// A property declares a type we do not know.
    #[error("property '{name}' has unsupported type '{kind}'")]
    UnsupportedType {
        /// Property name.
        name: String,
        /// The declared type.
        kind: String,
    },

    /// A property has no type that could be determined.
    #[error("property '{name}' has no recognisable type")]
    UntypedProperty {
        /// Property name.
        name: String,
    },

    /// `required` names a property that is not declared.
    #[error("required property '{name}' is not declared")]
    UnknownRequired {
        /// Property name.
        name: String,
    },

    /// The schema document could not be produced.
    #[error("schema could not be generated: {message}")]
    Generation {
        /// Underlying error text.
        message: String,
    },
}

/// JSON types a property may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    /// A JSON string.
    String,
    /// Any JSON number.
    Number,
    /// A JSON number without a fractional part.
    Integer,
    /// `true` or `false`.
    Boolean,
    /// A JSON array.
    Array,
    /// A JSON object.
    Object,
}

impl PropertyType {
    /// Parses a JSON Schema `type` keyword.
    #[must_use]
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    /// The JSON Schema keyword for this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Returns `true` if `value` is of this type.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|n| n.is_finite() && n.fract() == 0.0)
            }
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// One advertised property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertySchema {
    /// Declared type.
    #[serde(rename = "type")]
    pub kind: PropertyType,
    /// Optional human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The object-of-properties shape every input schema reduces to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDescription {
    /// Declared properties, in declaration order.
    pub properties: IndexMap<String, PropertySchema>,
    /// Names of the properties that must be present.
    pub required: Vec<String>,
}

impl SchemaDescription {
    /// Returns `true` if `name` must be supplied.
    #[must_use]
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Renders the protocol form of this description.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }
}

/// The advertised schema for a capability without one: any object.
#[must_use]
pub fn any_object_schema() -> Value {
    json!({ "type": "object" })
}

/// Describes an optional schema, falling back to [`any_object_schema`].
///
/// # Errors
///
/// Propagates the adapter's [`SchemaError`].
pub fn describe_json(schema: Option<&Arc<dyn InputSchema>>) -> Result<Value, SchemaError> {
    schema.map_or_else(|| Ok(any_object_schema()), |s| Ok(s.describe()?.to_json()))
}

/// Runs optional validation. Without a schema any object is accepted as
/// is, with a missing argument bag read as `{}`.
///
/// # Errors
///
/// Returns `InvalidParams` for shape failures (including a schema-less call
/// whose arguments are not an object), or the adapter's own protocol error.
pub fn validate_input(schema: Option<&Arc<dyn InputSchema>>, input: Value) -> McpResult<Value> {
    let input = if input.is_null() {
        Value::Object(Map::new())
    } else {
        input
    };
    match schema {
        Some(schema) => schema.validate(&input).map_err(McpError::from),
        None if input.is_object() => Ok(input),
        None => Err(ValidationError::invalid(format!(
            "expected an object of arguments, found {}",
            value_kind(&input)
        ))
        .into()),
    }
}

/// Short name of a JSON value's type for error messages.
pub(crate) const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A hand-declared object schema.
///
/// ```
/// use widget_mcp::mcp::schema::{ObjectSchema, PropertyType};
///
/// let schema = ObjectSchema::new()
///     .required("name", PropertyType::String, "Who to greet")
///     .optional("shout", PropertyType::Boolean, "Use capitals");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    description: SchemaDescription,
}

impl ObjectSchema {
    /// Creates a schema with no properties.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a property that must be present.
    #[must_use]
    pub fn required(
        mut self,
        name: impl Into<String>,
        kind: PropertyType,
        description: impl Into<String>,
    ) -> Self {
        let name = name.into();
        self.description.required.push(name.clone());
        self.insert(name, kind, description.into())
    }

    /// Declares a property that may be omitted.
    #[must_use]
    pub fn optional(
        self,
        name: impl Into<String>,
        kind: PropertyType,
        description: impl Into<String>,
    ) -> Self {
        self.insert(name.into(), kind, description.into())
    }

    fn insert(mut self, name: String, kind: PropertyType, description: String) -> Self {
        let description = (!description.is_empty()).then_some(description);
        self.description
            .properties
            .insert(name, PropertySchema { kind, description });
        self
    }

    /// Builds a schema from a JSON Schema document.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if the root is not an object schema or a
    /// property type is not understood.
    pub fn from_json(document: &Value) -> Result<Self, SchemaError> {
        Ok(Self {
            description: parse_object_schema(document)?,
        })
    }
}

impl InputSchema for ObjectSchema {
    fn validate(&self, input: &Value) -> Result<Value, ValidationError> {
        let Value::Object(args) = input else {
            return Err(ValidationError::invalid(format!(
                "expected an object of arguments, found {}",
                value_kind(input)
            )));
        };

        let mut issues = Vec::new();

        for name in &self.description.required {
            if args.get(name).map_or(true, Value::is_null) {
                issues.push(format!("missing required property '{name}'"));
            }
        }

        for (name, value) in args {
            let Some(property) = self.description.properties.get(name) else {
                continue;
            };
            if value.is_null() && !self.description.is_required(name) {
                continue;
            }
            if !value.is_null() && !property.kind.matches(value) {
                issues.push(format!(
                    "property '{name}' must be {}, found {}",
                    property.kind.as_str(),
                    value_kind(value)
                ));
            }
        }

        if issues.is_empty() {
            Ok(input.clone())
        } else {
            Err(ValidationError::Invalid { issues })
        }
    }

    fn describe(&self) -> Result<SchemaDescription, SchemaError> {
        Ok(self.description.clone())
    }
}

/// A schema derived from a Rust type.
///
/// Validation deserialises the arguments into `T` and serialises them back,
/// so handlers see defaults filled in and unknown fields handled the way the
/// type's serde attributes say.
pub struct TypedSchema<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedSchema<T> {
    /// Creates the adapter.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for TypedSchema<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedSchema")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> InputSchema for TypedSchema<T>
where
    T: JsonSchema + DeserializeOwned + Serialize,
{
    fn validate(&self, input: &Value) -> Result<Value, ValidationError> {
        if !input.is_object() {
            return Err(ValidationError::invalid(format!(
                "expected an object of arguments, found {}",
                value_kind(input)
            )));
        }
        let typed: T = serde_json::from_value(input.clone())
            .map_err(|e| ValidationError::invalid(e.to_string()))?;
        serde_json::to_value(&typed)
            .map_err(|e| McpError::internal(format!("failed to normalise arguments: {e}")).into())
    }

    fn describe(&self) -> Result<SchemaDescription, SchemaError> {
        let root = schemars::schema_for!(T);
        let document = serde_json::to_value(&root).map_err(|e| SchemaError::Generation {
            message: e.to_string(),
        })?;
        parse_object_schema(&document)
    }
}

/// Reduces a JSON Schema document to its object-of-properties form.
fn parse_object_schema(document: &Value) -> Result<SchemaDescription, SchemaError> {
    let Some(root) = document.as_object() else {
        return Err(SchemaError::NonObjectRoot {
            found: value_kind(document).to_string(),
        });
    };

    match root.get("type") {
        Some(Value::String(kind)) if kind == "object" => {}
        None if root.contains_key("properties") => {}
        Some(other) => {
            return Err(SchemaError::NonObjectRoot {
                found: other
                    .as_str()
                    .map_or_else(|| other.to_string(), str::to_string),
            });
        }
        None => {
            return Err(SchemaError::NonObjectRoot {
                found: "untyped schema".to_string(),
            });
        }
    }

    let mut description = SchemaDescription::default();

    if let Some(properties) = root.get("properties").and_then(Value::as_object) {
        for (name, property) in properties {
            let kind = property_type(document, name, property, 0)?;
            let text = property
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| {
                    resolve_ref(document, property)
                        .and_then(|r| r.get("description"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                });
            description.properties.insert(
                name.clone(),
                PropertySchema {
                    kind,
                    description: text,
                },
            );
        }
    }

    if let Some(required) = root.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if !description.properties.contains_key(name) {
                return Err(SchemaError::UnknownRequired {
                    name: name.to_string(),
                });
            }
            description.required.push(name.to_string());
        }
    }

    Ok(description)
}

/// Works out the type of a single property, following `$ref`s and
/// `anyOf`/`oneOf`/`allOf` combinators.
fn property_type(
    document: &Value,
    name: &str,
    property: &Value,
    depth: usize,
) -> Result<PropertyType, SchemaError> {
    let untyped = || SchemaError::UntypedProperty {
        name: name.to_string(),
    };
    if depth > MAX_SCHEMA_DEPTH {
        return Err(untyped());
    }

    match property.get("type") {
        Some(Value::String(kind)) => {
            return PropertyType::parse(kind).ok_or_else(|| SchemaError::UnsupportedType {
                name: name.to_string(),
                kind: kind.clone(),
            });
        }
        Some(Value::Array(kinds)) => {
            let kind = kinds
                .iter()
                .filter_map(Value::as_str)
                .find(|k| *k != "null")
                .ok_or_else(untyped)?;
            return PropertyType::parse(kind).ok_or_else(|| SchemaError::UnsupportedType {
                name: name.to_string(),
                kind: kind.to_string(),
            });
        }
        _ => {}
    }

    if let Some(target) = resolve_ref(document, property) {
        return property_type(document, name, target, depth + 1);
    }

    for combinator in ["anyOf", "oneOf", "allOf"] {
        if let Some(options) = property.get(combinator).and_then(Value::as_array) {
            let candidate = options
                .iter()
                .find(|o| o.get("type").and_then(Value::as_str) != Some("null"))
                .ok_or_else(untyped)?;
            return property_type(document, name, candidate, depth + 1);
        }
    }

    if property.get("enum").is_some() {
        return Ok(PropertyType::String);
    }

    Err(untyped())
}

/// Follows a local `#/definitions/..` or `#/$defs/..` reference.
fn resolve_ref<'a>(document: &'a Value, property: &Value) -> Option<&'a Value> {
    let reference = property.get("$ref")?.as_str()?;
    let (section, name) = reference
        .strip_prefix("#/definitions/")
        .map(|n| ("definitions", n))
        .or_else(|| reference.strip_prefix("#/$defs/").map(|n| ("$defs", n)))?;
    document.get(section)?.get(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::ErrorCode;

    fn greet_schema() -> ObjectSchema {
        ObjectSchema::new()
            .required("name", PropertyType::String, "Who to greet")
            .optional("times", PropertyType::Integer, "")
    }

    #[test]
    fn describe_lists_properties_and_required() {
        let json = greet_schema().describe().unwrap().to_json();
        assert_eq!(json["type"], "object");
        assert_eq!(json["properties"]["name"]["type"], "string");
        assert_eq!(json["properties"]["name"]["description"], "Who to greet");
        assert!(json["properties"]["times"].get("description").is_none());
        assert_eq!(json["required"], json!(["name"]));
    }

    #[test]
    fn validate_accepts_matching_input() {
        let input = json!({"name": "Ada", "times": 2, "extra": true});
        assert_eq!(greet_schema().validate(&input).unwrap(), input);
    }

    #[test]
    fn validate_reports_every_issue() {
        let err = greet_schema()
            .validate(&json!({"times": "twice"}))
            .unwrap_err();
        let ValidationError::Invalid { issues } = err else {
            panic!("expected shape failure");
        };
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn validate_rejects_non_object_input() {
        let err = greet_schema().validate(&json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("found array"));
    }

    #[test]
    fn validation_failure_maps_to_invalid_params() {
        let err = validate_input(Some(&(Arc::new(greet_schema()) as Arc<dyn InputSchema>)), json!({}))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParams);
        assert_eq!(err.data.unwrap()["errors"][0], "missing required property 'name'");
    }

    #[test]
    fn no_schema_accepts_anything() {
        let input = json!({"whatever": [1, 2, 3]});
        assert_eq!(validate_input(None, input.clone()).unwrap(), input);
        assert_eq!(validate_input(None, Value::Null).unwrap(), json!({}));
        assert_eq!(describe_json(None).unwrap(), json!({"type": "object"}));
    }

    #[test]
    fn no_schema_still_requires_an_object() {
        let err = validate_input(None, json!(5)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParams);
        assert!(validate_input(None, json!(["a"])).is_err());
    }

    #[test]
    fn integers_may_be_written_with_a_zero_fraction() {
        assert!(PropertyType::Integer.matches(&json!(2.0)));
        assert!(PropertyType::Integer.matches(&json!(-4)));
        assert!(!PropertyType::Integer.matches(&json!(2.5)));
        assert!(greet_schema()
            .validate(&json!({"name": "Ada", "times": 3.0}))
            .is_ok());
    }

    #[test]
    fn from_json_rejects_scalar_and_array_roots() {
        let err = ObjectSchema::from_json(&json!({"type": "string"})).unwrap_err();
        assert_eq!(
            err,
            SchemaError::NonObjectRoot {
                found: "string".to_string()
            }
        );
        assert!(ObjectSchema::from_json(&json!({"type": "array", "items": {}})).is_err());
        assert!(ObjectSchema::from_json(&json!(42)).is_err());
    }

    #[test]
    fn from_json_rejects_undeclared_required() {
        let err = ObjectSchema::from_json(&json!({
            "type": "object",
            "properties": {},
            "required": ["ghost"]
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownRequired { .. }));
    }

    #[test]
    fn from_json_reads_nullable_types() {
        let schema = ObjectSchema::from_json(&json!({
            "type": "object",
            "properties": { "note": { "type": ["string", "null"] } }
        }))
        .unwrap();
        let description = schema.describe().unwrap();
        assert_eq!(description.properties["note"].kind, PropertyType::String);
    }

    #[derive(Deserialize, Serialize, JsonSchema)]
    struct Booking {
        /// Guest name.
        guest: String,
        #[serde(default)]
        nights: u32,
        room: Option<Room>,
    }

    #[derive(Deserialize, Serialize, JsonSchema)]
    struct Room {
        floor: u8,
    }

    #[test]
    fn typed_schema_describes_struct() {
        let description = TypedSchema::<Booking>::new().describe().unwrap();
        assert_eq!(description.properties["guest"].kind, PropertyType::String);
        assert_eq!(
            description.properties["guest"].description.as_deref(),
            Some("Guest name.")
        );
        assert_eq!(description.properties["nights"].kind, PropertyType::Integer);
        assert_eq!(description.properties["room"].kind, PropertyType::Object);
        assert_eq!(description.required, vec!["guest".to_string()]);
    }

    #[test]
    fn typed_schema_normalises_input() {
        let output = TypedSchema::<Booking>::new()
            .validate(&json!({"guest": "Ada"}))
            .unwrap();
        assert_eq!(output["nights"], 0);
        assert!(output["room"].is_null());
    }

    #[test]
    fn typed_schema_rejects_wrong_shape() {
        let err = TypedSchema::<Booking>::new()
            .validate(&json!({"guest": 7}))
            .unwrap_err();
        assert!(matches!(err, ValidationError::Invalid { .. }));
    }

    #[test]
    fn typed_schema_rejects_scalar_root_type() {
        let err = TypedSchema::<String>::new().describe().unwrap_err();
        assert!(matches!(err, SchemaError::NonObjectRoot { .. }));
    }
}
