//! Folio Document Validation
//!
//! Collection schemas. A collection may carry a `Schema`; the store checks
//! it on every insert and on the post-update image of every updated
//! document. Validation reports every problem it finds, in a stable order,
//! rather than stopping at the first.
//!
//! @version 0.1.0
//! @author Folio Development Team

use crate::types::{Document, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const PATTERN_SIZE_LIMIT: usize = 1 << 20;

// =============================================================================
// Problems
// =============================================================================

/// Accumulates validation messages.
#[derive(Default)]
struct Problems(Vec<String>);

impl Problems {
    fn missing(&mut self, path: &str) {
        self.0.push(format!("Missing required field: {}", path));
    }

    fn at(&mut self, path: &str, message: String) {
        self.0.push(format!("Field '{}': {}", path, message));
    }
}

/// Map keys in sorted order, so messages come out deterministically.
fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<&String> {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort_unstable();
    keys
}

// =============================================================================
// Schema
// =============================================================================

/// Shape of the documents in one collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub fields: HashMap<String, FieldSchema>,
    /// Required fields; dotted paths reach into nested objects.
    pub required: Vec<String>,
    pub additional_properties: bool,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: HashMap::new(),
            required: Vec::new(),
            additional_properties: true,
        }
    }

    pub fn field(mut self, name: impl Into<String>, schema: FieldSchema) -> Self {
        self.fields.insert(name.into(), schema);
        self
    }

    pub fn require(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    pub fn additional_properties(mut self, allow: bool) -> Self {
        self.additional_properties = allow;
        self
    }

    /// Check `doc`, collecting every problem.
    pub fn validate(&self, doc: &Document) -> ValidationResult {
        let mut problems = Problems::default();

        // A required field holding null counts as missing unless the field
        // itself is declared nullable.
        let mut missing = Vec::new();
        for path in &self.required {
            let nullable = self.fields.get(path).is_some_and(|f| f.nullable);
            match doc.get(path) {
                Some(value) if !value.is_null() || nullable => {}
                _ => {
                    problems.missing(path);
                    missing.push(path.as_str());
                }
            }
        }

        for name in sorted_keys(&self.fields) {
            if missing.contains(&name.as_str()) {
                continue;
            }
            if let Some(value) = doc.get(name) {
                self.fields[name].check(name, value, &mut problems);
            }
        }

        if !self.additional_properties {
            let mut unknown: Vec<&String> = doc
                .keys()
                .filter(|key| !self.fields.contains_key(key.as_str()))
                .collect();
            unknown.sort_unstable();
            problems
                .0
                .extend(unknown.into_iter().map(|key| format!("Unknown field: {}", key)));
        }

        ValidationResult::from_errors(problems.0)
    }
}

// =============================================================================
// Field Schema
// =============================================================================

/// Constraints on one field. Unset constraints are not checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSchema {
    pub field_type: FieldType,
    pub nullable: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
    pub enum_values: Option<Vec<Value>>,
    pub items: Option<Box<FieldSchema>>,
    pub properties: Option<HashMap<String, FieldSchema>>,
    pub required_properties: Vec<String>,
}

impl FieldSchema {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            nullable: false,
            min: None,
            max: None,
            min_length: None,
            max_length: None,
            pattern: None,
            enum_values: None,
            items: None,
            properties: None,
            required_properties: Vec::new(),
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn int() -> Self {
        Self::new(FieldType::Int)
    }

    pub fn float() -> Self {
        Self::new(FieldType::Float)
    }

    /// Int or float.
    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn bool() -> Self {
        Self::new(FieldType::Bool)
    }

    pub fn array(items: FieldSchema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::new(FieldType::Array)
        }
    }

    pub fn object() -> Self {
        Self::new(FieldType::Object)
    }

    /// Optional property of an object field.
    pub fn property(mut self, name: impl Into<String>, schema: FieldSchema) -> Self {
        self.properties
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), schema);
        self
    }

    /// Property an object field must carry, non-null.
    pub fn required_property(mut self, name: impl Into<String>, schema: FieldSchema) -> Self {
        let name = name.into();
        self.required_properties.push(name.clone());
        self.property(name, schema)
    }

    pub fn nullable(self) -> Self {
        Self { nullable: true, ..self }
    }

    pub fn min(self, min: f64) -> Self {
        Self { min: Some(min), ..self }
    }

    pub fn max(self, max: f64) -> Self {
        Self { max: Some(max), ..self }
    }

    pub fn min_length(self, len: usize) -> Self {
        Self { min_length: Some(len), ..self }
    }

    pub fn max_length(self, len: usize) -> Self {
        Self { max_length: Some(len), ..self }
    }

    pub fn pattern(self, pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            ..self
        }
    }

    pub fn enum_values(self, values: Vec<Value>) -> Self {
        Self {
            enum_values: Some(values),
            ..self
        }
    }

    /// Check a standalone value, returning the first problem.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        let mut problems = Problems::default();
        self.check("value", value, &mut problems);
        problems.0.into_iter().next().map_or(Ok(()), Err)
    }

    fn check(&self, path: &str, value: &Value, problems: &mut Problems) {
        if value.is_null() {
            if !self.nullable {
                problems.at(path, "value cannot be null".to_string());
            }
            return;
        }
        if !self.field_type.matches(value) {
            problems.at(
                path,
                format!("expected {:?}, got {}", self.field_type, value.type_name()),
            );
            return;
        }

        self.check_enum(path, value, problems);
        match value {
            Value::Int(_) | Value::Float(_) => self.check_range(path, value, problems),
            Value::String(s) => {
                self.check_length(path, "string", s.chars().count(), problems);
                self.check_pattern(path, s, problems);
            }
            Value::Array(items) => {
                self.check_length(path, "array", items.len(), problems);
                if let Some(item) = self.items.as_deref() {
                    for (i, element) in items.iter().enumerate() {
                        item.check(&format!("{}.{}", path, i), element, problems);
                    }
                }
            }
            Value::Object(members) => self.check_members(path, members, problems),
            Value::Null | Value::Bool(_) => {}
        }
    }

    fn check_enum(&self, path: &str, value: &Value, problems: &mut Problems) {
        let Some(allowed) = self.enum_values.as_ref() else {
            return;
        };
        if allowed.iter().any(|candidate| candidate.loosely_equals(value)) {
            return;
        }
        let choices: Vec<String> = allowed.iter().map(|v| v.to_json().to_string()).collect();
        problems.at(
            path,
            format!("{} is not one of [{}]", value.to_json(), choices.join(", ")),
        );
    }

    fn check_range(&self, path: &str, value: &Value, problems: &mut Problems) {
        let Some(n) = value.as_f64() else {
            return;
        };
        if let Some(min) = self.min.filter(|&min| n < min) {
            problems.at(path, format!("{} is less than minimum {}", n, min));
        }
        if let Some(max) = self.max.filter(|&max| n > max) {
            problems.at(path, format!("{} is greater than maximum {}", n, max));
        }
    }

    fn check_length(&self, path: &str, what: &str, len: usize, problems: &mut Problems) {
        if let Some(min) = self.min_length.filter(|&min| len < min) {
            problems.at(path, format!("{} length {} is less than minimum {}", what, len, min));
        }
        if let Some(max) = self.max_length.filter(|&max| len > max) {
            problems.at(path, format!("{} length {} is greater than maximum {}", what, len, max));
        }
    }

    fn check_pattern(&self, path: &str, s: &str, problems: &mut Problems) {
        let Some(pattern) = self.pattern.as_deref() else {
            return;
        };
        match regex::RegexBuilder::new(pattern)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
        {
            Ok(re) if re.is_match(s) => {}
            Ok(_) => problems.at(path, format!("'{}' does not match pattern {}", s, pattern)),
            Err(e) => problems.at(path, format!("invalid pattern: {}", e)),
        }
    }

    fn check_members(&self, path: &str, members: &HashMap<String, Value>, problems: &mut Problems) {
        let present = |name: &str| members.get(name).filter(|v| !v.is_null());

        for name in &self.required_properties {
            if present(name).is_none() {
                problems.missing(&format!("{}.{}", path, name));
            }
        }

        let Some(properties) = self.properties.as_ref() else {
            return;
        };
        for name in sorted_keys(properties) {
            // A null required property was reported as missing above.
            let value = if self.required_properties.contains(name) {
                present(name)
            } else {
                members.get(name.as_str())
            };
            if let Some(value) = value {
                properties[name].check(&format!("{}.{}", path, name), value, problems);
            }
        }
    }
}

// =============================================================================
// Field Type
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    String,
    Int,
    Float,
    /// Int or float.
    Number,
    Bool,
    Array,
    Object,
    Any,
}

impl FieldType {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Number => value.is_number(),
            Self::String => matches!(value, Value::String(_)),
            Self::Int => matches!(value, Value::Int(_)),
            Self::Float => matches!(value, Value::Float(_)),
            Self::Bool => matches!(value, Value::Bool(_)),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

// =============================================================================
// Validation Result
// =============================================================================

/// Outcome of [`Schema::validate`].
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self::from_errors(Vec::new())
    }

    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

// =============================================================================
// Schema Builder
// =============================================================================

/// Fluent construction of a [`Schema`].
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: Schema::new(name),
        }
    }

    pub fn field(self, name: impl Into<String>, schema: FieldSchema) -> Self {
        Self {
            schema: self.schema.field(name, schema),
        }
    }

    pub fn required_field(self, name: impl Into<String>, schema: FieldSchema) -> Self {
        let name = name.into();
        Self {
            schema: self.schema.field(name.clone(), schema).require(name),
        }
    }

    pub fn additional_properties(self, allow: bool) -> Self {
        Self {
            schema: self.schema.additional_properties(allow),
        }
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn book_schema() -> Schema {
        SchemaBuilder::new("Book")
            .required_field("title", FieldSchema::string().min_length(1))
            .required_field("publishedYear", FieldSchema::int().min(0.0))
            .field("rating", FieldSchema::number().min(0.0).max(5.0).nullable())
            .build()
    }

    #[test]
    fn test_type_validation() {
        let schema = FieldSchema::string();
        assert!(schema.validate(&Value::String("hello".to_string())).is_ok());
        assert!(schema.validate(&Value::Int(42)).is_err());

        let schema = FieldSchema::number();
        assert!(schema.validate(&Value::Int(42)).is_ok());
        assert!(schema.validate(&Value::Float(4.5)).is_ok());
        assert!(schema.validate(&Value::String("42".to_string())).is_err());
    }

    #[test]
    fn test_nullable() {
        let schema = FieldSchema::string();
        assert!(schema.validate(&Value::Null).is_err());

        let schema = FieldSchema::string().nullable();
        assert!(schema.validate(&Value::Null).is_ok());
    }

    #[test]
    fn test_range_validation() {
        let schema = FieldSchema::int().min(0.0).max(100.0);

        assert!(schema.validate(&Value::Int(50)).is_ok());
        assert!(schema.validate(&Value::Int(-1)).is_err());
        assert!(schema.validate(&Value::Int(101)).is_err());
    }

    #[test]
    fn test_string_length_counts_chars() {
        let schema = FieldSchema::string().min_length(3).max_length(5);

        assert!(schema.validate(&Value::from("Ibsen")).is_ok());
        assert!(schema.validate(&Value::from("Åländ")).is_ok());
        assert!(schema.validate(&Value::from("Al")).is_err());
        assert!(schema.validate(&Value::from("Austen!")).is_err());
    }

    #[test]
    fn test_pattern_validation() {
        let schema = FieldSchema::string().pattern(r"^[^@\s]+@[^@\s]+\.[^@\s]+$");

        assert!(schema.validate(&Value::from("nora@example.com")).is_ok());
        assert!(schema.validate(&Value::from("not-an-email")).is_err());
    }

    #[test]
    fn test_schema_collects_every_error() {
        let schema = book_schema();

        let mut doc = Document::new();
        doc.set("title", "");
        doc.set("rating", 7i64);

        let result = schema.validate(&doc);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 3);
        assert!(result.errors.iter().any(|e| e.contains("publishedYear")));
        assert!(result.errors.iter().any(|e| e.contains("'title'")));
        assert!(result.errors.iter().any(|e| e.contains("'rating'")));
    }

    #[test]
    fn test_required_null_is_missing() {
        let schema = book_schema();
        let mut doc = Document::new();
        doc.set("title", "Dolls House");
        doc.set("publishedYear", Value::Null);

        let result = schema.validate(&doc);
        assert_eq!(result.errors, vec!["Missing required field: publishedYear".to_string()]);
    }

    #[test]
    fn test_enum_validation() {
        let schema = FieldSchema::string().enum_values(vec![
            Value::from("Processing"),
            Value::from("Shipped"),
        ]);

        assert!(schema.validate(&Value::from("Shipped")).is_ok());
        assert!(schema.validate(&Value::from("Lost")).is_err());
    }

    #[test]
    fn test_nested_object() {
        let schema = SchemaBuilder::new("User")
            .required_field(
                "address",
                FieldSchema::object()
                    .required_property("city", FieldSchema::string())
                    .property("zip", FieldSchema::string().pattern(r"^\d{5}$")),
            )
            .build();

        let mut doc = Document::new();
        doc.set_path("address.city", "Springfield").unwrap();
        doc.set_path("address.zip", "12345").unwrap();
        assert!(schema.validate(&doc).is_valid);

        let mut doc = Document::new();
        doc.set_path("address.zip", "12").unwrap();
        let result = schema.validate(&doc);
        assert!(result.errors.contains(&"Missing required field: address.city".to_string()));
        assert!(result.errors.iter().any(|e| e.contains("address.zip")));
    }

    #[test]
    fn test_array_validation() {
        let schema = FieldSchema::array(FieldSchema::int().min(1.0)).min_length(1).max_length(5);

        assert!(schema.validate(&Value::Array(vec![Value::Int(1), Value::Int(2)])).is_ok());
        assert!(schema.validate(&Value::Array(vec![])).is_err());
        assert!(schema
            .validate(&Value::Array(vec![Value::from("not an int")]))
            .is_err());
        assert!(schema.validate(&Value::Array(vec![Value::Int(0)])).is_err());
    }

    #[test]
    fn test_additional_properties() {
        let schema = SchemaBuilder::new("Strict")
            .field("title", FieldSchema::string())
            .additional_properties(false)
            .build();

        let mut doc = Document::new();
        doc.set("title", "ok");
        doc.set("PublishedYear", 2001i64);

        let result = schema.validate(&doc);
        assert_eq!(result.errors, vec!["Unknown field: PublishedYear".to_string()]);
    }
}
