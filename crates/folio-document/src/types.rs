//! Folio Document Types
//!
//! Documents, their identifiers and the dynamically typed values they hold.
//! Field paths are dotted (`address.city`, `products.0.price`); numeric
//! segments index into arrays.
//!
//! @version 0.1.0
//! @author Folio Development Team

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{SystemTime, UNIX_EPOCH};

// =============================================================================
// Document ID
// =============================================================================

/// Identifier of a stored document, unique within its collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh id: millisecond clock, a mixed sequence word and the low
    /// bits of a process-wide counter, as 24 hex digits.
    pub fn generate() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);

        let millis = epoch_millis() as u64;
        let seq = NEXT.fetch_add(1, AtomicOrdering::Relaxed);
        let mixed = seq.wrapping_mul(0x5851_f42d_4c95_7f2d) ^ millis.rotate_left(17);
        Self(format!("{:012x}{:08x}{:04x}", millis, mixed as u32, seq as u16))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

// =============================================================================
// Value
// =============================================================================

/// A field value. Mirrors JSON, with integers kept apart from floats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(HashMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Integer view; floats are truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Int(n) => Some(n),
            Self::Float(x) => Some(x as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Int(n) => Some(n as f64),
            Self::Float(x) => Some(x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Self::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    pub fn as_object(&self) -> Option<&HashMap<String, Value>> {
        if let Self::Object(fields) = self {
            Some(fields)
        } else {
            None
        }
    }

    /// Name of the value's type, as used in validation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// One step down: an object member or an array element.
    fn child(&self, segment: &str) -> Option<&Value> {
        match self {
            Self::Object(fields) => fields.get(segment),
            Self::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    fn child_mut(&mut self, segment: &str) -> Option<&mut Value> {
        match self {
            Self::Object(fields) => fields.get_mut(segment),
            Self::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
            _ => None,
        }
    }

    /// Value at a dotted path below this one.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(self, |value, segment| value.child(segment))
    }

    /// Store `value` at `segments`; missing object members along the way
    /// become empty objects. Arrays are never grown.
    fn put(&mut self, segments: &[&str], value: Value) -> Result<(), String> {
        let Some((segment, rest)) = segments.split_first() else {
            *self = value;
            return Ok(());
        };

        match self {
            Self::Object(fields) if rest.is_empty() => {
                fields.insert(segment.to_string(), value);
                Ok(())
            }
            Self::Object(fields) => fields
                .entry(segment.to_string())
                .or_insert_with(|| Self::Object(HashMap::new()))
                .put(rest, value),
            Self::Array(items) => {
                let index: usize = segment
                    .parse()
                    .map_err(|_| format!("'{}' is not an array index", segment))?;
                let len = items.len();
                items
                    .get_mut(index)
                    .ok_or_else(|| format!("array index {} out of bounds (len {})", index, len))?
                    .put(rest, value)
            }
            other => Err(format!(
                "cannot descend into {} at '{}'",
                other.type_name(),
                segment
            )),
        }
    }

    /// Detach the value at `segments`. Array elements are not removable.
    fn take(&mut self, segments: &[&str]) -> Option<Value> {
        match segments {
            [] => None,
            [last] => match self {
                Self::Object(fields) => fields.remove(*last),
                _ => None,
            },
            [segment, rest @ ..] => self.child_mut(segment)?.take(rest),
        }
    }

    /// Ordering between values of compatible types. Ints and floats compare
    /// numerically; other mixed pairs are unordered.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        use Value::*;
        match (self, other) {
            (Int(a), Int(b)) => Some(a.cmp(b)),
            (Int(_) | Float(_), Int(_) | Float(_)) => self.as_f64()?.partial_cmp(&other.as_f64()?),
            (String(a), String(b)) => Some(a.cmp(b)),
            (Bool(a), Bool(b)) => Some(a.cmp(b)),
            (Null, Null) => Some(Ordering::Equal),
            _ => None,
        }
    }

    /// Equality that treats `Int(2)` and `Float(2.0)` as equal.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        if self.is_number() && other.is_number() {
            self.compare(other) == Some(Ordering::Equal)
        } else {
            self == other
        }
    }

    /// Total order used for sorting: null, numbers, strings, bools, arrays,
    /// objects; values of the same rank compare with [`Value::compare`].
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.compare(other).unwrap_or(Ordering::Equal))
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Int(_) | Self::Float(_) => 1,
            Self::String(_) => 2,
            Self::Bool(_) => 3,
            Self::Array(_) => 4,
            Self::Object(_) => 5,
        }
    }

    pub fn from_json(json: JsonValue) -> Self {
        json.into()
    }

    /// JSON form. Non-finite floats become `null`.
    pub fn to_json(&self) -> JsonValue {
        self.into()
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            },
            JsonValue::String(s) => Self::String(s),
            JsonValue::Array(items) => Self::Array(items.into_iter().map(Into::into).collect()),
            JsonValue::Object(fields) => {
                Self::Object(fields.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&Value> for JsonValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(n) => JsonValue::from(*n),
            Value::Float(x) => serde_json::Number::from_f64(*x).map_or(JsonValue::Null, JsonValue::Number),
            Value::String(s) => JsonValue::from(s.as_str()),
            Value::Array(items) => items.iter().map(JsonValue::from).collect(),
            Value::Object(fields) => JsonValue::Object(
                fields.iter().map(|(k, v)| (k.clone(), JsonValue::from(v))).collect(),
            ),
        }
    }
}

macro_rules! value_from {
    ($($source:ty => |$v:ident| $make:expr),* $(,)?) => {
        $(
            impl From<$source> for Value {
                fn from($v: $source) -> Self {
                    $make
                }
            }
        )*
    };
}

value_from! {
    bool => |b| Value::Bool(b),
    i64 => |n| Value::Int(n),
    i32 => |n| Value::Int(n.into()),
    u32 => |n| Value::Int(n.into()),
    f64 => |x| Value::Float(x),
    String => |s| Value::String(s),
    &str => |s| Value::String(s.to_owned()),
    Vec<Value> => |items| Value::Array(items),
    HashMap<String, Value> => |fields| Value::Object(fields),
}

// =============================================================================
// Document
// =============================================================================

/// A stored record: an id, its fields, and bookkeeping timestamps in
/// milliseconds since the epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    #[serde(flatten)]
    pub data: HashMap<String, Value>,
    #[serde(rename = "_created_at", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(rename = "_updated_at", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Document {
    /// An empty document with a generated id.
    pub fn new() -> Self {
        Self::with_id(DocumentId::generate())
    }

    pub fn with_id(id: impl Into<DocumentId>) -> Self {
        Self::from_parts(id.into(), HashMap::new())
    }

    fn from_parts(id: DocumentId, data: HashMap<String, Value>) -> Self {
        Self {
            id,
            data,
            created_at: Some(epoch_millis()),
            updated_at: None,
        }
    }

    /// Build a document from a JSON object; anything else gives `None`.
    /// A string `_id` is kept; other keys starting with `_` are dropped.
    pub fn from_json(json: JsonValue) -> Option<Self> {
        let JsonValue::Object(fields) = json else {
            return None;
        };

        let id = match fields.get("_id") {
            Some(JsonValue::String(id)) => DocumentId::new(id.as_str()),
            _ => DocumentId::generate(),
        };
        let data = fields
            .into_iter()
            .filter(|(name, _)| !name.starts_with('_'))
            .map(|(name, value)| (name, Value::from(value)))
            .collect();

        Some(Self::from_parts(id, data))
    }

    /// Full JSON form, including `_id` and timestamps.
    pub fn to_json(&self) -> JsonValue {
        let mut json = self.data_json();
        if let JsonValue::Object(ref mut fields) = json {
            fields.insert("_id".to_string(), JsonValue::from(self.id.as_str()));
            for (name, stamp) in [("_created_at", self.created_at), ("_updated_at", self.updated_at)] {
                if let Some(ms) = stamp {
                    fields.insert(name.to_string(), JsonValue::from(ms));
                }
            }
        }
        json
    }

    /// Field data only, without `_id` or timestamps.
    pub fn data_json(&self) -> JsonValue {
        JsonValue::Object(
            self.data
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }

    /// Field value; dotted keys descend into objects and arrays.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match key.split_once('.') {
            Some((head, rest)) => self.data.get(head)?.get_path(rest),
            None => self.data.get(key),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
        self.touch();
    }

    /// Set the value at a dotted path, creating intermediate objects.
    pub fn set_path(&mut self, path: &str, value: impl Into<Value>) -> Result<(), String> {
        let segments: Vec<&str> = path.split('.').collect();
        match segments.as_slice() {
            [] | [""] => return Err("empty field path".to_string()),
            [field] => {
                self.data.insert(field.to_string(), value.into());
            }
            [field, rest @ ..] => {
                self.data
                    .entry(field.to_string())
                    .or_insert_with(|| Value::Object(HashMap::new()))
                    .put(rest, value.into())?;
            }
        }
        self.touch();
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.data.remove(key);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    /// Remove the value at a dotted path.
    pub fn remove_path(&mut self, path: &str) -> Option<Value> {
        let removed = match path.split_once('.') {
            None => self.data.remove(path),
            Some((head, rest)) => {
                let segments: Vec<&str> = rest.split('.').collect();
                self.data.get_mut(head)?.take(&segments)
            }
        };
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn touch(&mut self) {
        self.updated_at = Some(epoch_millis());
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn order() -> Document {
        Document::from_json(json!({
            "_id": "o-1",
            "userId": "u-7",
            "status": "Shipped",
            "products": [
                {"productId": "p-1", "quantity": 2, "price": 9.5},
                {"productId": "p-2", "quantity": 1, "price": 20}
            ],
            "shipping": {"city": "Bergen", "zip": "5003"}
        }))
        .unwrap()
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let ids: HashSet<DocumentId> = (0..10_000).map(|_| DocumentId::generate()).collect();
        assert_eq!(ids.len(), 10_000);
        assert!(ids.iter().all(|id| id.as_str().len() == 24));
        assert_eq!(DocumentId::from("978-0").to_string(), "978-0");
    }

    #[test]
    fn test_json_numbers_keep_int_and_float_apart() {
        let doc = order();
        assert_eq!(doc.get("products.0.quantity"), Some(&Value::Int(2)));
        assert_eq!(doc.get("products.0.price"), Some(&Value::Float(9.5)));
        assert_eq!(doc.get("products.1.price").and_then(Value::as_f64), Some(20.0));
        assert_eq!(Value::Float(f64::NAN).to_json(), JsonValue::Null);
    }

    #[test]
    fn test_paths() {
        let doc = order();
        assert_eq!(doc.get("shipping.city").and_then(Value::as_str), Some("Bergen"));
        assert_eq!(doc.get("products.1.productId").and_then(Value::as_str), Some("p-2"));
        assert!(doc.get("products.9.productId").is_none());
        assert!(doc.get("status.code").is_none());
        assert!(!doc.contains("total"));
    }

    #[test]
    fn test_numeric_comparison() {
        assert_eq!(Value::Int(2).compare(&Value::Float(2.5)), Some(Ordering::Less));
        assert!(Value::Int(2016).loosely_equals(&Value::Float(2016.0)));
        assert!(!Value::Int(1).loosely_equals(&Value::from("1")));
        assert_eq!(Value::from("a").compare(&Value::Int(1)), None);
    }

    #[test]
    fn test_sort_cmp_ranks() {
        let mut values = vec![
            Value::from("b"),
            Value::Int(3),
            Value::Null,
            Value::Float(1.5),
            Value::from("a"),
        ];
        values.sort_by(|a, b| a.sort_cmp(b));
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Float(1.5),
                Value::Int(3),
                Value::from("a"),
                Value::from("b"),
            ]
        );
    }

    #[test]
    fn test_set_and_remove_path() {
        let mut doc = Document::with_id("u1");
        doc.set_path("address.city", "Springfield").unwrap();
        doc.set_path("address.zip", "62701").unwrap();
        assert!(doc.updated_at.is_some());

        assert_eq!(doc.remove_path("address.zip"), Some(Value::from("62701")));
        assert!(!doc.contains("address.zip"));
        assert!(doc.contains("address.city"));

        doc.set("name", "nora");
        assert!(doc.set_path("name.first", "N").is_err());
        assert!(doc.set_path("", 1i64).is_err());
    }

    #[test]
    fn test_set_path_into_array() {
        let mut doc = order();
        doc.set_path("products.0.quantity", 3i64).unwrap();
        assert_eq!(doc.get("products.0.quantity"), Some(&Value::Int(3)));
        assert!(doc.set_path("products.4.quantity", 1i64).is_err());
        assert_eq!(doc.remove_path("products.1"), None);
    }

    #[test]
    fn test_json_forms() {
        let doc = order();
        assert_eq!(doc.id.as_str(), "o-1");

        let full = doc.to_json();
        assert_eq!(full["_id"], "o-1");
        assert!(full.get("_created_at").is_some());

        let data = doc.data_json();
        assert!(data.get("_id").is_none());
        assert_eq!(data["status"], "Shipped");
        assert!(Document::from_json(json!([1, 2])).is_none());
    }
}
