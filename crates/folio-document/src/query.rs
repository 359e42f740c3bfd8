//! Folio Document Query
//!
//! Query language for document filtering and retrieval.
//!
//! @version 0.1.0
//! @author Folio Development Team

use crate::types::{Document, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

// =============================================================================
// Query
// =============================================================================

/// A query for filtering documents.
///
/// Filters are AND-ed. Results keep insertion order unless sort keys are
/// given; sorting is stable, so ties stay in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub sort: Vec<Sort>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    pub projection: Option<Vec<String>>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// A query matching every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Check if a document matches this query.
    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }

    /// Add a filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add a sort key. Earlier keys take precedence.
    pub fn with_sort(mut self, field: impl Into<String>, ascending: bool) -> Self {
        self.sort.push(Sort {
            field: field.into(),
            ascending,
        });
        self
    }

    /// Add skip.
    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Add limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Add projection.
    pub fn with_projection(mut self, fields: Vec<String>) -> Self {
        self.projection = Some(fields);
        self
    }

    /// Only the filter part of this query.
    pub fn filter_only(&self) -> Query {
        Query {
            filters: self.filters.clone(),
            ..Default::default()
        }
    }

    /// Sort, skip, limit and project already-matched documents, which must
    /// be in insertion order.
    pub fn finish(&self, mut docs: Vec<Document>) -> Vec<Document> {
        if !self.sort.is_empty() {
            docs.sort_by(|a, b| compare_by_keys(a, b, &self.sort));
        }

        let docs = docs
            .into_iter()
            .skip(self.skip.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX));

        match self.projection {
            Some(ref fields) => docs.map(|doc| project(doc, fields)).collect(),
            None => docs.collect(),
        }
    }
}

/// Compare two documents by a list of sort keys. Missing fields sort as null.
pub fn compare_by_keys(a: &Document, b: &Document, keys: &[Sort]) -> Ordering {
    for key in keys {
        let left = a.get(&key.field).unwrap_or(&Value::Null);
        let right = b.get(&key.field).unwrap_or(&Value::Null);
        let ordering = left.sort_cmp(right);
        let ordering = if key.ascending {
            ordering
        } else {
            ordering.reverse()
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn project(doc: Document, fields: &[String]) -> Document {
    let data: HashMap<String, Value> = fields
        .iter()
        .filter_map(|f| doc.data.get(f).map(|v| (f.clone(), v.clone())))
        .collect();
    Document { data, ..doc }
}

// =============================================================================
// Filter
// =============================================================================

/// A filter condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Filter {
    Eq { field: String, value: Value },
    Ne { field: String, value: Value },
    Gt { field: String, value: Value },
    Gte { field: String, value: Value },
    Lt { field: String, value: Value },
    Lte { field: String, value: Value },
    In { field: String, values: Vec<Value> },
    Nin { field: String, values: Vec<Value> },
    Exists { field: String, exists: bool },
    Regex { field: String, pattern: String },
    Contains { field: String, value: String },
    StartsWith { field: String, value: String },
    EndsWith { field: String, value: String },
    /// Every search term appears as a word of the field, ignoring case.
    Text { field: String, query: String },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether `doc` satisfies this filter. A missing field satisfies only
    /// the negative forms (`Ne`, `Nin`, `Exists { exists: false }`).
    pub fn matches(&self, doc: &Document) -> bool {
        use Ordering::{Greater, Less};

        match self {
            Self::Eq { field, value } => doc.get(field).is_some_and(|v| holds(v, value)),
            Self::Ne { field, value } => !doc.get(field).is_some_and(|v| holds(v, value)),
            Self::Gt { field, value } => ordered(doc, field, value, &[Greater]),
            Self::Gte { field, value } => ordered(doc, field, value, &[Greater, Ordering::Equal]),
            Self::Lt { field, value } => ordered(doc, field, value, &[Less]),
            Self::Lte { field, value } => ordered(doc, field, value, &[Less, Ordering::Equal]),
            Self::In { field, values } => doc
                .get(field)
                .is_some_and(|v| values.iter().any(|c| holds(v, c))),
            Self::Nin { field, values } => !doc
                .get(field)
                .is_some_and(|v| values.iter().any(|c| holds(v, c))),
            Self::Exists { field, exists } => doc.contains(field) == *exists,
            Self::Regex { field, pattern } => text_of(doc, field).is_some_and(|s| {
                regex::RegexBuilder::new(pattern)
                    .size_limit(1 << 20)
                    .build()
                    .is_ok_and(|re| re.is_match(s))
            }),
            Self::Contains { field, value } => text_of(doc, field).is_some_and(|s| s.contains(value.as_str())),
            Self::StartsWith { field, value } => {
                text_of(doc, field).is_some_and(|s| s.starts_with(value.as_str()))
            }
            Self::EndsWith { field, value } => {
                text_of(doc, field).is_some_and(|s| s.ends_with(value.as_str()))
            }
            Self::Text { field, query } => text_of(doc, field).is_some_and(|s| {
                let words = tokenize(s);
                let terms = tokenize(query);
                !terms.is_empty() && terms.iter().all(|t| words.contains(t))
            }),
            Self::And(filters) => filters.iter().all(|f| f.matches(doc)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(doc)),
            Self::Not(filter) => !filter.matches(doc),
        }
    }
}

/// Lowercased alphanumeric words of at least two characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| s.len() >= 2)
        .map(String::from)
        .collect()
}

fn text_of<'a>(doc: &'a Document, field: &str) -> Option<&'a str> {
    doc.get(field).and_then(Value::as_str)
}

/// Equality against a field; an array field holds `expected` when any
/// element equals it.
fn holds(actual: &Value, expected: &Value) -> bool {
    match actual {
        _ if actual.loosely_equals(expected) => true,
        Value::Array(items) if !expected.is_array() => {
            items.iter().any(|item| item.loosely_equals(expected))
        }
        _ => false,
    }
}

fn ordered(doc: &Document, field: &str, bound: &Value, accept: &[Ordering]) -> bool {
    doc.get(field)
        .and_then(|v| v.compare(bound))
        .is_some_and(|o| accept.contains(&o))
}

// =============================================================================
// Sort
// =============================================================================

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub ascending: bool,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: false,
        }
    }
}

// =============================================================================
// Query Builder
// =============================================================================

/// Fluent construction of a [`Query`]. Filters are AND-ed.
#[derive(Default)]
pub struct QueryBuilder {
    query: Query,
}

macro_rules! value_filters {
    ($($method:ident => $variant:ident),* $(,)?) => {
        $(
            pub fn $method(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
                self.filter(Filter::$variant {
                    field: field.into(),
                    value: value.into(),
                })
            }
        )*
    };
}

macro_rules! string_filters {
    ($($method:ident => $variant:ident),* $(,)?) => {
        $(
            pub fn $method(self, field: impl Into<String>, value: impl Into<String>) -> Self {
                self.filter(Filter::$variant {
                    field: field.into(),
                    value: value.into(),
                })
            }
        )*
    };
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(self, filter: Filter) -> Self {
        Self {
            query: self.query.with_filter(filter),
        }
    }

    value_filters! {
        eq => Eq,
        ne => Ne,
        gt => Gt,
        gte => Gte,
        lt => Lt,
        lte => Lte,
    }

    string_filters! {
        contains => Contains,
        starts_with => StartsWith,
        ends_with => EndsWith,
    }

    pub fn in_values(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        let field = field.into();
        self.filter(Filter::In { field, values })
    }

    pub fn not_in(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        let field = field.into();
        self.filter(Filter::Nin { field, values })
    }

    pub fn exists(self, field: impl Into<String>, exists: bool) -> Self {
        let field = field.into();
        self.filter(Filter::Exists { field, exists })
    }

    pub fn regex(self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        let (field, pattern) = (field.into(), pattern.into());
        self.filter(Filter::Regex { field, pattern })
    }

    /// Title-style word search; see [`Filter::Text`].
    pub fn text(self, field: impl Into<String>, query: impl Into<String>) -> Self {
        let (field, query) = (field.into(), query.into());
        self.filter(Filter::Text { field, query })
    }

    pub fn and(self, filters: Vec<Filter>) -> Self {
        self.filter(Filter::And(filters))
    }

    pub fn or(self, filters: Vec<Filter>) -> Self {
        self.filter(Filter::Or(filters))
    }

    pub fn not(self, filter: Filter) -> Self {
        self.filter(Filter::Not(Box::new(filter)))
    }

    /// Append a sort key; call repeatedly for compound sorts.
    pub fn sort(self, field: impl Into<String>, ascending: bool) -> Self {
        Self {
            query: self.query.with_sort(field, ascending),
        }
    }

    pub fn skip(self, skip: usize) -> Self {
        Self {
            query: self.query.with_skip(skip),
        }
    }

    pub fn limit(self, limit: usize) -> Self {
        Self {
            query: self.query.with_limit(limit),
        }
    }

    pub fn project(self, fields: Vec<String>) -> Self {
        Self {
            query: self.query.with_projection(fields),
        }
    }

    pub fn build(self) -> Query {
        self.query
    }
}

// =============================================================================
// Query Result
// =============================================================================

/// Result of a document query.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub documents: Vec<Document>,
    pub total_scanned: usize,
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self {
            documents: Vec::new(),
            total_scanned: 0,
            execution_time_ms: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn first(&self) -> Option<&Document> {
        self.documents.first()
    }
}

// =============================================================================
// Tests
// =============================================================================
