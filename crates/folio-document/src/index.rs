//! Folio Document Index
//!
//! Indexing structures for efficient document queries. Indexes narrow the
//! candidate set a query scans; query results never depend on whether an
//! index exists. Unique indexes additionally reject conflicting documents.
//!
//! @version 0.1.0
//! @author Folio Development Team

use crate::query::tokenize;
use crate::types::{Document, DocumentId, Value};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

// =============================================================================
// Index Type
// =============================================================================

/// Type of document index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexType {
    /// Hash index for equality lookups.
    Hash,
    /// Ordered index; key directions are recorded for the store's planner.
    BTree,
    /// Full-text search index over the first key field.
    FullText,
}

/// Sort direction of an index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexDirection {
    Ascending,
    Descending,
}

impl IndexDirection {
    fn suffix(&self) -> &'static str {
        match self {
            Self::Ascending => "1",
            Self::Descending => "-1",
        }
    }
}

/// One field of an index key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexField {
    pub field: String,
    pub direction: IndexDirection,
}

// =============================================================================
// Index Spec
// =============================================================================

/// Declarative description of an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub keys: Vec<IndexField>,
    pub index_type: IndexType,
    pub unique: bool,
}

impl IndexSpec {
    /// Ordered index over a single field.
    pub fn ascending(field: impl Into<String>) -> Self {
        Self::compound(vec![(field.into(), IndexDirection::Ascending)])
    }

    /// Ordered index over several fields.
    pub fn compound(keys: Vec<(String, IndexDirection)>) -> Self {
        let keys: Vec<IndexField> = keys
            .into_iter()
            .map(|(field, direction)| IndexField { field, direction })
            .collect();
        let name = keys
            .iter()
            .map(|k| format!("{}_{}", k.field, k.direction.suffix()))
            .collect::<Vec<_>>()
            .join("_");
        Self {
            name,
            keys,
            index_type: IndexType::BTree,
            unique: false,
        }
    }

    /// Hash index for equality lookups on one field.
    pub fn hash(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            name: format!("{}_hashed", field),
            keys: vec![IndexField {
                field,
                direction: IndexDirection::Ascending,
            }],
            index_type: IndexType::Hash,
            unique: false,
        }
    }

    /// Full-text index on one string field.
    pub fn text(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            name: format!("{}_text", field),
            keys: vec![IndexField {
                field,
                direction: IndexDirection::Ascending,
            }],
            index_type: IndexType::FullText,
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The first key field, used for equality and text lookups.
    pub fn leading_field(&self) -> Option<&str> {
        self.keys.first().map(|k| k.field.as_str())
    }

    /// Check the index definition is usable.
    pub fn check(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("index name is empty".to_string());
        }
        if self.keys.is_empty() {
            return Err(format!("index '{}' has no key fields", self.name));
        }
        if self.index_type == IndexType::FullText && (self.keys.len() != 1 || self.unique) {
            return Err(format!(
                "text index '{}' must have exactly one key and cannot be unique",
                self.name
            ));
        }
        Ok(())
    }
}

impl fmt::Display for IndexSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self
            .keys
            .iter()
            .map(|k| format!("{}: {}", k.field, k.direction.suffix()))
            .collect();
        write!(f, "{} {{{}}} {:?}", self.name, keys.join(", "), self.index_type)?;
        if self.unique {
            write!(f, " unique")?;
        }
        Ok(())
    }
}

// =============================================================================
// Document Index
// =============================================================================

/// Index for efficient document queries.
pub struct DocumentIndex {
    spec: IndexSpec,
    /// Full key tuple -> documents; only documents having every key field.
    tuples: HashMap<Vec<IndexKey>, HashSet<DocumentId>>,
    /// Leading field value (or array element) -> documents.
    leading: HashMap<IndexKey, HashSet<DocumentId>>,
    text_index: Option<InvertedIndex>,
}

impl DocumentIndex {
    /// Create a new index.
    pub fn new(spec: IndexSpec) -> Self {
        let text_index = if spec.index_type == IndexType::FullText {
            Some(InvertedIndex::new())
        } else {
            None
        };

        Self {
            spec,
            tuples: HashMap::new(),
            leading: HashMap::new(),
            text_index,
        }
    }

    pub fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Get the leading indexed field name.
    pub fn field(&self) -> &str {
        self.spec.leading_field().unwrap_or_default()
    }

    /// Get the index type.
    pub fn index_type(&self) -> IndexType {
        self.spec.index_type
    }

    pub fn is_unique(&self) -> bool {
        self.spec.unique
    }

    fn tuple_key(&self, doc: &Document) -> Option<Vec<IndexKey>> {
        self.spec
            .keys
            .iter()
            .map(|k| doc.get(&k.field).map(IndexKey::from_value))
            .collect()
    }

    /// Index a document.
    pub fn index_document(&mut self, doc: &Document) {
        let Some(value) = doc.get(self.field()) else {
            return;
        };

        if let Some(ref mut idx) = self.text_index {
            if let Some(text) = value.as_str() {
                idx.index_document(&doc.id, text);
            }
            return;
        }

        for key in IndexKey::entries(value) {
            self.leading.entry(key).or_default().insert(doc.id.clone());
        }
        if let Some(tuple) = self.tuple_key(doc) {
            self.tuples.entry(tuple).or_default().insert(doc.id.clone());
        }
    }

    /// Remove a document from the index.
    pub fn unindex_document(&mut self, doc: &Document) {
        let Some(value) = doc.get(self.field()) else {
            return;
        };

        if let Some(ref mut idx) = self.text_index {
            idx.unindex_document(&doc.id, value.as_str().unwrap_or_default());
            return;
        }

        for key in IndexKey::entries(value) {
            forget(&mut self.leading, &key, &doc.id);
        }
        if let Some(tuple) = self.tuple_key(doc) {
            forget(&mut self.tuples, &tuple, &doc.id);
        }
    }

    /// For unique indexes, the id of another document holding the same key.
    pub fn conflicting_document(&self, doc: &Document) -> Option<DocumentId> {
        if !self.spec.unique {
            return None;
        }
        let tuple = self.tuple_key(doc)?;
        self.tuples
            .get(&tuple)?
            .iter()
            .find(|id| **id != doc.id)
            .cloned()
    }

    /// Human-readable key of `doc`, for error messages.
    pub fn describe_key(&self, doc: &Document) -> String {
        self.spec
            .keys
            .iter()
            .map(|k| {
                let value = doc.get(&k.field).map(|v| v.to_json().to_string());
                format!("{}: {}", k.field, value.unwrap_or_else(|| "null".to_string()))
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Find documents whose leading field equals `value` (or holds it as an
    /// array element). Returns `None` when the index cannot answer.
    pub fn find_eq(&self, value: &Value) -> Option<HashSet<DocumentId>> {
        if self.text_index.is_some() || value.is_array() || value.is_object() {
            return None;
        }
        let key = IndexKey::from_value(value);
        Some(self.leading.get(&key).cloned().unwrap_or_default())
    }

    /// Search full-text index; `None` for non-text indexes.
    pub fn search(&self, query: &str) -> Option<HashSet<DocumentId>> {
        self.text_index.as_ref().map(|idx| idx.search(query))
    }

    /// Clear the index.
    pub fn clear(&mut self) {
        self.tuples.clear();
        self.leading.clear();
        if let Some(ref mut idx) = self.text_index {
            idx.clear();
        }
    }

    /// Get the number of unique leading keys.
    pub fn key_count(&self) -> usize {
        match self.text_index {
            Some(ref idx) => idx.term_count(),
            None => self.leading.len(),
        }
    }
}

// =============================================================================
// Index Key
// =============================================================================

/// Key for hash-based indexing. Integral floats share the `Int` key so that
/// `2018` and `2018.0` land in the same bucket, matching filter equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IndexKey {
    Null,
    Bool(bool),
    Int(i64),
    String(String),
    /// Non-integral floats, by bit pattern.
    Float(u64),
    Composite(String),
}

impl IndexKey {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Int(n) => Self::Int(*n),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Self::Int(*f as i64)
            }
            Value::Float(f) => Self::Float(f.to_bits()),
            Value::String(s) => Self::String(s.clone()),
            Value::Array(_) | Value::Object(_) => Self::Composite(value.to_json().to_string()),
        }
    }

    /// Leading-map entries for a value: arrays index each scalar element.
    fn entries(value: &Value) -> Vec<Self> {
        match value {
            Value::Array(items) => items
                .iter()
                .filter(|v| !v.is_array() && !v.is_object())
                .map(Self::from_value)
                .collect(),
            Value::Object(_) => Vec::new(),
            scalar => vec![Self::from_value(scalar)],
        }
    }
}

/// Drop `id` from the posting list under `key`, removing the list once empty.
fn forget<K: Eq + Hash>(postings: &mut HashMap<K, HashSet<DocumentId>>, key: &K, id: &DocumentId) {
    if let Some(ids) = postings.get_mut(key) {
        ids.remove(id);
        if ids.is_empty() {
            postings.remove(key);
        }
    }
}

// =============================================================================
// Inverted Index
// =============================================================================

/// Word -> documents map behind full-text indexes. Words come from
/// [`tokenize`], the same tokenizer the `Text` filter uses.
#[derive(Default)]
pub struct InvertedIndex {
    postings: HashMap<String, HashSet<DocumentId>>,
    /// Words recorded per document, so removal does not depend on the
    /// caller passing the same text again.
    words: HashMap<DocumentId, HashSet<String>>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the words of `text` for `doc_id`, replacing earlier ones.
    pub fn index_document(&mut self, doc_id: &DocumentId, text: &str) {
        self.unindex_document(doc_id, "");
        let words: HashSet<String> = tokenize(text).into_iter().collect();
        for word in &words {
            self.postings
                .entry(word.clone())
                .or_default()
                .insert(doc_id.clone());
        }
        self.words.insert(doc_id.clone(), words);
    }

    /// Forget `doc_id`. `text` is consulted only for documents indexed
    /// before their words were recorded.
    pub fn unindex_document(&mut self, doc_id: &DocumentId, text: &str) {
        let words = self
            .words
            .remove(doc_id)
            .unwrap_or_else(|| tokenize(text).into_iter().collect());
        for word in &words {
            forget(&mut self.postings, word, doc_id);
        }
    }

    /// Documents holding every word of `query`. An empty query matches
    /// nothing.
    pub fn search(&self, query: &str) -> HashSet<DocumentId> {
        let mut words = tokenize(query).into_iter();
        let Some(first) = words.next() else {
            return HashSet::new();
        };
        let mut hits = self.postings.get(&first).cloned().unwrap_or_default();
        for word in words {
            let Some(ids) = self.postings.get(&word) else {
                return HashSet::new();
            };
            hits.retain(|id| ids.contains(id));
        }
        hits
    }

    /// Documents holding any word of `query`.
    pub fn search_any(&self, query: &str) -> HashSet<DocumentId> {
        tokenize(query)
            .iter()
            .filter_map(|word| self.postings.get(word))
            .flatten()
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.postings.clear();
        self.words.clear();
    }

    /// Distinct words indexed.
    pub fn term_count(&self) -> usize {
        self.postings.len()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: &str, author: &str, isbn: &str) -> Document {
        let mut doc = Document::with_id(id);
        doc.set("author", author);
        doc.set("ISBN", isbn);
        doc
    }

    #[test]
    fn test_spec_names() {
        assert_eq!(IndexSpec::ascending("author").name, "author_1");
        assert_eq!(
            IndexSpec::compound(vec![
                ("genre".to_string(), IndexDirection::Ascending),
                ("publishedYear".to_string(), IndexDirection::Descending),
            ])
            .name,
            "genre_1_publishedYear_-1"
        );
        assert_eq!(IndexSpec::text("title").name, "title_text");
        assert!(IndexSpec::text("title").unique().check().is_err());
    }

    #[test]
    fn test_equality_index() {
        let mut index = DocumentIndex::new(IndexSpec::ascending("author"));

        index.index_document(&book("doc1", "Ibsen", "1"));
        index.index_document(&book("doc2", "Ibsen", "2"));
        index.index_document(&book("doc3", "Austen", "3"));

        assert_eq!(index.find_eq(&Value::from("Ibsen")).map(|s| s.len()), Some(2));
        assert_eq!(index.find_eq(&Value::from("Austen")).map(|s| s.len()), Some(1));
        assert_eq!(index.find_eq(&Value::from("Nobody")).map(|s| s.len()), Some(0));
    }

    #[test]
    fn test_numeric_keys_unify() {
        let mut index = DocumentIndex::new(IndexSpec::hash("publishedYear"));
        let mut doc = Document::with_id("doc1");
        doc.set("publishedYear", 2018i64);
        index.index_document(&doc);

        assert_eq!(index.find_eq(&Value::Float(2018.0)).map(|s| s.len()), Some(1));
    }

    #[test]
    fn test_array_elements_indexed() {
        let mut index = DocumentIndex::new(IndexSpec::ascending("tags"));
        let mut doc = Document::with_id("doc1");
        doc.set("tags", Value::Array(vec!["drama".into(), "classic".into()]));
        index.index_document(&doc);

        assert_eq!(index.find_eq(&Value::from("classic")).map(|s| s.len()), Some(1));
        assert!(index.find_eq(&Value::Array(vec![])).is_none());
    }

    #[test]
    fn test_unique_conflicts() {
        let mut index = DocumentIndex::new(IndexSpec::ascending("ISBN").unique());
        index.index_document(&book("doc1", "Ibsen", "978-0"));

        assert_eq!(
            index.conflicting_document(&book("doc2", "Other", "978-0")),
            Some(DocumentId::new("doc1"))
        );
        assert_eq!(index.conflicting_document(&book("doc1", "Ibsen", "978-0")), None);
        assert_eq!(index.conflicting_document(&book("doc3", "Other", "978-1")), None);

        let mut no_isbn = Document::with_id("doc4");
        no_isbn.set("author", "Anon");
        assert_eq!(index.conflicting_document(&no_isbn), None);
    }

    #[test]
    fn test_compound_unique_uses_full_tuple() {
        let spec = IndexSpec::compound(vec![
            ("author".to_string(), IndexDirection::Ascending),
            ("ISBN".to_string(), IndexDirection::Ascending),
        ])
        .unique();
        let mut index = DocumentIndex::new(spec);
        index.index_document(&book("doc1", "Ibsen", "1"));

        assert!(index.conflicting_document(&book("doc2", "Ibsen", "2")).is_none());
        assert!(index.conflicting_document(&book("doc3", "Ibsen", "1")).is_some());
    }

    #[test]
    fn test_inverted_index() {
        let mut index = InvertedIndex::new();

        let doc1 = DocumentId::new("doc1");
        let doc2 = DocumentId::new("doc2");

        index.index_document(&doc1, "The quick brown fox");
        index.index_document(&doc2, "The lazy brown dog");

        assert_eq!(index.search("brown").len(), 2);
        assert_eq!(index.search("quick").len(), 1);
        assert_eq!(index.search("quick brown").len(), 1);
        assert_eq!(index.search_any("quick lazy").len(), 2);
    }

    #[test]
    fn test_full_text_index() {
        let mut index = DocumentIndex::new(IndexSpec::text("title"));

        let mut doc1 = Document::with_id("doc1");
        doc1.set("title", "Hello world");

        let mut doc2 = Document::with_id("doc2");
        doc2.set("title", "Goodbye world");

        index.index_document(&doc1);
        index.index_document(&doc2);

        assert_eq!(index.search("world").map(|s| s.len()), Some(2));
        assert_eq!(index.search("hello").map(|s| s.len()), Some(1));
        assert!(index.find_eq(&Value::from("Hello world")).is_none());
        assert_eq!(index.key_count(), 3);

        index.unindex_document(&doc1);
        assert_eq!(index.search("hello").map(|s| s.len()), Some(0));
        assert_eq!(index.key_count(), 2);
    }

    #[test]
    fn test_unindex() {
        let mut index = DocumentIndex::new(IndexSpec::ascending("author").unique());

        let doc = book("doc1", "Test", "1");
        index.index_document(&doc);
        assert_eq!(index.find_eq(&Value::from("Test")).map(|s| s.len()), Some(1));

        index.unindex_document(&doc);
        assert_eq!(index.find_eq(&Value::from("Test")).map(|s| s.len()), Some(0));
        assert!(index
            .conflicting_document(&book("doc2", "Test", "1"))
            .is_none());
    }
}
