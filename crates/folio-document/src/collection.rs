//! Folio Document Collection
//!
//! Collection management for document storage. Documents are kept in
//! insertion order; every write either fully applies or leaves the
//! collection untouched.
//!
//! @version 0.1.0
//! @author Folio Development Team

use crate::aggregate::Pipeline;
use crate::index::{DocumentIndex, IndexSpec, IndexType};
use crate::query::{Filter, Query, QueryResult};
use crate::types::{Document, DocumentId, Value};
use crate::update::Update;
use crate::validation::Schema;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

// =============================================================================
// Collection
// =============================================================================

/// A collection of documents.
pub struct Collection {
    name: String,
    inner: RwLock<Inner>,
}

struct Inner {
    /// Insertion sequence -> document.
    docs: BTreeMap<u64, Document>,
    positions: HashMap<DocumentId, u64>,
    next_seq: u64,
    indexes: Vec<DocumentIndex>,
    schema: Option<Schema>,
}

/// Outcome of an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched: usize,
    pub modified: usize,
}

impl Collection {
    /// Create a new collection.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: RwLock::new(Inner {
                docs: BTreeMap::new(),
                positions: HashMap::new(),
                next_seq: 0,
                indexes: Vec::new(),
                schema: None,
            }),
        }
    }

    /// Create a collection with schema validation.
    pub fn with_schema(name: impl Into<String>, schema: Schema) -> Self {
        let collection = Self::new(name);
        collection.inner.write().schema = Some(schema);
        collection
    }

    /// Get the collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    // -------------------------------------------------------------------------
    // Document Operations
    // -------------------------------------------------------------------------

    /// Insert a document.
    pub fn insert(&self, doc: Document) -> Result<DocumentId, CollectionError> {
        let mut inner = self.inner.write();
        inner.insert(doc)
    }

    /// Insert multiple documents. Either every document is stored or none
    /// is; a rejected batch reports each failing position.
    pub fn insert_many(&self, docs: Vec<Document>) -> Result<Vec<DocumentId>, CollectionError> {
        let mut inner = self.inner.write();
        let mut ids = Vec::with_capacity(docs.len());
        let mut failures = Vec::new();

        for (position, doc) in docs.into_iter().enumerate() {
            match inner.insert(doc) {
                Ok(id) => ids.push(id),
                Err(err) => failures.push((position, err)),
            }
        }

        if failures.is_empty() {
            return Ok(ids);
        }

        for id in &ids {
            inner.remove(id);
        }
        Err(CollectionError::BatchRejected(failures))
    }

    /// Get a document by ID.
    pub fn get(&self, id: &DocumentId) -> Option<Document> {
        let inner = self.inner.read();
        inner.get(id).cloned()
    }

    /// Replace a document by ID.
    pub fn replace(&self, id: &DocumentId, mut doc: Document) -> Result<(), CollectionError> {
        let mut inner = self.inner.write();
        let seq = *inner
            .positions
            .get(id)
            .ok_or_else(|| CollectionError::NotFound(id.clone()))?;
        let old = inner.docs[&seq].clone();

        doc.id = id.clone();
        doc.created_at = old.created_at;
        doc.updated_at = Some(now_millis());
        inner.check_schema(&doc)?;
        inner.reindex(&[old], &[doc.clone()])?;
        inner.docs.insert(seq, doc);
        Ok(())
    }

    /// Apply `update` to the first document matching `query`.
    pub fn update_one(&self, query: &Query, update: &Update) -> Result<UpdateResult, CollectionError> {
        self.update_matching(query, update, Some(1))
    }

    /// Apply `update` to every document matching `query`. All matched
    /// documents are updated or none are.
    pub fn update_many(&self, query: &Query, update: &Update) -> Result<UpdateResult, CollectionError> {
        self.update_matching(query, update, None)
    }

    fn update_matching(
        &self,
        query: &Query,
        update: &Update,
        limit: Option<usize>,
    ) -> Result<UpdateResult, CollectionError> {
        update.check().map_err(CollectionError::ValidationFailed)?;

        let mut inner = self.inner.write();
        let seqs = inner.matching_seqs(query, limit);

        let mut old_images = Vec::with_capacity(seqs.len());
        let mut new_images = Vec::with_capacity(seqs.len());
        let mut errors = Vec::new();
        let stamp = now_millis();

        for seq in &seqs {
            let old = &inner.docs[seq];
            let mut new = old.clone();
            if let Err(e) = update.apply(&mut new) {
                errors.push(format!("document {}: {}", old.id, e));
                continue;
            }
            if let Some(ref schema) = inner.schema {
                let result = schema.validate(&new);
                errors.extend(result.errors.into_iter().map(|e| format!("document {}: {}", old.id, e)));
            }
            new.updated_at = Some(stamp);
            old_images.push(old.clone());
            new_images.push(new);
        }

        if !errors.is_empty() {
            return Err(CollectionError::ValidationFailed(errors));
        }

        let modified = old_images
            .iter()
            .zip(&new_images)
            .filter(|(old, new)| old.data != new.data)
            .count();

        inner.reindex(&old_images, &new_images)?;
        for (seq, new) in seqs.iter().zip(new_images) {
            inner.docs.insert(*seq, new);
        }

        Ok(UpdateResult {
            matched: seqs.len(),
            modified,
        })
    }

    /// Delete a document by ID.
    pub fn delete(&self, id: &DocumentId) -> Result<Document, CollectionError> {
        let mut inner = self.inner.write();
        inner
            .remove(id)
            .ok_or_else(|| CollectionError::NotFound(id.clone()))
    }

    /// Delete the first document matching `query`; returns how many were removed.
    pub fn delete_one(&self, query: &Query) -> usize {
        self.delete_matching(query, Some(1))
    }

    /// Delete every document matching `query`; returns how many were removed.
    pub fn delete_many(&self, query: &Query) -> usize {
        self.delete_matching(query, None)
    }

    fn delete_matching(&self, query: &Query, limit: Option<usize>) -> usize {
        let mut inner = self.inner.write();
        let ids: Vec<DocumentId> = inner
            .matching_seqs(query, limit)
            .iter()
            .map(|seq| inner.docs[seq].id.clone())
            .collect();

        for id in &ids {
            inner.remove(id);
        }
        ids.len()
    }

    /// Check if a document exists.
    pub fn contains(&self, id: &DocumentId) -> bool {
        self.inner.read().positions.contains_key(id)
    }

    /// Get the number of documents.
    pub fn count(&self) -> usize {
        self.inner.read().docs.len()
    }

    /// Get all document IDs in insertion order.
    pub fn ids(&self) -> Vec<DocumentId> {
        let inner = self.inner.read();
        inner.docs.values().map(|d| d.id.clone()).collect()
    }

    /// Get all documents in insertion order.
    pub fn all(&self) -> Vec<Document> {
        let inner = self.inner.read();
        inner.docs.values().cloned().collect()
    }

    /// Clear all documents.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.docs.clear();
        inner.positions.clear();
        for index in inner.indexes.iter_mut() {
            index.clear();
        }
    }

    // -------------------------------------------------------------------------
    // Query Operations
    // -------------------------------------------------------------------------

    /// Find documents matching a query.
    pub fn find(&self, query: &Query) -> QueryResult {
        let start = std::time::Instant::now();
        let inner = self.inner.read();

        let (candidates, scanned) = inner.candidates(query);
        let matching: Vec<Document> = candidates
            .into_iter()
            .filter(|doc| query.matches(doc))
            .cloned()
            .collect();

        QueryResult {
            documents: query.finish(matching),
            total_scanned: scanned,
            execution_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Find the first document a query returns.
    pub fn find_one(&self, query: &Query) -> Option<Document> {
        let query = query.clone().with_limit(1);
        self.find(&query).documents.into_iter().next()
    }

    /// Count documents matching a query's filters.
    pub fn count_matching(&self, query: &Query) -> usize {
        let inner = self.inner.read();
        let (candidates, _) = inner.candidates(query);
        candidates.into_iter().filter(|doc| query.matches(doc)).count()
    }

    /// Run an aggregation pipeline over the collection.
    pub fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Value>, CollectionError> {
        pipeline.check().map_err(CollectionError::ValidationFailed)?;
        Ok(pipeline.run(self.all()))
    }

    // -------------------------------------------------------------------------
    // Index Operations
    // -------------------------------------------------------------------------

    /// Create an index. Returns `false` when an identical index already
    /// exists; a different index under the same name is an error.
    pub fn create_index(&self, spec: IndexSpec) -> Result<bool, CollectionError> {
        spec.check().map_err(CollectionError::IndexError)?;

        let mut inner = self.inner.write();
        if let Some(existing) = inner.indexes.iter().find(|i| i.name() == spec.name) {
            if existing.spec() == &spec {
                return Ok(false);
            }
            return Err(CollectionError::IndexError(format!(
                "index '{}' already exists as {}",
                spec.name,
                existing.spec()
            )));
        }

        let mut index = DocumentIndex::new(spec);
        for doc in inner.docs.values() {
            if let Some(other) = index.conflicting_document(doc) {
                return Err(CollectionError::DuplicateKey {
                    index: index.name().to_string(),
                    key: index.describe_key(doc),
                    existing: other,
                });
            }
            index.index_document(doc);
        }

        inner.indexes.push(index);
        Ok(true)
    }

    /// Drop an index by name.
    pub fn drop_index(&self, name: &str) -> bool {
        let mut inner = self.inner.write();
        let before = inner.indexes.len();
        inner.indexes.retain(|idx| idx.name() != name);
        inner.indexes.len() != before
    }

    /// Get all index names.
    pub fn index_names(&self) -> Vec<String> {
        let inner = self.inner.read();
        inner.indexes.iter().map(|idx| idx.name().to_string()).collect()
    }

    /// Get all index definitions.
    pub fn index_specs(&self) -> Vec<IndexSpec> {
        let inner = self.inner.read();
        inner.indexes.iter().map(|idx| idx.spec().clone()).collect()
    }

    // -------------------------------------------------------------------------
    // Schema Operations
    // -------------------------------------------------------------------------

    /// Set the collection schema. Existing documents are not rechecked.
    pub fn set_schema(&self, schema: Schema) {
        self.inner.write().schema = Some(schema);
    }

    /// Get the collection schema.
    pub fn schema(&self) -> Option<Schema> {
        self.inner.read().schema.clone()
    }
}

// -----------------------------------------------------------------------------
// Locked state
// -----------------------------------------------------------------------------

impl Inner {
    fn get(&self, id: &DocumentId) -> Option<&Document> {
        self.positions.get(id).and_then(|seq| self.docs.get(seq))
    }

    fn check_schema(&self, doc: &Document) -> Result<(), CollectionError> {
        if let Some(ref schema) = self.schema {
            let result = schema.validate(doc);
            if !result.is_valid {
                return Err(CollectionError::ValidationFailed(result.errors));
            }
        }
        Ok(())
    }

    fn unique_conflict(&self, doc: &Document) -> Option<CollectionError> {
        self.indexes.iter().find_map(|index| {
            index
                .conflicting_document(doc)
                .map(|existing| CollectionError::DuplicateKey {
                    index: index.name().to_string(),
                    key: index.describe_key(doc),
                    existing,
                })
        })
    }

    fn insert(&mut self, mut doc: Document) -> Result<DocumentId, CollectionError> {
        self.check_schema(&doc)?;

        if self.positions.contains_key(&doc.id) {
            return Err(CollectionError::DuplicateId(doc.id));
        }
        if let Some(err) = self.unique_conflict(&doc) {
            return Err(err);
        }

        if doc.created_at.is_none() {
            doc.created_at = Some(now_millis());
        }
        let id = doc.id.clone();
        let seq = self.next_seq;
        self.next_seq += 1;

        for index in self.indexes.iter_mut() {
            index.index_document(&doc);
        }
        self.positions.insert(id.clone(), seq);
        self.docs.insert(seq, doc);
        Ok(id)
    }

    fn remove(&mut self, id: &DocumentId) -> Option<Document> {
        let seq = self.positions.remove(id)?;
        let doc = self.docs.remove(&seq)?;
        for index in self.indexes.iter_mut() {
            index.unindex_document(&doc);
        }
        Some(doc)
    }

    /// Swap old images for new ones in every index, checking unique keys.
    /// On conflict the indexes are restored to the old images.
    fn reindex(&mut self, old: &[Document], new: &[Document]) -> Result<(), CollectionError> {
        for doc in old {
            for index in self.indexes.iter_mut() {
                index.unindex_document(doc);
            }
        }

        for (i, doc) in new.iter().enumerate() {
            if let Some(err) = self.unique_conflict(doc) {
                for indexed in &new[..i] {
                    for index in self.indexes.iter_mut() {
                        index.unindex_document(indexed);
                    }
                }
                for doc in old {
                    for index in self.indexes.iter_mut() {
                        index.index_document(doc);
                    }
                }
                return Err(err);
            }
            for index in self.indexes.iter_mut() {
                index.index_document(doc);
            }
        }
        Ok(())
    }

    /// Documents that may match `query`, in insertion order, narrowed by
    /// any index able to answer one of the top-level filters. Also returns
    /// how many documents that is.
    fn candidates(&self, query: &Query) -> (Vec<&Document>, usize) {
        let docs: Vec<&Document> = match self.index_lookup(&query.filters) {
            Some(ids) => {
                let mut seqs: Vec<u64> = ids
                    .iter()
                    .filter_map(|id| self.positions.get(id).copied())
                    .collect();
                seqs.sort_unstable();
                seqs.iter().filter_map(|seq| self.docs.get(seq)).collect()
            }
            None => self.docs.values().collect(),
        };
        let scanned = docs.len();
        (docs, scanned)
    }

    fn index_lookup(&self, filters: &[Filter]) -> Option<HashSet<DocumentId>> {
        let mut result: Option<HashSet<DocumentId>> = None;

        for filter in filters {
            let found = match filter {
                Filter::Eq { field, value } => self
                    .indexes
                    .iter()
                    .filter(|idx| idx.index_type() != IndexType::FullText && idx.field() == field)
                    .find_map(|idx| idx.find_eq(value)),
                Filter::Text { field, query } => self
                    .indexes
                    .iter()
                    .filter(|idx| idx.field() == field)
                    .find_map(|idx| idx.search(query)),
                _ => None,
            };

            if let Some(ids) = found {
                result = Some(match result {
                    Some(current) => current.intersection(&ids).cloned().collect(),
                    None => ids,
                });
            }
        }

        result
    }

    /// Sequence numbers of documents matching the query's filters, in
    /// insertion order, up to `limit`.
    fn matching_seqs(&self, query: &Query, limit: Option<usize>) -> Vec<u64> {
        let (candidates, _) = self.candidates(query);
        candidates
            .into_iter()
            .filter(|doc| query.matches(doc))
            .take(limit.unwrap_or(usize::MAX))
            .filter_map(|doc| self.positions.get(&doc.id).copied())
            .collect()
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

// =============================================================================
// Collection Error
// =============================================================================

/// Errors that can occur in collection operations.
#[derive(Debug, Clone)]
pub enum CollectionError {
    DuplicateId(DocumentId),
    NotFound(DocumentId),
    ValidationFailed(Vec<String>),
    DuplicateKey {
        index: String,
        key: String,
        existing: DocumentId,
    },
    /// Failures by position in a rejected batch.
    BatchRejected(Vec<(usize, CollectionError)>),
    IndexError(String),
}

impl CollectionError {
    /// Flattened messages, one per problem.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::ValidationFailed(errors) => errors.clone(),
            Self::BatchRejected(failures) => failures
                .iter()
                .flat_map(|(position, err)| {
                    err.messages()
                        .into_iter()
                        .map(move |m| format!("document {}: {}", position, m))
                })
                .collect(),
            other => vec![other.to_string()],
        }
    }
}

impl std::fmt::Display for CollectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateId(id) => write!(f, "Document with ID {} already exists", id),
            Self::NotFound(id) => write!(f, "Document with ID {} not found", id),
            Self::ValidationFailed(errors) => {
                write!(f, "Validation failed: {}", errors.join(", "))
            }
            Self::DuplicateKey { index, key, existing } => write!(
                f,
                "Duplicate key in unique index {} ({}), held by document {}",
                index, key, existing
            ),
            Self::BatchRejected(_) => {
                write!(f, "Batch rejected: {}", self.messages().join("; "))
            }
            Self::IndexError(msg) => write!(f, "Index error: {}", msg),
        }
    }
}

impl std::error::Error for CollectionError {}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexDirection;
    use crate::query::QueryBuilder;
    use crate::validation::{FieldSchema, SchemaBuilder};

    fn book(id: &str, title: &str, isbn: &str, year: i64, genre: &str) -> Document {
        let mut doc = Document::with_id(id);
        doc.set("title", title);
        doc.set("ISBN", isbn);
        doc.set("publishedYear", year);
        doc.set("genre", genre);
        doc
    }

    fn library() -> Collection {
        let collection = Collection::new("books");
        collection
            .create_index(IndexSpec::ascending("ISBN").unique())
            .unwrap();
        collection
            .insert_many(vec![
                book("b1", "The Silent Harbor", "111", 2001, "Fiction"),
                book("b2", "Edge of Fury", "222", 2024, "action"),
                book("b3", "Northern Lights", "333", 2012, "Fiction"),
            ])
            .unwrap();
        collection
    }

    #[test]
    fn test_collection_creation() {
        let collection = Collection::new("users");
        assert_eq!(collection.name(), "users");
        assert_eq!(collection.count(), 0);
    }

    #[test]
    fn test_insert_and_get() {
        let collection = Collection::new("test");

        let mut doc = Document::with_id("doc1");
        doc.set("name", "Alice");

        let id = collection.insert(doc).unwrap();
        assert_eq!(id.as_str(), "doc1");

        let retrieved = collection.get(&id).unwrap();
        assert_eq!(retrieved.get("name").and_then(|v| v.as_str()), Some("Alice"));
    }

    #[test]
    fn test_duplicate_id() {
        let collection = Collection::new("test");

        collection.insert(Document::with_id("same-id")).unwrap();
        let result = collection.insert(Document::with_id("same-id"));

        assert!(matches!(result, Err(CollectionError::DuplicateId(_))));
    }

    #[test]
    fn test_find_keeps_insertion_order() {
        let collection = Collection::new("test");
        for i in 0..10 {
            let mut doc = Document::with_id(format!("doc{:02}", 9 - i));
            doc.set("value", i as i64);
            collection.insert(doc).unwrap();
        }

        let values: Vec<i64> = collection
            .find(&Query::all())
            .documents
            .iter()
            .filter_map(|d| d.get("value").and_then(Value::as_i64))
            .collect();
        assert_eq!(values, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_unique_index_rejects_duplicates() {
        let collection = library();
        let err = collection
            .insert(book("b4", "Copy", "222", 2020, "Fiction"))
            .unwrap_err();

        assert!(matches!(err, CollectionError::DuplicateKey { .. }));
        assert_eq!(collection.count(), 3);
    }

    #[test]
    fn test_insert_many_is_all_or_nothing() {
        let collection = library();
        let err = collection
            .insert_many(vec![
                book("b4", "Velvet Manners", "444", 2025, "Classy"),
                book("b5", "Copy", "111", 2020, "Fiction"),
                book("b6", "Dolls House", "444", 2018, "Marriage"),
            ])
            .unwrap_err();

        match err {
            CollectionError::BatchRejected(ref failures) => {
                let positions: Vec<usize> = failures.iter().map(|(p, _)| *p).collect();
                assert_eq!(positions, vec![1, 2]);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(err.messages()[0].starts_with("document 1:"));
        assert_eq!(collection.count(), 3);
        assert!(!collection.contains(&DocumentId::new("b4")));

        // index state was rolled back too
        collection
            .insert(book("b4", "Velvet Manners", "444", 2025, "Classy"))
            .unwrap();
    }

    #[test]
    fn test_update_many_counts_and_atomicity() {
        let collection = library();

        let result = collection
            .update_many(
                &QueryBuilder::new().eq("genre", "Fiction").build(),
                &Update::new().set("genre", "Literary Fiction"),
            )
            .unwrap();
        assert_eq!(result, UpdateResult { matched: 2, modified: 2 });

        let again = collection
            .update_many(
                &QueryBuilder::new().eq("genre", "Literary Fiction").build(),
                &Update::new().set("genre", "Literary Fiction"),
            )
            .unwrap();
        assert_eq!(again, UpdateResult { matched: 2, modified: 0 });

        let err = collection
            .update_many(&Query::all(), &Update::new().set("ISBN", "999"))
            .unwrap_err();
        assert!(matches!(err, CollectionError::DuplicateKey { .. }));
        assert_eq!(
            collection.get(&DocumentId::new("b1")).unwrap().get("ISBN"),
            Some(&Value::from("111"))
        );

        let none = collection
            .update_one(
                &QueryBuilder::new().eq("genre", "Poetry").build(),
                &Update::new().set("rating", 4.0f64),
            )
            .unwrap();
        assert_eq!(none.matched, 0);
    }

    #[test]
    fn test_update_rechecks_schema() {
        let schema = SchemaBuilder::new("Book")
            .required_field("title", FieldSchema::string().min_length(1))
            .build();
        let collection = Collection::with_schema("books", schema);
        collection.insert(book("b1", "Dolls House", "1", 2018, "Marriage")).unwrap();

        let err = collection
            .update_one(&Query::all(), &Update::new().unset("title"))
            .unwrap_err();
        assert!(matches!(err, CollectionError::ValidationFailed(_)));
        assert!(collection.get(&DocumentId::new("b1")).unwrap().contains("title"));
    }

    #[test]
    fn test_delete_counts() {
        let collection = library();

        assert_eq!(collection.delete_one(&QueryBuilder::new().eq("genre", "Fiction").build()), 1);
        assert_eq!(collection.delete_many(&QueryBuilder::new().eq("genre", "Poetry").build()), 0);
        assert_eq!(collection.delete_many(&Query::all()), 2);
        assert_eq!(collection.count(), 0);
        assert!(matches!(
            collection.delete(&DocumentId::new("b1")),
            Err(CollectionError::NotFound(_))
        ));
    }

    #[test]
    fn test_index_and_scan_agree() {
        let plain = library();
        let indexed = library();
        indexed
            .create_index(IndexSpec::compound(vec![
                ("genre".to_string(), IndexDirection::Ascending),
                ("publishedYear".to_string(), IndexDirection::Descending),
            ]))
            .unwrap();
        indexed.create_index(IndexSpec::text("title")).unwrap();

        let queries = vec![
            QueryBuilder::new().eq("genre", "Fiction").build(),
            QueryBuilder::new().text("title", "northern").build(),
            QueryBuilder::new().eq("genre", "Fiction").gt("publishedYear", 2005i64).build(),
        ];

        for query in queries {
            let a: Vec<DocumentId> = plain.find(&query).documents.into_iter().map(|d| d.id).collect();
            let b: Vec<DocumentId> = indexed.find(&query).documents.into_iter().map(|d| d.id).collect();
            assert_eq!(a, b);
        }

        let narrowed = indexed.find(&QueryBuilder::new().eq("genre", "action").build());
        assert_eq!(narrowed.total_scanned, 1);
    }

    #[test]
    fn test_create_index_idempotent() {
        let collection = library();
        assert!(!collection
            .create_index(IndexSpec::ascending("ISBN").unique())
            .unwrap());
        assert!(collection.create_index(IndexSpec::ascending("ISBN")).is_err());
        assert_eq!(collection.index_names(), vec!["ISBN_1".to_string()]);

        assert!(collection.drop_index("ISBN_1"));
        assert!(!collection.drop_index("ISBN_1"));
    }

    #[test]
    fn test_unique_index_over_existing_duplicates_fails() {
        let collection = Collection::new("books");
        collection.insert(book("b1", "A", "1", 2000, "x")).unwrap();
        collection.insert(book("b2", "B", "1", 2000, "x")).unwrap();

        assert!(collection.create_index(IndexSpec::ascending("ISBN").unique()).is_err());
        assert!(collection.index_names().is_empty());
    }
}
