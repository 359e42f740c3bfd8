//! Folio Repository
//!
//! Typed data access for one entity collection. Entities are validated
//! against the collection schema, their domain checks and their uniqueness
//! constraints before anything reaches the store.
//!
//! @version 0.1.0
//! @author Folio Development Team

use crate::schema::Entity;
use folio_client::DocumentStore;
use folio_common::{FolioError, Result, ValidationConfig};
use folio_document::{Document, DocumentId, Filter, Query, Update, UpdateOp, Value};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info};

// =============================================================================
// Record
// =============================================================================

/// An entity together with the id the store assigned it.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<E> {
    pub id: DocumentId,
    pub entity: E,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the collection of `E`.
pub struct Repository<E: Entity> {
    store: Arc<dyn DocumentStore>,
    validation: ValidationConfig,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            validation: self.validation.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            validation: ValidationConfig::default(),
            _entity: PhantomData,
        }
    }

    pub fn with_validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = validation;
        self
    }

    /// Create the collection if needed and install its schema.
    pub async fn init(&self) -> Result<()> {
        self.store
            .ensure_collection(E::COLLECTION, Some(E::schema()))
            .await?;
        debug!(database = %self.store.name(), collection = E::COLLECTION, "Collection ready");
        Ok(())
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Validate and store one entity.
    pub async fn insert(&self, entity: &E) -> Result<DocumentId> {
        let doc = encode(entity)?;
        let mut errors = self.problems(entity, &doc);
        if errors.is_empty() {
            errors = self.taken_values(&doc).await?;
        }
        if !errors.is_empty() {
            return Err(FolioError::Validation(errors));
        }

        let id = self.store.insert(E::COLLECTION, doc).await?;
        debug!(collection = E::COLLECTION, id = %id, "Inserted document");
        Ok(id)
    }

    /// Validate every entity first; store all of them or none.
    pub async fn insert_batch(&self, entities: &[E]) -> Result<Vec<DocumentId>> {
        if entities.is_empty() {
            return Ok(Vec::new());
        }

        let mut docs = Vec::with_capacity(entities.len());
        let mut errors = Vec::new();
        for (position, entity) in entities.iter().enumerate() {
            let doc = encode(entity)?;
            errors.extend(
                self.problems(entity, &doc)
                    .into_iter()
                    .map(|e| format!("document {}: {}", position, e)),
            );
            docs.push(doc);
        }

        let mut seen: HashMap<(&str, String), usize> = HashMap::new();
        for (position, doc) in docs.iter().enumerate() {
            for field in E::unique_fields() {
                let Some(value) = doc.get(field) else { continue };
                let key = (*field, value.to_json().to_string());
                if let Some(first) = seen.get(&key) {
                    errors.push(format!(
                        "document {}: {} {} repeats document {}",
                        position,
                        field,
                        value.to_json(),
                        first
                    ));
                } else {
                    seen.insert(key, position);
                }
            }
            for e in self.taken_values(doc).await? {
                errors.push(format!("document {}: {}", position, e));
            }
        }

        if !errors.is_empty() {
            return Err(FolioError::Validation(errors));
        }

        let ids = self.store.insert_many(E::COLLECTION, docs).await?;
        info!(collection = E::COLLECTION, count = ids.len(), "Inserted batch");
        Ok(ids)
    }

    /// Apply `update` to the first match. Returns how many documents the
    /// update was applied to, 0 or 1.
    pub async fn update_one(&self, query: &Query, update: &Update) -> Result<usize> {
        self.check_update(query, update, Some(1)).await?;
        let result = self.store.update_one(E::COLLECTION, query, update).await?;
        debug!(collection = E::COLLECTION, matched = result.matched, "Updated one");
        Ok(result.matched)
    }

    /// Apply `update` to every match atomically.
    pub async fn update_many(&self, query: &Query, update: &Update) -> Result<usize> {
        self.check_update(query, update, None).await?;
        let result = self.store.update_many(E::COLLECTION, query, update).await?;
        info!(
            collection = E::COLLECTION,
            matched = result.matched,
            modified = result.modified,
            "Updated documents"
        );
        Ok(result.matched)
    }

    pub async fn delete_one(&self, query: &Query) -> Result<usize> {
        self.store.delete_one(E::COLLECTION, query).await
    }

    pub async fn delete_many(&self, query: &Query) -> Result<usize> {
        let deleted = self.store.delete_many(E::COLLECTION, query).await?;
        info!(collection = E::COLLECTION, deleted, "Deleted documents");
        Ok(deleted)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub async fn find(&self, query: &Query) -> Result<Vec<Record<E>>> {
        self.store
            .find(E::COLLECTION, query)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn find_one(&self, query: &Query) -> Result<Option<Record<E>>> {
        let query = query.clone().with_limit(1);
        Ok(self.find(&query).await?.into_iter().next())
    }

    /// Fetch by id; a missing id is `NotFound`.
    pub async fn get(&self, id: &DocumentId) -> Result<Record<E>> {
        match self.store.get(E::COLLECTION, id).await? {
            Some(doc) => decode(doc),
            None => Err(FolioError::NotFound(format!(
                "{} document '{}'",
                E::COLLECTION,
                id
            ))),
        }
    }

    pub async fn count(&self, query: &Query) -> Result<usize> {
        self.store.count(E::COLLECTION, query).await
    }

    // -------------------------------------------------------------------------
    // Checks
    // -------------------------------------------------------------------------

    fn problems(&self, entity: &E, doc: &Document) -> Vec<String> {
        let mut errors = E::schema().validate(doc).errors;
        errors.extend(entity.check(&self.validation));
        errors
    }

    /// Unique field values of `doc` already held by a stored document.
    async fn taken_values(&self, doc: &Document) -> Result<Vec<String>> {
        let mut errors = Vec::new();
        for field in E::unique_fields() {
            let Some(value) = doc.get(field) else { continue };
            let query = Query::new().with_filter(Filter::eq(*field, value.clone()));
            if self.store.count(E::COLLECTION, &query).await? > 0 {
                errors.push(format!("{} {} already exists", field, value.to_json()));
            }
        }
        Ok(errors)
    }

    /// Reject updates that would give two documents the same unique value
    /// or leave a matched entity failing its own checks. An update matching
    /// nothing passes.
    async fn check_update(&self, query: &Query, update: &Update, limit: Option<usize>) -> Result<()> {
        let unique_sets: Vec<(&str, &Value)> = update
            .ops
            .iter()
            .filter_map(|op| match op {
                UpdateOp::Set { path, value } if E::unique_fields().iter().any(|f| *f == path.as_str()) => {
                    Some((path.as_str(), value))
                }
                _ => None,
            })
            .collect();
        let recheck = update.paths().any(|path| {
            E::checked_fields().iter().any(|field| {
                path == *field || path.strip_prefix(field).is_some_and(|rest| rest.starts_with('.'))
            })
        });
        if unique_sets.is_empty() && !recheck {
            return Ok(());
        }

        let mut targets = query.filter_only();
        targets.limit = limit;
        let targets = self.store.find(E::COLLECTION, &targets).await?;
        if targets.is_empty() {
            return Ok(());
        }

        let mut errors = Vec::new();
        for (field, value) in unique_sets {
            if targets.len() > 1 {
                errors.push(format!(
                    "{} {} would be shared by {} documents",
                    field,
                    value.to_json(),
                    targets.len()
                ));
                continue;
            }
            let holders = Query::new().with_filter(Filter::eq(field, value.clone()));
            let taken = self
                .store
                .find(E::COLLECTION, &holders)
                .await?
                .iter()
                .any(|holder| targets.iter().all(|target| target.id != holder.id));
            if taken {
                errors.push(format!("{} {} already exists", field, value.to_json()));
            }
        }

        if recheck {
            for target in targets {
                let mut image = target;
                // Images the patch or decoding cannot produce are left to the
                // store's own update and schema checks.
                if update.apply(&mut image).is_err() {
                    continue;
                }
                let Ok(record) = decode::<E>(image) else {
                    continue;
                };
                errors.extend(
                    record
                        .entity
                        .check(&self.validation)
                        .into_iter()
                        .map(|e| format!("document {}: {}", record.id, e)),
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(FolioError::Validation(errors))
        }
    }
}

fn encode<E: Entity>(entity: &E) -> Result<Document> {
    let json = serde_json::to_value(entity)?;
    Document::from_json(json).ok_or_else(|| {
        FolioError::Serialization(format!("{} entity is not a JSON object", E::COLLECTION))
    })
}

fn decode<E: Entity>(doc: Document) -> Result<Record<E>> {
    let entity = serde_json::from_value(doc.data_json()).map_err(|e| {
        FolioError::Serialization(format!("{} document '{}': {}", E::COLLECTION, doc.id, e))
    })?;
    Ok(Record { id: doc.id, entity })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Address, Book, LineItem, Order, OrderStatus, User};
    use folio_client::Client;
    use folio_common::ErrorKind;
    use folio_document::QueryBuilder;

    async fn books() -> Repository<Book> {
        let client = Client::connect("mem://").await.unwrap();
        let repo = Repository::new(Arc::new(client.database("library").unwrap()));
        repo.init().await.unwrap();
        repo
    }

    fn dolls_house() -> Book {
        Book::new("Dolls House", "Henrik Ibsen", 2018, "Marriage", "978-0-486-27062-4")
    }

    fn harbor() -> Book {
        Book::new("The Silent Harbor", "Amelia Hart", 2001, "Fiction", "978-0-14-044913-6")
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = books().await;
        let id = repo.insert(&dolls_house()).await.unwrap();

        let record = repo.get(&id).await.unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.entity, dolls_house());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let repo = books().await;
        let err = repo.get(&DocumentId::new("missing")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_invalid_entity_is_rejected() {
        let repo = books().await;
        let bad = Book::new("", "Henrik Ibsen", 2018, "Marriage", "978-0-486-27062-4");

        let err = repo.insert(&bad).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(repo.count(&Query::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_isbn_is_rejected() {
        let repo = books().await;
        repo.insert(&dolls_house()).await.unwrap();

        let mut copy = harbor();
        copy.isbn = dolls_house().isbn;
        let err = repo.insert(&copy).await.unwrap_err();
        assert!(err.messages()[0].contains("already exists"));
        assert_eq!(repo.count(&Query::all()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_batch_names_every_bad_position() {
        let repo = books().await;
        let mut bad = harbor();
        bad.title.clear();
        let batch = vec![dolls_house(), bad, dolls_house()];

        let err = repo.insert_batch(&batch).await.unwrap_err();
        let messages = err.messages();
        assert!(messages.iter().any(|m| m.starts_with("document 1:")));
        assert!(messages.iter().any(|m| m.starts_with("document 2:") && m.contains("repeats document 0")));
        assert_eq!(repo.count(&Query::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_and_delete_counts() {
        let repo = books().await;
        repo.insert_batch(&[dolls_house(), harbor()]).await.unwrap();

        let by_title = QueryBuilder::new().eq("title", "Dolls House").build();
        let updated = repo
            .update_one(&by_title, &Update::new().set("publishedYear", 2025i64))
            .await
            .unwrap();
        assert_eq!(updated, 1);
        let record = repo.find_one(&by_title).await.unwrap().unwrap();
        assert_eq!(record.entity.published_year, 2025);

        assert_eq!(repo.delete_many(&by_title).await.unwrap(), 1);
        assert_eq!(repo.update_one(&by_title, &Update::new().set("publishedYear", 2026i64)).await.unwrap(), 0);
        assert_eq!(repo.delete_many(&by_title).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_cannot_duplicate_isbn() {
        let repo = books().await;
        repo.insert_batch(&[dolls_house(), harbor()]).await.unwrap();

        let by_title = QueryBuilder::new().eq("title", "The Silent Harbor").build();
        let err = repo
            .update_one(&by_title, &Update::new().set("ISBN", dolls_house().isbn))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = repo
            .update_many(&Query::all(), &Update::new().set("ISBN", "978-1-86197-876-9"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_update_matching_nothing_ignores_taken_isbn() {
        let repo = books().await;
        repo.insert_batch(&[dolls_house(), harbor()]).await.unwrap();

        let missing = QueryBuilder::new().eq("title", "No Such Title").build();
        let taken = Update::new().set("ISBN", dolls_house().isbn);
        assert_eq!(repo.update_one(&missing, &taken).await.unwrap(), 0);
        assert_eq!(repo.update_many(&missing, &taken).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_breaking_schema_is_rejected() {
        let repo = books().await;
        repo.insert(&dolls_house()).await.unwrap();

        let err = repo
            .update_many(&Query::all(), &Update::new().set("publishedYear", "soon"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let record = repo.find_one(&Query::all()).await.unwrap().unwrap();
        assert_eq!(record.entity.published_year, 2018);
    }

    #[tokio::test]
    async fn test_order_total_checked_on_insert() {
        let client = Client::connect("mem://").await.unwrap();
        let repo: Repository<Order> = Repository::new(Arc::new(client.database("ecommerce").unwrap()));
        repo.init().await.unwrap();

        let mut order = Order::new("u1", vec![LineItem::new("p1", 2, 10.0)], OrderStatus::Processing);
        repo.insert(&order).await.unwrap();

        order.total_amount = 25.0;
        let err = repo.insert(&order).await.unwrap_err();
        assert!(err.messages()[0].contains("totalAmount"));
    }

    async fn orders() -> Repository<Order> {
        let client = Client::connect("mem://").await.unwrap();
        let repo = Repository::new(Arc::new(client.database("ecommerce").unwrap()));
        repo.init().await.unwrap();
        repo
    }

    #[tokio::test]
    async fn test_order_total_checked_on_update() {
        let repo = orders().await;
        let id = repo
            .insert(&Order::new("u1", vec![LineItem::new("p1", 1, 10.0)], OrderStatus::Processing))
            .await
            .unwrap();
        let by_user = QueryBuilder::new().eq("userId", "u1").build();

        let err = repo
            .update_one(&by_user, &Update::new().set("totalAmount", 999.0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.messages()[0].contains("totalAmount"));

        let err = repo
            .update_many(&by_user, &Update::new().set("products.0.quantity", 50))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let stored = repo.get(&id).await.unwrap().entity;
        assert_eq!(stored.products[0].quantity, 1);
        assert!((stored.total_amount - 10.0).abs() < 1e-9);

        let consistent = Update::new().set("products.0.quantity", 3).set("totalAmount", 30.0);
        assert_eq!(repo.update_one(&by_user, &consistent).await.unwrap(), 1);
        assert!((repo.get(&id).await.unwrap().entity.total_amount - 30.0).abs() < 1e-9);

        assert_eq!(
            repo.update_one(&by_user, &Update::new().set("status", "shipped")).await.unwrap(),
            1
        );
    }

    async fn users() -> Repository<User> {
        let client = Client::connect("mem://").await.unwrap();
        let repo = Repository::new(Arc::new(client.database("ecommerce").unwrap()));
        repo.init().await.unwrap();
        repo
    }

    fn user(name: &str, email: &str) -> User {
        User::new(
            name,
            email,
            Address {
                street: "12 Elm St".to_string(),
                city: "Springfield".to_string(),
                state: "IL".to_string(),
                zip: "62704".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_email() {
        let repo = users().await;
        repo.insert(&user("Ada", "ada@example.com")).await.unwrap();

        let err = repo.insert(&user("Other Ada", "ada@example.com")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.messages()[0].contains("already exists"));
        assert_eq!(repo.count(&Query::all()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_batch_rejects_repeated_email() {
        let repo = users().await;
        let batch = [
            user("Ada", "ada@example.com"),
            user("Grace", "grace@example.com"),
            user("Ada Again", "ada@example.com"),
        ];

        let err = repo.insert_batch(&batch).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.messages().iter().any(|m| m.contains("repeats document 0")));
        assert_eq!(repo.count(&Query::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_cannot_duplicate_email() {
        let repo = users().await;
        repo.insert_batch(&[user("Ada", "ada@example.com"), user("Grace", "grace@example.com")])
            .await
            .unwrap();

        let grace = QueryBuilder::new().eq("name", "Grace").build();
        let err = repo
            .update_one(&grace, &Update::new().set("email", "ada@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.messages()[0].contains("already exists"));

        let nobody = QueryBuilder::new().eq("name", "Nobody").build();
        let taken = Update::new().set("email", "ada@example.com");
        assert_eq!(repo.update_one(&nobody, &taken).await.unwrap(), 0);

        let moved = Update::new().set("email", "grace@example.org");
        assert_eq!(repo.update_one(&grace, &moved).await.unwrap(), 1);
    }
}
