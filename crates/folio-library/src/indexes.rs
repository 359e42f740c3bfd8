//! Folio Index Declarations
//!
//! The indexes every deployment carries, applied once at start-up.
//!
//! @version 0.1.0
//! @author Folio Development Team

use crate::schema::{Book, Domain, Entity, Order, User};
use folio_client::DocumentStore;
use folio_common::Result;
use folio_document::{IndexDirection, IndexSpec};
use tracing::info;

/// One declared index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDeclaration {
    pub domain: Domain,
    pub collection: &'static str,
    pub spec: IndexSpec,
}

impl IndexDeclaration {
    fn of<E: Entity>(spec: IndexSpec) -> Self {
        Self {
            domain: E::DOMAIN,
            collection: E::COLLECTION,
            spec,
        }
    }
}

/// All declared indexes, in application order.
pub fn declarations() -> Vec<IndexDeclaration> {
    vec![
        IndexDeclaration::of::<Book>(IndexSpec::ascending("author")),
        IndexDeclaration::of::<Book>(IndexSpec::compound(vec![
            ("genre".to_string(), IndexDirection::Ascending),
            ("publishedYear".to_string(), IndexDirection::Descending),
        ])),
        IndexDeclaration::of::<Book>(IndexSpec::text("title")),
        IndexDeclaration::of::<Book>(IndexSpec::hash("ISBN").unique()),
        IndexDeclaration::of::<User>(IndexSpec::hash("email").unique()),
        IndexDeclaration::of::<Order>(IndexSpec::ascending("userId")),
    ]
}

/// Outcome of applying one declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedIndex {
    pub collection: &'static str,
    pub name: String,
    pub created: bool,
}

/// Apply every declaration. Collections are created when missing; indexes
/// that already exist are left alone.
pub async fn apply_indexes(
    library: &dyn DocumentStore,
    commerce: &dyn DocumentStore,
) -> Result<Vec<AppliedIndex>> {
    let mut applied = Vec::new();
    for declaration in declarations() {
        let store = match declaration.domain {
            Domain::Library => library,
            Domain::Commerce => commerce,
        };
        store.ensure_collection(declaration.collection, None).await?;

        let name = declaration.spec.name.clone();
        let created = store
            .create_index(declaration.collection, declaration.spec)
            .await?;
        if created {
            info!(database = %store.name(), collection = declaration.collection, index = %name, "Applied index");
        }
        applied.push(AppliedIndex {
            collection: declaration.collection,
            name,
            created,
        });
    }
    Ok(applied)
}
