//! Folio Document - Document Store Engine
//!
//! Schema-flexible document storage backing the Folio library and commerce
//! data. Provides filtered queries, updates, aggregation pipelines,
//! secondary and full-text indexes, and schema validation.
//!
//! Key Features:
//! - Insertion-ordered collections with all-or-nothing batch writes
//! - Dotted-path queries with compound sort, skip, limit and projection
//! - Unique, compound and full-text indexes
//! - Group/unwind aggregation pipelines
//!
//! @version 0.1.0
//! @author Folio Development Team

pub mod types;
pub mod aggregate;
pub mod collection;
pub mod index;
pub mod query;
pub mod update;
pub mod validation;
pub mod engine;

pub use types::{Document, DocumentId, Value};
pub use aggregate::{Accumulator, Group, Pipeline, Stage, GROUP_KEY};
pub use collection::{Collection, CollectionError, UpdateResult};
pub use index::{DocumentIndex, IndexDirection, IndexSpec, IndexType};
pub use query::{Filter, Query, QueryBuilder, QueryResult, Sort};
pub use update::{Update, UpdateOp};
pub use validation::{FieldSchema, FieldType, Schema, SchemaBuilder, ValidationResult};
pub use engine::{DocumentEngine, EngineConfig, EngineError};
