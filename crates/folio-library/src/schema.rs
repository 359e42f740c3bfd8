//! Folio Schema Definitions
//!
//! Typed entities for the library and commerce databases, the store-level
//! schema of each collection, and the domain checks the schema cannot
//! express.
//!
//! @version 0.1.0
//! @author Folio Development Team

use chrono::{DateTime, Utc};
use folio_common::ValidationConfig;
use folio_document::{FieldSchema, Schema, SchemaBuilder, Value};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Entity
// =============================================================================

/// Which database a collection lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Library,
    Commerce,
}

/// A typed document stored in one collection.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;
    const DOMAIN: Domain;

    /// Schema enforced by the store on every write.
    fn schema() -> Schema;

    /// Fields whose values identify at most one document.
    fn unique_fields() -> &'static [&'static str] {
        &[]
    }

    /// Invariants spanning several fields; one message per problem.
    fn check(&self, _config: &ValidationConfig) -> Vec<String> {
        Vec::new()
    }

    /// Fields that [`Entity::check`] depends on. Updates touching them, or
    /// anything below them, are re-checked against the updated entity.
    fn checked_fields() -> &'static [&'static str] {
        &[]
    }
}

fn text() -> FieldSchema {
    FieldSchema::string().min_length(1)
}

fn timestamp() -> FieldSchema {
    FieldSchema::string().pattern(r"^\d{4}-\d{2}-\d{2}T")
}

// =============================================================================
// Book
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub author: String,
    #[serde(rename = "publishedYear", alias = "publisherYear", alias = "PublishedYear")]
    pub published_year: i32,
    pub genre: String,
    #[serde(rename = "ISBN", alias = "isbn")]
    pub isbn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

impl Book {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        published_year: i32,
        genre: impl Into<String>,
        isbn: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            published_year,
            genre: genre.into(),
            isbn: isbn.into(),
            rating: None,
        }
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }
}

impl Entity for Book {
    const COLLECTION: &'static str = "books";
    const DOMAIN: Domain = Domain::Library;

    fn schema() -> Schema {
        SchemaBuilder::new("Book")
            .required_field("title", text())
            .required_field("author", text())
            .required_field("publishedYear", FieldSchema::int().min(0.0).max(9999.0))
            .required_field("genre", text())
            .required_field("ISBN", FieldSchema::string().pattern(r"^[0-9][0-9-]{8,15}[0-9Xx]$"))
            .field("rating", FieldSchema::number().min(0.0).max(5.0).nullable())
            .build()
    }

    fn unique_fields() -> &'static [&'static str] {
        &["ISBN"]
    }
}

// =============================================================================
// User
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "username")]
    pub name: String,
    pub email: String,
    pub address: Address,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>, address: Address) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            address,
            created_at: Utc::now(),
        }
    }
}

impl Entity for User {
    const COLLECTION: &'static str = "users";
    const DOMAIN: Domain = Domain::Commerce;

    fn schema() -> Schema {
        SchemaBuilder::new("User")
            .required_field("name", text())
            .required_field("email", FieldSchema::string().pattern(r"^[^@\s]+@[^@\s]+\.[^@\s]+$"))
            .required_field(
                "address",
                FieldSchema::object()
                    .required_property("street", text())
                    .required_property("city", text())
                    .required_property("state", text())
                    .required_property("zip", FieldSchema::string().pattern(r"^\d{5}(-\d{4})?$")),
            )
            .required_field("createdAt", timestamp())
            .build()
    }

    fn unique_fields() -> &'static [&'static str] {
        &["email"]
    }
}

// =============================================================================
// Product
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub price: f64,
    pub description: String,
    pub category: String,
    pub stock: i64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        price: f64,
        description: impl Into<String>,
        category: impl Into<String>,
        stock: i64,
    ) -> Self {
        Self {
            name: name.into(),
            price,
            description: description.into(),
            category: category.into(),
            stock,
            created_at: Utc::now(),
        }
    }
}

impl Entity for Product {
    const COLLECTION: &'static str = "products";
    const DOMAIN: Domain = Domain::Commerce;

    fn schema() -> Schema {
        SchemaBuilder::new("Product")
            .required_field("name", text())
            .required_field("price", FieldSchema::number().min(0.0))
            .required_field("description", FieldSchema::string())
            .required_field("category", text())
            .required_field("stock", FieldSchema::int().min(0.0))
            .required_field("createdAt", timestamp())
            .build()
    }
}

// =============================================================================
// Order
// =============================================================================

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One product line of an order; `price` is the unit price paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "productId")]
    pub product_id: String,
    pub quantity: u32,
    pub price: f64,
}

impl LineItem {
    pub fn new(product_id: impl Into<String>, quantity: u32, price: f64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            price,
        }
    }

    pub fn subtotal(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub products: Vec<LineItem>,
    #[serde(rename = "totalAmount")]
    pub total_amount: f64,
    pub status: OrderStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Build an order whose total is the sum of its line items.
    pub fn new(user_id: impl Into<String>, products: Vec<LineItem>, status: OrderStatus) -> Self {
        let total_amount = line_total(&products);
        Self {
            user_id: user_id.into(),
            products,
            total_amount,
            status,
            created_at: Utc::now(),
        }
    }

    /// Sum of quantity × price over the line items, rounded to cents.
    pub fn computed_total(&self) -> f64 {
        line_total(&self.products)
    }
}

fn line_total(products: &[LineItem]) -> f64 {
    let total: f64 = products.iter().map(LineItem::subtotal).sum();
    (total * 100.0).round() / 100.0
}

impl Entity for Order {
    const COLLECTION: &'static str = "orders";
    const DOMAIN: Domain = Domain::Commerce;

    fn schema() -> Schema {
        let statuses = OrderStatus::ALL.iter().map(|s| Value::from(s.as_str())).collect();
        let line = FieldSchema::object()
            .required_property("productId", text())
            .required_property("quantity", FieldSchema::int().min(1.0))
            .required_property("price", FieldSchema::number().min(0.0));

        SchemaBuilder::new("Order")
            .required_field("userId", text())
            .required_field("products", FieldSchema::array(line).min_length(1))
            .required_field("totalAmount", FieldSchema::number().min(0.0))
            .required_field("status", FieldSchema::string().enum_values(statuses))
            .required_field("createdAt", timestamp())
            .build()
    }

    fn checked_fields() -> &'static [&'static str] {
        &["products", "totalAmount"]
    }

    fn check(&self, config: &ValidationConfig) -> Vec<String> {
        let computed = self.computed_total();
        if (self.total_amount - computed).abs() > config.total_tolerance {
            vec![format!(
                "totalAmount {:.2} does not match line items total {:.2}",
                self.total_amount, computed
            )]
        } else {
            Vec::new()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
