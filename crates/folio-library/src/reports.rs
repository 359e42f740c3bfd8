//! Folio Reports
//!
//! Read-only aggregations over the library and commerce collections.
//!
//! @version 0.1.0
//! @author Folio Development Team

use crate::repository::{Record, Repository};
use crate::schema::{Book, Entity, Order, OrderStatus, Product};
use folio_client::DocumentStore;
use folio_common::{FolioError, Result};
use folio_document::{Filter, Group, Pipeline, QueryBuilder, Value, GROUP_KEY};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Units of one product across all orders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductUnits {
    pub product_id: String,
    pub units: u64,
}

/// Reporting queries. Every report reads a consistent snapshot of one
/// collection and never writes.
#[derive(Clone)]
pub struct Reports {
    books: Repository<Book>,
    products: Repository<Product>,
    commerce: Arc<dyn DocumentStore>,
}

impl Reports {
    pub fn new(library: Arc<dyn DocumentStore>, commerce: Arc<dyn DocumentStore>) -> Self {
        Self {
            books: Repository::new(library),
            products: Repository::new(commerce.clone()),
            commerce,
        }
    }

    // =========================================================================
    // Library
    // =========================================================================

    /// Number of books per genre. Every genre present appears exactly once
    /// and the counts add up to the number of books.
    pub async fn count_by_genre(&self) -> Result<BTreeMap<String, u64>> {
        let pipeline = Pipeline::new().group(Group::by("genre").count("count"));
        let rows = self.books.store().aggregate(Book::COLLECTION, &pipeline).await?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let genre = match row.get_path(GROUP_KEY) {
                Some(Value::String(genre)) => genre.clone(),
                _ => continue,
            };
            counts.insert(genre, count_of(&row, "count"));
        }
        debug!(genres = counts.len(), "Counted books by genre");
        Ok(counts)
    }

    /// Mean publication year over all books.
    pub async fn average_published_year(&self) -> Result<f64> {
        let pipeline = Pipeline::new().group(Group::all().avg("average", "publishedYear"));
        let rows = self.books.store().aggregate(Book::COLLECTION, &pipeline).await?;

        rows.first()
            .and_then(|row| row.get_path("average"))
            .and_then(Value::as_f64)
            .ok_or_else(|| FolioError::EmptyResult("no books to average".to_string()))
    }

    /// The highest rated book; ties go to the earliest inserted. Unrated
    /// books never win.
    pub async fn top_rated_book(&self) -> Result<Option<Record<Book>>> {
        let query = QueryBuilder::new()
            .exists("rating", true)
            .ne("rating", Value::Null)
            .sort("rating", false)
            .limit(1)
            .build();
        self.books.find_one(&query).await
    }

    /// Books published strictly after `year`, newest first.
    pub async fn books_published_after(&self, year: i32, limit: usize) -> Result<Vec<Record<Book>>> {
        let query = QueryBuilder::new()
            .gt("publishedYear", year)
            .sort("publishedYear", false)
            .limit(limit)
            .build();
        self.books.find(&query).await
    }

    // =========================================================================
    // Commerce
    // =========================================================================

    /// Summed `totalAmount` per order status, rounded to cents. Statuses
    /// without orders are absent.
    pub async fn revenue_by_status(&self) -> Result<BTreeMap<OrderStatus, f64>> {
        let pipeline = Pipeline::new().group(Group::by("status").sum("revenue", "totalAmount"));
        let rows = self.commerce.aggregate(Order::COLLECTION, &pipeline).await?;

        let mut revenue = BTreeMap::new();
        for row in rows {
            let Some(status) = row
                .get_path(GROUP_KEY)
                .and_then(Value::as_str)
                .and_then(OrderStatus::parse)
            else {
                continue;
            };
            let total = row.get_path("revenue").and_then(Value::as_f64).unwrap_or(0.0);
            revenue.insert(status, (total * 100.0).round() / 100.0);
        }
        debug!(statuses = revenue.len(), "Computed revenue by status");
        Ok(revenue)
    }

    /// Products with fewer than `threshold` units in stock, lowest first.
    pub async fn low_stock_products(&self, threshold: i64) -> Result<Vec<Record<Product>>> {
        let query = QueryBuilder::new()
            .lt("stock", threshold)
            .sort("stock", true)
            .build();
        self.products.find(&query).await
    }

    /// Units ordered per product, best sellers first. Cancelled orders are
    /// left out.
    pub async fn units_sold_by_product(&self) -> Result<Vec<ProductUnits>> {
        let pipeline = Pipeline::new()
            .filter(Filter::Ne {
                field: "status".to_string(),
                value: Value::from(OrderStatus::Cancelled.as_str()),
            })
            .unwind("products")
            .group(Group::by("products.productId").sum("units", "products.quantity"))
            .sort("units", false);
        let rows = self.commerce.aggregate(Order::COLLECTION, &pipeline).await?;
        debug!(products = rows.len(), "Computed units sold");

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let product_id = row.get_path(GROUP_KEY)?.as_str()?.to_string();
                Some(ProductUnits {
                    product_id,
                    units: count_of(&row, "units"),
                })
            })
            .collect())
    }
}

fn count_of(row: &Value, field: &str) -> u64 {
    row.get_path(field)
        .and_then(Value::as_i64)
        .map_or(0, |n| n.max(0) as u64)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LineItem;
    use folio_client::Client;
    use folio_common::ErrorKind;

    struct Fixture {
        books: Repository<Book>,
        orders: Repository<Order>,
        products: Repository<Product>,
        reports: Reports,
    }

    async fn fixture() -> Fixture {
        let client = Client::connect("mem://").await.unwrap();
        let library: Arc<dyn DocumentStore> = Arc::new(client.database("library").unwrap());
        let commerce: Arc<dyn DocumentStore> = Arc::new(client.database("ecommerce").unwrap());

        let books = Repository::new(library.clone());
        let orders = Repository::new(commerce.clone());
        let products = Repository::new(commerce.clone());
        books.init().await.unwrap();
        orders.init().await.unwrap();
        products.init().await.unwrap();

        Fixture {
            books,
            orders,
            products,
            reports: Reports::new(library, commerce),
        }
    }

    fn book(title: &str, year: i32, genre: &str, isbn: &str) -> Book {
        Book::new(title, "Anon", year, genre, isbn)
    }

    #[tokio::test]
    async fn test_count_by_genre() {
        let f = fixture().await;
        f.books
            .insert_batch(&[
                book("A", 2001, "Fiction", "978-0-00-000001-1"),
                book("B", 2024, "action", "978-0-00-000002-2"),
                book("C", 2012, "Fiction", "978-0-00-000003-3"),
            ])
            .await
            .unwrap();

        let counts = f.reports.count_by_genre().await.unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts["Fiction"], 2);
        assert_eq!(counts["action"], 1);
        assert_eq!(counts.values().sum::<u64>(), 3);
    }

    #[tokio::test]
    async fn test_average_published_year() {
        let f = fixture().await;
        let err = f.reports.average_published_year().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResult);

        f.books
            .insert_batch(&[
                book("A", 2000, "Fiction", "978-0-00-000001-1"),
                book("B", 2003, "Fiction", "978-0-00-000002-2"),
            ])
            .await
            .unwrap();
        assert_eq!(f.reports.average_published_year().await.unwrap(), 2001.5);
    }

    #[tokio::test]
    async fn test_top_rated_book_prefers_earliest_on_ties() {
        let f = fixture().await;
        assert!(f.reports.top_rated_book().await.unwrap().is_none());

        f.books
            .insert_batch(&[
                book("Unrated", 2001, "Fiction", "978-0-00-000001-1"),
                book("First", 2002, "Fiction", "978-0-00-000002-2").with_rating(4.5),
                book("Second", 2003, "Fiction", "978-0-00-000003-3").with_rating(4.5),
                book("Low", 2004, "Fiction", "978-0-00-000004-4").with_rating(2.0),
            ])
            .await
            .unwrap();

        let top = f.reports.top_rated_book().await.unwrap().unwrap();
        assert_eq!(top.entity.title, "First");
    }

    #[tokio::test]
    async fn test_books_published_after() {
        let f = fixture().await;
        f.books
            .insert_batch(&[
                book("Old", 1999, "Fiction", "978-0-00-000001-1"),
                book("Mid", 2012, "Fiction", "978-0-00-000002-2"),
                book("New", 2025, "Fiction", "978-0-00-000003-3"),
            ])
            .await
            .unwrap();

        let titles: Vec<String> = f
            .reports
            .books_published_after(2000, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.entity.title)
            .collect();
        assert_eq!(titles, vec!["New", "Mid"]);
    }

    #[tokio::test]
    async fn test_revenue_and_units() {
        let f = fixture().await;
        f.orders
            .insert_batch(&[
                Order::new("u1", vec![LineItem::new("p1", 2, 10.0)], OrderStatus::Delivered),
                Order::new(
                    "u2",
                    vec![LineItem::new("p1", 1, 10.0), LineItem::new("p2", 5, 1.25)],
                    OrderStatus::Delivered,
                ),
                Order::new("u1", vec![LineItem::new("p2", 9, 1.25)], OrderStatus::Cancelled),
            ])
            .await
            .unwrap();

        let revenue = f.reports.revenue_by_status().await.unwrap();
        assert_eq!(revenue[&OrderStatus::Delivered], 36.25);
        assert_eq!(revenue[&OrderStatus::Cancelled], 11.25);
        assert!(!revenue.contains_key(&OrderStatus::Shipped));

        let units = f.reports.units_sold_by_product().await.unwrap();
        assert_eq!(
            units,
            vec![
                ProductUnits { product_id: "p2".into(), units: 5 },
                ProductUnits { product_id: "p1".into(), units: 3 },
            ]
        );
    }

    #[tokio::test]
    async fn test_low_stock_products() {
        let f = fixture().await;
        f.products
            .insert_batch(&[
                Product::new("Lamp", 30.0, "Desk lamp", "Home", 12),
                Product::new("Mug", 8.0, "", "Kitchen", 3),
                Product::new("Pen", 1.5, "Blue ink", "Office", 0),
            ])
            .await
            .unwrap();

        let names: Vec<String> = f
            .reports
            .low_stock_products(5)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.entity.name)
            .collect();
        assert_eq!(names, vec!["Pen", "Mug"]);
    }
}
