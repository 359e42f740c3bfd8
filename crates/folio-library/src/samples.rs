//! Folio Sample Data
//!
//! A small demo dataset: five books, three customers, a product catalogue
//! and orders linking them.
//!
//! @version 0.1.0
//! @author Folio Development Team

use crate::schema::{Address, Book, LineItem, Order, OrderStatus, Product, User};
use crate::Folio;
use chrono::{DateTime, TimeZone, Utc};
use folio_common::Result;
use folio_document::{DocumentId, Query};
use serde::Serialize;
use tracing::info;

fn day(year: i32, month: u32, date: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, date, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn books() -> Vec<Book> {
    vec![
        Book::new("The Silent Harbor", "Amelia Hart", 2001, "Fiction", "978-0-306-40615-7")
            .with_rating(4.6),
        Book::new("Edge of Fury", "Marcus Reed", 2024, "action", "978-1-4028-9462-6")
            .with_rating(3.9),
        Book::new("Velvet Manners", "Clara Dunn", 2025, "Classy", "978-0-19-852663-6"),
        Book::new("Dolls House", "Henrik Ibsen", 2018, "Marriage", "978-0-486-27062-4")
            .with_rating(4.6),
        Book::new("Northern Lights", "Ava Lind", 2012, "Fiction", "978-0-7432-7356-5")
            .with_rating(4.2),
    ]
}

pub fn users() -> Vec<User> {
    let user = |name: &str, email: &str, street: &str, city: &str, state: &str, zip: &str, at| User {
        name: name.to_string(),
        email: email.to_string(),
        address: Address {
            street: street.to_string(),
            city: city.to_string(),
            state: state.to_string(),
            zip: zip.to_string(),
        },
        created_at: at,
    };

    vec![
        user("nora", "nora@example.com", "12 Elm St", "Springfield", "IL", "62701", day(2024, 1, 15)),
        user("omar", "omar@example.com", "4 Bay Rd", "Portland", "ME", "04101", day(2024, 3, 2)),
        user("lena", "lena@example.com", "88 Hill Ave", "Austin", "TX", "73301", day(2024, 6, 20)),
    ]
}

pub fn products() -> Vec<Product> {
    let product = |name: &str, price, description: &str, category: &str, stock, at| Product {
        name: name.to_string(),
        price,
        description: description.to_string(),
        category: category.to_string(),
        stock,
        created_at: at,
    };

    vec![
        product("Reading Lamp", 34.99, "Adjustable LED desk lamp", "Home", 25, day(2024, 1, 2)),
        product("Bookmark Set", 6.5, "Five leather bookmarks", "Accessories", 4, day(2024, 1, 2)),
        product("Hardcover Journal", 18.0, "A5 dotted journal", "Stationery", 0, day(2024, 2, 11)),
        product("Book Stand", 22.75, "Bamboo reading stand", "Home", 9, day(2024, 4, 8)),
    ]
}

/// Orders placed by `users` for `products`, both given as stored ids in the
/// order of [`users`] and [`products`].
pub fn orders(users: &[DocumentId], products: &[DocumentId]) -> Vec<Order> {
    let catalogue = self::products();
    let line = |i: usize, quantity| {
        LineItem::new(products[i].as_str(), quantity, catalogue[i].price)
    };
    let order = |user: usize, lines, status, at| {
        let mut order = Order::new(users[user].as_str(), lines, status);
        order.created_at = at;
        order
    };

    if users.len() < 3 || products.len() < 4 || catalogue.len() < 4 {
        return Vec::new();
    }
    vec![
        order(0, vec![line(0, 1), line(1, 2)], OrderStatus::Delivered, day(2024, 5, 1)),
        order(1, vec![line(3, 1)], OrderStatus::Shipped, day(2024, 7, 14)),
        order(2, vec![line(1, 3), line(2, 1)], OrderStatus::Processing, day(2024, 9, 30)),
        order(0, vec![line(2, 2)], OrderStatus::Cancelled, day(2024, 10, 3)),
    ]
}

/// How many documents `seed` stored per collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeedSummary {
    pub books: usize,
    pub users: usize,
    pub products: usize,
    pub orders: usize,
}

/// Store the sample dataset. Does nothing when books already exist.
pub async fn seed(folio: &Folio) -> Result<SeedSummary> {
    if folio.books.count(&Query::all()).await? > 0 {
        info!("Sample data already present");
        return Ok(SeedSummary::default());
    }

    let books = folio.books.insert_batch(&books()).await?;
    let users = folio.users.insert_batch(&users()).await?;
    let products = folio.products.insert_batch(&products()).await?;
    let orders = folio.orders.insert_batch(&orders(&users, &products)).await?;

    let summary = SeedSummary {
        books: books.len(),
        users: users.len(),
        products: products.len(),
        orders: orders.len(),
    };
    info!(
        books = summary.books,
        users = summary.users,
        products = summary.products,
        orders = summary.orders,
        "Seeded sample data"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Entity;
    use folio_common::ValidationConfig;

    #[test]
    fn test_sample_books() {
        let books = books();
        assert_eq!(books.len(), 5);
        let years: Vec<i32> = books.iter().map(|b| b.published_year).collect();
        assert_eq!(years, vec![2001, 2024, 2025, 2018, 2012]);
    }

    #[test]
    fn test_sample_orders_are_consistent() {
        let users: Vec<DocumentId> = (0..3).map(|i| DocumentId::new(format!("u{}", i))).collect();
        let products: Vec<DocumentId> = (0..4).map(|i| DocumentId::new(format!("p{}", i))).collect();

        let orders = orders(&users, &products);
        assert_eq!(orders.len(), 4);
        for order in &orders {
            assert!(order.check(&ValidationConfig::default()).is_empty());
        }
        assert_eq!(orders[0].total_amount, 47.99);
    }

    #[test]
    fn test_orders_need_ids() {
        assert!(orders(&[], &[]).is_empty());
    }
}
