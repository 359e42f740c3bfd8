//! End-to-end tests for Folio Library
//!
//! Runs the repositories and reports against the in-process store, starting
//! from the sample dataset.

use folio_client::DocumentStore;
use folio_common::{ErrorKind, FolioConfig};
use folio_document::{Filter, Query, QueryBuilder, Update};
use folio_library::{samples, Book, Folio, LineItem, Order, OrderStatus};
use std::collections::BTreeMap;
use std::io::Write;

/// A fresh private store with indexes applied and the samples loaded.
async fn seeded() -> Folio {
    let mut config = FolioConfig::default();
    config.store.uri = "mem://".to_string();
    let folio = Folio::connect(&config).await.unwrap();
    folio.init().await.unwrap();
    samples::seed(&folio).await.unwrap();
    folio
}

fn titles(records: Vec<folio_library::Record<Book>>) -> Vec<String> {
    records.into_iter().map(|r| r.entity.title).collect()
}

#[tokio::test]
async fn test_insert_then_find_by_isbn() {
    let folio = seeded().await;
    let book = Book::new("Quiet Rivers", "Ines Moe", 2019, "Fiction", "978-3-16-148410-0");

    folio.books.insert(&book).await.unwrap();
    let by_isbn = QueryBuilder::new().eq("ISBN", book.isbn.clone()).build();
    let found = folio.books.find(&by_isbn).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].entity, book);

    let err = folio.books.insert(&book).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(folio.books.count(&Query::all()).await.unwrap(), 6);
}

#[tokio::test]
async fn test_update_only_touches_the_match() {
    let folio = seeded().await;
    let dolls = QueryBuilder::new().eq("title", "Dolls House").build();

    let updated = folio
        .books
        .update_one(&dolls, &Update::new().set("publishedYear", 2025i64))
        .await
        .unwrap();
    assert_eq!(updated, 1);

    let years: BTreeMap<String, i32> = folio
        .books
        .find(&Query::all())
        .await
        .unwrap()
        .into_iter()
        .map(|r| (r.entity.title, r.entity.published_year))
        .collect();
    assert_eq!(years["Dolls House"], 2025);
    assert_eq!(years["The Silent Harbor"], 2001);
    assert_eq!(years["Velvet Manners"], 2025);

    folio.books.delete_one(&dolls).await.unwrap();
    let updated = folio
        .books
        .update_one(&dolls, &Update::new().set("publishedYear", 2030i64))
        .await
        .unwrap();
    assert_eq!(updated, 0);
}

#[tokio::test]
async fn test_reports_over_samples() {
    let folio = seeded().await;

    let counts = folio.reports.count_by_genre().await.unwrap();
    let expected: BTreeMap<String, u64> = [("Fiction", 2), ("action", 1), ("Classy", 1), ("Marriage", 1)]
        .into_iter()
        .map(|(g, n)| (g.to_string(), n))
        .collect();
    assert_eq!(counts, expected);

    assert_eq!(folio.reports.average_published_year().await.unwrap(), 2016.0);

    let top = folio.reports.top_rated_book().await.unwrap().unwrap();
    assert_eq!(top.entity.title, "The Silent Harbor");

    let revenue = folio.reports.revenue_by_status().await.unwrap();
    assert_eq!(revenue.len(), 4);
    assert_eq!(revenue[&OrderStatus::Delivered], 47.99);

    let low = folio.reports.low_stock_products(5).await.unwrap();
    let names: Vec<String> = low.into_iter().map(|r| r.entity.name).collect();
    assert_eq!(names, vec!["Hardcover Journal", "Bookmark Set"]);
}

#[tokio::test]
async fn test_delete_by_genre() {
    let folio = seeded().await;
    let fiction = QueryBuilder::new().eq("genre", "Fiction").build();

    assert_eq!(folio.books.delete_many(&fiction).await.unwrap(), 2);
    assert_eq!(folio.books.count(&Query::all()).await.unwrap(), 3);
    assert_eq!(folio.books.delete_many(&fiction).await.unwrap(), 0);
}

#[tokio::test]
async fn test_set_is_idempotent_and_inc_is_not() {
    let folio = seeded().await;
    let rate = Update::new().set("rating", 4.5);

    for _ in 0..2 {
        assert_eq!(folio.books.update_many(&Query::all(), &rate).await.unwrap(), 5);
    }
    let books = folio.books.find(&Query::all()).await.unwrap();
    assert!(books.iter().all(|r| r.entity.rating == Some(4.5)));

    let bump = Update::new().inc("publishedYear", 1i64);
    let harbor = QueryBuilder::new().eq("title", "The Silent Harbor").build();
    folio.books.update_one(&harbor, &bump).await.unwrap();
    folio.books.update_one(&harbor, &bump).await.unwrap();

    let record = folio.books.find_one(&harbor).await.unwrap().unwrap();
    assert_eq!(record.entity.published_year, 2003);
}

#[tokio::test]
async fn test_invalid_batch_persists_nothing() {
    let folio = seeded().await;
    let good = Book::new("Quiet Rivers", "Ines Moe", 2019, "Fiction", "978-3-16-148410-0");
    let bad = Book::new("Loud Seas", "", 2020, "Fiction", "978-1-56619-909-4");

    let err = folio.books.insert_batch(&[good, bad]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.messages().iter().all(|m| m.starts_with("document 1:")));
    assert_eq!(folio.books.count(&Query::all()).await.unwrap(), 5);
}

#[tokio::test]
async fn test_order_total_must_match_lines() {
    let folio = seeded().await;
    let lines = vec![LineItem::new("p-1", 3, 2.5)];

    let order = Order::new("u-1", lines.clone(), OrderStatus::Processing);
    assert_eq!(order.total_amount, 7.5);
    folio.orders.insert(&order).await.unwrap();

    let mut wrong = Order::new("u-1", lines, OrderStatus::Processing);
    wrong.total_amount = 8.0;
    let err = folio.orders.insert(&wrong).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_results_do_not_depend_on_indexes() {
    let indexed = seeded().await;

    let mut config = FolioConfig::default();
    config.store.uri = "mem://".to_string();
    let plain = Folio::connect(&config).await.unwrap();
    plain.books.init().await.unwrap();
    plain.books.insert_batch(&samples::books()).await.unwrap();
    assert!(plain.library().list_indexes("books").await.unwrap().is_empty());

    let queries = vec![
        QueryBuilder::new().eq("author", "Henrik Ibsen").build(),
        QueryBuilder::new().eq("genre", "Fiction").sort("publishedYear", false).build(),
        QueryBuilder::new().text("title", "HARBOR").build(),
        QueryBuilder::new().filter(Filter::eq("ISBN", "978-0-486-27062-4")).build(),
        QueryBuilder::new().gte("publishedYear", 2018).build(),
    ];
    for query in &queries {
        let a = titles(indexed.books.find(query).await.unwrap());
        let b = titles(plain.books.find(query).await.unwrap());
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }
}

#[tokio::test]
async fn test_seed_runs_once() {
    let folio = seeded().await;
    let again = samples::seed(&folio).await.unwrap();
    assert_eq!(again.books, 0);
    assert_eq!(folio.books.count(&Query::all()).await.unwrap(), 5);
}

#[tokio::test]
async fn test_config_file_and_shared_address() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[store]
uri = "folio://flow-test:9311"
commerce_database = "shop"

[retry]
max_retries = 0
"#
    )
    .unwrap();

    let config = FolioConfig::from_file(file.path()).unwrap();
    let first = Folio::connect(&config).await.unwrap();
    first.init().await.unwrap();
    samples::seed(&first).await.unwrap();

    let second = Folio::connect(&config).await.unwrap();
    assert_eq!(second.books.count(&Query::all()).await.unwrap(), 5);
    assert_eq!(second.commerce().list_collections().await.unwrap().len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_isbn_keeps_one() {
    let folio = seeded().await;
    let mut handles = Vec::new();
    for i in 0..8 {
        let books = folio.books.clone();
        handles.push(tokio::spawn(async move {
            let book = Book::new(format!("Copy {}", i), "Ines Moe", 2019, "Fiction", "978-3-16-148410-0");
            books.insert(&book).await.is_ok()
        }));
    }

    let mut stored = 0;
    for handle in handles {
        if handle.await.unwrap() {
            stored += 1;
        }
    }
    assert_eq!(stored, 1);
    let isbn = QueryBuilder::new().eq("ISBN", "978-3-16-148410-0").build();
    assert_eq!(folio.books.count(&isbn).await.unwrap(), 1);
}
