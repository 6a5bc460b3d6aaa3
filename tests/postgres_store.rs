//! PostgreSQL store tests
//!
//! These need a reachable database named by `DATABASE_URL`. Each test works on
//! freshly generated ids so they can share one database.

use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use library_zone_server::{
    models::{BookFilter, Document, UpdateResult},
    repository::{postgres::PgStore, BorrowOutcome, LibraryStore},
};

async fn store() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    let store = PgStore::new(pool);
    store.migrate().await.expect("Failed to run migrations");
    store
}

fn doc(value: Value) -> Document {
    value.as_object().cloned().expect("Not an object")
}

async fn quantity(store: &PgStore, id: Uuid) -> Value {
    let book = store
        .get_book(id)
        .await
        .expect("Failed to read book")
        .expect("Book not found");
    book.fields["quantity"].clone()
}

fn unique_email() -> String {
    format!("{}@example.com", Uuid::new_v4().simple())
}

async fn borrow(store: &PgStore, book_id: Uuid, email: &str) -> BorrowOutcome {
    store
        .borrow_book(
            book_id,
            doc(json!({"email": email, "bookId": book_id.to_string()})),
        )
        .await
        .expect("Failed to borrow")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_update_merges_and_upserts() {
    let store = store().await;
    let id = store
        .insert_book(doc(json!({"title": "Dune", "quantity": 2})))
        .await
        .unwrap();

    let result = store.update_book(id, doc(json!({"quantity": 5}))).await.unwrap();
    assert_eq!(result, UpdateResult::matched(true));
    let book = store.get_book(id).await.unwrap().unwrap();
    assert_eq!(book.fields["title"], "Dune");
    assert_eq!(book.fields["quantity"], 5);

    let result = store.update_book(id, doc(json!({"quantity": 5}))).await.unwrap();
    assert_eq!(result, UpdateResult::matched(false));

    let fresh = Uuid::new_v4();
    let result = store
        .update_book(fresh, doc(json!({"title": "New", "quantity": 1})))
        .await
        .unwrap();
    assert_eq!(result, UpdateResult::upserted(fresh));
    assert_eq!(quantity(&store, fresh).await, 1);
}

#[tokio::test]
#[ignore]
async fn test_list_filters_by_category() {
    let store = store().await;
    let category = Uuid::new_v4().to_string();
    let first = store
        .insert_book(doc(json!({"title": "A", "category": category})))
        .await
        .unwrap();
    let second = store
        .insert_book(doc(json!({"title": "B", "category": category})))
        .await
        .unwrap();

    let filter = BookFilter {
        category: Some(category),
    };
    let ids: Vec<Uuid> = store
        .list_books(&filter)
        .await
        .unwrap()
        .iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(ids, vec![first, second]);
}

#[tokio::test]
#[ignore]
async fn test_borrow_until_unavailable() {
    let store = store().await;
    let email = unique_email();
    let book_id = store.insert_book(doc(json!({"quantity": 1}))).await.unwrap();

    assert!(matches!(
        borrow(&store, book_id, &email).await,
        BorrowOutcome::Borrowed(_)
    ));
    assert_eq!(quantity(&store, book_id).await, 0);

    assert_eq!(borrow(&store, book_id, &email).await, BorrowOutcome::Unavailable);
    assert_eq!(quantity(&store, book_id).await, 0);
    assert_eq!(store.list_borrowed_by_email(&email).await.unwrap().len(), 1);

    assert_eq!(
        borrow(&store, Uuid::new_v4(), &email).await,
        BorrowOutcome::BookNotFound
    );
}

#[tokio::test]
#[ignore]
async fn test_return_restocks_once() {
    let store = store().await;
    let email = unique_email();
    let book_id = store.insert_book(doc(json!({"quantity": 2}))).await.unwrap();

    let BorrowOutcome::Borrowed(borrow_id) = borrow(&store, book_id, &email).await else {
        panic!("borrow should succeed");
    };
    assert_eq!(quantity(&store, book_id).await, 1);

    let outcome = store.return_book(borrow_id).await.unwrap().unwrap();
    assert_eq!(outcome.deleted_count, 1);
    assert!(outcome.restocked);
    assert_eq!(quantity(&store, book_id).await, 2);
    assert!(store.list_borrowed_by_email(&email).await.unwrap().is_empty());

    assert_eq!(store.return_book(borrow_id).await.unwrap(), None);
    assert_eq!(quantity(&store, book_id).await, 2);
}

#[tokio::test]
#[ignore]
async fn test_quantity_types_match_memory_store() {
    let store = store().await;
    let email = unique_email();

    // Integral floats count as copies
    let book_id = store.insert_book(doc(json!({"quantity": 3.0}))).await.unwrap();
    let BorrowOutcome::Borrowed(borrow_id) = borrow(&store, book_id, &email).await else {
        panic!("borrow should succeed");
    };
    assert_eq!(quantity(&store, book_id).await, 2);

    // A quantity that is not a number is never rewritten
    store
        .update_book(book_id, doc(json!({"quantity": "5"})))
        .await
        .unwrap();
    let outcome = store.return_book(borrow_id).await.unwrap().unwrap();
    assert!(!outcome.restocked);
    assert_eq!(quantity(&store, book_id).await, "5");
}
