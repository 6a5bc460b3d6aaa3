//! In-memory document store
//!
//! Collections are insertion-ordered maps behind a single [`RwLock`], so the
//! two-collection borrow and return operations run under one write guard.
//! Used for local development (`database.backend = "memory"`) and tests.

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BorrowOutcome, LibraryStore, ReturnOutcome};
use crate::{
    error::AppResult,
    models::{
        book::{adjust_quantity, quantity_of},
        Book, BookFilter, BorrowRecord, Document, UpdateResult,
    },
};

#[derive(Default)]
struct Collections {
    books: IndexMap<Uuid, Document>,
    borrowed: IndexMap<Uuid, Document>,
}

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LibraryStore for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn list_books(&self, filter: &BookFilter) -> AppResult<Vec<Book>> {
        let collections = self.collections.read().await;
        Ok(collections
            .books
            .iter()
            .map(|(id, doc)| Book::new(*id, doc.clone()))
            .filter(|book| filter.matches(book))
            .collect())
    }

    async fn get_book(&self, id: Uuid) -> AppResult<Option<Book>> {
        let collections = self.collections.read().await;
        Ok(collections
            .books
            .get(&id)
            .map(|doc| Book::new(id, doc.clone())))
    }

    async fn insert_book(&self, fields: Document) -> AppResult<Uuid> {
        let id = Uuid::new_v4();
        self.collections.write().await.books.insert(id, fields);
        Ok(id)
    }

    async fn update_book(&self, id: Uuid, fields: Document) -> AppResult<UpdateResult> {
        let mut collections = self.collections.write().await;
        match collections.books.get_mut(&id) {
            Some(doc) => {
                let before = doc.clone();
                doc.extend(fields);
                Ok(UpdateResult::matched(*doc != before))
            }
            None => {
                collections.books.insert(id, fields);
                Ok(UpdateResult::upserted(id))
            }
        }
    }

    async fn borrow_book(&self, book_id: Uuid, record: Document) -> AppResult<BorrowOutcome> {
        let mut collections = self.collections.write().await;

        let Some(book) = collections.books.get_mut(&book_id) else {
            return Ok(BorrowOutcome::BookNotFound);
        };
        if quantity_of(book).unwrap_or(0) <= 0 {
            return Ok(BorrowOutcome::Unavailable);
        }
        adjust_quantity(book, -1);

        let borrow_id = Uuid::new_v4();
        collections.borrowed.insert(borrow_id, record);
        Ok(BorrowOutcome::Borrowed(borrow_id))
    }

    async fn list_borrowed_by_email(&self, email: &str) -> AppResult<Vec<BorrowRecord>> {
        let collections = self.collections.read().await;
        Ok(collections
            .borrowed
            .iter()
            .map(|(id, doc)| BorrowRecord::new(*id, doc.clone()))
            .filter(|record| record.email() == Some(email))
            .collect())
    }

    async fn return_book(&self, borrow_id: Uuid) -> AppResult<Option<ReturnOutcome>> {
        let mut collections = self.collections.write().await;

        // shift_remove keeps the remaining records in insertion order
        let Some(doc) = collections.borrowed.shift_remove(&borrow_id) else {
            return Ok(None);
        };

        let record = BorrowRecord::new(borrow_id, doc);
        let book_id = record.book_id().and_then(|id| Uuid::parse_str(id).ok());

        let mut restocked = false;
        if let Some(book_id) = book_id {
            if let Some(book) = collections.books.get_mut(&book_id) {
                restocked = adjust_quantity(book, 1);
            }
        }

        Ok(Some(ReturnOutcome {
            deleted_count: 1,
            restocked,
        }))
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn quantity(store: &MemoryStore, id: Uuid) -> Option<i64> {
        store.get_book(id).await.unwrap().unwrap().quantity()
    }

    #[tokio::test]
    async fn test_list_keeps_insertion_order() {
        let store = MemoryStore::new();
        let first = store.insert_book(doc(json!({"title": "A"}))).await.unwrap();
        let second = store.insert_book(doc(json!({"title": "B"}))).await.unwrap();

        let books = store.list_books(&BookFilter::default()).await.unwrap();
        let ids: Vec<Uuid> = books.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[tokio::test]
    async fn test_update_merges_and_upserts() {
        let store = MemoryStore::new();
        let id = store
            .insert_book(doc(json!({"title": "Dune", "quantity": 2})))
            .await
            .unwrap();

        let result = store.update_book(id, doc(json!({"quantity": 5}))).await.unwrap();
        assert_eq!(result, UpdateResult::matched(true));
        let book = store.get_book(id).await.unwrap().unwrap();
        assert_eq!(book.fields["title"], "Dune");
        assert_eq!(book.quantity(), Some(5));

        let result = store.update_book(id, doc(json!({"quantity": 5}))).await.unwrap();
        assert_eq!(result, UpdateResult::matched(false));

        let fresh = Uuid::new_v4();
        let result = store.update_book(fresh, doc(json!({"title": "New"}))).await.unwrap();
        assert_eq!(result, UpdateResult::upserted(fresh));
        assert!(store.get_book(fresh).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_borrow_and_return_adjust_quantity() {
        let store = MemoryStore::new();
        let book_id = store.insert_book(doc(json!({"quantity": 1}))).await.unwrap();
        let record = doc(json!({"email": "a@x.com", "bookId": book_id.to_string()}));

        let BorrowOutcome::Borrowed(borrow_id) =
            store.borrow_book(book_id, record.clone()).await.unwrap()
        else {
            panic!("borrow should succeed");
        };
        assert_eq!(quantity(&store, book_id).await, Some(0));

        // No copies left
        let outcome = store.borrow_book(book_id, record).await.unwrap();
        assert_eq!(outcome, BorrowOutcome::Unavailable);
        assert_eq!(quantity(&store, book_id).await, Some(0));
        assert_eq!(store.list_borrowed_by_email("a@x.com").await.unwrap().len(), 1);

        let outcome = store.return_book(borrow_id).await.unwrap();
        assert_eq!(
            outcome,
            Some(ReturnOutcome {
                deleted_count: 1,
                restocked: true
            })
        );
        assert_eq!(quantity(&store, book_id).await, Some(1));

        assert_eq!(store.return_book(borrow_id).await.unwrap(), None);
        assert_eq!(quantity(&store, book_id).await, Some(1));
    }

    #[tokio::test]
    async fn test_borrow_unknown_book() {
        let store = MemoryStore::new();
        let outcome = store
            .borrow_book(Uuid::new_v4(), doc(json!({"email": "a@x.com"})))
            .await
            .unwrap();
        assert_eq!(outcome, BorrowOutcome::BookNotFound);
        assert!(store.list_borrowed_by_email("a@x.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_return_with_dangling_book_reference() {
        let store = MemoryStore::new();
        let book_id = store.insert_book(doc(json!({"quantity": 1}))).await.unwrap();
        let record = doc(json!({"email": "a@x.com", "bookId": "not-a-book"}));

        let BorrowOutcome::Borrowed(borrow_id) =
            store.borrow_book(book_id, record).await.unwrap()
        else {
            panic!("borrow should succeed");
        };

        let outcome = store.return_book(borrow_id).await.unwrap().unwrap();
        assert!(!outcome.restocked);
        assert_eq!(quantity(&store, book_id).await, Some(0));
    }

    #[tokio::test]
    async fn test_return_keeps_non_numeric_quantity() {
        let store = MemoryStore::new();
        let book_id = store.insert_book(doc(json!({"quantity": 2}))).await.unwrap();
        let record = doc(json!({"email": "a@x.com", "bookId": book_id.to_string()}));
        let BorrowOutcome::Borrowed(borrow_id) =
            store.borrow_book(book_id, record).await.unwrap()
        else {
            panic!("borrow should succeed");
        };

        store
            .update_book(book_id, doc(json!({"quantity": "5"})))
            .await
            .unwrap();

        let outcome = store.return_book(borrow_id).await.unwrap().unwrap();
        assert_eq!(outcome.deleted_count, 1);
        assert!(!outcome.restocked);
        let book = store.get_book(book_id).await.unwrap().unwrap();
        assert_eq!(book.fields["quantity"], "5");
    }

    #[tokio::test]
    async fn test_float_quantity_counts_as_copies() {
        let store = MemoryStore::new();
        let book_id = store.insert_book(doc(json!({"quantity": 3.0}))).await.unwrap();
        let record = doc(json!({"email": "a@x.com", "bookId": book_id.to_string()}));

        let BorrowOutcome::Borrowed(borrow_id) =
            store.borrow_book(book_id, record).await.unwrap()
        else {
            panic!("borrow should succeed");
        };
        assert_eq!(quantity(&store, book_id).await, Some(2));

        let outcome = store.return_book(borrow_id).await.unwrap().unwrap();
        assert!(outcome.restocked);
        assert_eq!(quantity(&store, book_id).await, Some(3));
    }
}
