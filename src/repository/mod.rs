//! Repository layer for document storage
//!
//! The [`LibraryStore`] trait covers both collections (`books` and
//! `borrowed_books`). Borrowing and returning touch both collections and are
//! applied atomically by each backend.

pub mod memory;
pub mod postgres;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::{
    config::{DatabaseConfig, StoreBackend},
    error::AppResult,
    models::{Book, BookFilter, BorrowRecord, Document, UpdateResult},
};

/// Result of recording a borrow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BorrowOutcome {
    /// Record inserted and the book quantity decremented
    Borrowed(Uuid),
    BookNotFound,
    /// The book has no copies left
    Unavailable,
}

/// Result of removing a borrow record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnOutcome {
    pub deleted_count: u64,
    /// Whether a book quantity was incremented
    pub restocked: bool,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Check that the backing store answers
    async fn ping(&self) -> AppResult<()>;

    /// All books matching `filter`, in insertion order
    async fn list_books(&self, filter: &BookFilter) -> AppResult<Vec<Book>>;

    async fn get_book(&self, id: Uuid) -> AppResult<Option<Book>>;

    /// Insert a book and return its generated id
    async fn insert_book(&self, fields: Document) -> AppResult<Uuid>;

    /// Merge `fields` into the book, creating it when absent
    async fn update_book(&self, id: Uuid, fields: Document) -> AppResult<UpdateResult>;

    /// Insert a borrow record and take one copy of the book off the shelf
    async fn borrow_book(&self, book_id: Uuid, record: Document) -> AppResult<BorrowOutcome>;

    async fn list_borrowed_by_email(&self, email: &str) -> AppResult<Vec<BorrowRecord>>;

    /// Delete a borrow record and put the copy back on the shelf.
    /// Returns `None` when no such record exists.
    async fn return_book(&self, borrow_id: Uuid) -> AppResult<Option<ReturnOutcome>>;

    /// Release the underlying resources
    async fn close(&self);
}

/// Shared handle to the configured store
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn LibraryStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self { store }
    }

    /// Open the store selected by configuration
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        match config.backend {
            StoreBackend::Postgres => {
                let pool = PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .min_connections(config.min_connections)
                    .connect_with(config.connect_options()?)
                    .await?;

                tracing::info!("Connected to database");

                let store = postgres::PgStore::new(pool);
                store.migrate().await?;

                tracing::info!("Database migrations completed");
                Ok(Self::new(Arc::new(store)))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store, data will not survive a restart");
                Ok(Self::new(Arc::new(memory::MemoryStore::new())))
            }
        }
    }
}

impl Deref for Repository {
    type Target = dyn LibraryStore;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref()
    }
}
