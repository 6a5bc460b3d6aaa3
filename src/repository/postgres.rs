//! PostgreSQL document store
//!
//! Each collection is a table with a UUID key and a JSONB `doc` column.
//! Borrow records also keep `email` and `book_id` in their own columns for lookups.

use async_trait::async_trait;
use sqlx::{types::Json, Pool, Postgres};
use uuid::Uuid;

use super::{BorrowOutcome, LibraryStore, ReturnOutcome};
use crate::{
    error::AppResult,
    models::{
        book::{adjust_quantity, quantity_of},
        Book, BookFilter, BorrowRecord, Document, UpdateResult,
    },
};

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;
        Ok(())
    }
}

#[async_trait]
impl LibraryStore for PgStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_books(&self, filter: &BookFilter) -> AppResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, (Uuid, Json<Document>)>(
            r#"
            SELECT id, doc FROM books
            WHERE ($1::text IS NULL OR doc->>'category' = $1)
            ORDER BY created_at, id
            "#,
        )
        .bind(filter.category.as_deref())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, Json(doc))| Book::new(id, doc))
            .collect())
    }

    async fn get_book(&self, id: Uuid) -> AppResult<Option<Book>> {
        let row = sqlx::query_as::<_, (Uuid, Json<Document>)>(
            "SELECT id, doc FROM books WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, Json(doc))| Book::new(id, doc)))
    }

    async fn insert_book(&self, fields: Document) -> AppResult<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO books (id, doc) VALUES ($1, $2)")
            .bind(id)
            .bind(Json(&fields))
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    async fn update_book(&self, id: Uuid, fields: Document) -> AppResult<UpdateResult> {
        // Both CTEs see the same snapshot, so `prev` holds the document before the write.
        let (previous, current) =
            sqlx::query_as::<_, (Option<Json<Document>>, Json<Document>)>(
                r#"
                WITH prev AS (
                    SELECT doc FROM books WHERE id = $1
                ),
                upsert AS (
                    INSERT INTO books (id, doc) VALUES ($1, $2)
                    ON CONFLICT (id) DO UPDATE SET doc = books.doc || EXCLUDED.doc
                    RETURNING doc
                )
                SELECT (SELECT doc FROM prev) AS previous, (SELECT doc FROM upsert) AS current
                "#,
            )
            .bind(id)
            .bind(Json(&fields))
            .fetch_one(&self.pool)
            .await?;

        Ok(match previous {
            Some(Json(previous)) => UpdateResult::matched(previous != current.0),
            None => UpdateResult::upserted(id),
        })
    }

    async fn borrow_book(&self, book_id: Uuid, record: Document) -> AppResult<BorrowOutcome> {
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query_as::<_, (Json<Document>,)>(
            "SELECT doc FROM books WHERE id = $1 FOR UPDATE",
        )
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((Json(mut book),)) = book else {
            return Ok(BorrowOutcome::BookNotFound);
        };

        if quantity_of(&book).unwrap_or(0) <= 0 {
            return Ok(BorrowOutcome::Unavailable);
        }

        let borrow_id = Uuid::new_v4();
        let record = BorrowRecord::new(borrow_id, record);
        sqlx::query(
            "INSERT INTO borrowed_books (id, email, book_id, doc) VALUES ($1, $2, $3, $4)",
        )
        .bind(borrow_id)
        .bind(record.email().unwrap_or_default())
        .bind(record.book_id())
        .bind(Json(&record.fields))
        .execute(&mut *tx)
        .await?;

        adjust_quantity(&mut book, -1);
        sqlx::query("UPDATE books SET doc = $2 WHERE id = $1")
            .bind(book_id)
            .bind(Json(&book))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(BorrowOutcome::Borrowed(borrow_id))
    }

    async fn list_borrowed_by_email(&self, email: &str) -> AppResult<Vec<BorrowRecord>> {
        let rows = sqlx::query_as::<_, (Uuid, Json<Document>)>(
            "SELECT id, doc FROM borrowed_books WHERE email = $1 ORDER BY created_at, id",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, Json(doc))| BorrowRecord::new(id, doc))
            .collect())
    }

    async fn return_book(&self, borrow_id: Uuid) -> AppResult<Option<ReturnOutcome>> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query_as::<_, (Option<String>,)>(
            "DELETE FROM borrowed_books WHERE id = $1 RETURNING book_id",
        )
        .bind(borrow_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((book_id,)) = deleted else {
            return Ok(None);
        };

        let mut restocked = false;
        if let Some(book_id) = book_id.as_deref().and_then(|id| Uuid::parse_str(id).ok()) {
            let book = sqlx::query_as::<_, (Json<Document>,)>(
                "SELECT doc FROM books WHERE id = $1 FOR UPDATE",
            )
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some((Json(mut book),)) = book {
                if adjust_quantity(&mut book, 1) {
                    sqlx::query("UPDATE books SET doc = $2 WHERE id = $1")
                        .bind(book_id)
                        .bind(Json(&book))
                        .execute(&mut *tx)
                        .await?;
                    restocked = true;
                }
            }
        }

        tx.commit().await?;
        Ok(Some(ReturnOutcome {
            deleted_count: 1,
            restocked,
        }))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
