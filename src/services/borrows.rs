//! Borrow management service

use crate::{
    error::{AppError, AppResult},
    models::{parse_id, BorrowRecord, DeleteResult, InsertResult, NewBorrow},
    repository::{BorrowOutcome, Repository},
};

use super::identity::Identity;

#[derive(Clone)]
pub struct BorrowsService {
    repository: Repository,
}

impl BorrowsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Record a borrow of `book_id` and take one copy off the shelf
    pub async fn borrow_book(&self, book_id: &str, request: NewBorrow) -> AppResult<InsertResult> {
        let book_id = parse_id(book_id)?;
        let record = request.into_document(book_id)?;

        match self.repository.borrow_book(book_id, record).await? {
            BorrowOutcome::Borrowed(borrow_id) => {
                tracing::info!("Book {} borrowed (record {})", book_id, borrow_id);
                Ok(InsertResult::new(borrow_id))
            }
            BorrowOutcome::BookNotFound => Err(AppError::NotFound(format!(
                "Book with id {} not found",
                book_id
            ))),
            BorrowOutcome::Unavailable => Err(AppError::Conflict(format!(
                "No copies of book {} are available",
                book_id
            ))),
        }
    }

    /// Borrow records of `email`. Callers may only read their own records.
    pub async fn list_borrowed(&self, email: &str, caller: &Identity) -> AppResult<Vec<BorrowRecord>> {
        if caller.email != email {
            tracing::warn!(
                "User {} tried to read borrow records of another account",
                caller.uid
            );
            return Err(AppError::Authorization("forbidden access".to_string()));
        }
        self.repository.list_borrowed_by_email(email).await
    }

    /// Delete a borrow record and put the copy back on the shelf
    pub async fn return_book(&self, borrow_id: &str) -> AppResult<DeleteResult> {
        let not_found = || AppError::BorrowNotFound("Borrowed book not found.".to_string());

        // A malformed id cannot name a stored record
        let borrow_id = parse_id(borrow_id).map_err(|_| not_found())?;

        match self.repository.return_book(borrow_id).await {
            Ok(Some(outcome)) => {
                if !outcome.restocked {
                    tracing::warn!(
                        "Borrow record {} removed without a book to restock",
                        borrow_id
                    );
                }
                Ok(DeleteResult::new(outcome.deleted_count))
            }
            Ok(None) => Err(not_found()),
            Err(e) => {
                tracing::error!("Error returning borrow record {}: {}", borrow_id, e);
                Err(AppError::Internal("Something went wrong.".to_string()))
            }
        }
    }
}
