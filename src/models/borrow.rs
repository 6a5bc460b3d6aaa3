//! Borrow record model and related types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{strip_reserved, Document};
use crate::error::{AppError, AppResult};

pub const EMAIL_FIELD: &str = "email";
pub const BOOK_ID_FIELD: &str = "bookId";

/// Borrow record as stored in the `borrowed_books` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorrowRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: Document,
}

impl BorrowRecord {
    pub fn new(id: Uuid, fields: Document) -> Self {
        Self { id, fields }
    }

    pub fn email(&self) -> Option<&str> {
        self.fields.get(EMAIL_FIELD).and_then(Value::as_str)
    }

    /// Id of the borrowed book. This is a weak reference and may not parse.
    pub fn book_id(&self) -> Option<&str> {
        self.fields.get(BOOK_ID_FIELD).and_then(Value::as_str)
    }
}

/// Borrow request body
#[derive(Debug, Deserialize, Validate)]
pub struct NewBorrow {
    /// Borrower email
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    /// Borrowed book id; defaults to the id in the path
    #[serde(rename = "bookId")]
    pub book_id: Option<String>,
    /// Any other borrow metadata (dates, title...)
    #[serde(flatten)]
    pub extra: Document,
}

impl NewBorrow {
    /// Validate the request and build the document to store for `book_id`
    pub fn into_document(self, book_id: Uuid) -> AppResult<Document> {
        self.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let path_id = book_id.to_string();
        if let Some(ref body_id) = self.book_id {
            if body_id != &path_id {
                return Err(AppError::BadRequest(format!(
                    "bookId {} does not match borrowed book {}",
                    body_id, path_id
                )));
            }
        }

        let mut doc = strip_reserved(self.extra);
        doc.insert(EMAIL_FIELD.to_string(), Value::String(self.email));
        doc.insert(BOOK_ID_FIELD.to_string(), Value::String(path_id));
        Ok(doc)
    }
}

/// Documented shape of a borrow request. Any additional fields are stored as-is.
#[derive(Serialize, ToSchema)]
pub struct NewBorrowSchema {
    pub email: String,
    #[serde(rename = "bookId")]
    pub book_id: Option<String>,
    #[serde(rename = "borrowedDate")]
    pub borrowed_date: Option<String>,
    #[serde(rename = "returnDate")]
    pub return_date: Option<String>,
}

/// Documented shape of a borrow record
#[derive(Serialize, ToSchema)]
pub struct BorrowRecordSchema {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    #[serde(rename = "bookId")]
    pub book_id: Option<String>,
    #[serde(rename = "borrowedDate")]
    pub borrowed_date: Option<String>,
    #[serde(rename = "returnDate")]
    pub return_date: Option<String>,
}
