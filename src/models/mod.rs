//! Data models for Library Zone
//!
//! Books and borrow records are schemaless JSON documents keyed by a
//! store-generated UUID, mirroring the collections they were designed around.

pub mod book;
pub mod borrow;
pub mod results;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

// Re-export commonly used types
pub use book::{Book, BookFilter};
pub use borrow::{BorrowRecord, NewBorrow};
pub use results::{DeleteResult, InsertResult, UpdateResult};

/// Opaque document body (top-level fields of a record)
pub type Document = Map<String, Value>;

/// Key under which the record identifier is exposed
pub const ID_FIELD: &str = "_id";

/// Parse a path identifier into a record id
pub fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid id: {}", raw)))
}

/// Remove keys that clients are not allowed to set
pub fn strip_reserved(mut doc: Document) -> Document {
    doc.remove(ID_FIELD);
    doc
}
