//! Book (catalog) model

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::Document;

/// Field holding the number of copies on the shelf
pub const QUANTITY_FIELD: &str = "quantity";

/// Book record as stored in the `books` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: Document,
}

impl Book {
    pub fn new(id: Uuid, fields: Document) -> Self {
        Self { id, fields }
    }

    /// Copies currently available, when the record carries an integer quantity
    pub fn quantity(&self) -> Option<i64> {
        quantity_of(&self.fields)
    }

    pub fn category(&self) -> Option<&str> {
        self.fields.get("category").and_then(Value::as_str)
    }
}

/// Quantity of a book document when it is an integral JSON number (`3` or `3.0`)
pub fn quantity_of(fields: &Document) -> Option<i64> {
    let value = fields.get(QUANTITY_FIELD)?;
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|q| q.fract() == 0.0 && q.abs() < i64::MAX as f64)
            .map(|q| q as i64)
    })
}

/// Add `delta` to the quantity of a book document.
///
/// A missing quantity counts as zero. Any other value that is not an integral
/// number is left untouched and `false` is returned.
pub fn adjust_quantity(fields: &mut Document, delta: i64) -> bool {
    let current = match fields.get(QUANTITY_FIELD) {
        None => 0,
        Some(_) => match quantity_of(fields) {
            Some(current) => current,
            None => return false,
        },
    };
    fields.insert(QUANTITY_FIELD.to_string(), Value::from(current + delta));
    true
}

/// Query filter for listing books
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookFilter {
    /// Only return books of this category
    pub category: Option<String>,
}

impl BookFilter {
    pub fn matches(&self, book: &Book) -> bool {
        match &self.category {
            Some(category) => book.category() == Some(category.as_str()),
            None => true,
        }
    }
}

/// Documented shape of a book. Stored books accept any additional fields.
#[derive(Serialize, ToSchema)]
pub struct BookSchema {
    /// Store-generated identifier
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    /// Copies available for borrowing
    pub quantity: Option<i64>,
    /// Cover image URL
    pub image: Option<String>,
}
