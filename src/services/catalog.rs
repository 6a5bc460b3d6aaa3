//! Catalog management service

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{parse_id, strip_reserved, Book, BookFilter, Document, InsertResult, UpdateResult},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List books, optionally restricted to a category
    pub async fn list_books(&self, filter: &BookFilter) -> AppResult<Vec<Book>> {
        self.repository.list_books(filter).await
    }

    /// Get a book by id
    pub async fn get_book(&self, id: &str) -> AppResult<Book> {
        let id = parse_id(id)?;
        self.repository
            .get_book(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Create a book from arbitrary fields
    pub async fn create_book(&self, fields: Document) -> AppResult<InsertResult> {
        let id = self.repository.insert_book(strip_reserved(fields)).await?;
        tracing::info!("Created book {}", id);
        Ok(InsertResult::new(id))
    }

    /// Set the given fields on a book, creating it if it does not exist
    pub async fn update_book(&self, id: &str, fields: Document) -> AppResult<UpdateResult> {
        let id: Uuid = parse_id(id)?;
        let fields = strip_reserved(fields);
        if fields.is_empty() {
            return Err(AppError::BadRequest("Update document is empty".to_string()));
        }

        let result = self.repository.update_book(id, fields).await?;
        if result.upserted_id.is_some() {
            tracing::info!("Book {} did not exist and was created", id);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    fn service() -> CatalogService {
        CatalogService::new(Repository::new(Arc::new(MemoryStore::new())))
    }

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let catalog = service();
        let created = catalog
            .create_book(doc(json!({"title": "Dune", "category": "Sci-Fi", "quantity": 4})))
            .await
            .unwrap();

        let book = catalog.get_book(&created.inserted_id.to_string()).await.unwrap();
        assert_eq!(book.id, created.inserted_id);
        assert_eq!(book.fields["title"], "Dune");
        assert_eq!(book.category(), Some("Sci-Fi"));
        assert_eq!(book.quantity(), Some(4));
    }

    #[tokio::test]
    async fn test_create_ignores_client_id() {
        let catalog = service();
        let created = catalog
            .create_book(doc(json!({"_id": "forged", "title": "Dune"})))
            .await
            .unwrap();

        let book = catalog.get_book(&created.inserted_id.to_string()).await.unwrap();
        assert!(!book.fields.contains_key("_id"));
    }

    #[tokio::test]
    async fn test_get_missing_and_malformed() {
        let catalog = service();
        let missing = catalog.get_book(&Uuid::new_v4().to_string()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let malformed = catalog.get_book("42").await;
        assert!(matches!(malformed, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_update_existing_and_upsert() {
        let catalog = service();
        let created = catalog
            .create_book(doc(json!({"title": "Dune", "quantity": 4})))
            .await
            .unwrap();
        let id = created.inserted_id.to_string();

        let result = catalog
            .update_book(&id, doc(json!({"title": "Dune Messiah"})))
            .await
            .unwrap();
        assert_eq!(result.matched_count, 1);
        assert_eq!(result.modified_count, 1);
        let book = catalog.get_book(&id).await.unwrap();
        assert_eq!(book.fields["title"], "Dune Messiah");
        assert_eq!(book.quantity(), Some(4));

        let fresh = Uuid::new_v4().to_string();
        let result = catalog
            .update_book(&fresh, doc(json!({"title": "Children of Dune"})))
            .await
            .unwrap();
        assert_eq!(result.upserted_count, 1);
        assert_eq!(
            catalog.get_book(&fresh).await.unwrap().fields["title"],
            "Children of Dune"
        );
    }

    #[tokio::test]
    async fn test_update_rejects_empty_document() {
        let catalog = service();
        let result = catalog
            .update_book(&Uuid::new_v4().to_string(), doc(json!({"_id": "x"})))
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
