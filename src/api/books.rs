//! Book (catalog) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppResult, ErrorResponse},
    models::{book::BookSchema, Book, BookFilter, Document, InsertResult, UpdateResult},
    AppState,
};

/// List all books
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookFilter),
    responses(
        (status = 200, description = "All books in storage order", body = Vec<BookSchema>)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(filter): Query<BookFilter>,
) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.catalog.list_books(&filter).await?;
    Ok(Json(books))
}

/// Get a book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = String, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = BookSchema),
        (status = 400, description = "Malformed ID", body = ErrorResponse),
        (status = 404, description = "Book not found", body = ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(&id).await?;
    Ok(Json(book))
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = BookSchema,
    responses(
        (status = 201, description = "Book created", body = InsertResult)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    Json(fields): Json<Document>,
) -> AppResult<(StatusCode, Json<InsertResult>)> {
    let result = state.services.catalog.create_book(fields).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// Update a book, creating it when the ID is unknown
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = String, Path, description = "Book ID")
    ),
    request_body = BookSchema,
    responses(
        (status = 200, description = "Book updated or created", body = UpdateResult),
        (status = 400, description = "Malformed ID or empty update", body = ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(fields): Json<Document>,
) -> AppResult<Json<UpdateResult>> {
    let result = state.services.catalog.update_book(&id, fields).await?;
    Ok(Json(result))
}
