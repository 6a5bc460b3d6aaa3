//! Borrow record endpoints
//!
//! All three handlers share the `/borrowed/:key` route; the key is a borrower
//! email for GET, a book id for POST and a borrow record id for DELETE.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppResult, ErrorResponse},
    models::{
        borrow::{BorrowRecordSchema, NewBorrowSchema},
        BorrowRecord, DeleteResult, InsertResult, NewBorrow,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Borrow a book
#[utoipa::path(
    post,
    path = "/borrowed/{id}",
    tag = "borrowed",
    params(
        ("id" = String, Path, description = "Book ID")
    ),
    request_body = NewBorrowSchema,
    responses(
        (status = 201, description = "Borrow recorded", body = InsertResult),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Book not found", body = ErrorResponse),
        (status = 409, description = "No copies available", body = ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
    Json(request): Json<NewBorrow>,
) -> AppResult<(StatusCode, Json<InsertResult>)> {
    let result = state.services.borrows.borrow_book(&book_id, request).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// List the borrow records of the authenticated user
#[utoipa::path(
    get,
    path = "/borrowed/{email}",
    tag = "borrowed",
    security(("bearer_auth" = [])),
    params(
        ("email" = String, Path, description = "Borrower email, must match the token")
    ),
    responses(
        (status = 200, description = "Borrow records", body = Vec<BorrowRecordSchema>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Email does not match the token", body = ErrorResponse)
    )
)]
pub async fn list_borrowed(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(email): Path<String>,
) -> AppResult<Json<Vec<BorrowRecord>>> {
    let records = state.services.borrows.list_borrowed(&email, &identity).await?;
    Ok(Json(records))
}

/// Return a borrowed book
#[utoipa::path(
    delete,
    path = "/borrowed/{id}",
    tag = "borrowed",
    params(
        ("id" = String, Path, description = "Borrow record ID")
    ),
    responses(
        (status = 200, description = "Borrow record removed", body = DeleteResult),
        (status = 404, description = "Borrow record not found", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    Path(borrow_id): Path<String>,
) -> AppResult<Json<DeleteResult>> {
    let result = state.services.borrows.return_book(&borrow_id).await?;
    Ok(Json(result))
}
