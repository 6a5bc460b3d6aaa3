//! API handlers for Library Zone REST endpoints

pub mod books;
pub mod borrowed;
pub mod health;
pub mod openapi;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, services::identity::Identity, AppState};

/// Extractor for the caller identity established from a bearer token
pub struct AuthenticatedUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("unauthorized access".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Authentication("unauthorized access".to_string()))?;

        let identity = state.services.identity.verify(token).await.map_err(|e| {
            tracing::debug!("Token rejected: {}", e);
            match e {
                AppError::Authentication(_) => {
                    AppError::Authentication("unauthorized access".to_string())
                }
                other => other,
            }
        })?;

        Ok(AuthenticatedUser(identity))
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Books (catalog)
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/:id", get(books::get_book).put(books::update_book))
        // Borrow records. GET takes an email, POST a book id, DELETE a borrow id.
        .route(
            "/borrowed/:key",
            get(borrowed::list_borrowed)
                .post(borrowed::borrow_book)
                .delete(borrowed::return_book),
        )
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
