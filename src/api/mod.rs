//! API handlers for Libris REST endpoints

pub mod auth;
pub mod availability;
pub mod books;
pub mod borrows;
pub mod health;
pub mod openapi;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, AppState};

pub use auth::PatronClaims;

/// Extractor for the authenticated caller from the bearer token
pub struct AuthenticatedUser(pub PatronClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = PatronClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Catalog
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/:id", get(books::get_book).delete(books::delete_book))
        // Borrowing
        .route("/borrows", get(borrows::list_borrows).post(borrows::borrow_book))
        .route("/borrows/me", get(borrows::my_borrows))
        .route("/borrows/overdue", get(borrows::list_overdue))
        .route("/borrows/report", get(borrows::overdue_report))
        .route("/borrows/:id", delete(borrows::delete_borrow))
        .route("/borrows/:id/return", post(borrows::return_book))
        .route("/patrons/:id/borrows", get(borrows::patron_borrows))
        // Live availability
        .route("/stream/books/availability", get(availability::stream_availability))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
