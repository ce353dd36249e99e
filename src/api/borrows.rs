//! Borrowing endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{BorrowRecord, OverdueReport, PatronIdentity},
    AppState,
};

use super::AuthenticatedUser;

/// Borrow request
#[derive(Debug, Deserialize, ToSchema)]
pub struct BorrowRequest {
    /// Book to borrow
    pub book_id: i64,
    /// Start of the loan; today or earlier. The due date is computed from it.
    pub borrow_date: NaiveDate,
}

/// Borrow a book as the authenticated patron
#[utoipa::path(
    post,
    path = "/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Book borrowed", body = BorrowRecord),
        (status = 404, description = "Book or patron not found"),
        (status = 422, description = "Borrow refused by policy")
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowRecord>)> {
    tracing::info!(book_id = request.book_id, patron = %claims.sub, "Borrow requested");

    let record = state
        .services
        .loans
        .borrow(claims.identity(), request.book_id, request.borrow_date)
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/borrows/{id}/return",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Borrow record ID")),
    responses(
        (status = 200, description = "Book returned", body = BorrowRecord),
        (status = 404, description = "Borrow record not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BorrowRecord>> {
    let record = state.services.loans.return_book(id).await?;
    Ok(Json(record))
}

/// Borrow history of the authenticated patron
#[utoipa::path(
    get,
    path = "/borrows/me",
    tag = "borrows",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own borrow records", body = Vec<BorrowRecord>)
    )
)]
pub async fn my_borrows(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowRecord>>> {
    let records = state.services.loans.history(&claims.identity()).await?;
    Ok(Json(records))
}

/// List every borrow record
#[utoipa::path(
    get,
    path = "/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All borrow records", body = Vec<BorrowRecord>),
        (status = 403, description = "Librarian role required")
    )
)]
pub async fn list_borrows(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowRecord>>> {
    claims.require_librarian()?;

    let records = state.services.loans.all_records().await?;
    Ok(Json(records))
}

/// List overdue borrow records
#[utoipa::path(
    get,
    path = "/borrows/overdue",
    tag = "borrows",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue borrow records", body = Vec<BorrowRecord>),
        (status = 403, description = "Librarian role required")
    )
)]
pub async fn list_overdue(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowRecord>>> {
    claims.require_librarian()?;

    let records = state.services.overdue.list_overdue().await?;
    Ok(Json(records))
}

/// Overdue audit report
#[utoipa::path(
    get,
    path = "/borrows/report",
    tag = "borrows",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Borrow record counts", body = OverdueReport),
        (status = 403, description = "Librarian role required")
    )
)]
pub async fn overdue_report(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<OverdueReport>> {
    claims.require_librarian()?;

    let report = state.services.overdue.generate_overdue_report().await?;
    Ok(Json(report))
}

/// Borrow history of a patron
#[utoipa::path(
    get,
    path = "/patrons/{id}/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Patron ID")),
    responses(
        (status = 200, description = "Patron's borrow records", body = Vec<BorrowRecord>),
        (status = 404, description = "Patron not found")
    )
)]
pub async fn patron_borrows(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(patron_id): Path<i64>,
) -> AppResult<Json<Vec<BorrowRecord>>> {
    claims.require_librarian()?;

    let records = state
        .services
        .loans
        .history(&PatronIdentity::Id(patron_id))
        .await?;
    Ok(Json(records))
}

/// Delete a returned borrow record
#[utoipa::path(
    delete,
    path = "/borrows/{id}",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Borrow record ID")),
    responses(
        (status = 204, description = "Borrow record deleted"),
        (status = 404, description = "Borrow record not found"),
        (status = 409, description = "Borrow record not returned yet")
    )
)]
pub async fn delete_borrow(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    claims.require_librarian()?;

    state.services.loans.delete_record(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
