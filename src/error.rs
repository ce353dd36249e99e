//! Error types for Libris server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Reasons the borrow policy refuses a loan, in evaluation order
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowRejection {
    #[error("You already have the maximum number of active loans ({max}). Please return a book to borrow a new one.")]
    TooManyActiveLoans { max: usize },

    #[error("You have overdue books. Please return them before borrowing another.")]
    HasOverdueLoans,

    #[error("You have already borrowed this book and not returned it.")]
    AlreadyBorrowed,

    #[error("This book is out of stock.")]
    OutOfStock,

    #[error("Borrow date cannot be in the future. Please select today's date or a past date.")]
    InvalidBorrowDate,
}

/// Stable numeric error codes reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchPatron = 4,
    NoSuchBook = 5,
    NoSuchBorrowRecord = 6,
    Duplicate = 8,
    BadValue = 18,
    TooManyActiveLoans = 30,
    HasOverdueLoans = 31,
    AlreadyBorrowed = 32,
    OutOfStock = 33,
    InvalidBorrowDate = 34,
    AlreadyReturned = 40,
    BookHasActiveLoans = 41,
    RecordStillActive = 42,
}

impl From<BorrowRejection> for ErrorCode {
    fn from(rejection: BorrowRejection) -> Self {
        match rejection {
            BorrowRejection::TooManyActiveLoans { .. } => ErrorCode::TooManyActiveLoans,
            BorrowRejection::HasOverdueLoans => ErrorCode::HasOverdueLoans,
            BorrowRejection::AlreadyBorrowed => ErrorCode::AlreadyBorrowed,
            BorrowRejection::OutOfStock => ErrorCode::OutOfStock,
            BorrowRejection::InvalidBorrowDate => ErrorCode::InvalidBorrowDate,
        }
    }
}

/// Coarse error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    PolicyViolation,
    InvalidState,
    Conflict,
    Validation,
    Unauthorized,
    Internal,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Book with id {0} not found")]
    BookNotFound(i64),

    #[error("Patron {0} not found")]
    PatronNotFound(String),

    #[error("Borrow record with id {0} not found")]
    BorrowRecordNotFound(i64),

    #[error(transparent)]
    Policy(#[from] BorrowRejection),

    #[error("Borrow record {0} was already returned")]
    AlreadyReturned(i64),

    #[error("Book {0} still has unreturned loans")]
    BookHasActiveLoans(i64),

    #[error("Borrow record {0} has not been returned yet")]
    RecordStillActive(i64),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Authentication(_) | AppError::Authorization(_) => ErrorKind::Unauthorized,
            AppError::BookNotFound(_)
            | AppError::PatronNotFound(_)
            | AppError::BorrowRecordNotFound(_) => ErrorKind::NotFound,
            AppError::Policy(_) => ErrorKind::PolicyViolation,
            AppError::AlreadyReturned(_)
            | AppError::BookHasActiveLoans(_)
            | AppError::RecordStillActive(_) => ErrorKind::InvalidState,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::Database(_) | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The policy rejection, if this is one
    pub fn rejection(&self) -> Option<BorrowRejection> {
        match self {
            AppError::Policy(rejection) => Some(*rejection),
            _ => None,
        }
    }

    fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized),
            AppError::BookNotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchBook),
            AppError::PatronNotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchPatron),
            AppError::BorrowRecordNotFound(_) => {
                (StatusCode::NOT_FOUND, ErrorCode::NoSuchBorrowRecord)
            }
            AppError::Policy(rejection) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::from(*rejection))
            }
            AppError::AlreadyReturned(_) => (StatusCode::CONFLICT, ErrorCode::AlreadyReturned),
            AppError::BookHasActiveLoans(_) => {
                (StatusCode::CONFLICT, ErrorCode::BookHasActiveLoans)
            }
            AppError::RecordStillActive(_) => (StatusCode::CONFLICT, ErrorCode::RecordStillActive),
            AppError::Conflict(_) => (StatusCode::CONFLICT, ErrorCode::Duplicate),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DbFailure),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::Authentication(msg) | AppError::Authorization(msg) => msg.clone(),
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
