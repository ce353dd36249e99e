//! Book model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Book record as stored in the book ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    /// Globally unique
    pub isbn: String,
    pub publication_date: NaiveDate,
    pub genre: String,
    /// Copies currently on the shelf
    pub copy_count: i32,
    /// Always `copy_count > 0`
    pub available: bool,
}

impl Book {
    /// Copy of this book with one copy taken off the shelf
    pub fn lend_one(&self) -> Self {
        let copy_count = (self.copy_count - 1).max(0);
        Self {
            copy_count,
            available: copy_count > 0,
            ..self.clone()
        }
    }

    /// Copy of this book with one copy put back on the shelf
    pub fn shelve_one(&self) -> Self {
        Self {
            copy_count: self.copy_count + 1,
            available: true,
            ..self.clone()
        }
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title cannot be blank"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author cannot be blank"))]
    pub author: String,
    #[validate(length(min = 1, message = "ISBN cannot be blank"))]
    pub isbn: String,
    pub publication_date: NaiveDate,
    #[validate(length(min = 1, message = "Genre cannot be blank"))]
    pub genre: String,
    #[validate(range(min = 0, message = "Copy count cannot be negative"))]
    pub copy_count: i32,
}
