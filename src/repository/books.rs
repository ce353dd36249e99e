//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::{conflict_on_unique, BookLedger};
use crate::{
    error::{AppError, AppResult},
    models::{Book, CreateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookLedger for BooksRepository {
    async fn get(&self, id: i64) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn list(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY title, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, isbn, publication_date, genre, copy_count, available)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.publication_date)
        .bind(&book.genre)
        .bind(book.copy_count)
        .bind(book.copy_count > 0)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "ISBN"))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        // Returned history goes with the book (ON DELETE CASCADE)
        let deleted = sqlx::query(
            r#"
            DELETE FROM books
            WHERE id = $1
              AND NOT EXISTS (
                  SELECT 1 FROM borrow_records
                  WHERE book_id = $1 AND returned = FALSE
              )
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if deleted > 0 {
            return Ok(());
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        if exists {
            Err(AppError::BookHasActiveLoans(id))
        } else {
            Err(AppError::BookNotFound(id))
        }
    }
}
