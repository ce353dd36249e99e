//! Patrons and borrow records repository for database operations

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use super::{conflict_on_unique, PatronLedger};
use crate::{
    error::{AppError, AppResult, BorrowRejection},
    models::{Book, BorrowRecord, CreatePatron, NewBorrowRecord, Patron},
};

#[derive(Clone)]
pub struct PatronsRepository {
    pool: Pool<Postgres>,
}

impl PatronsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PatronLedger for PatronsRepository {
    async fn get(&self, id: i64) -> AppResult<Option<Patron>> {
        let patron = sqlx::query_as::<_, Patron>("SELECT * FROM patrons WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(patron)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Patron>> {
        let patron = sqlx::query_as::<_, Patron>("SELECT * FROM patrons WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(patron)
    }

    async fn create(&self, patron: &CreatePatron) -> AppResult<Patron> {
        sqlx::query_as::<_, Patron>(
            r#"
            INSERT INTO patrons (name, email, phone, role, registered_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING *
            "#,
        )
        .bind(&patron.name)
        .bind(&patron.email)
        .bind(&patron.phone)
        .bind(patron.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Email or phone"))
    }

    async fn get_record(&self, id: i64) -> AppResult<Option<BorrowRecord>> {
        let record =
            sqlx::query_as::<_, BorrowRecord>("SELECT * FROM borrow_records WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(record)
    }

    async fn records_for_patron(&self, patron_id: i64) -> AppResult<Vec<BorrowRecord>> {
        let records = sqlx::query_as::<_, BorrowRecord>(
            "SELECT * FROM borrow_records WHERE patron_id = $1 ORDER BY borrow_date, id",
        )
        .bind(patron_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn unreturned_records(&self) -> AppResult<Vec<BorrowRecord>> {
        let records = sqlx::query_as::<_, BorrowRecord>(
            "SELECT * FROM borrow_records WHERE returned = FALSE ORDER BY due_date, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn all_records(&self) -> AppResult<Vec<BorrowRecord>> {
        let records = sqlx::query_as::<_, BorrowRecord>("SELECT * FROM borrow_records ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn commit_borrow(&self, record: &NewBorrowRecord) -> AppResult<(Book, BorrowRecord)> {
        let mut tx = self.pool.begin().await?;

        // SET expressions see the pre-update copy_count
        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET copy_count = copy_count - 1,
                available = copy_count - 1 > 0
            WHERE id = $1 AND copy_count > 0
            RETURNING *
            "#,
        )
        .bind(record.book_id)
        .fetch_optional(&mut *tx)
        .await?;

        let book = match book {
            Some(book) => book,
            None => {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
                        .bind(record.book_id)
                        .fetch_one(&mut *tx)
                        .await?;
                return Err(if exists {
                    BorrowRejection::OutOfStock.into()
                } else {
                    AppError::BookNotFound(record.book_id)
                });
            }
        };

        let saved = sqlx::query_as::<_, BorrowRecord>(
            r#"
            INSERT INTO borrow_records (patron_id, book_id, borrow_date, due_date, return_date, returned)
            VALUES ($1, $2, $3, $4, NULL, FALSE)
            RETURNING *
            "#,
        )
        .bind(record.patron_id)
        .bind(record.book_id)
        .bind(record.borrow_date)
        .bind(record.due_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((book, saved))
    }

    async fn commit_return(
        &self,
        record_id: i64,
        return_date: NaiveDate,
    ) -> AppResult<(Book, BorrowRecord)> {
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, BorrowRecord>(
            r#"
            UPDATE borrow_records
            SET returned = TRUE, return_date = $2
            WHERE id = $1 AND returned = FALSE
            RETURNING *
            "#,
        )
        .bind(record_id)
        .bind(return_date)
        .fetch_optional(&mut *tx)
        .await?;

        let record = match record {
            Some(record) => record,
            None => {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM borrow_records WHERE id = $1)")
                        .bind(record_id)
                        .fetch_one(&mut *tx)
                        .await?;
                return Err(if exists {
                    AppError::AlreadyReturned(record_id)
                } else {
                    AppError::BorrowRecordNotFound(record_id)
                });
            }
        };

        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET copy_count = copy_count + 1, available = TRUE
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(record.book_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::BookNotFound(record.book_id))?;

        tx.commit().await?;

        Ok((book, record))
    }

    async fn delete_record(&self, id: i64) -> AppResult<()> {
        let deleted = sqlx::query("DELETE FROM borrow_records WHERE id = $1 AND returned = TRUE")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted > 0 {
            return Ok(());
        }

        match self.get_record(id).await? {
            Some(_) => Err(AppError::RecordStillActive(id)),
            None => Err(AppError::BorrowRecordNotFound(id)),
        }
    }
}
