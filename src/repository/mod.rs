//! Ledger layer: durable storage for books, patrons and borrow records

pub mod books;
pub mod memory;
pub mod patrons;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{Book, BorrowRecord, CreateBook, CreatePatron, NewBorrowRecord, Patron},
};

/// Book ledger: catalog rows with their shelf copy count
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookLedger: Send + Sync {
    async fn get(&self, id: i64) -> AppResult<Option<Book>>;

    async fn list(&self) -> AppResult<Vec<Book>>;

    /// Fails with `Conflict` when the ISBN is taken
    async fn create(&self, book: &CreateBook) -> AppResult<Book>;

    /// Deletes a book together with its returned history.
    /// Fails with `BookHasActiveLoans` while any record is unreturned.
    async fn delete(&self, id: i64) -> AppResult<()>;
}

/// Patron ledger: patrons and the borrow records they own
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PatronLedger: Send + Sync {
    async fn get(&self, id: i64) -> AppResult<Option<Patron>>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Patron>>;

    /// Fails with `Conflict` when the email or phone is taken
    async fn create(&self, patron: &CreatePatron) -> AppResult<Patron>;

    async fn get_record(&self, id: i64) -> AppResult<Option<BorrowRecord>>;

    async fn records_for_patron(&self, patron_id: i64) -> AppResult<Vec<BorrowRecord>>;

    async fn unreturned_records(&self) -> AppResult<Vec<BorrowRecord>>;

    async fn all_records(&self) -> AppResult<Vec<BorrowRecord>>;

    /// Takes one copy of the book off the shelf and stores the record, atomically.
    /// Fails with `OutOfStock` if no copy is left at commit time.
    async fn commit_borrow(&self, record: &NewBorrowRecord) -> AppResult<(Book, BorrowRecord)>;

    /// Marks the record returned and puts the copy back, atomically.
    /// Fails with `AlreadyReturned` if the record was returned before.
    async fn commit_return(
        &self,
        record_id: i64,
        return_date: NaiveDate,
    ) -> AppResult<(Book, BorrowRecord)>;

    /// Deletes a returned record; unreturned ones fail with `RecordStillActive`
    async fn delete_record(&self, id: i64) -> AppResult<()>;
}

/// Main repository struct holding the ledgers
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookLedger>,
    pub patrons: Arc<dyn PatronLedger>,
}

impl Repository {
    pub fn new(books: Arc<dyn BookLedger>, patrons: Arc<dyn PatronLedger>) -> Self {
        Self { books, patrons }
    }

    /// Create a Postgres-backed repository with the given database pool
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            patrons: Arc::new(patrons::PatronsRepository::new(pool)),
        }
    }

    /// Create a repository over a fresh in-memory ledger
    pub fn in_memory() -> Self {
        let ledger = Arc::new(memory::MemoryLedger::new());
        Self {
            books: ledger.clone(),
            patrons: ledger,
        }
    }
}

/// Map unique-constraint violations to `Conflict`
pub(crate) fn conflict_on_unique(err: sqlx::Error, what: &str) -> crate::error::AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            crate::error::AppError::Conflict(format!("{} is already in use", what))
        }
        _ => err.into(),
    }
}
