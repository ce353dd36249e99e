//! In-process ledger backend
//!
//! All tables sit behind one lock, so every commit is atomic with respect to
//! every other ledger call.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;

use super::{BookLedger, PatronLedger};
use crate::{
    error::{AppError, AppResult, BorrowRejection},
    models::{Book, BorrowRecord, CreateBook, CreatePatron, NewBorrowRecord, Patron},
};

#[derive(Default)]
struct Tables {
    books: BTreeMap<i64, Book>,
    patrons: BTreeMap<i64, Patron>,
    records: BTreeMap<i64, BorrowRecord>,
    last_book_id: i64,
    last_patron_id: i64,
    last_record_id: i64,
}

#[derive(Default)]
pub struct MemoryLedger {
    tables: RwLock<Tables>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookLedger for MemoryLedger {
    async fn get(&self, id: i64) -> AppResult<Option<Book>> {
        Ok(self.tables.read().await.books.get(&id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<Book>> {
        let tables = self.tables.read().await;
        let mut books: Vec<Book> = tables.books.values().cloned().collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(books)
    }

    async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let mut tables = self.tables.write().await;

        if tables.books.values().any(|b| b.isbn == book.isbn) {
            return Err(AppError::Conflict("ISBN is already in use".to_string()));
        }

        tables.last_book_id += 1;
        let created = Book {
            id: tables.last_book_id,
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            publication_date: book.publication_date,
            genre: book.genre.clone(),
            copy_count: book.copy_count,
            available: book.copy_count > 0,
        };
        tables.books.insert(created.id, created.clone());
        Ok(created)
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let mut tables = self.tables.write().await;

        if !tables.books.contains_key(&id) {
            return Err(AppError::BookNotFound(id));
        }
        if tables.records.values().any(|r| r.book_id == id && !r.returned) {
            return Err(AppError::BookHasActiveLoans(id));
        }

        tables.records.retain(|_, r| r.book_id != id);
        tables.books.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl PatronLedger for MemoryLedger {
    async fn get(&self, id: i64) -> AppResult<Option<Patron>> {
        Ok(self.tables.read().await.patrons.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Patron>> {
        let tables = self.tables.read().await;
        Ok(tables.patrons.values().find(|p| p.email == email).cloned())
    }

    async fn create(&self, patron: &CreatePatron) -> AppResult<Patron> {
        let mut tables = self.tables.write().await;

        if tables
            .patrons
            .values()
            .any(|p| p.email == patron.email || p.phone == patron.phone)
        {
            return Err(AppError::Conflict("Email or phone is already in use".to_string()));
        }

        tables.last_patron_id += 1;
        let created = Patron {
            id: tables.last_patron_id,
            name: patron.name.clone(),
            email: patron.email.clone(),
            phone: patron.phone.clone(),
            role: patron.role,
            registered_at: Utc::now(),
        };
        tables.patrons.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_record(&self, id: i64) -> AppResult<Option<BorrowRecord>> {
        Ok(self.tables.read().await.records.get(&id).cloned())
    }

    async fn records_for_patron(&self, patron_id: i64) -> AppResult<Vec<BorrowRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .records
            .values()
            .filter(|r| r.patron_id == patron_id)
            .cloned()
            .collect())
    }

    async fn unreturned_records(&self) -> AppResult<Vec<BorrowRecord>> {
        let tables = self.tables.read().await;
        let mut records: Vec<BorrowRecord> = tables
            .records
            .values()
            .filter(|r| !r.returned)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn all_records(&self) -> AppResult<Vec<BorrowRecord>> {
        Ok(self.tables.read().await.records.values().cloned().collect())
    }

    async fn commit_borrow(&self, record: &NewBorrowRecord) -> AppResult<(Book, BorrowRecord)> {
        let mut tables = self.tables.write().await;

        if !tables.patrons.contains_key(&record.patron_id) {
            return Err(AppError::PatronNotFound(record.patron_id.to_string()));
        }
        let book = tables
            .books
            .get(&record.book_id)
            .ok_or(AppError::BookNotFound(record.book_id))?;
        if book.copy_count <= 0 {
            return Err(BorrowRejection::OutOfStock.into());
        }

        let book = book.lend_one();
        tables.last_record_id += 1;
        let saved = BorrowRecord {
            id: tables.last_record_id,
            patron_id: record.patron_id,
            book_id: record.book_id,
            borrow_date: record.borrow_date,
            due_date: record.due_date,
            return_date: None,
            returned: false,
        };

        tables.books.insert(book.id, book.clone());
        tables.records.insert(saved.id, saved.clone());
        Ok((book, saved))
    }

    async fn commit_return(
        &self,
        record_id: i64,
        return_date: NaiveDate,
    ) -> AppResult<(Book, BorrowRecord)> {
        let mut tables = self.tables.write().await;

        let record = tables
            .records
            .get(&record_id)
            .ok_or(AppError::BorrowRecordNotFound(record_id))?;
        if record.returned {
            return Err(AppError::AlreadyReturned(record_id));
        }
        let book = tables
            .books
            .get(&record.book_id)
            .ok_or(AppError::BookNotFound(record.book_id))?
            .shelve_one();

        let record = BorrowRecord {
            return_date: Some(return_date),
            returned: true,
            ..record.clone()
        };

        tables.books.insert(book.id, book.clone());
        tables.records.insert(record.id, record.clone());
        Ok((book, record))
    }

    async fn delete_record(&self, id: i64) -> AppResult<()> {
        let mut tables = self.tables.write().await;

        match tables.records.get(&id).map(|r| r.returned) {
            None => Err(AppError::BorrowRecordNotFound(id)),
            Some(false) => Err(AppError::RecordStillActive(id)),
            Some(true) => {
                tables.records.remove(&id);
                Ok(())
            }
        }
    }
}
