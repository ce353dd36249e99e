//! Inventory coordinator
//!
//! Serializes every read-modify-write of a book's copy count. Borrow takes the
//! book lock and then the patron lock (always in that order); return and book
//! removal take the book lock only. Policy evaluation, the ledger commit and
//! the availability announcement all happen while the locks are held, so
//! events for one book are published in commit order.

use std::sync::Arc;

use chrono::NaiveDate;

use super::{
    availability::AvailabilityBroadcaster, clock::Clock, locks::KeyedLocks, policy::BorrowPolicy,
};
use crate::{
    error::{AppError, AppResult},
    models::{Book, BorrowRecord, NewBorrowRecord, Patron, PatronIdentity},
    repository::Repository,
};

#[derive(Clone)]
pub struct InventoryCoordinator {
    repository: Repository,
    policy: BorrowPolicy,
    broadcaster: AvailabilityBroadcaster,
    clock: Arc<dyn Clock>,
    book_locks: KeyedLocks<i64>,
    patron_locks: KeyedLocks<i64>,
}

impl InventoryCoordinator {
    pub fn new(
        repository: Repository,
        policy: BorrowPolicy,
        broadcaster: AvailabilityBroadcaster,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            policy,
            broadcaster,
            clock,
            book_locks: KeyedLocks::new(),
            patron_locks: KeyedLocks::new(),
        }
    }

    pub fn policy(&self) -> &BorrowPolicy {
        &self.policy
    }

    /// Look up the patron behind an identity
    pub async fn resolve_patron(&self, identity: &PatronIdentity) -> AppResult<Patron> {
        let patron = match identity {
            PatronIdentity::Id(id) => self.repository.patrons.get(*id).await?,
            PatronIdentity::Email(email) => self.repository.patrons.find_by_email(email).await?,
        };
        patron.ok_or_else(|| AppError::PatronNotFound(identity.to_string()))
    }

    /// Lend one copy of `book_id` to the patron.
    ///
    /// The due date is always `borrow_date` plus the loan period. Any failure
    /// leaves both ledgers untouched.
    pub async fn borrow(
        &self,
        identity: &PatronIdentity,
        book_id: i64,
        borrow_date: NaiveDate,
    ) -> AppResult<BorrowRecord> {
        let patron = self.resolve_patron(identity).await?;

        let _book_guard = self.book_locks.lock(book_id).await;
        let _patron_guard = self.patron_locks.lock(patron.id).await;

        let book = self
            .repository
            .books
            .get(book_id)
            .await?
            .ok_or(AppError::BookNotFound(book_id))?;
        let records = self.repository.patrons.records_for_patron(patron.id).await?;
        let today = self.clock.today();

        if let Err(rejection) = self.policy.evaluate(&records, &book, borrow_date, today) {
            tracing::warn!(
                patron_id = patron.id,
                book_id,
                reason = ?rejection,
                "Borrow rejected"
            );
            return Err(rejection.into());
        }

        let new_record = NewBorrowRecord {
            patron_id: patron.id,
            book_id,
            borrow_date,
            due_date: self.policy.due_date(borrow_date),
        };
        let (updated, record) = self.repository.patrons.commit_borrow(&new_record).await?;

        tracing::info!(
            record_id = record.id,
            patron_id = patron.id,
            book_id,
            copies_left = updated.copy_count,
            due_date = %record.due_date,
            "Book borrowed"
        );

        self.announce(&book, &updated);
        Ok(record)
    }

    /// Close a loan and put the copy back on the shelf
    pub async fn return_book(&self, record_id: i64) -> AppResult<BorrowRecord> {
        // The book reference never changes, so it is safe to read it unlocked
        let book_id = self
            .repository
            .patrons
            .get_record(record_id)
            .await?
            .ok_or(AppError::BorrowRecordNotFound(record_id))?
            .book_id;

        let _book_guard = self.book_locks.lock(book_id).await;

        let record = self
            .repository
            .patrons
            .get_record(record_id)
            .await?
            .ok_or(AppError::BorrowRecordNotFound(record_id))?;
        if record.returned {
            tracing::debug!(record_id, "Return rejected, already returned");
            return Err(AppError::AlreadyReturned(record_id));
        }

        let book = self
            .repository
            .books
            .get(book_id)
            .await?
            .ok_or(AppError::BookNotFound(book_id))?;

        let (updated, record) = self
            .repository
            .patrons
            .commit_return(record_id, self.clock.today())
            .await?;

        tracing::info!(
            record_id,
            patron_id = record.patron_id,
            book_id,
            copies_left = updated.copy_count,
            "Book returned"
        );

        self.announce(&book, &updated);
        Ok(record)
    }

    /// Remove a book from the catalog; refused while copies are out on loan
    pub async fn remove_book(&self, book_id: i64) -> AppResult<()> {
        let _book_guard = self.book_locks.lock(book_id).await;
        self.repository.books.delete(book_id).await?;
        tracing::warn!(book_id, "Book deleted");
        Ok(())
    }

    fn announce(&self, before: &Book, after: &Book) {
        if before.available != after.available {
            self.broadcaster.publish(after.id, after.available);
        }
    }
}
