//! Borrow policy rules
//!
//! Evaluation is a pure function over snapshots handed in by the caller; the
//! inventory coordinator takes those snapshots inside its critical section.

use chrono::{Duration, NaiveDate};

use crate::{
    config::LendingConfig,
    error::BorrowRejection,
    models::{Book, BorrowRecord},
};

#[derive(Debug, Clone)]
pub struct BorrowPolicy {
    max_active_loans: usize,
    loan_period: Duration,
}

impl BorrowPolicy {
    pub fn new(max_active_loans: usize, loan_period_days: i64) -> Self {
        Self {
            max_active_loans,
            loan_period: Duration::days(loan_period_days),
        }
    }

    pub fn from_config(config: &LendingConfig) -> Self {
        Self::new(config.max_active_loans, config.loan_period_days)
    }

    pub fn max_active_loans(&self) -> usize {
        self.max_active_loans
    }

    /// Due date for a loan starting on `borrow_date`
    pub fn due_date(&self, borrow_date: NaiveDate) -> NaiveDate {
        borrow_date + self.loan_period
    }

    /// Check a borrow attempt against the patron's records and the book.
    ///
    /// `patron_records` must be every record owned by the borrowing patron;
    /// returned ones are ignored. Checks run in a fixed order and the first
    /// failure is reported.
    pub fn evaluate(
        &self,
        patron_records: &[BorrowRecord],
        book: &Book,
        requested_borrow_date: NaiveDate,
        today: NaiveDate,
    ) -> Result<(), BorrowRejection> {
        let active: Vec<&BorrowRecord> = patron_records.iter().filter(|r| !r.returned).collect();

        if active.len() >= self.max_active_loans {
            return Err(BorrowRejection::TooManyActiveLoans {
                max: self.max_active_loans,
            });
        }

        if active.iter().any(|r| r.due_date < today) {
            return Err(BorrowRejection::HasOverdueLoans);
        }

        if active.iter().any(|r| r.book_id == book.id) {
            return Err(BorrowRejection::AlreadyBorrowed);
        }

        if book.copy_count <= 0 {
            return Err(BorrowRejection::OutOfStock);
        }

        if requested_borrow_date > today {
            return Err(BorrowRejection::InvalidBorrowDate);
        }

        Ok(())
    }
}

impl Default for BorrowPolicy {
    fn default() -> Self {
        Self::from_config(&LendingConfig::default())
    }
}
