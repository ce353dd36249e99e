//! Borrow record model and reporting types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// A single loan of one book to one patron
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRecord {
    pub id: i64,
    pub patron_id: i64,
    pub book_id: i64,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    /// Set once, on return
    pub return_date: Option<NaiveDate>,
    pub returned: bool,
}

impl BorrowRecord {
    /// Unreturned and due strictly before `today`
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.returned && self.due_date < today
    }
}

/// Borrow record about to be committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBorrowRecord {
    pub patron_id: i64,
    pub book_id: i64,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// Aggregate counts over all borrow records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LoanCounts {
    pub total: usize,
    pub overdue: usize,
    pub not_returned: usize,
    pub returned: usize,
}

impl LoanCounts {
    pub fn tally<'a>(records: impl IntoIterator<Item = &'a BorrowRecord>, today: NaiveDate) -> Self {
        records.into_iter().fold(Self::default(), |mut counts, record| {
            counts.total += 1;
            if record.returned {
                counts.returned += 1;
            } else {
                counts.not_returned += 1;
                if record.due_date < today {
                    counts.overdue += 1;
                }
            }
            counts
        })
    }
}

/// Overdue audit report
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OverdueReport {
    #[serde(flatten)]
    pub counts: LoanCounts,
    pub generated_at: DateTime<Utc>,
}
