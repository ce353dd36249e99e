//! Overdue scanner: read-only audit queries over the patron ledger

use std::sync::Arc;

use super::clock::Clock;
use crate::{
    error::AppResult,
    models::{BorrowRecord, LoanCounts, OverdueReport},
    repository::Repository,
};

#[derive(Clone)]
pub struct OverdueScanner {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl OverdueScanner {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Unreturned records due strictly before today
    pub async fn list_overdue(&self) -> AppResult<Vec<BorrowRecord>> {
        let today = self.clock.today();
        let overdue: Vec<BorrowRecord> = self
            .repository
            .patrons
            .unreturned_records()
            .await?
            .into_iter()
            .filter(|record| record.is_overdue(today))
            .collect();

        tracing::debug!(count = overdue.len(), "Found overdue borrow records");
        Ok(overdue)
    }

    pub async fn counts_report(&self) -> AppResult<LoanCounts> {
        let records = self.repository.patrons.all_records().await?;
        Ok(LoanCounts::tally(&records, self.clock.today()))
    }

    pub async fn generate_overdue_report(&self) -> AppResult<OverdueReport> {
        let counts = self.counts_report().await?;
        Ok(OverdueReport {
            counts,
            generated_at: self.clock.now(),
        })
    }
}
