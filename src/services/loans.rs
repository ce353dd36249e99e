//! Loan management service

use chrono::NaiveDate;

use super::inventory::InventoryCoordinator;
use crate::{
    error::{AppError, AppResult},
    models::{BorrowRecord, PatronIdentity},
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    inventory: InventoryCoordinator,
}

impl LoansService {
    pub fn new(repository: Repository, inventory: InventoryCoordinator) -> Self {
        Self {
            repository,
            inventory,
        }
    }

    /// Borrow a book for a patron.
    ///
    /// Runs on its own task so a dropped request cannot interrupt the commit.
    pub async fn borrow(
        &self,
        identity: PatronIdentity,
        book_id: i64,
        borrow_date: NaiveDate,
    ) -> AppResult<BorrowRecord> {
        let inventory = self.inventory.clone();
        tokio::spawn(async move { inventory.borrow(&identity, book_id, borrow_date).await })
            .await
            .map_err(|e| AppError::Internal(format!("Borrow task failed: {}", e)))?
    }

    /// Return a borrowed book; runs to completion like `borrow`
    pub async fn return_book(&self, record_id: i64) -> AppResult<BorrowRecord> {
        let inventory = self.inventory.clone();
        tokio::spawn(async move { inventory.return_book(record_id).await })
            .await
            .map_err(|e| AppError::Internal(format!("Return task failed: {}", e)))?
    }

    /// Full borrow history of a patron
    pub async fn history(&self, identity: &PatronIdentity) -> AppResult<Vec<BorrowRecord>> {
        let patron = self.inventory.resolve_patron(identity).await?;
        let records = self.repository.patrons.records_for_patron(patron.id).await?;
        tracing::debug!(patron_id = patron.id, count = records.len(), "Fetched borrow history");
        Ok(records)
    }

    pub async fn all_records(&self) -> AppResult<Vec<BorrowRecord>> {
        self.repository.patrons.all_records().await
    }

    /// Delete a returned record from the history
    pub async fn delete_record(&self, record_id: i64) -> AppResult<()> {
        self.repository.patrons.delete_record(record_id).await?;
        tracing::warn!(record_id, "Borrow record deleted");
        Ok(())
    }
}
