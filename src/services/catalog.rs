//! Catalog service

use validator::Validate;

use super::inventory::InventoryCoordinator;
use crate::{
    error::{AppError, AppResult},
    models::{Book, CreateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    inventory: InventoryCoordinator,
}

impl CatalogService {
    pub fn new(repository: Repository, inventory: InventoryCoordinator) -> Self {
        Self {
            repository,
            inventory,
        }
    }

    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list().await
    }

    pub async fn get_book(&self, id: i64) -> AppResult<Book> {
        self.repository
            .books
            .get(id)
            .await?
            .ok_or(AppError::BookNotFound(id))
    }

    /// Add a book; the ISBN must be new
    pub async fn create_book(&self, book: &CreateBook) -> AppResult<Book> {
        book.validate()?;
        let created = self.repository.books.create(book).await?;
        tracing::info!(book_id = created.id, isbn = %created.isbn, "Book added");
        Ok(created)
    }

    /// Delete a book and its returned loan history
    pub async fn delete_book(&self, id: i64) -> AppResult<()> {
        self.inventory.remove_book(id).await
    }
}
