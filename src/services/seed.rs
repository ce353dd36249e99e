//! Startup seeding of default accounts and sample books

use validator::Validate;

use crate::{
    config::SeedConfig,
    error::AppResult,
    repository::Repository,
};

/// How many entries a seeding run actually created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedOutcome {
    pub patrons_created: usize,
    pub books_created: usize,
}

/// Create every configured patron and book that is not there yet.
///
/// Patrons are matched by email and books by ISBN, so running it again is a
/// no-op. Entries are validated before anything is written.
pub async fn apply(repository: &Repository, seed: &SeedConfig) -> AppResult<SeedOutcome> {
    for patron in &seed.patrons {
        patron.validate()?;
    }
    for book in &seed.books {
        book.validate()?;
    }

    let mut outcome = SeedOutcome::default();

    for patron in &seed.patrons {
        if repository.patrons.find_by_email(&patron.email).await?.is_some() {
            tracing::debug!(email = %patron.email, "Seed patron already exists");
            continue;
        }
        let created = repository.patrons.create(patron).await?;
        tracing::info!(patron_id = created.id, email = %created.email, role = %created.role, "Seed patron created");
        outcome.patrons_created += 1;
    }

    let existing: Vec<String> = repository
        .books
        .list()
        .await?
        .into_iter()
        .map(|book| book.isbn)
        .collect();

    for book in &seed.books {
        if existing.contains(&book.isbn) {
            tracing::debug!(isbn = %book.isbn, "Seed book already exists");
            continue;
        }
        let created = repository.books.create(book).await?;
        tracing::info!(book_id = created.id, title = %created.title, "Seed book created");
        outcome.books_created += 1;
    }

    Ok(outcome)
}
