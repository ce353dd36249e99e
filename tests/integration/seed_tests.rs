//! Startup seeding over the in-memory ledger

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
};
use libris_server::{
    config::AppConfig,
    models::{PatronIdentity, Role},
    services::seed::{self, SeedOutcome},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::common::{day, Library};

fn shipped_config() -> AppConfig {
    config::Config::builder()
        .add_source(config::File::with_name("config/default"))
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap()
}

#[tokio::test]
async fn test_seeded_patron_can_borrow() {
    let library = Library::new();
    let seed_config = shipped_config().seed;

    let outcome = seed::apply(&library.repository, &seed_config).await.unwrap();
    assert_eq!(outcome.patrons_created, seed_config.patrons.len());
    assert_eq!(outcome.books_created, seed_config.books.len());

    let patron = library
        .repository
        .patrons
        .find_by_email("patron@libris.example")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(patron.role, Role::Patron);

    let book = library
        .services
        .catalog
        .list_books()
        .await
        .unwrap()
        .into_iter()
        .find(|book| book.isbn == "9780132350884")
        .unwrap();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/borrows")
        .header(header::AUTHORIZATION, format!("Bearer {}", library.token_for(&patron)))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::to_vec(&json!({ "book_id": book.id, "borrow_date": day(0) })).unwrap(),
        ))
        .unwrap();
    let response = library.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let record: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(record["patron_id"], patron.id);
    assert_eq!(library.copies(book.id).await.copy_count, book.copy_count - 1);
}

#[tokio::test]
async fn test_reseeding_keeps_existing_state() {
    let library = Library::new();
    let seed_config = shipped_config().seed;
    seed::apply(&library.repository, &seed_config).await.unwrap();

    let librarian = library
        .services
        .inventory
        .resolve_patron(&PatronIdentity::Email("librarian@libris.example".to_string()))
        .await
        .unwrap();
    assert_eq!(librarian.role, Role::Librarian);

    let book = library.services.catalog.list_books().await.unwrap()[0].clone();
    let patron = library
        .services
        .inventory
        .resolve_patron(&PatronIdentity::Email("patron@libris.example".to_string()))
        .await
        .unwrap();
    library
        .services
        .loans
        .borrow(PatronIdentity::Id(patron.id), book.id, day(0))
        .await
        .unwrap();

    let again = seed::apply(&library.repository, &seed_config).await.unwrap();
    assert_eq!(again, SeedOutcome::default());
    assert_eq!(library.copies(book.id).await.copy_count, book.copy_count - 1);
    assert_eq!(library.services.catalog.list_books().await.unwrap().len(), 2);
}
