//! Borrowing engine scenarios over the in-memory ledger

use std::time::Duration as StdDuration;

use libris_server::{
    error::{AppError, BorrowRejection},
    models::{AvailabilityEvent, PatronIdentity, Role},
};
use tokio_stream::StreamExt;

use crate::common::{day, Library};

fn id(patron: &libris_server::models::Patron) -> PatronIdentity {
    PatronIdentity::Id(patron.id)
}

#[tokio::test]
async fn test_borrow_and_return_lifecycle() {
    let library = Library::new();
    let book = library.add_book("Clean Code", "9780132350884", 5).await;
    let patron = library.add_patron("Ada", Role::Patron).await;

    let record = library
        .services
        .loans
        .borrow(id(&patron), book.id, day(0))
        .await
        .unwrap();

    assert_eq!(record.borrow_date, day(0));
    assert_eq!(record.due_date, day(10));
    assert!(!record.returned);
    assert_eq!(record.return_date, None);

    let after_borrow = library.copies(book.id).await;
    assert_eq!(after_borrow.copy_count, 4);
    assert!(after_borrow.available);

    library.set_day(3);
    let returned = library.services.loans.return_book(record.id).await.unwrap();
    assert!(returned.returned);
    assert_eq!(returned.return_date, Some(day(3)));
    assert_eq!(library.copies(book.id).await.copy_count, 5);
}

#[tokio::test]
async fn test_last_copy_then_out_of_stock() {
    let library = Library::new();
    let book = library.add_book("Refactoring", "9780134757599", 1).await;
    let first = library.add_patron("Ada", Role::Patron).await;
    let second = library.add_patron("Brian", Role::Patron).await;

    library
        .services
        .loans
        .borrow(id(&first), book.id, day(0))
        .await
        .unwrap();

    let shelf = library.copies(book.id).await;
    assert_eq!(shelf.copy_count, 0);
    assert!(!shelf.available);

    let err = library
        .services
        .loans
        .borrow(id(&second), book.id, day(0))
        .await
        .unwrap_err();
    assert_eq!(err.rejection(), Some(BorrowRejection::OutOfStock));
    assert!(library
        .services
        .loans
        .history(&id(&second))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_overdue_detection_follows_the_clock() {
    let library = Library::new();
    let book = library.add_book("SICP", "9780262510875", 2).await;
    let patron = library.add_patron("Ada", Role::Patron).await;

    let record = library
        .services
        .loans
        .borrow(id(&patron), book.id, day(0))
        .await
        .unwrap();

    library.set_day(10);
    assert!(library.services.overdue.list_overdue().await.unwrap().is_empty());

    library.set_day(11);
    let overdue = library.services.overdue.list_overdue().await.unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].id, record.id);

    let report = library.services.overdue.generate_overdue_report().await.unwrap();
    assert_eq!(report.counts.total, 1);
    assert_eq!(report.counts.overdue, 1);
    assert_eq!(report.counts.not_returned, 1);

    library.services.loans.return_book(record.id).await.unwrap();
    assert!(library.services.overdue.list_overdue().await.unwrap().is_empty());

    let counts = library.services.overdue.counts_report().await.unwrap();
    assert_eq!(counts.returned, 1);
    assert_eq!(counts.overdue, 0);
}

#[tokio::test]
async fn test_overdue_patron_cannot_borrow() {
    let library = Library::new();
    let first = library.add_book("SICP", "9780262510875", 2).await;
    let second = library.add_book("TAOCP", "9780201896831", 2).await;
    let patron = library.add_patron("Ada", Role::Patron).await;

    library
        .services
        .loans
        .borrow(id(&patron), first.id, day(0))
        .await
        .unwrap();

    library.set_day(11);
    let err = library
        .services
        .loans
        .borrow(id(&patron), second.id, day(11))
        .await
        .unwrap_err();
    assert_eq!(err.rejection(), Some(BorrowRejection::HasOverdueLoans));
}

#[tokio::test]
async fn test_active_loan_cap_wins_over_stock() {
    let library = Library::new();
    let patron = library.add_patron("Ada", Role::Patron).await;
    for (n, isbn) in ["1000000001", "1000000002", "1000000003"].into_iter().enumerate() {
        let book = library.add_book(&format!("Volume {}", n), isbn, 1).await;
        library
            .services
            .loans
            .borrow(id(&patron), book.id, day(0))
            .await
            .unwrap();
    }

    // Out of stock too, but the cap is checked first
    let empty = library.add_book("Empty Shelf", "1000000004", 0).await;
    let err = library
        .services
        .loans
        .borrow(id(&patron), empty.id, day(0))
        .await
        .unwrap_err();
    assert_eq!(
        err.rejection(),
        Some(BorrowRejection::TooManyActiveLoans { max: 3 })
    );
}

#[tokio::test]
async fn test_same_book_twice_is_rejected() {
    let library = Library::new();
    let book = library.add_book("Clean Code", "9780132350884", 5).await;
    let patron = library.add_patron("Ada", Role::Patron).await;

    library
        .services
        .loans
        .borrow(id(&patron), book.id, day(0))
        .await
        .unwrap();
    let err = library
        .services
        .loans
        .borrow(id(&patron), book.id, day(0))
        .await
        .unwrap_err();

    assert_eq!(err.rejection(), Some(BorrowRejection::AlreadyBorrowed));
    assert_eq!(library.copies(book.id).await.copy_count, 4);
}

#[tokio::test]
async fn test_future_borrow_date_is_rejected() {
    let library = Library::new();
    let book = library.add_book("Clean Code", "9780132350884", 5).await;
    let patron = library.add_patron("Ada", Role::Patron).await;

    let err = library
        .services
        .loans
        .borrow(id(&patron), book.id, day(1))
        .await
        .unwrap_err();
    assert_eq!(err.rejection(), Some(BorrowRejection::InvalidBorrowDate));
    assert_eq!(library.copies(book.id).await.copy_count, 5);
}

#[tokio::test]
async fn test_unknown_book_and_patron() {
    let library = Library::new();
    let book = library.add_book("Clean Code", "9780132350884", 5).await;
    let patron = library.add_patron("Ada", Role::Patron).await;

    let err = library
        .services
        .loans
        .borrow(id(&patron), 999, day(0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BookNotFound(999)));

    let err = library
        .services
        .loans
        .borrow(
            PatronIdentity::Email("nobody@library.test".to_string()),
            book.id,
            day(0),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PatronNotFound(_)));

    let err = library.services.loans.return_book(999).await.unwrap_err();
    assert!(matches!(err, AppError::BorrowRecordNotFound(999)));
}

#[tokio::test]
async fn test_double_return_does_not_restock_twice() {
    let library = Library::new();
    let book = library.add_book("Clean Code", "9780132350884", 2).await;
    let patron = library.add_patron("Ada", Role::Patron).await;

    let record = library
        .services
        .loans
        .borrow(id(&patron), book.id, day(0))
        .await
        .unwrap();
    library.services.loans.return_book(record.id).await.unwrap();

    let err = library.services.loans.return_book(record.id).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyReturned(_)));
    assert_eq!(library.copies(book.id).await.copy_count, 2);
}

#[tokio::test]
async fn test_book_with_active_loans_cannot_be_deleted() {
    let library = Library::new();
    let book = library.add_book("Clean Code", "9780132350884", 2).await;
    let patron = library.add_patron("Ada", Role::Patron).await;

    let record = library
        .services
        .loans
        .borrow(id(&patron), book.id, day(0))
        .await
        .unwrap();

    let err = library.services.catalog.delete_book(book.id).await.unwrap_err();
    assert!(matches!(err, AppError::BookHasActiveLoans(_)));

    library.services.loans.return_book(record.id).await.unwrap();
    library.services.catalog.delete_book(book.id).await.unwrap();

    let err = library.services.catalog.get_book(book.id).await.unwrap_err();
    assert!(matches!(err, AppError::BookNotFound(_)));
    assert!(library.services.loans.all_records().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_race_for_last_copy_has_one_winner() {
    let library = Library::new();
    let book = library.add_book("Refactoring", "9780134757599", 1).await;

    let mut handles = Vec::new();
    for name in ["Ada", "Brian", "Cleo", "Dmitri", "Edsger", "Frances"] {
        let patron = library.add_patron(name, Role::Patron).await;
        let loans = library.services.loans.clone();
        let book_id = book.id;
        handles.push(tokio::spawn(async move {
            loans.borrow(PatronIdentity::Id(patron.id), book_id, day(0)).await
        }));
    }

    let mut granted = 0;
    let mut out_of_stock = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(err) => {
                assert_eq!(err.rejection(), Some(BorrowRejection::OutOfStock));
                out_of_stock += 1;
            }
        }
    }

    assert_eq!(granted, 1);
    assert_eq!(out_of_stock, 5);
    let shelf = library.copies(book.id).await;
    assert_eq!(shelf.copy_count, 0);
    assert!(!shelf.available);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cap_holds_across_concurrent_borrows_of_different_books() {
    let library = Library::new();
    let patron = library.add_patron("Ada", Role::Patron).await;

    for isbn in ["2000000001", "2000000002"] {
        let book = library.add_book("Held", isbn, 3).await;
        library
            .services
            .loans
            .borrow(id(&patron), book.id, day(0))
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for isbn in ["3000000001", "3000000002", "3000000003", "3000000004"] {
        let book = library.add_book("Wanted", isbn, 3).await;
        let loans = library.services.loans.clone();
        let patron_id = patron.id;
        handles.push(tokio::spawn(async move {
            loans.borrow(PatronIdentity::Id(patron_id), book.id, day(0)).await
        }));
    }

    let mut granted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(err) => assert_eq!(
                err.rejection(),
                Some(BorrowRejection::TooManyActiveLoans { max: 3 })
            ),
        }
    }

    assert_eq!(granted, 1);
    let active = library
        .services
        .loans
        .history(&id(&patron))
        .await
        .unwrap()
        .into_iter()
        .filter(|r| !r.returned)
        .count();
    assert_eq!(active, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_copies_are_conserved_under_churn() {
    let library = Library::new();
    let mut books = Vec::new();
    for (isbn, copies) in [("4000000001", 2), ("4000000002", 1), ("4000000003", 3)] {
        books.push(library.add_book("Churn", isbn, copies).await);
    }
    let mut patrons = Vec::new();
    for name in ["Ada", "Brian", "Cleo", "Dmitri"] {
        patrons.push(library.add_patron(name, Role::Patron).await);
    }

    let mut handles = Vec::new();
    for patron in &patrons {
        for book in &books {
            let loans = library.services.loans.clone();
            let (patron_id, book_id) = (patron.id, book.id);
            handles.push(tokio::spawn(async move {
                for _ in 0..3 {
                    if let Ok(record) =
                        loans.borrow(PatronIdentity::Id(patron_id), book_id, day(0)).await
                    {
                        loans.return_book(record.id).await.unwrap();
                    }
                    tokio::task::yield_now().await;
                }
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Leave some loans open so both sides of the balance are exercised
    let open = library
        .services
        .loans
        .borrow(id(&patrons[0]), books[0].id, day(0))
        .await
        .unwrap();

    let records = library.services.loans.all_records().await.unwrap();
    for seeded in &books {
        let current = library.copies(seeded.id).await;
        let lent = records
            .iter()
            .filter(|r| r.book_id == seeded.id && !r.returned)
            .count() as i32;

        assert!(current.copy_count >= 0);
        assert_eq!(current.available, current.copy_count > 0);
        assert_eq!(current.copy_count + lent, seeded.copy_count);
    }
    assert_eq!(open.book_id, books[0].id);
}

#[tokio::test]
async fn test_subscribers_see_changes_in_order_without_replay() {
    let library = Library::new();
    let book = library.add_book("Refactoring", "9780134757599", 1).await;
    let patron = library.add_patron("Ada", Role::Patron).await;

    let mut early = library.services.availability.subscribe();

    let record = library
        .services
        .loans
        .borrow(id(&patron), book.id, day(0))
        .await
        .unwrap();

    let mut late = library.services.availability.subscribe();

    library.services.loans.return_book(record.id).await.unwrap();

    assert_eq!(
        early.next().await,
        Some(AvailabilityEvent::new(book.id, false))
    );
    assert_eq!(
        early.next().await,
        Some(AvailabilityEvent::new(book.id, true))
    );
    assert_eq!(late.next().await, Some(AvailabilityEvent::new(book.id, true)));

    let nothing_more = tokio::time::timeout(StdDuration::from_millis(50), late.next()).await;
    assert!(nothing_more.is_err());
    let nothing_more = tokio::time::timeout(StdDuration::from_millis(50), early.next()).await;
    assert!(nothing_more.is_err());
}

#[tokio::test]
async fn test_no_event_while_copies_remain() {
    let library = Library::new();
    let book = library.add_book("Clean Code", "9780132350884", 5).await;
    let patron = library.add_patron("Ada", Role::Patron).await;
    let mut subscription = library.services.availability.subscribe();

    let record = library
        .services
        .loans
        .borrow(id(&patron), book.id, day(0))
        .await
        .unwrap();
    library.services.loans.return_book(record.id).await.unwrap();

    let event = tokio::time::timeout(StdDuration::from_millis(50), subscription.next()).await;
    assert!(event.is_err());
}
