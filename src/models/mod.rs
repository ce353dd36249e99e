//! Data models for Libris

pub mod availability;
pub mod book;
pub mod borrow_record;
pub mod patron;

// Re-export commonly used types
pub use availability::AvailabilityEvent;
pub use book::{Book, CreateBook};
pub use borrow_record::{BorrowRecord, LoanCounts, NewBorrowRecord, OverdueReport};
pub use patron::{CreatePatron, Patron, PatronIdentity, Role};
