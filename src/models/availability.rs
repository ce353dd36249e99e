//! Book availability change events

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Emitted whenever a book's `available` flag flips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityEvent {
    pub book_id: i64,
    pub available: bool,
}

impl AvailabilityEvent {
    pub fn new(book_id: i64, available: bool) -> Self {
        Self { book_id, available }
    }
}
