//! Libris Library Inventory & Borrowing Server
//!
//! Tracks physical copies of books, enforces the borrowing policy, detects
//! overdue loans and streams availability changes to live subscribers.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
