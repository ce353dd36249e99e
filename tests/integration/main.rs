//! Integration tests

mod engine_tests;
mod seed_tests;
