//! Database module for Harmonia
//!
//! This module handles all database operations using SQLx with SQLite.

mod engine;
mod migrations;
pub mod tables;

pub use engine::{setup_sqlite, DbEngine};
#[cfg(test)]
pub(crate) use engine::setup_test_db;
pub use migrations::run_migrations;
pub use tables::*;
