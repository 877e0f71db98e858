//! SQLite-backed definition store.

pub mod connection;
pub mod definition_repository;
pub mod migrations;

pub use definition_repository::SqliteDefinitionRepository;
