pub mod commands;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;

pub use db::Database;
pub use error::{JournalError, Result};
