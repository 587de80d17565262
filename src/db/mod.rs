pub mod connection;
pub mod migration_runner;
pub mod sql_types;

pub use connection::Database;
