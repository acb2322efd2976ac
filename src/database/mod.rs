/*!
 * Database module for the durable tier of the translation cache.
 *
 * SQLite keeps translations across runs so a repeated string never reaches
 * a provider twice for the same language pair.
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

// Re-export main types
pub use connection::DatabaseConnection;
pub use models::{CacheRecord, CacheTableStats};
pub use repository::Repository;
