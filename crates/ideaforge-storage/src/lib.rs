//! Persistence for idea-validation reports and the users who own them.
//!
//! [`ReportStore`] wraps a SeaORM connection (SQLite by default, WAL mode)
//! and runs the schema migrations on connect. Report reads and writes are
//! always scoped to a user id.

pub mod auth;
pub mod entities;
pub mod error;
pub mod store;


pub use error::StorageError;
pub use store::ReportStore;
