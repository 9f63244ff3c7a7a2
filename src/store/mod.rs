//! External store boundary: raw records, the read-only client trait, and the
//! parallel loader that turns fetched collections into a [`Database`](crate::db::Database).

pub mod client;
pub mod loader;
pub mod records;

pub use client::{JsonFileStore, RecordStore, StoreError};
pub use loader::load_database;
pub use records::{RawAffiliation, RawArticle, RawAuthor, RawKeyword};
