//! Deduplicated entity database.
//!
//! This module owns the canonical in-memory representation of the scraped
//! bibliography:
//! - Arena entities linked by stable ids (`entities`)
//! - Content hashing and fuzzy identity resolution (`identity`)
//! - The insert-or-get-canonical store with merge and cycle detection
//!   (`database`)

pub mod database;
pub mod entities;
pub mod identity;

pub use database::Database;
pub use entities::{
    Affiliation, AffiliationId, Article, ArticleId, Author, AuthorId, Keyword, KeywordId,
};
pub use identity::KeywordRef;

#[cfg(test)]
pub mod tests;
