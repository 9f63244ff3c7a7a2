//! Read-only client interface to the external record store.
//!
//! The real system keeps its collections in a remote key-value store; this
//! crate only ever sees the four fetch queries below. `JsonFileStore` serves
//! the same collections from a directory of JSON files and is what the CLI
//! and the tests run against.

use super::records::{RawAffiliation, RawArticle, RawAuthor, RawKeyword};
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed store collection {collection}: {source}")]
    Parse {
        collection: String,
        source: serde_json::Error,
    },
    #[error("store fetch task failed: {0}")]
    Task(String),
}

/// The external store, reduced to the queries the analysis needs.
///
/// Article fetches are sharded by first-author surname so independent shards
/// can load in parallel: a shard covers surnames strictly greater than `from`
/// and less than or equal to `to`, with the sentinels `"min"`/`"max"`
/// leaving the respective bound open.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_affiliations(&self) -> Result<Vec<RawAffiliation>, StoreError>;
    async fn fetch_authors(&self) -> Result<Vec<RawAuthor>, StoreError>;
    async fn fetch_keywords(&self) -> Result<Vec<RawKeyword>, StoreError>;
    async fn fetch_articles_shard(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Vec<RawArticle>, StoreError>;
}

/// File-backed store: one JSON array per collection.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn read_collection<T: serde::de::DeserializeOwned>(
        &self,
        name: &str,
    ) -> Result<Vec<T>, StoreError> {
        let path = self.dir.join(name);
        let content = tokio::fs::read_to_string(&path).await?;
        serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            collection: name.to_string(),
            source,
        })
    }
}

/// True when `surname` falls into the (`from`, `to`] shard range.
pub fn in_shard(surname: &str, from: &str, to: &str) -> bool {
    if from != "min" && surname <= from {
        return false;
    }
    if to != "max" && surname > to {
        return false;
    }
    true
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn fetch_affiliations(&self) -> Result<Vec<RawAffiliation>, StoreError> {
        self.read_collection("affiliations.json").await
    }

    async fn fetch_authors(&self) -> Result<Vec<RawAuthor>, StoreError> {
        self.read_collection("authors.json").await
    }

    async fn fetch_keywords(&self) -> Result<Vec<RawKeyword>, StoreError> {
        self.read_collection("keywords.json").await
    }

    async fn fetch_articles_shard(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Vec<RawArticle>, StoreError> {
        let articles: Vec<RawArticle> = self.read_collection("articles.json").await?;
        Ok(articles
            .into_iter()
            .filter(|article| {
                in_shard(
                    article.first_author_surname.as_deref().unwrap_or(""),
                    from,
                    to,
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_shard_bounds_are_exclusive_inclusive() {
        assert!(in_shard("Doe", "C", "H"));
        assert!(!in_shard("C", "C", "H"), "lower bound is exclusive");
        assert!(in_shard("H", "C", "H"), "upper bound is inclusive");
        assert!(!in_shard("Z", "C", "H"));
    }

    #[test]
    fn test_in_shard_sentinels_leave_bounds_open() {
        assert!(in_shard("Aardvark", "min", "C"));
        assert!(in_shard("Zhukov", "U", "max"));
        assert!(in_shard("", "min", "max"));
    }
}
