//! Raw record shapes exchanged with the external store.
//!
//! The store keeps flat collections keyed by content hash (articles,
//! keywords) or external id (authors, affiliations). Cross-entity links
//! arrive as id arrays, never as embedded objects; the loader resolves them
//! against the already-fetched collections and tolerates dangling entries.

use serde::{Deserialize, Serialize};

/// An article row as persisted by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawArticle {
    pub eid: Option<String>,
    pub title: Option<String>,
    pub date: Option<String>,
    pub source: Option<String>,
    pub first_author_surname: Option<String>,
    /// External author ids, in authorship order.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Keyword content hashes.
    #[serde(default)]
    pub keywords: Vec<u64>,
    /// Referenced article content hashes.
    #[serde(default)]
    pub references: Vec<u64>,
    #[serde(default)]
    pub references_are_updated: bool,
    #[serde(default)]
    pub not_in_scopus: bool,
    #[serde(default)]
    pub out_of_scope: bool,
    #[serde(default)]
    pub fully_scraped: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawAuthor {
    pub auid: String,
    pub surname: Option<String>,
    pub given_name: Option<String>,
    pub affiliation: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawKeyword {
    pub name: String,
    #[serde(default = "default_count")]
    pub count: u64,
}

fn default_count() -> u64 {
    1
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawAffiliation {
    pub id: String,
    pub name: Option<String>,
    pub country: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_article_defaults_on_sparse_json() {
        let json = r#"{"eid": "2-s2.0-1", "title": "T", "date": null,
                       "source": null, "first_author_surname": "Doe"}"#;
        let raw: RawArticle = serde_json::from_str(json).unwrap();
        assert!(raw.authors.is_empty());
        assert!(raw.references.is_empty());
        assert!(!raw.fully_scraped);
    }

    #[test]
    fn test_raw_keyword_count_defaults_to_one() {
        let raw: RawKeyword = serde_json::from_str(r#"{"name": "privacy"}"#).unwrap();
        assert_eq!(raw.count, 1);
    }
}
