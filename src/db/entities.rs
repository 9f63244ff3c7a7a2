//! Arena entities for the deduplicated bibliographic database.
//!
//! The article graph is cyclic (article → reference → … → citing article), so
//! entities never hold direct references to each other. Every cross-entity
//! link is an id into the owning [`Database`](crate::db::Database) arena:
//! articles and keywords are keyed by stable content hashes, authors and
//! affiliations by their external ids.

use crate::utilities::normalize;
use std::collections::HashSet;

/// Content hash identifying an article in the arena.
pub type ArticleId = u64;
/// Content hash of a keyword's exact name.
pub type KeywordId = u64;
/// External author id (auid), the stable author key.
pub type AuthorId = String;
/// External affiliation id.
pub type AffiliationId = String;

/// Placeholder title for articles known only as citation stubs.
pub const NO_TITLE: &str = "No title";
/// Placeholder surname for articles with no resolvable first author.
pub const ANONYMOUS: &str = "Anonymous";

/// A bibliographic article record.
///
/// Scope flags: `not_in_scopus` marks records the index does not know,
/// `out_of_scope` marks records outside the analyzed field, `fully_scraped`
/// marks records whose metadata was retrieved completely (as opposed to
/// citation stubs that only carry an eid or a description).
#[derive(Debug, Clone)]
pub struct Article {
    /// Arena id, assigned on insertion and stable for the article's lifetime.
    /// Merges and later metadata upgrades never re-key a stored article.
    pub assigned_id: Option<ArticleId>,
    pub eid: Option<String>,
    pub title: String,
    /// Publication date, year in the first four characters.
    pub date: Option<String>,
    pub source: Option<String>,
    pub first_author_surname: String,
    /// Ordered author list; order matters for the first-author fallback.
    pub authors: Vec<AuthorId>,
    pub keywords: HashSet<KeywordId>,
    /// Outgoing citations.
    pub references: HashSet<ArticleId>,
    /// Incoming citations, the derived inverse of `references`.
    pub citations: HashSet<ArticleId>,
    pub references_are_updated: bool,
    pub not_in_scopus: bool,
    pub out_of_scope: bool,
    pub fully_scraped: bool,
}

impl Article {
    pub fn new(eid: Option<String>) -> Self {
        Self {
            assigned_id: None,
            eid,
            title: NO_TITLE.to_string(),
            date: None,
            source: None,
            first_author_surname: ANONYMOUS.to_string(),
            authors: Vec::new(),
            keywords: HashSet::new(),
            references: HashSet::new(),
            citations: HashSet::new(),
            references_are_updated: false,
            not_in_scopus: false,
            out_of_scope: false,
            fully_scraped: false,
        }
    }

    pub fn has_placeholder_title(&self) -> bool {
        self.title.is_empty() || self.title == NO_TITLE
    }

    pub fn has_placeholder_surname(&self) -> bool {
        self.first_author_surname.is_empty() || self.first_author_surname == ANONYMOUS
    }

    /// True when the record carries nothing that could identify it.
    pub fn is_fully_placeholder(&self) -> bool {
        self.eid.is_none() && self.has_placeholder_title() && self.has_placeholder_surname()
    }

    /// Publication year, if the date parses.
    pub fn year(&self) -> Option<i32> {
        self.date.as_deref().and_then(crate::utilities::parse_year)
    }

    /// True when every metadata field a full scrape provides is present.
    pub fn is_complete(&self) -> bool {
        self.eid.is_some()
            && !self.has_placeholder_title()
            && self.date.is_some()
            && self.source.is_some()
            && !self.authors.is_empty()
            && !self.keywords.is_empty()
            && !self.references.is_empty()
    }

    /// Normalized "surname, title" form used for hashing-adjacent comparisons.
    pub fn normalized_description(&self) -> String {
        format!(
            "{}, {}",
            normalize(&self.first_author_surname),
            normalize(&self.title)
        )
    }

    /// Human-readable "Surname, Title" description.
    pub fn description(&self) -> String {
        format!("{}, {}", self.first_author_surname, self.title)
    }

    /// Description suffixed with the publication year, used in reports.
    pub fn description_with_year(&self) -> String {
        match self.year() {
            Some(year) => format!("{}, {}", self.description(), year),
            None => self.description(),
        }
    }

    /// Stable display id for exports: the eid when known, else the content hash.
    pub fn export_id(&self) -> String {
        match (&self.eid, self.assigned_id) {
            (Some(eid), _) => eid.clone(),
            (None, Some(id)) => id.to_string(),
            (None, None) => self.normalized_description(),
        }
    }
}

/// An author identified by the external `auid`.
#[derive(Debug, Clone)]
pub struct Author {
    pub auid: AuthorId,
    pub surname: Option<String>,
    pub given_name: Option<String>,
    pub affiliation: Option<AffiliationId>,
    pub articles: HashSet<ArticleId>,
    /// Total citations of this author's articles. Derived cache, only valid
    /// after `Database::aggregate_author_citations` has run.
    pub citation_cnt: u64,
}

impl Author {
    pub fn new(auid: impl Into<AuthorId>) -> Self {
        Self {
            auid: auid.into(),
            surname: None,
            given_name: None,
            affiliation: None,
            articles: HashSet::new(),
            citation_cnt: 0,
        }
    }

    /// "Surname, Given name" display form.
    pub fn full_name(&self) -> String {
        match (&self.surname, &self.given_name) {
            (Some(surname), Some(given)) => format!("{}, {}", surname, given),
            (Some(surname), None) => surname.clone(),
            (None, _) => self.auid.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Keyword {
    pub name: String,
    pub count: u64,
}

impl Keyword {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Affiliation {
    pub id: AffiliationId,
    pub name: Option<String>,
    pub country: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_article_is_fully_placeholder_without_eid() {
        assert!(Article::new(None).is_fully_placeholder());
        assert!(!Article::new(Some("2-s2.0-1".to_string())).is_fully_placeholder());
    }

    #[test]
    fn test_normalized_description_lowercases_both_fields() {
        let mut article = Article::new(None);
        article.title = "Attack Graphs Revisited".to_string();
        article.first_author_surname = "Doe".to_string();
        assert_eq!(
            article.normalized_description(),
            "doe, attack graphs revisited"
        );
    }

    #[test]
    fn test_description_with_year_omits_unparseable_date() {
        let mut article = Article::new(None);
        article.title = "On Testing".to_string();
        article.first_author_surname = "Roe".to_string();
        article.date = Some("n.d.".to_string());
        assert_eq!(article.description_with_year(), "Roe, On Testing");
        article.date = Some("2014-05-01".to_string());
        assert_eq!(article.description_with_year(), "Roe, On Testing, 2014");
    }

    #[test]
    fn test_author_full_name_falls_back_to_auid() {
        let mut author = Author::new("57193");
        assert_eq!(author.full_name(), "57193");
        author.surname = Some("Curie".to_string());
        assert_eq!(author.full_name(), "Curie");
        author.given_name = Some("Marie".to_string());
        assert_eq!(author.full_name(), "Curie, Marie");
    }
}
