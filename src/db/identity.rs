//! Identity resolution: content hashing and fuzzy article/keyword matching.
//!
//! Everything here is pure. Comparing two records never mutates anything;
//! merging is an explicit, separate step on the [`Database`](super::Database).
//! The threshold values and the branch order of the relaxed checks are load
//! bearing: existing stored hashes and historical merge decisions depend on
//! them, so they must not be reordered or "cleaned up". The derived same-
//! article relation is reflexive and symmetric but not transitive, and no code
//! may assume otherwise.

use super::entities::{Article, ArticleId};
use crate::utilities::{hash_text, normalize};
use textdistance::{Algorithm, Jaro};

/// Jaro similarity accepted unconditionally.
pub const JARO_GENERAL_THRESHOLD: f64 = 0.95;
/// Jaro similarity on the combined description, same publication year only.
pub const JARO_COMBINED_THRESHOLD: f64 = 0.90;
/// Jaro similarity on the surname when the title matches exactly.
pub const JARO_NAME_THRESHOLD: f64 = 0.80;
/// Jaro similarity on the title when the surname matches exactly.
pub const JARO_TITLE_THRESHOLD: f64 = 0.75;
pub const JARO_MAX: f64 = 1.0;

/// Jaro similarity over two raw strings. Empty inputs are a defined case:
/// two empty strings score 1.0, one empty side scores 0.0; nothing panics.
pub fn jaro(a: &str, b: &str) -> f64 {
    Jaro::default().for_str(a, b).nval()
}

/// Computes the content hash for an article per the identity basis rule.
///
/// The eid is the basis when one is present and the record is either fully
/// scraped or still a bare citation stub (placeholder title and surname). In
/// every other case the basis is the normalized title concatenated with the
/// normalized first-author surname. The function always produces a value;
/// placeholder text hashes as its literal normalized form.
///
/// `effective_surname` is the surname after the first-author fallback has been
/// applied by the caller (the stored field, or the first listed author's
/// surname when the field is a placeholder).
pub fn compute_article_hash(article: &Article, effective_surname: &str) -> ArticleId {
    if let Some(eid) = &article.eid {
        if article.fully_scraped
            || (article.has_placeholder_title() && article.has_placeholder_surname())
        {
            return hash_text(eid);
        }
    }
    // Hash basis is "titlesurname", not the "surname, title" description form.
    let basis = format!("{}{}", normalize(&article.title), normalize(effective_surname));
    hash_text(&basis)
}

/// Fields extracted from an article for fuzzy comparison.
///
/// Built by the database so the surname fallback and description assembly
/// happen once per candidate rather than per compared pair.
#[derive(Debug, Clone)]
pub struct MatchFields {
    pub description: String,
    pub title: String,
    pub surname: String,
    pub year: Option<i32>,
    pub anonymous: bool,
}

impl MatchFields {
    pub fn of(article: &Article, effective_surname: &str) -> Self {
        Self {
            description: format!(
                "{}, {}",
                normalize(effective_surname),
                normalize(&article.title)
            ),
            title: normalize(&article.title),
            surname: normalize(effective_surname),
            year: article.year(),
            anonymous: effective_surname == super::entities::ANONYMOUS
                || effective_surname.is_empty(),
        }
    }

    fn is_placeholder(&self) -> bool {
        self.description == "anonymous, no title"
    }
}

/// Fuzzy description match with the general and year-relaxed threshold ladder.
///
/// Branches, in order:
/// 1. combined description similarity >= 0.95;
/// then, only when both publication years are known and equal:
/// 2. combined description similarity >= 0.90;
/// 3. title similarity >= 0.75 with an exact surname match;
/// 4. exact title match with surname similarity >= 0.80;
/// 5. exact title match with an anonymous first surname.
pub fn descriptions_match(a: &MatchFields, b: &MatchFields) -> bool {
    if a.is_placeholder() || b.is_placeholder() {
        return false;
    }
    if jaro(&a.description, &b.description) >= JARO_GENERAL_THRESHOLD {
        return true;
    }
    match (a.year, b.year) {
        (Some(year_a), Some(year_b)) if year_a == year_b => {
            if jaro(&a.description, &b.description) >= JARO_COMBINED_THRESHOLD {
                true
            } else if jaro(&a.title, &b.title) >= JARO_TITLE_THRESHOLD
                && jaro(&a.surname, &b.surname) >= JARO_MAX
            {
                true
            } else if jaro(&a.title, &b.title) >= JARO_MAX
                && jaro(&a.surname, &b.surname) >= JARO_NAME_THRESHOLD
            {
                true
            } else {
                jaro(&a.title, &b.title) >= JARO_MAX && a.anonymous
            }
        }
        _ => false,
    }
}

/// Keyword equivalence: exact lowercase match, or Jaro above the general
/// threshold. Like the article relation, this is not transitive.
pub fn keywords_equivalent(a: &str, b: &str) -> bool {
    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();
    a_lower == b_lower || jaro(&a_lower, &b_lower) >= JARO_GENERAL_THRESHOLD
}

/// Typed keyword lookup key. Callers resolve by arena id or by (possibly
/// fuzzy) name through one API instead of comparing keyword objects against
/// raw hash integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordRef<'a> {
    Id(super::entities::KeywordId),
    Name(&'a str),
}
