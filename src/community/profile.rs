//! Per-community profiles: keyword/source histograms, citation rankings,
//! publication dates and affiliation influence.
//!
//! A `Community` is a query-only view over the database, constructed once per
//! partition run from a frozen author-id list and discarded when the next run
//! replaces the partition. Aggregations are per member author: an article
//! shared by two members contributes once per member, matching how the
//! analysis has always weighted collaboration.

use super::naming::NamingContext;
use crate::db::entities::{Affiliation, AffiliationId, ArticleId, AuthorId};
use crate::db::Database;
use crate::logger;
use std::collections::{BTreeMap, HashSet};

/// Citation rankings of a community, display-string keyed.
#[derive(Debug, Default)]
pub struct MostCited {
    /// Articles produced by the community that the community itself cites
    /// more than the configured threshold, with their global citation counts.
    pub produced_articles: Vec<(String, u64)>,
    /// Member authors by total citations of their articles (only > 0).
    pub cited_authors: Vec<(String, u64)>,
    /// Citation totals of the community's publications per publication year.
    pub cited_years: Vec<(i32, u64)>,
    /// Everything the community cites, by how often it cites it.
    pub cited_articles: Vec<(String, u64)>,
    /// The subset of `cited_articles` the community also produced.
    pub intra_community: Vec<(String, u64)>,
}

/// Citation rankings keyed by stable ids, for the structured export.
#[derive(Debug, Default)]
pub struct MostCitedIds {
    pub articles: Vec<String>,
    pub authors: Vec<AuthorId>,
    pub years: Vec<String>,
}

/// Affiliation rankings with their country aggregates.
#[derive(Debug, Default)]
pub struct AffiliationRankings {
    /// Distinct articles per affiliation.
    pub by_articles: Vec<(String, u64)>,
    /// Author citation totals per affiliation.
    pub by_influence: Vec<(String, u64)>,
    /// Member authors per affiliation.
    pub by_appearance: Vec<(String, u64)>,
    pub countries_by_articles: Vec<(String, u64)>,
    pub countries_by_influence: Vec<(String, u64)>,
    pub countries_by_appearance: Vec<(String, u64)>,
}

/// A discovered community of authors, with derived profile queries.
pub struct Community<'a> {
    db: &'a Database,
    pub partition_id: usize,
    pub name: String,
    auids: Vec<AuthorId>,
}

impl<'a> Community<'a> {
    /// Builds the community from a frozen member list and names it against
    /// the naming context. Members missing from the database are logged and
    /// dropped, the way dangling store references are.
    pub fn new(
        db: &'a Database,
        partition_id: usize,
        member_auids: &[AuthorId],
        naming: &NamingContext,
    ) -> Self {
        let mut auids = Vec::with_capacity(member_auids.len());
        for auid in member_auids {
            if db.authors.contains_key(auid) {
                auids.push(auid.clone());
            } else {
                logger::warn(&format!(
                    "Author '{}' was not found for community {}",
                    auid, partition_id
                ));
            }
        }
        let mut community = Self {
            db,
            partition_id,
            name: String::new(),
            auids,
        };
        community.name = naming.choose_name(&community.influence_keywords(super::naming::NAMING_KEYWORD_POOL));
        community
    }

    pub fn member_count(&self) -> usize {
        self.auids.len()
    }

    pub fn auids(&self) -> &[AuthorId] {
        &self.auids
    }

    /// The distinct articles authored by community members.
    pub fn articles(&self) -> HashSet<ArticleId> {
        let mut articles = HashSet::new();
        for auid in &self.auids {
            if let Some(author) = self.db.authors.get(auid) {
                articles.extend(author.articles.iter().copied());
            }
        }
        articles
    }

    /// Keyword frequency histogram, descending, truncated to `length`.
    pub fn keyword_histogram(&self, length: usize) -> Vec<(String, u64)> {
        let mut histogram: BTreeMap<String, u64> = BTreeMap::new();
        self.for_each_member_article(|_, article| {
            for keyword_id in &article.keywords {
                if let Some(keyword) = self.db.keywords.get(keyword_id) {
                    *histogram.entry(keyword.name.clone()).or_default() += 1;
                }
            }
        });
        rank_descending(histogram, length)
    }

    /// Citation-weighted keyword histogram: each article's keywords count the
    /// article's citation total instead of 1. This ranking drives naming.
    pub fn influence_keywords(&self, length: usize) -> Vec<(String, u64)> {
        let mut histogram: BTreeMap<String, u64> = BTreeMap::new();
        self.for_each_member_article(|_, article| {
            let weight = article.citations.len() as u64;
            for keyword_id in &article.keywords {
                if let Some(keyword) = self.db.keywords.get(keyword_id) {
                    *histogram.entry(keyword.name.clone()).or_default() += weight;
                }
            }
        });
        rank_descending(histogram, length)
    }

    /// Source (venue) histogram, descending. Equal counts keep their
    /// name-sorted order; nothing further is promised for ties.
    pub fn source_histogram(&self, length: usize) -> Vec<(String, u64)> {
        let mut histogram: BTreeMap<String, u64> = BTreeMap::new();
        self.for_each_member_article(|_, article| {
            if let Some(source) = &article.source {
                *histogram.entry(source.clone()).or_default() += 1;
            }
        });
        rank_descending(histogram, length)
    }

    /// The community's citation rankings; see [`MostCited`].
    ///
    /// `produced_threshold` is the minimum number of intra-community citations
    /// for an authored article to count as "produced by the community".
    pub fn most_cited(&self, produced_threshold: u64) -> MostCited {
        let mut community_articles: HashSet<ArticleId> = HashSet::new();
        let mut produced: BTreeMap<String, u64> = BTreeMap::new();
        let mut authors: BTreeMap<String, u64> = BTreeMap::new();
        let mut yearly: BTreeMap<i32, u64> = BTreeMap::new();

        for auid in &self.auids {
            let Some(author) = self.db.authors.get(auid) else {
                continue;
            };
            let full_name = author.full_name();
            for article_id in &author.articles {
                let Some(article) = self.db.articles.get(article_id) else {
                    continue;
                };
                community_articles.insert(*article_id);
                let citations = article.citations.len() as u64;
                produced
                    .entry(article.description_with_year())
                    .or_insert(citations);
                *authors.entry(full_name.clone()).or_default() += citations;
                match article.year() {
                    Some(year) => *yearly.entry(year).or_default() += citations,
                    None => logger::debug(&format!(
                        "No parseable year on '{}'; excluded from yearly citations",
                        article.description()
                    )),
                }
            }
        }

        let mut cited: BTreeMap<String, u64> = BTreeMap::new();
        let mut intra: BTreeMap<String, u64> = BTreeMap::new();
        for article_id in &community_articles {
            let Some(article) = self.db.articles.get(article_id) else {
                continue;
            };
            for reference_id in &article.references {
                let Some(reference) = self.db.articles.get(reference_id) else {
                    continue;
                };
                let key = reference.description_with_year();
                *cited.entry(key.clone()).or_default() += 1;
                if produced.contains_key(&key) {
                    *intra.entry(key).or_default() += 1;
                }
            }
        }

        // Only articles the community itself cites often enough count as
        // produced by it; the raw authored set overstates the community.
        let produced_filtered: BTreeMap<String, u64> = produced
            .into_iter()
            .filter(|(key, _)| cited.get(key).copied().unwrap_or(0) > produced_threshold)
            .collect();

        let cited_authors: BTreeMap<String, u64> = authors
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .collect();
        MostCited {
            produced_articles: rank_descending(produced_filtered, usize::MAX),
            cited_authors: rank_descending(cited_authors, usize::MAX),
            cited_years: rank_descending(yearly, usize::MAX),
            cited_articles: rank_descending(cited, usize::MAX),
            intra_community: rank_descending(intra, usize::MAX),
        }
    }

    /// Id-keyed variant of the citation rankings for the structured export:
    /// article export ids, auids and year strings, citation-sorted.
    pub fn most_cited_by_id(&self) -> MostCitedIds {
        let mut articles: BTreeMap<String, u64> = BTreeMap::new();
        let mut authors: BTreeMap<AuthorId, u64> = BTreeMap::new();
        let mut years: BTreeMap<String, u64> = BTreeMap::new();
        for auid in &self.auids {
            let Some(author) = self.db.authors.get(auid) else {
                continue;
            };
            for article_id in &author.articles {
                let Some(article) = self.db.articles.get(article_id) else {
                    continue;
                };
                let citations = article.citations.len() as u64;
                *articles.entry(article.export_id()).or_default() += citations;
                *authors.entry(auid.clone()).or_default() += citations;
                if let Some(year) = article.year() {
                    *years.entry(year.to_string()).or_default() += citations;
                }
            }
        }
        MostCitedIds {
            articles: keys_by_rank(articles),
            authors: keys_by_rank(authors),
            years: keys_by_rank(years),
        }
    }

    /// (earliest, median, latest) publication date of the community's
    /// member-weighted article list, if any article has a date.
    pub fn publication_dates(&self) -> Option<(String, String, String)> {
        let mut dates: Vec<String> = Vec::new();
        self.for_each_member_article(|_, article| {
            if let Some(date) = &article.date {
                if !date.is_empty() {
                    dates.push(date.clone());
                }
            }
        });
        if dates.is_empty() {
            return None;
        }
        dates.sort();
        Some((
            dates[0].clone(),
            dates[dates.len() / 2].clone(),
            dates[dates.len() - 1].clone(),
        ))
    }

    /// Articles per publication year, ascending by year. Articles without a
    /// parseable year are excluded from the statistic, not fatal.
    pub fn annual_article_count(&self) -> Vec<(i32, u64)> {
        let mut counts: BTreeMap<i32, u64> = BTreeMap::new();
        for article_id in self.articles() {
            let Some(article) = self.db.articles.get(&article_id) else {
                continue;
            };
            match article.year() {
                Some(year) => *counts.entry(year).or_default() += 1,
                None => logger::debug(&format!(
                    "No parseable year on '{}'; excluded from annual counts",
                    article.description()
                )),
            }
        }
        counts.into_iter().collect()
    }

    /// Affiliation rankings by article output, citation influence and member
    /// presence, plus their country aggregates. Lookups that miss the
    /// affiliation dictionary fall back to "Unknown Affiliation" /
    /// "Unknown Country".
    ///
    /// The influence ranking reads `Author::citation_cnt` and therefore
    /// requires `Database::aggregate_author_citations` to have run.
    pub fn affiliation_rankings(&self) -> AffiliationRankings {
        let mut influence: BTreeMap<AffiliationId, u64> = BTreeMap::new();
        let mut appearance: BTreeMap<AffiliationId, u64> = BTreeMap::new();
        for auid in &self.auids {
            let Some(author) = self.db.authors.get(auid) else {
                continue;
            };
            if let Some(affiliation_id) = &author.affiliation {
                *influence.entry(affiliation_id.clone()).or_default() += author.citation_cnt;
                *appearance.entry(affiliation_id.clone()).or_default() += 1;
            }
        }

        // Distinct articles per affiliation, over all authors of each
        // community article (co-authors outside the community included).
        let mut by_articles: BTreeMap<AffiliationId, u64> = BTreeMap::new();
        let mut counted: HashSet<ArticleId> = HashSet::new();
        for auid in &self.auids {
            let Some(author) = self.db.authors.get(auid) else {
                continue;
            };
            for article_id in &author.articles {
                if !counted.insert(*article_id) {
                    continue;
                }
                let Some(article) = self.db.articles.get(article_id) else {
                    continue;
                };
                let mut article_affiliations: Vec<AffiliationId> = Vec::new();
                for article_auid in &article.authors {
                    if let Some(article_author) = self.db.authors.get(article_auid) {
                        if let Some(affiliation_id) = &article_author.affiliation {
                            if !article_affiliations.contains(affiliation_id) {
                                article_affiliations.push(affiliation_id.clone());
                            }
                        }
                    }
                }
                for affiliation_id in article_affiliations {
                    *by_articles.entry(affiliation_id).or_default() += 1;
                }
            }
        }

        AffiliationRankings {
            by_articles: self.named_ranking(&by_articles),
            by_influence: self.named_ranking(&influence),
            by_appearance: self.named_ranking(&appearance),
            countries_by_articles: self.country_ranking(&by_articles),
            countries_by_influence: self.country_ranking(&influence),
            countries_by_appearance: self.country_ranking(&appearance),
        }
    }

    /// Citations from this community to `other`, counted per
    /// (article, reference, cited author) occurrence.
    pub fn citations_to(&self, other: &Community<'_>) -> u64 {
        let other_members: HashSet<&AuthorId> = other.auids.iter().collect();
        let mut count = 0u64;
        self.for_each_member_article(|_, article| {
            for reference_id in &article.references {
                if let Some(reference) = self.db.articles.get(reference_id) {
                    for cited_auid in &reference.authors {
                        if other_members.contains(cited_auid) {
                            count += 1;
                        }
                    }
                }
            }
        });
        count
    }

    fn named_ranking(&self, counts: &BTreeMap<AffiliationId, u64>) -> Vec<(String, u64)> {
        let mut ranked: Vec<(String, u64)> = counts
            .iter()
            .map(|(id, &count)| (self.affiliation_name(id), count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    fn country_ranking(&self, counts: &BTreeMap<AffiliationId, u64>) -> Vec<(String, u64)> {
        let mut by_country: BTreeMap<String, u64> = BTreeMap::new();
        for (id, &count) in counts {
            *by_country.entry(self.affiliation_country(id)).or_default() += count;
        }
        rank_descending(by_country, usize::MAX)
    }

    fn affiliation_name(&self, id: &str) -> String {
        self.db
            .affiliations
            .get(id)
            .and_then(|affiliation: &Affiliation| affiliation.name.clone())
            .unwrap_or_else(|| "Unknown Affiliation".to_string())
    }

    fn affiliation_country(&self, id: &str) -> String {
        self.db
            .affiliations
            .get(id)
            .and_then(|affiliation| affiliation.country.clone())
            .unwrap_or_else(|| "Unknown Country".to_string())
    }

    /// Visits every (author, article) membership pair once.
    fn for_each_member_article<F>(&self, mut visit: F)
    where
        F: FnMut(&AuthorId, &crate::db::Article),
    {
        for auid in &self.auids {
            if let Some(author) = self.db.authors.get(auid) {
                for article_id in &author.articles {
                    if let Some(article) = self.db.articles.get(article_id) {
                        visit(auid, article);
                    }
                }
            }
        }
    }
}

/// Sorts a histogram descending by count (ties keep key order) and truncates.
fn rank_descending<K: Ord>(histogram: BTreeMap<K, u64>, length: usize) -> Vec<(K, u64)> {
    let mut ranked: Vec<(K, u64)> = histogram.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(length);
    ranked
}

/// Like [`rank_descending`] but returns the keys only.
fn keys_by_rank<K: Ord>(histogram: BTreeMap<K, u64>) -> Vec<K> {
    rank_descending(histogram, usize::MAX)
        .into_iter()
        .map(|(key, _)| key)
        .collect()
}
