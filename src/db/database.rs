//! The content-addressed entity arena and its merge machinery.
//!
//! Articles and keywords are keyed by stable content hashes, authors and
//! affiliations by external ids. All adjacency (authorship, keywords,
//! references, citations) is stored as ids, so merges and cycle detection
//! walk the arena explicitly instead of chasing shared references.

use super::entities::{
    Affiliation, AffiliationId, Article, ArticleId, Author, AuthorId, Keyword, KeywordId, ANONYMOUS,
};
use super::identity::{self, KeywordRef, MatchFields};
use crate::config::DeduplicationConfig;
use crate::logger;
use crate::utilities::{hash_text, normalize};
use bloomfilter::Bloom;
use lru::LruCache;
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;

/// Caches guarding the fuzzy candidate scan in [`Database::add_article`].
///
/// The Bloom filters hold the normalized titles and surnames of every stored
/// eid-bearing article. A candidate whose title and surname both miss cannot
/// share an exact field with any stored record, and the scan is skipped; a
/// fuzzy-only duplicate with no exact field in common slips through, the same
/// recall tradeoff the ingestion cache has always made. The LRU memoizes
/// match decisions per (candidate description, stored article) pair, since
/// the same citation stub is typically re-added once per citing article.
struct DedupIndex {
    title_filter: Bloom<String>,
    surname_filter: Bloom<String>,
    match_cache: LruCache<(u64, ArticleId), bool>,
}

impl DedupIndex {
    fn new(config: &DeduplicationConfig) -> Self {
        let size = config.bloom_filter_size.max(1);
        Self {
            title_filter: Bloom::new_for_fp_rate(size, 0.01)
                .unwrap_or_else(|_| Bloom::new_for_fp_rate(10_000, 0.01).unwrap()),
            surname_filter: Bloom::new_for_fp_rate(size, 0.01)
                .unwrap_or_else(|_| Bloom::new_for_fp_rate(10_000, 0.01).unwrap()),
            match_cache: LruCache::new(
                NonZeroUsize::new(config.similarity_cache_size.max(1)).unwrap(),
            ),
        }
    }

    fn observe(&mut self, fields: &MatchFields) {
        self.title_filter.set(&fields.title);
        self.surname_filter.set(&fields.surname);
    }

    fn may_match_anything(&self, fields: &MatchFields) -> bool {
        self.title_filter.check(&fields.title) || self.surname_filter.check(&fields.surname)
    }
}

/// In-memory deduplicated store of all resolved entities.
pub struct Database {
    pub articles: HashMap<ArticleId, Article>,
    pub authors: HashMap<AuthorId, Author>,
    pub keywords: HashMap<KeywordId, Keyword>,
    pub affiliations: HashMap<AffiliationId, Affiliation>,
    /// Articles carrying an external id; the candidate set for fuzzy matching.
    articles_with_eid: Vec<ArticleId>,
    eid_index: HashMap<String, ArticleId>,
    dedup: DedupIndex,
}

impl Default for Database {
    fn default() -> Self {
        Self::new(&DeduplicationConfig::default())
    }
}

impl Database {
    pub fn new(config: &DeduplicationConfig) -> Self {
        Self {
            articles: HashMap::new(),
            authors: HashMap::new(),
            keywords: HashMap::new(),
            affiliations: HashMap::new(),
            articles_with_eid: Vec::new(),
            eid_index: HashMap::new(),
            dedup: DedupIndex::new(config),
        }
    }

    /// The first-author surname with the fallback applied: the stored field
    /// unless it is a placeholder, else the first listed author's surname.
    pub fn effective_surname(&self, article: &Article) -> String {
        if !article.has_placeholder_surname() {
            return article.first_author_surname.clone();
        }
        article
            .authors
            .first()
            .and_then(|auid| self.authors.get(auid))
            .and_then(|author| author.surname.clone())
            .unwrap_or_else(|| ANONYMOUS.to_string())
    }

    /// The article's identity hash. Once an article is stored its assigned id
    /// is the answer forever; merges and metadata upgrades never re-key it.
    pub fn article_hash(&self, article: &Article) -> ArticleId {
        match article.assigned_id {
            Some(id) => id,
            None => identity::compute_article_hash(article, &self.effective_surname(article)),
        }
    }

    fn match_fields(&self, article: &Article) -> MatchFields {
        MatchFields::of(article, &self.effective_surname(article))
    }

    /// Pure equality: hash match, eid match, or fuzzy description match.
    /// Never mutates; resolving a fuzzy pair into one record is the explicit
    /// job of [`Database::add_article`] / [`Database::merge_articles`].
    pub fn articles_equal(&self, a: &Article, b: &Article) -> bool {
        if self.article_hash(a) == self.article_hash(b) {
            // A hash collision between placeholder stubs proves nothing.
            return !(a.is_fully_placeholder() && b.is_fully_placeholder());
        }
        if let (Some(eid_a), Some(eid_b)) = (&a.eid, &b.eid) {
            if eid_a == eid_b {
                return true;
            }
        }
        identity::descriptions_match(&self.match_fields(a), &self.match_fields(b))
    }

    /// Inserts `candidate` unless an equivalent article is already stored, in
    /// which case the candidate is merged into the canonical record. Returns
    /// the canonical id, or `None` for records too empty to identify.
    pub fn add_article(&mut self, candidate: Article) -> Option<ArticleId> {
        if candidate.is_fully_placeholder() {
            return None;
        }
        let hash = self.article_hash(&candidate);
        if self.articles.contains_key(&hash) {
            return Some(hash);
        }
        if let Some(eid) = &candidate.eid {
            if let Some(&canonical) = self.eid_index.get(eid) {
                let source = self.insert_article(candidate, hash);
                self.merge_articles(canonical, source);
                return Some(canonical);
            }
        }
        if let Some(canonical) = self.find_fuzzy_match(&candidate) {
            let source = self.insert_article(candidate, hash);
            self.merge_articles(canonical, source);
            return Some(canonical);
        }
        Some(self.insert_article(candidate, hash))
    }

    fn insert_article(&mut self, mut article: Article, hash: ArticleId) -> ArticleId {
        article.assigned_id = Some(hash);
        if let Some(eid) = article.eid.clone() {
            let fields = self.match_fields(&article);
            self.dedup.observe(&fields);
            if !self.articles.contains_key(&hash) || !self.articles_with_eid.contains(&hash) {
                self.articles_with_eid.push(hash);
            }
            self.eid_index.insert(eid, hash);
        }
        self.articles.insert(hash, article);
        hash
    }

    /// Directly stores an already-canonical record, as when loading from the
    /// deduplicated external store. Bypasses the equivalence search; a
    /// same-hash entry is simply replaced.
    pub fn insert_canonical(&mut self, article: Article) -> ArticleId {
        let hash = self.article_hash(&article);
        self.insert_article(article, hash)
    }

    /// Scans the eid-bearing articles for a fuzzy description match.
    fn find_fuzzy_match(&mut self, candidate: &Article) -> Option<ArticleId> {
        let fields = self.match_fields(candidate);
        if fields.description == "anonymous, no title" {
            return None;
        }
        if !self.dedup.may_match_anything(&fields) {
            return None;
        }
        let candidate_key = hash_text(&fields.description);
        for &stored_id in &self.articles_with_eid {
            if let Some(&decided) = self.dedup.match_cache.get(&(candidate_key, stored_id)) {
                if decided {
                    return Some(stored_id);
                }
                continue;
            }
            let stored = match self.articles.get(&stored_id) {
                Some(article) => article,
                None => continue,
            };
            let matched = identity::descriptions_match(&fields, &self.match_fields(stored));
            self.dedup
                .match_cache
                .put((candidate_key, stored_id), matched);
            if matched {
                return Some(stored_id);
            }
        }
        None
    }

    /// Merges `source` into `target` and removes `source` from the arena.
    ///
    /// Field precedence goes to non-empty target values; author, keyword,
    /// reference and citation sets are unioned with back-pointer repair, and
    /// the scope flags widen. The target keeps its identity hash. A reference
    /// cycle introduced by the union is logged, not unwound: the merge itself
    /// is correct, the cycle is a data-quality finding.
    pub fn merge_articles(&mut self, target_id: ArticleId, source_id: ArticleId) {
        if target_id == source_id {
            return;
        }
        let source = match self.articles.remove(&source_id) {
            Some(article) => article,
            None => {
                logger::warn(&format!("merge: source article {} not found", source_id));
                return;
            }
        };
        let Some(target) = self.articles.get_mut(&target_id) else {
            logger::warn(&format!("merge: target article {} not found", target_id));
            self.articles.insert(source_id, source);
            return;
        };
        logger::debug(&format!(
            "Merging articles: {} <with> {}",
            target.description(),
            source.description()
        ));

        let target_had_eid = target.eid.is_some();
        if target.has_placeholder_title() && !source.has_placeholder_title() {
            target.title = source.title.clone();
        }
        if target.eid.as_deref().unwrap_or("").is_empty() {
            target.eid = source.eid.clone();
        }
        if target.date.is_none() {
            target.date = source.date.clone();
        }
        if target.source.as_deref().unwrap_or("").is_empty() {
            target.source = source.source.clone();
        }
        if target.has_placeholder_surname() && !source.has_placeholder_surname() {
            target.first_author_surname = source.first_author_surname.clone();
        }
        for auid in &source.authors {
            if !target.authors.contains(auid) {
                target.authors.push(auid.clone());
            }
        }
        target.keywords.extend(source.keywords.iter().copied());
        for &ref_id in &source.references {
            if ref_id != target_id {
                target.references.insert(ref_id);
            }
        }
        for &cit_id in &source.citations {
            if cit_id != target_id {
                target.citations.insert(cit_id);
            }
        }
        // The merged record must not point at the record that just died,
        // nor at itself through an inherited self-citation.
        target.references.remove(&source_id);
        target.citations.remove(&source_id);
        target.references_are_updated |= source.references_are_updated;
        target.not_in_scopus &= source.not_in_scopus;
        target.out_of_scope |= source.out_of_scope;
        target.fully_scraped |= source.fully_scraped;
        let adopted_eid = if !target_had_eid { target.eid.clone() } else { None };

        // Back-pointer repair across the arena.
        for ref_id in &source.references {
            if let Some(referenced) = self.articles.get_mut(ref_id) {
                referenced.citations.remove(&source_id);
                if *ref_id != target_id {
                    referenced.citations.insert(target_id);
                }
            }
        }
        for cit_id in &source.citations {
            if let Some(citing) = self.articles.get_mut(cit_id) {
                citing.references.remove(&source_id);
                if *cit_id != target_id {
                    citing.references.insert(target_id);
                }
            }
        }
        for auid in &source.authors {
            if let Some(author) = self.authors.get_mut(auid) {
                author.articles.remove(&source_id);
                author.articles.insert(target_id);
            }
        }

        // Index upkeep: the source's slot dies; a shared or adopted eid
        // re-points at the surviving record.
        self.articles_with_eid.retain(|&id| id != source_id);
        if let Some(eid) = &source.eid {
            if self.eid_index.get(eid) == Some(&source_id) {
                self.eid_index.remove(eid);
                let target_eid = self.articles.get(&target_id).and_then(|a| a.eid.as_deref());
                if target_eid == Some(eid.as_str()) {
                    self.eid_index.insert(eid.clone(), target_id);
                }
            }
        }
        if let Some(eid) = adopted_eid {
            self.eid_index.insert(eid, target_id);
            if !self.articles_with_eid.contains(&target_id) {
                self.articles_with_eid.push(target_id);
            }
        }

        for chain in self.find_reference_cycles(target_id) {
            let rendered: Vec<String> = chain
                .iter()
                .map(|id| {
                    self.articles
                        .get(id)
                        .map(|article| article.description())
                        .unwrap_or_else(|| id.to_string())
                })
                .collect();
            logger::warn(&format!(
                "Circular reference detected after merge: {}",
                rendered.join(" -> ")
            ));
        }
    }

    /// Finds reference cycles reachable from `start`.
    ///
    /// Iterative coloring walk; the reference closure can be deep enough that
    /// recursing per edge would overflow the stack on real data.
    pub fn find_reference_cycles(&self, start: ArticleId) -> Vec<Vec<ArticleId>> {
        let mut cycles = Vec::new();
        let mut finished: HashSet<ArticleId> = HashSet::new();
        let mut on_path: HashSet<ArticleId> = HashSet::new();
        let mut path: Vec<ArticleId> = Vec::new();
        // Each frame is a node plus the snapshot of its outgoing references.
        let mut stack: Vec<(ArticleId, Vec<ArticleId>, usize)> = Vec::new();

        let children = |id: ArticleId| -> Vec<ArticleId> {
            self.articles
                .get(&id)
                .map(|article| article.references.iter().copied().collect())
                .unwrap_or_default()
        };

        stack.push((start, children(start), 0));
        on_path.insert(start);
        path.push(start);

        loop {
            let next_child = match stack.last_mut() {
                None => break,
                Some((_, refs, next)) => {
                    if *next < refs.len() {
                        let child = refs[*next];
                        *next += 1;
                        Some(child)
                    } else {
                        None
                    }
                }
            };
            match next_child {
                Some(child) => {
                    if on_path.contains(&child) {
                        let from = path.iter().position(|&id| id == child).unwrap_or(0);
                        let mut chain: Vec<ArticleId> = path[from..].to_vec();
                        chain.push(child);
                        cycles.push(chain);
                    } else if !finished.contains(&child) {
                        on_path.insert(child);
                        path.push(child);
                        let grandchildren = children(child);
                        stack.push((child, grandchildren, 0));
                    }
                }
                None => {
                    if let Some((node, _, _)) = stack.pop() {
                        on_path.remove(&node);
                        finished.insert(node);
                        path.pop();
                    }
                }
            }
        }
        cycles
    }

    /// Adds an author, filling missing fields of an existing record.
    pub fn add_author(&mut self, new_author: Author) {
        match self.authors.get_mut(&new_author.auid) {
            Some(existing) => {
                if existing.surname.is_none() {
                    existing.surname = new_author.surname;
                }
                if existing.given_name.is_none() {
                    existing.given_name = new_author.given_name;
                }
                if existing.affiliation.is_none() {
                    existing.affiliation = new_author.affiliation;
                }
                if existing.articles.is_empty() {
                    existing.articles = new_author.articles;
                }
            }
            None => {
                self.authors.insert(new_author.auid.clone(), new_author);
            }
        }
    }

    /// Registers one occurrence of a keyword, returning its arena id.
    pub fn add_keyword(&mut self, name: &str) -> KeywordId {
        let id = hash_text(name);
        self.keywords
            .entry(id)
            .and_modify(|keyword| keyword.count += 1)
            .or_insert_with(|| Keyword::new(name));
        id
    }

    pub fn add_affiliation(&mut self, affiliation: Affiliation) {
        self.affiliations
            .entry(affiliation.id.clone())
            .or_insert(affiliation);
    }

    /// Typed keyword lookup: by id, by exact name, or by fuzzy name match.
    pub fn resolve_keyword(&self, key: KeywordRef<'_>) -> Option<KeywordId> {
        match key {
            KeywordRef::Id(id) => self.keywords.contains_key(&id).then_some(id),
            KeywordRef::Name(name) => {
                let exact = hash_text(name);
                if self.keywords.contains_key(&exact) {
                    return Some(exact);
                }
                self.keywords
                    .iter()
                    .find(|(_, keyword)| identity::keywords_equivalent(name, &keyword.name))
                    .map(|(&id, _)| id)
            }
        }
    }

    /// Rebuilds every author's article set from the article author lists.
    pub fn update_author_article_records(&mut self) {
        for author in self.authors.values_mut() {
            author.articles.clear();
        }
        let mut missing = 0usize;
        let mut memberships: Vec<(AuthorId, ArticleId)> = Vec::new();
        for (&article_id, article) in &self.articles {
            for auid in &article.authors {
                if self.authors.contains_key(auid) {
                    memberships.push((auid.clone(), article_id));
                } else {
                    missing += 1;
                }
            }
        }
        for (auid, article_id) in memberships {
            if let Some(author) = self.authors.get_mut(&auid) {
                author.articles.insert(article_id);
            }
        }
        if missing > 0 {
            logger::warn(&format!(
                "{} article author entries refer to unknown authors",
                missing
            ));
        }
    }

    /// Rebuilds the incoming-citation sets from the reference sets.
    pub fn update_article_citation_records(&mut self) {
        let mut pairs: Vec<(ArticleId, ArticleId)> = Vec::new();
        for (&citing, article) in &self.articles {
            for &referenced in &article.references {
                pairs.push((referenced, citing));
            }
        }
        let mut dangling = 0usize;
        for (referenced, citing) in pairs {
            match self.articles.get_mut(&referenced) {
                Some(article) => {
                    article.citations.insert(citing);
                }
                None => dangling += 1,
            }
        }
        if dangling > 0 {
            logger::warn(&format!(
                "{} references point outside the database and were skipped",
                dangling
            ));
        }
    }

    /// Computes every author's total citation count. Must run after
    /// [`Database::update_article_citation_records`]; the per-author counts
    /// are meaningless before both passes have completed.
    pub fn aggregate_author_citations(&mut self) {
        let articles = &self.articles;
        for author in self.authors.values_mut() {
            author.citation_cnt = author
                .articles
                .iter()
                .filter_map(|id| articles.get(id))
                .map(|article| article.citations.len() as u64)
                .sum();
        }
    }

    /// Drops reference ids that resolve to nothing, logging each drop.
    pub fn prune_dangling_references(&mut self) {
        let known: HashSet<ArticleId> = self.articles.keys().copied().collect();
        let mut dropped = 0usize;
        for article in self.articles.values_mut() {
            let before = article.references.len();
            article.references.retain(|id| known.contains(id));
            article.citations.retain(|id| known.contains(id));
            dropped += before - article.references.len();
        }
        if dropped > 0 {
            logger::warn(&format!("Pruned {} dangling references", dropped));
        }
    }

    /// Authors cited by the given author through any of their articles.
    pub fn cited_authors(&self, auid: &str) -> HashSet<AuthorId> {
        let mut cited = HashSet::new();
        if let Some(author) = self.authors.get(auid) {
            for article_id in &author.articles {
                if let Some(article) = self.articles.get(article_id) {
                    for ref_id in &article.references {
                        if let Some(reference) = self.articles.get(ref_id) {
                            cited.extend(reference.authors.iter().cloned());
                        }
                    }
                }
            }
        }
        cited
    }

    /// O(n²) sweep merging stored articles that share a first-author surname
    /// and have one title contained in the other. Returns the merge count.
    pub fn identify_description_duplicates(&mut self) -> usize {
        let ids: Vec<ArticleId> = self.articles.keys().copied().collect();
        let mut merged_away: HashSet<ArticleId> = HashSet::new();
        let mut merges = 0usize;
        for &a_id in &ids {
            if merged_away.contains(&a_id) {
                continue;
            }
            for &b_id in &ids {
                if a_id == b_id || merged_away.contains(&b_id) || merged_away.contains(&a_id) {
                    continue;
                }
                let (Some(a), Some(b)) = (self.articles.get(&a_id), self.articles.get(&b_id))
                else {
                    continue;
                };
                if Self::same_author_and_title(a, b) {
                    logger::info(&format!("Found duplicate: {}", b.description()));
                    self.merge_articles(a_id, b_id);
                    merged_away.insert(b_id);
                    merges += 1;
                }
            }
        }
        merges
    }

    fn same_author_and_title(a: &Article, b: &Article) -> bool {
        if a.has_placeholder_surname() || b.has_placeholder_surname() {
            return false;
        }
        if a.title.is_empty() || b.title.is_empty() {
            return false;
        }
        let surname_a = normalize(&a.first_author_surname);
        let surname_b = normalize(&b.first_author_surname);
        let title_a = normalize(&a.title);
        let title_b = normalize(&b.title);
        surname_a == surname_b && (title_a.contains(&title_b) || title_b.contains(&title_a))
    }

    pub fn articles_with_eid(&self) -> &[ArticleId] {
        &self.articles_with_eid
    }

    pub fn lookup_eid(&self, eid: &str) -> Option<ArticleId> {
        self.eid_index.get(eid).copied()
    }
}
