//! End-to-end analysis orchestration.
//!
//! Loads the entity database, runs the derivation passes, builds the author
//! graph, partitions it (recursively for large communities) and derives the
//! per-community profiles, reports and exports. The whole run aborts when the
//! main partition misses the configured modularity threshold; there is no
//! partial output and no retry.

use crate::community::{AnalysisExport, Community, CommunityExport, NamingContext};
use crate::config::Config;
use crate::db::Database;
use crate::graph::partition::level_size_threshold;
use crate::graph::{
    build_author_graph, induced_graph, partition_tree, AuthorGraph, PartitionError, PartitionTree,
    RecursionPolicy, SeedPolicy,
};
use crate::logger;
use crate::store::{load_database, RecordStore, StoreError};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Partition(#[from] PartitionError),
}

/// Database-wide counters reported before the community breakdown.
#[derive(Debug, Default)]
pub struct GlobalStatistics {
    pub articles: usize,
    pub authors: usize,
    pub keywords: usize,
    pub not_in_scopus: usize,
    pub complete: usize,
    pub with_eid: usize,
    pub out_of_scope: usize,
    pub citation_links: usize,
    /// Articles at or above the citation threshold, citation-ranked.
    pub top_cited_articles: Vec<(String, usize)>,
    /// Fully scraped articles per year, ascending.
    pub annual_counts: Vec<(i32, u64)>,
    pub top_authors_by_articles: Vec<(String, usize)>,
    pub top_sources: Vec<(String, u64)>,
    /// Keywords at or above the frequency threshold, descending.
    pub top_keywords: Vec<(String, u64)>,
}

/// A completed analysis over one configuration.
pub struct Analyzer {
    config: Config,
    db: Database,
    graph: AuthorGraph,
    tree: PartitionTree,
    naming_base: NamingContext,
}

impl Analyzer {
    /// Loads the database from the store and runs the full pipeline.
    pub async fn initialize(
        store: Arc<dyn RecordStore>,
        config: Config,
        seed_policy: SeedPolicy,
    ) -> Result<Self, AnalysisError> {
        let db = load_database(store, &config).await?;
        Self::from_database(db, config, seed_policy)
    }

    /// Runs the pipeline over an already-loaded database.
    pub fn from_database(
        mut db: Database,
        config: Config,
        seed_policy: SeedPolicy,
    ) -> Result<Self, AnalysisError> {
        db.update_author_article_records();
        db.update_article_citation_records();
        db.aggregate_author_citations();

        let analysis = &config.analysis;
        let graph = build_author_graph(
            &db,
            analysis.start_year,
            analysis.effective_end_year(),
            &analysis.keyword,
            analysis.historical_start_year,
        );
        let policy = RecursionPolicy {
            max_depth: analysis.max_partition_depth,
            base_size_threshold: analysis.community_size_threshold,
            size_threshold_divider: analysis.sub_community_size_threshold_divider,
        };
        let tree = partition_tree(
            &db,
            &graph,
            seed_policy,
            analysis.modularity_threshold,
            policy,
        )?;
        let naming_base = NamingContext::from_config(&config.naming);
        Ok(Self {
            config,
            db,
            graph,
            tree,
            naming_base,
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn graph(&self) -> &AuthorGraph {
        &self.graph
    }

    pub fn tree(&self) -> &PartitionTree {
        &self.tree
    }

    /// Names and materializes the communities of one partition-tree node, in
    /// partition-id order. Only communities meeting the level's reporting
    /// threshold claim their name (and any manual rename) in the run's
    /// naming state.
    fn communities_of<'a>(
        &'a self,
        node: &PartitionTree,
        parent_name: Option<&str>,
    ) -> Vec<Community<'a>> {
        let mut ctx = self.naming_base.fresh_run();
        if let Some(parent) = parent_name {
            ctx.seed_name(parent);
        }
        let threshold = self.report_threshold(node.level);
        let mut communities = Vec::with_capacity(node.members.len());
        for (community_id, members) in node.members.iter().enumerate() {
            let mut community = Community::new(&self.db, community_id, members, &ctx);
            if community.member_count() >= threshold {
                ctx.register_name(&community.name);
                if let Some(renamed) = ctx.apply_rename(&community.name, parent_name) {
                    community.name = renamed;
                }
            }
            communities.push(community);
        }
        communities
    }

    /// Reporting threshold for a tree level: the configured community size
    /// threshold divided once per level below the main partition.
    fn report_threshold(&self, level: usize) -> usize {
        level_size_threshold(
            self.config.analysis.community_size_threshold,
            self.config.analysis.sub_community_size_threshold_divider,
            level,
        )
        .max(1)
    }

    /// Logs the full analysis report: global statistics, the community
    /// breakdown per tree level, and the inter-community citation imbalances.
    pub fn report(&self) {
        let stats = self.global_statistics();
        logger::info(&format!(
            "Database: {} articles ({} complete, {} with eid, {} not in scopus, {} out of scope), {} authors, {} keywords, {} citation links",
            stats.articles,
            stats.complete,
            stats.with_eid,
            stats.not_in_scopus,
            stats.out_of_scope,
            stats.authors,
            stats.keywords,
            stats.citation_links
        ));
        for (description, citations) in &stats.top_cited_articles {
            logger::info(&format!("{}: {}", citations, description));
        }
        logger::info(&format!(
            "Partition: {} communities, modularity {:.4}, seed {}",
            self.tree.result.community_count, self.tree.result.modularity, self.tree.result.seed
        ));
        self.report_node(&self.tree, None);
        for line in self.intercommunity_imbalances() {
            logger::info(&line);
        }
        for (keyword, count) in &stats.top_keywords {
            logger::info(&format!("{}: {}", keyword, count));
        }
    }

    fn report_node(&self, node: &PartitionTree, parent_name: Option<&str>) {
        let threshold = self.report_threshold(node.level);
        let communities = self.communities_of(node, parent_name);
        for community in &communities {
            if self.naming_base.is_excluded_community(&community.name) {
                if community.member_count() >= threshold {
                    logger::info(&format!(
                        "Community {} = '{}' ({} members): excluded by the exclusion list",
                        community.partition_id,
                        community.name,
                        community.member_count()
                    ));
                }
                continue;
            }
            if community.member_count() >= threshold {
                logger::info(&self.render_community(community));
            } else if community.member_count() > threshold / 2
                && community.name != crate::community::ANONYMOUS_COMMUNITY
            {
                logger::info(&format!(
                    "Community {} = '{}' ({} members): below the size threshold",
                    community.partition_id,
                    community.name,
                    community.member_count()
                ));
            }
        }
        for (community_id, child) in sorted_children(node) {
            let name = communities
                .get(community_id)
                .map(|community| community.name.clone())
                .unwrap_or_default();
            logger::info(&format!(
                "--- Level {} analysis for community '{}' ---",
                child.level, name
            ));
            self.report_node(child, Some(&name));
        }
    }

    /// One community's profile as a multi-line report block.
    fn render_community(&self, community: &Community<'_>) -> String {
        let report = &self.config.report;
        let mut out = String::new();
        let dates = community.publication_dates();
        let _ = writeln!(
            out,
            "Community {} = '{}' ({} members, {:?}):",
            community.partition_id,
            community.name,
            community.member_count(),
            dates
        );
        let _ = writeln!(
            out,
            "Most influential keywords: {:?}",
            community.influence_keywords(report.keywords_to_print)
        );
        let _ = writeln!(
            out,
            "Most used keywords: {:?}",
            community.keyword_histogram(report.keywords_to_print)
        );
        let _ = writeln!(
            out,
            "Sources: {:?}",
            community.source_histogram(report.sources_to_print)
        );
        let most_cited = community.most_cited(report.produced_by_citation_threshold);
        let _ = writeln!(
            out,
            "Most cited member authors: {:?}",
            truncated(&most_cited.cited_authors, report.articles_to_print * 2)
        );
        let _ = writeln!(
            out,
            "Most cited produced articles: {:?}",
            truncated(&most_cited.produced_articles, report.articles_to_print)
        );
        let _ = writeln!(out, "Citations per publication year: {:?}", most_cited.cited_years);
        let _ = writeln!(
            out,
            "Most cited articles overall: {:?}",
            truncated(&most_cited.cited_articles, report.articles_to_print)
        );
        let _ = writeln!(
            out,
            "Intra-community citations: {:?}",
            truncated(&most_cited.intra_community, report.articles_to_print)
        );
        let _ = writeln!(
            out,
            "Annual article count: {:?}",
            community.annual_article_count()
        );
        let affiliations = community.affiliation_rankings();
        let _ = writeln!(
            out,
            "Most productive affiliations: {:?}",
            truncated(&affiliations.by_articles, report.sources_to_print)
        );
        let _ = writeln!(
            out,
            "Most influential affiliations: {:?}",
            truncated(&affiliations.by_influence, report.sources_to_print)
        );
        let _ = writeln!(
            out,
            "Most productive countries: {:?}",
            affiliations.countries_by_articles
        );
        let _ = write!(
            out,
            "Most influential countries: {:?}",
            affiliations.countries_by_influence
        );
        out
    }

    /// Structured export of the main partition (§ the JSON analysis format).
    pub fn export(&self) -> AnalysisExport {
        let report = &self.config.report;
        let threshold = self.report_threshold(0);
        let mut communities = Vec::new();
        for community in self.communities_of(&self.tree, None) {
            if community.member_count() < threshold
                || self.naming_base.is_excluded_community(&community.name)
            {
                continue;
            }
            let by_id = community.most_cited_by_id();
            let keywords = community
                .keyword_histogram(report.keywords_to_print)
                .into_iter()
                .map(|(name, _)| name)
                .collect();
            let mut articles = by_id.articles;
            articles.truncate(report.articles_to_print);
            communities.push(CommunityExport {
                community_id: community.partition_id,
                community_name: community.name.clone(),
                member_count: community.member_count(),
                keywords,
                authors: by_id.authors,
                articles,
            });
        }
        AnalysisExport {
            modularity: self.tree.result.modularity,
            random_seed: self.tree.result.seed,
            communities,
        }
    }

    /// Gathers the database-wide statistics block.
    pub fn global_statistics(&self) -> GlobalStatistics {
        let db = &self.db;
        let mut stats = GlobalStatistics {
            articles: db.articles.len(),
            authors: db.authors.len(),
            keywords: db.keywords.len(),
            with_eid: db.articles_with_eid().len(),
            ..Default::default()
        };
        let mut cited: Vec<(String, usize)> = Vec::new();
        for article in db.articles.values() {
            if article.not_in_scopus {
                stats.not_in_scopus += 1;
            }
            if article.out_of_scope {
                stats.out_of_scope += 1;
            }
            if article.is_complete() {
                stats.complete += 1;
            }
            stats.citation_links += article.references.len();
            let citations = article.citations.len();
            if citations >= self.config.report.citation_truncation_threshold as usize {
                cited.push((article.description_with_year(), citations));
            }
        }
        cited.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        stats.top_cited_articles = cited;

        let mut annual: BTreeMap<i32, u64> = BTreeMap::new();
        for &article_id in db.articles_with_eid() {
            if let Some(article) = db.articles.get(&article_id) {
                if let Some(year) = article.year() {
                    *annual.entry(year).or_default() += 1;
                }
            }
        }
        stats.annual_counts = annual.into_iter().collect();

        let mut by_articles: BTreeMap<String, usize> = BTreeMap::new();
        let mut sources: BTreeMap<String, u64> = BTreeMap::new();
        for author in db.authors.values() {
            if !author.articles.is_empty() {
                *by_articles.entry(author.full_name()).or_default() += author.articles.len();
            }
            for article_id in &author.articles {
                if let Some(article) = db.articles.get(article_id) {
                    if let Some(source) = &article.source {
                        *sources.entry(source.clone()).or_default() += 1;
                    }
                }
            }
        }
        let mut top_authors: Vec<(String, usize)> = by_articles.into_iter().collect();
        top_authors.sort_by(|a, b| b.1.cmp(&a.1));
        top_authors.truncate(20);
        stats.top_authors_by_articles = top_authors;
        let mut top_sources: Vec<(String, u64)> = sources.into_iter().collect();
        top_sources.sort_by(|a, b| b.1.cmp(&a.1));
        top_sources.truncate(20);
        stats.top_sources = top_sources;

        let mut top_keywords: Vec<(String, u64)> = db
            .keywords
            .values()
            .filter(|keyword| keyword.count >= self.config.report.keyword_truncation_threshold)
            .map(|keyword| (keyword.name.clone(), keyword.count))
            .collect();
        top_keywords.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        stats.top_keywords = top_keywords;
        stats
    }

    /// Pairs of reported communities with a strongly one-sided citation
    /// relation (size-normalized ratio above 2), as report lines.
    pub fn intercommunity_imbalances(&self) -> Vec<String> {
        let threshold = self.report_threshold(0);
        let communities: Vec<Community<'_>> = self
            .communities_of(&self.tree, None)
            .into_iter()
            .filter(|community| community.member_count() >= threshold)
            .collect();
        let mut lines = Vec::new();
        for a in &communities {
            for b in &communities {
                if a.partition_id == b.partition_id {
                    continue;
                }
                let a_to_b = a.citations_to(b);
                let b_to_a = b.citations_to(a);
                if a_to_b.max(b_to_a) <= self.config.report.citation_truncation_threshold {
                    continue;
                }
                if b_to_a > 0
                    && (a_to_b * b.member_count() as u64) as f64
                        / (b_to_a * a.member_count() as u64) as f64
                        > 2.0
                {
                    lines.push(format!(
                        "'{}' ({}) cites '{}' ({}) {} times, while '{}' cites '{}' {} times",
                        a.name,
                        a.member_count(),
                        b.name,
                        b.member_count(),
                        a_to_b,
                        b.name,
                        a.name,
                        b_to_a
                    ));
                }
            }
        }
        lines
    }

    /// Writes the author graph and the induced community graph as CSV files
    /// for the external rendering layer.
    pub fn export_graph_csv(&self, prefix: &str) -> io::Result<()> {
        let mut nodes = std::fs::File::create(format!("{}_author_graph_nodes.csv", prefix))?;
        self.graph.export_nodes_csv(&self.db, &mut nodes)?;
        let mut edges = std::fs::File::create(format!("{}_author_graph_edges.csv", prefix))?;
        self.graph.export_edges_csv(&mut edges)?;

        let communities = self.communities_of(&self.tree, None);
        let meta = induced_graph(&self.graph, &self.tree.result);
        let mut community_nodes =
            std::fs::File::create(format!("{}_community_graph_nodes.csv", prefix))?;
        writeln!(community_nodes, "Id,Label,Size")?;
        for community in &communities {
            writeln!(
                community_nodes,
                "{},\"{}\",{}",
                community.partition_id,
                community.name,
                community.member_count()
            )?;
        }
        let mut community_edges =
            std::fs::File::create(format!("{}_community_graph_edges.csv", prefix))?;
        writeln!(community_edges, "Source,Target,Weight")?;
        for (source, row) in meta.iter().enumerate() {
            for (&target, &weight) in row {
                if target >= source {
                    writeln!(community_edges, "{},{},{}", source, target, weight)?;
                }
            }
        }
        Ok(())
    }
}

fn truncated<T: Clone>(items: &[T], length: usize) -> Vec<T> {
    items.iter().take(length).cloned().collect()
}

/// Children in community-id order, for deterministic reporting.
fn sorted_children(node: &PartitionTree) -> Vec<(usize, &PartitionTree)> {
    let mut children: Vec<(usize, &PartitionTree)> = node
        .children
        .iter()
        .map(|(&community_id, child)| (community_id, child))
        .collect();
    children.sort_by_key(|(community_id, _)| *community_id);
    children
}
