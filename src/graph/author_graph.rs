//! Author-level citation graph construction.
//!
//! Nodes are authors, interned to dense indices; an undirected edge connects
//! a citing and a cited author. Self-loops are allowed (authors do cite
//! themselves). Node inclusion is governed by the analysis window and an
//! optional topic keyword; edge inclusion depends on whether the window spans
//! the full historical range (see [`build_author_graph`]).

use crate::db::entities::AuthorId;
use crate::db::{Database, KeywordRef};
use crate::logger;
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};

/// Undirected weighted graph over interned author ids.
#[derive(Debug, Clone, Default)]
pub struct AuthorGraph {
    nodes: Vec<AuthorId>,
    index: HashMap<AuthorId, usize>,
    adjacency: Vec<BTreeMap<usize, f64>>,
    edge_count: usize,
}

impl AuthorGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or finds) a node, returning its dense index.
    pub fn add_node(&mut self, auid: &str) -> usize {
        if let Some(&idx) = self.index.get(auid) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(auid.to_string());
        self.index.insert(auid.to_string(), idx);
        self.adjacency.push(BTreeMap::new());
        idx
    }

    /// Adds an undirected unit edge; re-adding an existing edge is a no-op.
    pub fn add_edge(&mut self, a: usize, b: usize) {
        if self.adjacency[a].contains_key(&b) {
            return;
        }
        self.adjacency[a].insert(b, 1.0);
        if a != b {
            self.adjacency[b].insert(a, 1.0);
        }
        self.edge_count += 1;
    }

    pub fn contains(&self, auid: &str) -> bool {
        self.index.contains_key(auid)
    }

    pub fn node_index(&self, auid: &str) -> Option<usize> {
        self.index.get(auid).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn nodes(&self) -> &[AuthorId] {
        &self.nodes
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        match (self.index.get(a), self.index.get(b)) {
            (Some(&ia), Some(&ib)) => self.adjacency[ia].contains_key(&ib),
            _ => false,
        }
    }

    /// Symmetric adjacency, indexed by dense node id.
    pub fn adjacency(&self) -> &[BTreeMap<usize, f64>] {
        &self.adjacency
    }

    /// Writes the node list as `Id,Label` CSV rows, labels being surnames.
    pub fn export_nodes_csv<W: Write>(&self, db: &Database, out: &mut W) -> io::Result<()> {
        writeln!(out, "Id,Label")?;
        for auid in &self.nodes {
            let label = db
                .authors
                .get(auid)
                .and_then(|author| author.surname.clone())
                .unwrap_or_default();
            writeln!(out, "{},\"{}\"", auid, label)?;
        }
        Ok(())
    }

    /// Writes the edge list as `Source,Target` CSV rows.
    pub fn export_edges_csv<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Source,Target")?;
        for (a, neighbors) in self.adjacency.iter().enumerate() {
            for (&b, _) in neighbors {
                // Emit each undirected edge once.
                if b >= a {
                    writeln!(out, "{},{}", self.nodes[a], self.nodes[b])?;
                }
            }
        }
        Ok(())
    }
}

/// Builds the author graph for the `[start_year, end_year]` window.
///
/// An author becomes a node when at least one of their articles falls inside
/// the window and carries the topic keyword (an empty filter matches every
/// article). Articles whose date does not parse are excluded from node
/// selection, with a log line, not an error.
///
/// Edge rule: an edge is added from each node to every author it cites,
/// provided the cited author is known to the database. When the window is
/// narrower than the full historical range the cited author must additionally
/// already be a node, so the time filter cannot be bypassed through the
/// citation side.
pub fn build_author_graph(
    db: &Database,
    start_year: i32,
    end_year: i32,
    keyword_filter: &str,
    historical_start_year: i32,
) -> AuthorGraph {
    let mut graph = AuthorGraph::new();
    let filter_id = if keyword_filter.is_empty() {
        None
    } else {
        let resolved = db.resolve_keyword(KeywordRef::Name(keyword_filter));
        if resolved.is_none() {
            logger::warn(&format!(
                "Topic keyword '{}' is unknown; the graph will be empty",
                keyword_filter
            ));
        }
        Some(resolved)
    };

    for (auid, author) in &db.authors {
        let mut qualifies = false;
        for article_id in &author.articles {
            let Some(article) = db.articles.get(article_id) else {
                continue;
            };
            let year = match article.year() {
                Some(year) => year,
                None => {
                    logger::debug(&format!(
                        "No parseable date on '{}'; excluding it from selection",
                        article.description()
                    ));
                    continue;
                }
            };
            if year < start_year || year > end_year {
                continue;
            }
            match filter_id {
                None => qualifies = true,
                Some(Some(keyword_id)) => {
                    if article.keywords.contains(&keyword_id) {
                        qualifies = true;
                    }
                }
                Some(None) => {}
            }
            if qualifies {
                break;
            }
        }
        if qualifies {
            graph.add_node(auid);
        }
    }

    // A window reaching over the whole recorded history may pull in cited
    // authors that the node filter skipped; narrower windows must not.
    let current_year: i32 = chrono::Utc::now()
        .format("%Y")
        .to_string()
        .parse()
        .unwrap_or(end_year);
    let window_is_full = end_year - start_year >= (current_year - 1) - historical_start_year;

    let node_auids: Vec<AuthorId> = graph.nodes().to_vec();
    for auid in node_auids {
        let citing = graph.add_node(&auid);
        for cited_auid in db.cited_authors(&auid) {
            if !db.authors.contains_key(&cited_auid) {
                continue;
            }
            if window_is_full {
                let cited = graph.add_node(&cited_auid);
                graph.add_edge(citing, cited);
            } else if let Some(cited) = graph.node_index(&cited_auid) {
                graph.add_edge(citing, cited);
            }
        }
    }
    logger::info(&format!(
        "Author graph: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    ));
    graph
}

/// Builds the induced graph over an arbitrary author subset, with the same
/// edge rule as the full-range case restricted to the subset. This is the
/// input for sub-community partitioning.
pub fn build_restricted_subgraph(db: &Database, auids: &[AuthorId]) -> AuthorGraph {
    let mut graph = AuthorGraph::new();
    for auid in auids {
        graph.add_node(auid);
    }
    for auid in auids {
        let Some(citing) = graph.node_index(auid) else {
            continue;
        };
        for cited_auid in db.cited_authors(auid) {
            if !db.authors.contains_key(&cited_auid) {
                continue;
            }
            if let Some(cited) = graph.node_index(&cited_auid) {
                graph.add_edge(citing, cited);
            }
        }
    }
    graph
}
