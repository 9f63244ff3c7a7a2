//! Parallel load of the raw collections and single-threaded resolution.
//!
//! Affiliations, authors, keywords and the article shards are independent
//! read-only fetches and run concurrently; everything joins before the
//! cross-referencing walk starts, because resolving an article needs every
//! shard's authors and keywords to already be resident. The resolution walk
//! itself is strictly single-threaded: it performs insert-or-get-canonical
//! updates against one mutable arena.

use super::client::{RecordStore, StoreError};
use super::records::RawArticle;
use crate::config::Config;
use crate::db::entities::{Affiliation, Article, ArticleId, Author};
use crate::db::{Database, Keyword};
use crate::logger;
use crate::utilities::hash_text;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

fn join_error(err: tokio::task::JoinError) -> StoreError {
    StoreError::Task(err.to_string())
}

/// Fetches every collection and resolves it into a [`Database`].
pub async fn load_database(
    store: Arc<dyn RecordStore>,
    config: &Config,
) -> Result<Database, StoreError> {
    let started = Instant::now();

    // Affiliations come first; author records resolve against them.
    let affiliations = store.fetch_affiliations().await?;

    // Authors, keywords and article shards fan out in parallel.
    let authors_task = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.fetch_authors().await })
    };
    let keywords_task = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.fetch_keywords().await })
    };
    let shard_tasks: Vec<JoinHandle<Result<Vec<RawArticle>, StoreError>>> = config
        .store
        .article_shards
        .iter()
        .cloned()
        .map(|(from, to)| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.fetch_articles_shard(&from, &to).await })
        })
        .collect();

    // Join barrier: resolution must not start before every shard landed.
    let raw_authors = authors_task.await.map_err(join_error)??;
    let raw_keywords = keywords_task.await.map_err(join_error)??;
    let mut raw_articles: Vec<RawArticle> = Vec::new();
    for task in shard_tasks {
        // Shards are disjoint; appending is the whole merge step.
        raw_articles.extend(task.await.map_err(join_error)??);
    }
    logger::info(&format!(
        "Fetched {} affiliations, {} authors, {} keywords, {} articles in {}ms",
        affiliations.len(),
        raw_authors.len(),
        raw_keywords.len(),
        raw_articles.len(),
        started.elapsed().as_millis()
    ));

    let mut db = Database::new(&config.deduplication);

    for raw in affiliations {
        db.add_affiliation(Affiliation {
            id: raw.id,
            name: raw.name,
            country: raw.country,
        });
    }

    for raw in raw_authors {
        if let Some(affiliation_id) = &raw.affiliation {
            if !db.affiliations.contains_key(affiliation_id) {
                logger::warn(&format!(
                    "Affiliation '{}' of author '{}' is not in the store",
                    affiliation_id, raw.auid
                ));
            }
        }
        let mut author = Author::new(raw.auid);
        author.surname = raw.surname;
        author.given_name = raw.given_name;
        author.affiliation = raw.affiliation;
        db.add_author(author);
    }

    for raw in raw_keywords {
        let id = hash_text(&raw.name);
        db.keywords.insert(
            id,
            Keyword {
                name: raw.name,
                count: raw.count,
            },
        );
    }

    // First article walk: scalar fields, author and keyword resolution.
    let mut reference_lists: Vec<(ArticleId, Vec<u64>)> = Vec::new();
    let mut missing_authors = 0usize;
    let mut missing_keywords = 0usize;
    for raw in raw_articles {
        let mut article = Article::new(raw.eid);
        if let Some(title) = raw.title {
            article.title = title;
        }
        article.date = raw.date;
        article.source = raw.source;
        if let Some(surname) = raw.first_author_surname {
            article.first_author_surname = surname;
        }
        for auid in raw.authors {
            if db.authors.contains_key(&auid) {
                article.authors.push(auid);
            } else {
                missing_authors += 1;
                logger::debug(&format!(
                    "Author '{}' was not found for article '{}'",
                    auid,
                    article.export_id()
                ));
            }
        }
        for keyword_id in raw.keywords {
            if db.keywords.contains_key(&keyword_id) {
                article.keywords.insert(keyword_id);
            } else {
                missing_keywords += 1;
            }
        }
        article.references_are_updated = raw.references_are_updated;
        article.not_in_scopus = raw.not_in_scopus;
        article.out_of_scope = raw.out_of_scope;
        article.fully_scraped = raw.fully_scraped;
        let id = db.insert_canonical(article);
        reference_lists.push((id, raw.references));
    }

    // Second walk: references resolve only once every article is resident.
    let mut dangling_references = 0usize;
    for (id, references) in reference_lists {
        for reference in references {
            if db.articles.contains_key(&reference) {
                if let Some(article) = db.articles.get_mut(&id) {
                    article.references.insert(reference);
                }
            } else {
                dangling_references += 1;
            }
        }
    }
    if missing_authors + missing_keywords + dangling_references > 0 {
        logger::warn(&format!(
            "Skipped during resolution: {} author refs, {} keyword refs, {} references",
            missing_authors, missing_keywords, dangling_references
        ));
    }

    logger::info(&format!(
        "Database loaded: {} articles, {} authors, {} keywords ({}ms total)",
        db.articles.len(),
        db.authors.len(),
        db.keywords.len(),
        started.elapsed().as_millis()
    ));
    Ok(db)
}
