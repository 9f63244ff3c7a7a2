//! Community naming: greedy keyword selection with explicit shared state.
//!
//! Naming is deliberately order-dependent: communities are named in partition
//! id order, each seeing exactly the names already handed out in its run (plus
//! the parent community's name when sub-partitioning). All of that state lives
//! in a `NamingContext` passed into each community construction, so naming
//! order and prior-name visibility are explicit inputs rather than ambient
//! analyzer state.

use crate::config::NamingConfig;
use crate::logger;
use std::collections::{HashMap, HashSet};
use std::fs;

/// Name given to a community when every keyword candidate is rejected.
pub const ANONYMOUS_COMMUNITY: &str = "anonymous";
/// How many influence-ranked keywords are considered as name candidates.
pub const NAMING_KEYWORD_POOL: usize = 10;

#[derive(Debug, Default)]
pub struct NamingContext {
    excluded_keywords: HashSet<String>,
    used_names: Vec<String>,
    /// Manual renames, keyed by `name` (main run) or `parent:name` (sub-runs).
    rename_map: HashMap<String, String>,
    excluded_communities: HashSet<String>,
}

impl NamingContext {
    pub fn new(excluded_keywords: impl IntoIterator<Item = String>) -> Self {
        Self {
            excluded_keywords: excluded_keywords.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Builds a context from config, reading the rename and exclusion CSV
    /// lists. A missing file is a warning, not an error: renames and
    /// exclusions simply stay empty.
    pub fn from_config(config: &NamingConfig) -> Self {
        let mut ctx = Self::new(config.excluded_keywords.iter().cloned());
        match fs::read_to_string(&config.rename_list_file) {
            Ok(content) => {
                // First row is the header; each row is "current,replacement".
                for line in content.lines().skip(1) {
                    if let Some((from, to)) = line.split_once(',') {
                        ctx.rename_map
                            .insert(from.trim().to_string(), to.trim().to_string());
                    }
                }
            }
            Err(_) => logger::warn(&format!(
                "'{}' not found; no community renames will be made",
                config.rename_list_file
            )),
        }
        match fs::read_to_string(&config.excluded_communities_file) {
            Ok(content) => {
                for line in content.lines() {
                    let name = line.split(',').next().unwrap_or("").trim();
                    if !name.is_empty() {
                        ctx.excluded_communities.insert(name.to_string());
                    }
                }
            }
            Err(_) => logger::warn(&format!(
                "'{}' not found; no communities will be excluded",
                config.excluded_communities_file
            )),
        }
        ctx
    }

    /// A fresh naming run sharing the exclusion and rename lists but starting
    /// from an empty used-name set. Each partition run (main, or one
    /// community's sub-partition) names against its own run.
    pub fn fresh_run(&self) -> NamingContext {
        NamingContext {
            excluded_keywords: self.excluded_keywords.clone(),
            used_names: Vec::new(),
            rename_map: self.rename_map.clone(),
            excluded_communities: self.excluded_communities.clone(),
        }
    }

    /// Seeds the used-name list, e.g. with the parent community's name before
    /// naming its sub-communities.
    pub fn seed_name(&mut self, name: &str) {
        self.used_names.push(name.to_string());
    }

    /// Picks the first influence-ranked keyword that is not excluded and whose
    /// stem (the part before a parenthetical suffix) is not contained in any
    /// already-used name. Greedy and final: earlier choices are never
    /// revisited. Falls back to `"anonymous"`.
    ///
    /// The chosen name is NOT registered here; only communities that end up
    /// being reported claim their name via [`NamingContext::register_name`].
    pub fn choose_name(&self, ranked_keywords: &[(String, u64)]) -> String {
        for (keyword, _) in ranked_keywords.iter().take(NAMING_KEYWORD_POOL) {
            if self.excluded_keywords.contains(keyword) {
                continue;
            }
            let stem = keyword.split(" (").next().unwrap_or(keyword);
            let collides = self
                .used_names
                .iter()
                .any(|used| used.contains(stem) || used.contains(keyword.as_str()));
            if !collides {
                return keyword.clone();
            }
        }
        ANONYMOUS_COMMUNITY.to_string()
    }

    /// Claims a name so later siblings cannot reuse it.
    pub fn register_name(&mut self, name: &str) {
        self.used_names.push(name.to_string());
    }

    /// Applies the manual rename list. The lookup key is the bare name for
    /// the main partition and `parent:name` for sub-partitions; a hit claims
    /// the replacement name as used and returns it.
    pub fn apply_rename(&mut self, name: &str, parent: Option<&str>) -> Option<String> {
        let key = match parent {
            Some(parent) => format!("{}:{}", parent, name),
            None => name.to_string(),
        };
        let renamed = self.rename_map.get(&key).cloned()?;
        logger::info(&format!(
            "Community name '{}' renamed to '{}'",
            key, renamed
        ));
        self.used_names.push(renamed.clone());
        Some(renamed)
    }

    pub fn is_excluded_community(&self, name: &str) -> bool {
        self.excluded_communities.contains(name)
    }
}
