use serde::Deserialize;
use std::fs;

#[derive(Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub deduplication: DeduplicationConfig,
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    /// First year of the analyzed window.
    pub start_year: i32,
    /// Last year of the analyzed window. Zero means "current year".
    pub end_year: i32,
    /// First year of the full historical range; a window reaching back this far
    /// uses the relaxed edge-inclusion rule.
    pub historical_start_year: i32,
    /// Optional topic filter; empty string matches every article.
    pub keyword: String,
    pub community_size_threshold: usize,
    pub sub_community_size_threshold_divider: usize,
    /// Recursion bound for sub-partitioning: 0 = main only, 2 = sub and sub².
    pub max_partition_depth: usize,
    /// Abort the whole run when the main partition's modularity falls below this.
    pub modularity_threshold: Option<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            start_year: 1945,
            end_year: 0,
            historical_start_year: 1945,
            keyword: String::new(),
            community_size_threshold: 75,
            sub_community_size_threshold_divider: 4,
            max_partition_depth: 2,
            modularity_threshold: None,
        }
    }
}

impl AnalysisConfig {
    /// End year with the "current year" default applied.
    pub fn effective_end_year(&self) -> i32 {
        if self.end_year > 0 {
            self.end_year
        } else {
            chrono::Utc::now()
                .format("%Y")
                .to_string()
                .parse()
                .unwrap_or(self.start_year)
        }
    }
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct ReportConfig {
    pub keywords_to_print: usize,
    pub sources_to_print: usize,
    pub articles_to_print: usize,
    /// Articles below this citation count are left out of the global statistics.
    pub citation_truncation_threshold: u64,
    /// Keywords below this frequency are left out of the global keyword listing.
    pub keyword_truncation_threshold: u64,
    /// An article counts as "produced by the community" only when the community
    /// cites it more than this many times.
    pub produced_by_citation_threshold: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            keywords_to_print: 20,
            sources_to_print: 15,
            articles_to_print: 250,
            citation_truncation_threshold: 50,
            keyword_truncation_threshold: 50,
            produced_by_citation_threshold: 1,
        }
    }
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct NamingConfig {
    /// Keywords never used as community names (the field's umbrella terms).
    pub excluded_keywords: Vec<String>,
    pub rename_list_file: String,
    pub excluded_communities_file: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            excluded_keywords: Vec::new(),
            rename_list_file: "communities_rename_list.csv".to_string(),
            excluded_communities_file: "excluded_communities_list.csv".to_string(),
        }
    }
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the exported record collections.
    pub data_dir: String,
    /// Lexical shard bounds for the parallel article fetch, as
    /// (exclusive-from, inclusive-to) surname prefixes. "min"/"max" are open ends.
    pub article_shards: Vec<(String, String)>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: "./store".to_string(),
            article_shards: vec![
                ("min".to_string(), "C".to_string()),
                ("C".to_string(), "H".to_string()),
                ("H".to_string(), "L".to_string()),
                ("L".to_string(), "P".to_string()),
                ("P".to_string(), "U".to_string()),
                ("U".to_string(), "max".to_string()),
            ],
        }
    }
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct DeduplicationConfig {
    pub bloom_filter_size: usize,
    pub similarity_cache_size: usize,
}

impl Default for DeduplicationConfig {
    fn default() -> Self {
        Self {
            bloom_filter_size: 100_000,
            similarity_cache_size: 65_536,
        }
    }
}

pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    let content = fs::read_to_string("config.json")?;
    serde_json::from_str(&content).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_thresholds() {
        let config = Config::default();
        assert_eq!(config.analysis.community_size_threshold, 75);
        assert_eq!(config.analysis.sub_community_size_threshold_divider, 4);
        assert_eq!(config.analysis.max_partition_depth, 2);
        assert_eq!(config.report.produced_by_citation_threshold, 1);
    }

    #[test]
    fn test_partial_config_parses_with_defaults() {
        let json = r#"{"analysis": {"start_year": 2000, "end_year": 2020}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.analysis.start_year, 2000);
        assert_eq!(config.analysis.effective_end_year(), 2020);
        // Untouched sections keep their defaults
        assert_eq!(config.report.keywords_to_print, 20);
        assert_eq!(config.store.article_shards.len(), 6);
    }

    #[test]
    fn test_end_year_zero_resolves_to_current_year() {
        let config = AnalysisConfig::default();
        assert!(config.effective_end_year() >= 2026);
    }
}
