//! Structured export of a completed analysis run.
//!
//! One JSON document per run: the partition's modularity and seed, plus the
//! reported communities with stable identifiers (auids and article ids, not
//! display strings). The stability analyzer consumes these documents across
//! many runs.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisExport {
    pub modularity: f64,
    pub random_seed: u64,
    pub communities: Vec<CommunityExport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityExport {
    pub community_id: usize,
    pub community_name: String,
    pub member_count: usize,
    /// Top keywords, frequency-ranked names.
    pub keywords: Vec<String>,
    /// Member auids, citation-ranked.
    pub authors: Vec<String>,
    /// Produced article ids, citation-ranked and truncated.
    pub articles: Vec<String>,
}

impl AnalysisExport {
    pub fn write_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AnalysisExport {
        AnalysisExport {
            modularity: 0.41,
            random_seed: 99,
            communities: vec![CommunityExport {
                community_id: 0,
                community_name: "cryptography".to_string(),
                member_count: 2,
                keywords: vec!["cryptography".to_string()],
                authors: vec!["123".to_string(), "456".to_string()],
                articles: vec!["2-s2.0-1".to_string()],
            }],
        }
    }

    #[test]
    fn test_export_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run0.json");
        sample().write_to(&path).unwrap();
        let loaded = AnalysisExport::read_from(&path).unwrap();
        assert_eq!(loaded.modularity, 0.41);
        assert_eq!(loaded.random_seed, 99);
        assert_eq!(loaded.communities.len(), 1);
        assert_eq!(loaded.communities[0].community_name, "cryptography");
        assert_eq!(loaded.communities[0].authors.len(), 2);
    }

    #[test]
    fn test_export_field_names_are_stable() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("modularity").is_some());
        assert!(json.get("random_seed").is_some());
        let community = &json["communities"][0];
        for field in [
            "community_id",
            "community_name",
            "member_count",
            "keywords",
            "authors",
            "articles",
        ] {
            assert!(community.get(field).is_some(), "missing field {}", field);
        }
    }
}
