//! Cross-run stability analysis of community memberships.
//!
//! Community names are not guaranteed stable across randomized runs, so runs
//! are aligned through a manually curated name-to-canonical-index map. For
//! every pair of runs and every canonical community, membership overlap is
//! measured as intersection over union; the per-community mean over all pairs
//! quantifies how reproducible the partition is. A diagnostic tool, not part
//! of the analysis pipeline.

use crate::community::AnalysisExport;
use crate::logger;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Stability figures over N independent analysis runs.
#[derive(Debug)]
pub struct StabilityReport {
    /// Mean intersection-over-union per canonical community index.
    pub per_community: Vec<f64>,
    pub max_modularity: f64,
    /// Indices of the run(s) achieving the maximum modularity.
    pub best_runs: Vec<usize>,
    pub run_count: usize,
}

/// Loads the curated "community name,canonical index" CSV map.
pub fn load_name_map(path: &Path) -> Result<HashMap<String, usize>, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let mut map = HashMap::new();
    for line in content.lines() {
        let Some((name, index)) = line.rsplit_once(',') else {
            continue;
        };
        match index.trim().parse::<usize>() {
            Ok(index) => {
                map.insert(name.trim().to_string(), index);
            }
            Err(_) => logger::warn(&format!("Skipping unparseable name-map row: '{}'", line)),
        }
    }
    Ok(map)
}

/// Computes stability across the given runs.
///
/// Communities whose name is missing from `name_to_index` are logged and
/// skipped; they simply do not contribute members to any canonical slot.
pub fn analyze_stability(
    runs: &[AnalysisExport],
    name_to_index: &HashMap<String, usize>,
) -> StabilityReport {
    let community_count = name_to_index.values().max().map_or(0, |&max| max + 1);
    // Canonical membership sets per run.
    let samples: Vec<Vec<HashSet<&str>>> = runs
        .iter()
        .map(|run| {
            let mut slots: Vec<HashSet<&str>> = vec![HashSet::new(); community_count];
            for community in &run.communities {
                match name_to_index.get(&community.community_name) {
                    Some(&index) => {
                        slots[index].extend(community.authors.iter().map(String::as_str));
                    }
                    None => logger::warn(&format!(
                        "Community name '{}' is not in the canonical map; skipping",
                        community.community_name
                    )),
                }
            }
            slots
        })
        .collect();

    let mut sums = vec![0.0f64; community_count];
    let mut pair_count = 0usize;
    for i in 0..samples.len() {
        for j in (i + 1)..samples.len() {
            pair_count += 1;
            for community in 0..community_count {
                let a = &samples[i][community];
                let b = &samples[j][community];
                let union = a.union(b).count();
                if union == 0 {
                    continue;
                }
                let intersection = a.intersection(b).count();
                sums[community] += intersection as f64 / union as f64;
            }
        }
    }
    let per_community = sums
        .into_iter()
        .map(|sum| if pair_count > 0 { sum / pair_count as f64 } else { 0.0 })
        .collect();

    let max_modularity = runs
        .iter()
        .map(|run| run.modularity)
        .fold(f64::NEG_INFINITY, f64::max);
    let best_runs = runs
        .iter()
        .enumerate()
        .filter(|(_, run)| run.modularity == max_modularity)
        .map(|(index, _)| index)
        .collect();

    StabilityReport {
        per_community,
        max_modularity,
        best_runs,
        run_count: runs.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::CommunityExport;

    fn run(modularity: f64, communities: &[(&str, &[&str])]) -> AnalysisExport {
        AnalysisExport {
            modularity,
            random_seed: 0,
            communities: communities
                .iter()
                .enumerate()
                .map(|(id, (name, authors))| CommunityExport {
                    community_id: id,
                    community_name: name.to_string(),
                    member_count: authors.len(),
                    keywords: Vec::new(),
                    authors: authors.iter().map(|a| a.to_string()).collect(),
                    articles: Vec::new(),
                })
                .collect(),
        }
    }

    fn name_map() -> HashMap<String, usize> {
        let mut map = HashMap::new();
        map.insert("cryptography".to_string(), 0);
        map.insert("encryption schemes".to_string(), 0);
        map.insert("malware".to_string(), 1);
        map.insert("privacy".to_string(), 2);
        map
    }

    #[test]
    fn test_identical_membership_scores_one() {
        let runs = vec![
            run(0.40, &[("cryptography", &["1", "2"]), ("malware", &["3"]), ("privacy", &["4", "5"])]),
            run(0.42, &[("cryptography", &["1", "2"]), ("malware", &["3"]), ("privacy", &["9"])]),
        ];
        let report = analyze_stability(&runs, &name_map());
        // Community #0 and #1 have identical author sets across both runs.
        assert_eq!(report.per_community[0], 1.0);
        assert_eq!(report.per_community[1], 1.0);
        assert!(report.per_community[2] < 1.0);
    }

    #[test]
    fn test_partial_overlap_is_the_iou_ratio() {
        let runs = vec![
            run(0.40, &[("cryptography", &["1", "2", "3"])]),
            run(0.41, &[("cryptography", &["2", "3", "4"])]),
        ];
        let report = analyze_stability(&runs, &name_map());
        // |{2,3}| / |{1,2,3,4}| = 0.5
        assert_eq!(report.per_community[0], 0.5);
    }

    #[test]
    fn test_aliased_names_share_a_canonical_slot() {
        let runs = vec![
            run(0.40, &[("cryptography", &["1", "2"])]),
            run(0.41, &[("encryption schemes", &["1", "2"])]),
        ];
        let report = analyze_stability(&runs, &name_map());
        assert_eq!(report.per_community[0], 1.0);
    }

    #[test]
    fn test_unknown_names_are_skipped_not_fatal() {
        let runs = vec![
            run(0.40, &[("unheard of", &["1"])]),
            run(0.41, &[("unheard of", &["1"])]),
        ];
        let report = analyze_stability(&runs, &name_map());
        // Nothing landed in any slot; averages stay zero.
        assert!(report.per_community.iter().all(|&mean| mean == 0.0));
    }

    #[test]
    fn test_best_runs_report_max_modularity() {
        let runs = vec![
            run(0.40, &[("malware", &["1"])]),
            run(0.44, &[("malware", &["1"])]),
            run(0.44, &[("malware", &["1"])]),
        ];
        let report = analyze_stability(&runs, &name_map());
        assert_eq!(report.max_modularity, 0.44);
        assert_eq!(report.best_runs, vec![1, 2]);
        assert_eq!(report.run_count, 3);
    }

    #[test]
    fn test_three_runs_average_over_all_pairs() {
        let runs = vec![
            run(0.40, &[("cryptography", &["1", "2"])]),
            run(0.41, &[("cryptography", &["1", "2"])]),
            run(0.42, &[("cryptography", &["1", "3"])]),
        ];
        let report = analyze_stability(&runs, &name_map());
        // Pairs: (0,1)=1.0, (0,2)=1/3, (1,2)=1/3 → mean 5/9.
        let expected = (1.0 + 1.0 / 3.0 + 1.0 / 3.0) / 3.0;
        assert!((report.per_community[0] - expected).abs() < 1e-12);
    }
}
