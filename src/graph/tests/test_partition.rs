#[cfg(test)]
mod tests {
    use crate::db::entities::Article;
    use crate::db::{Author, Database};
    use crate::graph::partition::level_size_threshold;
    use crate::graph::{
        build_author_graph, induced_graph, partition, partition_tree, AuthorGraph,
        PartitionError, RecursionPolicy, SeedPolicy,
    };
    use std::collections::HashSet;

    /// Two triangles joined by a single bridge edge.
    fn two_triangles() -> AuthorGraph {
        let mut graph = AuthorGraph::new();
        let ids: Vec<usize> = (0..6).map(|i| graph.add_node(&format!("{}", i))).collect();
        for &(a, b) in &[(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5)] {
            graph.add_edge(ids[a], ids[b]);
        }
        graph.add_edge(ids[2], ids[3]);
        graph
    }

    #[test]
    fn test_partition_splits_two_triangles() {
        let graph = two_triangles();
        let result = partition(&graph, SeedPolicy::Seed(42), None).unwrap();
        assert!(result.community_count >= 2);
        // The dense triangle members end up together.
        assert_eq!(result.assignment["0"], result.assignment["1"]);
        assert_eq!(result.assignment["1"], result.assignment["2"]);
        assert_eq!(result.assignment["3"], result.assignment["4"]);
        assert_eq!(result.assignment["4"], result.assignment["5"]);
        assert_ne!(result.assignment["0"], result.assignment["3"]);
        assert!(result.modularity > 0.0);
    }

    #[test]
    fn test_partition_codomain_is_dense_and_total() {
        let graph = two_triangles();
        let result = partition(&graph, SeedPolicy::Default, None).unwrap();
        // Total: every node mapped exactly once.
        assert_eq!(result.assignment.len(), graph.node_count());
        // Dense: ids are exactly {0, ..., max}.
        let used: HashSet<usize> = result.assignment.values().copied().collect();
        let max = *used.iter().max().unwrap();
        assert_eq!(used.len(), max + 1);
        assert_eq!(result.community_count, max + 1);
        for id in 0..=max {
            assert!(used.contains(&id));
        }
    }

    #[test]
    fn test_same_seed_reproduces_mapping_and_modularity() {
        let graph = two_triangles();
        let first = partition(&graph, SeedPolicy::Seed(7), None).unwrap();
        let second = partition(&graph, SeedPolicy::Seed(7), None).unwrap();
        assert_eq!(first.assignment, second.assignment);
        assert_eq!(first.modularity, second.modularity);
        assert_eq!(first.seed, 7);
    }

    #[test]
    fn test_default_policy_is_reproducible_too() {
        let graph = two_triangles();
        let first = partition(&graph, SeedPolicy::Default, None).unwrap();
        let second = partition(&graph, SeedPolicy::Default, None).unwrap();
        assert_eq!(first.assignment, second.assignment);
        assert_eq!(first.seed, second.seed);
    }

    #[test]
    fn test_zero_edge_graph_partitions_into_singletons() {
        let mut graph = AuthorGraph::new();
        for i in 0..3 {
            graph.add_node(&format!("{}", i));
        }
        let result = partition(&graph, SeedPolicy::Default, None).unwrap();
        assert_eq!(result.community_count, 3);
        assert_eq!(result.modularity, 0.0);
        let used: HashSet<usize> = result.assignment.values().copied().collect();
        assert_eq!(used.len(), 3);
    }

    #[test]
    fn test_empty_graph_partitions_without_error() {
        let graph = AuthorGraph::new();
        let result = partition(&graph, SeedPolicy::Default, None).unwrap();
        assert_eq!(result.community_count, 0);
        assert!(result.assignment.is_empty());
    }

    #[test]
    fn test_modularity_threshold_reports_structured_failure() {
        // A single edge cannot beat a 0.3 modularity threshold.
        let mut graph = AuthorGraph::new();
        let a = graph.add_node("1");
        let b = graph.add_node("2");
        graph.add_edge(a, b);
        let result = partition(&graph, SeedPolicy::Default, Some(0.3));
        match result {
            Err(PartitionError::BelowThreshold { threshold, .. }) => {
                assert_eq!(threshold, 0.3);
            }
            other => panic!("expected BelowThreshold, got {:?}", other.map(|r| r.modularity)),
        }
    }

    #[test]
    fn test_induced_graph_aggregates_inter_community_weight() {
        let graph = two_triangles();
        let result = partition(&graph, SeedPolicy::Seed(42), None).unwrap();
        let meta = induced_graph(&graph, &result);
        assert_eq!(meta.len(), result.community_count);
        let c0 = result.assignment["0"];
        let c1 = result.assignment["3"];
        // Exactly the bridge edge connects the two communities.
        assert_eq!(meta[c0].get(&c1).copied().unwrap_or(0.0), 1.0);
        // Intra-community weight sits on the diagonal (ordered-pair sum).
        assert_eq!(meta[c0].get(&c0).copied().unwrap_or(0.0), 6.0);
    }

    #[test]
    fn test_level_size_threshold_divides_per_level() {
        assert_eq!(level_size_threshold(75, 4, 0), 75);
        assert_eq!(level_size_threshold(75, 4, 1), 18);
        assert_eq!(level_size_threshold(75, 4, 2), 4);
    }

    /// Database fixture mirroring the two-triangle topology through real
    /// citations, so the recursive tree can rebuild restricted sub-graphs.
    fn triangle_database() -> Database {
        let mut db = Database::default();
        for i in 0..6 {
            db.add_author(Author::new(format!("{}", i)));
        }
        // Dissimilar titles keep the fuzzy resolver from merging same-author
        // same-year fixtures.
        let cited_titles = [
            "Spectral partitions of sparse graphs",
            "Taxonomy of packed malware",
            "Pairings on elliptic curves",
            "Limits of anomaly detection",
            "Fuzzing compiler backends",
            "Quantum key agreement",
            "Verified microkernel design",
        ];
        let citing_titles = [
            "Community structure in networks",
            "Botnet takedown economics",
            "Lattice based signatures",
            "Alert correlation at scale",
            "Symbolic execution revisited",
            "Post quantum migration",
            "Formal proofs for schedulers",
        ];
        let pairs = [(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5), (2, 3)];
        for (n, &(citing, cited)) in pairs.iter().enumerate() {
            let mut cited_article = Article::new(Some(format!("2-s2.0-c{}", n)));
            cited_article.title = cited_titles[n].to_string();
            cited_article.first_author_surname = format!("S{}", cited);
            cited_article.date = Some("2010".to_string());
            cited_article.authors.push(format!("{}", cited));
            let cited_id = db.add_article(cited_article).unwrap();

            let mut citing_article = Article::new(Some(format!("2-s2.0-r{}", n)));
            citing_article.title = citing_titles[n].to_string();
            citing_article.first_author_surname = format!("S{}", citing);
            citing_article.date = Some("2012".to_string());
            citing_article.authors.push(format!("{}", citing));
            citing_article.references.insert(cited_id);
            db.add_article(citing_article).unwrap();
        }
        db.update_author_article_records();
        db.update_article_citation_records();
        db
    }

    #[test]
    fn test_partition_tree_recurses_into_large_communities() {
        let db = triangle_database();
        let graph = build_author_graph(
            &db,
            1945,
            chrono::Utc::now().format("%Y").to_string().parse().unwrap(),
            "",
            1945,
        );
        assert_eq!(graph.node_count(), 6);
        let policy = RecursionPolicy {
            max_depth: 1,
            base_size_threshold: 3,
            size_threshold_divider: 4,
        };
        let tree = partition_tree(&db, &graph, SeedPolicy::Seed(42), None, policy).unwrap();
        assert_eq!(tree.level, 0);
        assert!(!tree.children.is_empty(), "triangles meet the size threshold");
        for child in tree.children.values() {
            assert_eq!(child.level, 1);
            assert!(child.children.is_empty(), "depth is bounded");
            // Sub-partition is total over its community's members.
            assert!(child.result.assignment.len() >= 3);
        }
    }

    #[test]
    fn test_partition_tree_respects_size_threshold() {
        let db = triangle_database();
        let graph = build_author_graph(
            &db,
            1945,
            chrono::Utc::now().format("%Y").to_string().parse().unwrap(),
            "",
            1945,
        );
        let policy = RecursionPolicy {
            max_depth: 2,
            base_size_threshold: 100,
            size_threshold_divider: 4,
        };
        let tree = partition_tree(&db, &graph, SeedPolicy::Seed(42), None, policy).unwrap();
        assert!(tree.children.is_empty(), "no community reaches 100 members");
    }
}
