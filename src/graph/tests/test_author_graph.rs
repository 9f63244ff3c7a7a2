#[cfg(test)]
mod tests {
    use crate::db::entities::Article;
    use crate::db::{Author, Database};
    use crate::graph::{build_author_graph, build_restricted_subgraph};

    /// Two authors; "456" cites "123"'s 2010 article from a 2015 article.
    fn citation_fixture() -> Database {
        let mut db = Database::default();
        let mut adams = Author::new("123");
        adams.surname = Some("Adams".to_string());
        db.add_author(adams);
        let mut zhang = Author::new("456");
        zhang.surname = Some("Zhang".to_string());
        db.add_author(zhang);

        let mut cited = Article::new(Some("2-s2.0-1".to_string()));
        cited.title = "Cited work".to_string();
        cited.first_author_surname = "Adams".to_string();
        cited.date = Some("2010-03-01".to_string());
        cited.authors.push("123".to_string());
        let keyword = db.add_keyword("graph theory");
        cited.keywords.insert(keyword);
        let cited_id = db.add_article(cited).unwrap();

        let mut citing = Article::new(Some("2-s2.0-2".to_string()));
        citing.title = "Citing work".to_string();
        citing.first_author_surname = "Zhang".to_string();
        citing.date = Some("2015-06-01".to_string());
        citing.authors.push("456".to_string());
        citing.references.insert(cited_id);
        db.add_article(citing).unwrap();

        db.update_author_article_records();
        db.update_article_citation_records();
        db
    }

    fn current_year() -> i32 {
        chrono::Utc::now().format("%Y").to_string().parse().unwrap()
    }

    #[test]
    fn test_full_window_produces_citation_edge() {
        let db = citation_fixture();
        let graph = build_author_graph(&db, 1945, current_year(), "", 1945);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.has_edge("456", "123"));
        // Undirected: visible from both endpoints.
        assert!(graph.has_edge("123", "456"));
    }

    #[test]
    fn test_narrow_window_drops_edge_to_filtered_author() {
        let db = citation_fixture();
        // 2014-2016 excludes the cited author's only article (2010); the
        // narrow-window rule must not re-introduce them through the citation.
        let graph = build_author_graph(&db, 2014, 2016, "", 1945);
        assert_eq!(graph.node_count(), 1);
        assert!(graph.contains("456"));
        assert!(!graph.contains("123"));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_narrow_window_keeps_edge_when_both_qualify() {
        let db = citation_fixture();
        let graph = build_author_graph(&db, 2009, 2016, "", 1945);
        assert_eq!(graph.node_count(), 2);
        assert!(graph.has_edge("456", "123"));
    }

    #[test]
    fn test_keyword_filter_limits_node_selection() {
        let db = citation_fixture();
        let graph = build_author_graph(&db, 1945, current_year(), "graph theory", 1945);
        // Only the cited article carries the keyword; its author qualifies,
        // and the citing author does not.
        assert!(graph.contains("123"));
        assert!(!graph.contains("456"));
    }

    #[test]
    fn test_unknown_keyword_yields_empty_graph() {
        let db = citation_fixture();
        let graph = build_author_graph(&db, 1945, current_year(), "nonexistent topic", 1945);
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn test_self_citation_produces_self_loop() {
        let mut db = Database::default();
        let mut author = Author::new("7");
        author.surname = Some("Solo".to_string());
        db.add_author(author);

        let mut earlier = Article::new(Some("2-s2.0-a".to_string()));
        earlier.title = "Earlier work".to_string();
        earlier.first_author_surname = "Solo".to_string();
        earlier.date = Some("2000".to_string());
        earlier.authors.push("7".to_string());
        let earlier_id = db.add_article(earlier).unwrap();

        let mut later = Article::new(Some("2-s2.0-b".to_string()));
        later.title = "Later work".to_string();
        later.first_author_surname = "Solo".to_string();
        later.date = Some("2005".to_string());
        later.authors.push("7".to_string());
        later.references.insert(earlier_id);
        db.add_article(later).unwrap();

        db.update_author_article_records();
        let graph = build_author_graph(&db, 1945, current_year(), "", 1945);
        assert_eq!(graph.node_count(), 1);
        assert!(graph.has_edge("7", "7"));
    }

    #[test]
    fn test_restricted_subgraph_keeps_edges_inside_subset() {
        let db = citation_fixture();
        let both = build_restricted_subgraph(
            &db,
            &["123".to_string(), "456".to_string()],
        );
        assert_eq!(both.node_count(), 2);
        assert!(both.has_edge("456", "123"));

        let only_citing = build_restricted_subgraph(&db, &["456".to_string()]);
        assert_eq!(only_citing.node_count(), 1);
        assert_eq!(only_citing.edge_count(), 0);
    }

    #[test]
    fn test_csv_exports_have_headers_and_rows() {
        let db = citation_fixture();
        let graph = build_author_graph(&db, 1945, current_year(), "", 1945);
        let mut nodes = Vec::new();
        graph.export_nodes_csv(&db, &mut nodes).unwrap();
        let nodes = String::from_utf8(nodes).unwrap();
        assert!(nodes.starts_with("Id,Label\n"));
        assert!(nodes.contains("123,\"Adams\""));

        let mut edges = Vec::new();
        graph.export_edges_csv(&mut edges).unwrap();
        let edges = String::from_utf8(edges).unwrap();
        assert!(edges.starts_with("Source,Target\n"));
        assert_eq!(edges.lines().count(), 2);
    }
}
