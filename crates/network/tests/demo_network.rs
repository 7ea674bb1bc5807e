use tracechain_network::{fixtures, NetworkError, PathFinder, VulnerabilityAnalyzer, WeightKey};

#[test]
fn test_demo_shortest_paths_per_weight() {
    let network = fixtures::demo_network();
    let finder = PathFinder::new(&network);

    let expected = [
        (WeightKey::Cost, 29.0),
        (WeightKey::Time, 7.0),
        (WeightKey::Distance, 85.0),
    ];
    for (key, total) in expected {
        let route = finder.shortest_path("farm1", "retail2", key).unwrap();
        assert_eq!(
            route.path,
            vec!["farm1", "factory1", "factory2", "dist1", "retail2"]
        );
        assert_eq!(route.total, total, "total for {}", key);
    }
}

#[test]
fn test_demo_has_no_way_back_upstream() {
    let network = fixtures::demo_network();
    let route = PathFinder::new(&network)
        .shortest_path("retail1", "farm1", WeightKey::Cost)
        .unwrap();
    assert!(!route.is_found());
}

#[test]
fn test_demo_unknown_endpoint() {
    let network = fixtures::demo_network();
    let err = PathFinder::new(&network)
        .shortest_path("farm1", "warehouse9", WeightKey::Time)
        .unwrap_err();
    assert_eq!(err, NetworkError::NodeNotFound("warehouse9".into()));
}

#[test]
fn test_demo_vulnerabilities() {
    let network = fixtures::demo_network();
    let analyzer = VulnerabilityAnalyzer::new(&network);

    assert_eq!(
        analyzer.articulation_points(),
        vec!["factory1", "factory2", "dist1"]
    );

    let names: Vec<String> = analyzer
        .detect_vulnerabilities()
        .into_iter()
        .map(|v| v.name)
        .collect();
    assert_eq!(
        names,
        vec!["Processing Plant A", "Packaging Corp", "Regional Distributor"]
    );
}

#[test]
fn test_adding_a_bypass_removes_a_cut_vertex() {
    let mut network = fixtures::demo_network();
    network
        .add_edge("factory1", "dist1", 20.0, 4.0, 40.0)
        .unwrap();

    let points = VulnerabilityAnalyzer::new(&network).articulation_points();
    assert_eq!(points, vec!["factory1", "dist1"]);

    let all = PathFinder::new(&network)
        .all_simple_paths("farm1", "retail1")
        .unwrap();
    assert_eq!(all.len(), 2);
}
