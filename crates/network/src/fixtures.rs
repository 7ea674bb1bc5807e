//! Demo network used by the server and the CLI.

use crate::graph::{Company, CompanyCategory, NetworkGraph};

/// Six companies from farm to retail, linked by five routes.
pub fn demo_network() -> NetworkGraph {
    let companies = [
        ("farm1", "Green Valley Farm", CompanyCategory::Supplier, (10.0, 10.0)),
        ("factory1", "Processing Plant A", CompanyCategory::Manufacturer, (30.0, 20.0)),
        ("factory2", "Packaging Corp", CompanyCategory::Manufacturer, (50.0, 25.0)),
        ("dist1", "Regional Distributor", CompanyCategory::Distributor, (70.0, 30.0)),
        ("retail1", "SuperMart", CompanyCategory::Retailer, (90.0, 40.0)),
        ("retail2", "Corner Store", CompanyCategory::Retailer, (85.0, 15.0)),
    ];
    // (from, to, cost, time, distance)
    let routes = [
        ("farm1", "factory1", 5.0, 2.0, 25.0),
        ("factory1", "factory2", 8.0, 1.0, 20.0),
        ("factory2", "dist1", 12.0, 3.0, 22.0),
        ("dist1", "retail1", 6.0, 1.0, 25.0),
        ("dist1", "retail2", 4.0, 1.0, 18.0),
    ];

    let mut graph = NetworkGraph::new();
    for (id, name, category, location) in companies {
        graph.add_node(Company::new(id, name, category, location));
    }
    for (from, to, cost, time, distance) in routes {
        graph
            .add_edge(from, to, cost, time, distance)
            .expect("demo routes reference demo companies");
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_network_shape() {
        let g = demo_network();
        assert_eq!(g.node_count(), 6);
        assert_eq!(g.edge_count(), 5);
        assert_eq!(g.company("retail2").unwrap().name, "Corner Store");
    }
}
