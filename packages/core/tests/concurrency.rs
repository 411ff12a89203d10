//! Shared filter trees evaluated from many threads at once.

use std::sync::{Arc, Barrier};
use std::thread;

use nodeselection::location::{self, CountryCode};
use nodeselection::{
    select, select_parallel, with_annotation, CountrySet, NodeFilter, NodeFilters, NodeId,
    PlacementRules, SelectedNode,
};

fn generated_nodes(count: usize) -> Vec<SelectedNode> {
    let countries = [
        CountryCode::NONE,
        location::UNITED_STATES,
        location::GERMANY,
        location::HUNGARY,
        location::AUSTRIA,
    ];
    (0..count)
        .map(|i| {
            SelectedNode::new(NodeId::generate())
                .with_last_net(format!("192.168.{}.0", i % 256))
                .with_last_ip_port(format!("192.168.{}.{}:{}", i % 256, i % 250, i % 1000 + 1000))
                .with_country(countries[i % countries.len()])
        })
        .collect()
}

fn policy_filter(nodes: &[SelectedNode]) -> Arc<dyn NodeFilter> {
    let filters = NodeFilters::new()
        .with_excluded_ids(nodes.iter().step_by(11).map(|n| n.id))
        .with_excluded_networks(&nodes[..16])
        .with_country_filter(CountrySet::new(location::EU_COUNTRIES));
    Arc::new(with_annotation(filters, "location", "eu"))
}

#[test]
fn concurrent_evaluation_matches_sequential() {
    let nodes = Arc::new(generated_nodes(5_000));
    let filter = policy_filter(&nodes);
    let expected: Vec<bool> = nodes.iter().map(|n| filter.match_node(n)).collect();
    let expected = Arc::new(expected);

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let nodes = Arc::clone(&nodes);
            let filter = Arc::clone(&filter);
            let expected = Arc::clone(&expected);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                // Each thread walks the full set from a different offset so
                // that threads overlap on the same nodes.
                for step in 0..nodes.len() {
                    let i = (step + t * 613) % nodes.len();
                    assert_eq!(filter.match_node(&nodes[i]), expected[i], "node {i}");
                }
                assert_eq!(filter.annotation("location"), Some("eu"));
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked");
    }
}

#[test]
fn parallel_selection_matches_sequential() {
    let nodes = generated_nodes(2_500);
    let filter = policy_filter(&nodes);
    let sequential = select(filter.as_ref(), &nodes);
    assert!(!sequential.is_empty());
    for workers in [2, 4, 7, 16] {
        assert_eq!(select_parallel(filter.as_ref(), &nodes, workers), sequential);
    }
}

#[test]
fn policy_filters_are_shareable() {
    let rules = Arc::new(
        PlacementRules::from_json(
            r#"{"placements": [
                {"id": 10, "name": "eu", "filter": {"country": ["EU"]}},
                {"id": 11, "filter": {"all": [{"country": ["US"]}, {"exclude_networks": ["192.168.1.0"]}]}}
            ]}"#,
        )
        .expect("valid policy"),
    );
    let nodes = Arc::new(generated_nodes(1_000));

    let handles: Vec<_> = [10u16, 11, 12, 0]
        .into_iter()
        .map(|placement| {
            let rules = Arc::clone(&rules);
            let nodes = Arc::clone(&nodes);
            thread::spawn(move || (placement, select(&rules.filter(placement), &nodes).len()))
        })
        .collect();

    for handle in handles {
        let (placement, selected) = handle.join().expect("worker panicked");
        match placement {
            // Germany, Hungary, Austria: three of every five nodes.
            10 => assert_eq!(selected, 600),
            // US nodes are i % 5 == 1; i % 256 == 1 is excluded.
            11 => assert!(selected > 0 && selected < 200),
            12 => assert_eq!(selected, 0),
            0 => assert_eq!(selected, 1_000),
            _ => unreachable!(),
        }
    }
}
