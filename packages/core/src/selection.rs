//! Running a filter over a snapshot of nodes.
//!
//! Filters carry no state, so a pass is a plain scan. [`select_parallel`]
//! fans the scan across scoped threads sharing the same filter tree; the
//! result is the same as [`select`], in the same order.

use std::num::NonZeroUsize;
use std::panic;
use std::thread;

use crate::filter::NodeFilter;
use crate::types::SelectedNode;

/// The nodes that match `filter`, in input order.
pub fn select<'a>(filter: &dyn NodeFilter, nodes: &'a [SelectedNode]) -> Vec<&'a SelectedNode> {
    let selected: Vec<&SelectedNode> = nodes.iter().filter(|n| filter.match_node(n)).collect();
    tracing::trace!(
        nodes = nodes.len(),
        selected = selected.len(),
        "selection pass"
    );
    selected
}

/// How many of `nodes` match `filter`.
pub fn count_matching(filter: &dyn NodeFilter, nodes: &[SelectedNode]) -> usize {
    nodes.iter().filter(|n| filter.match_node(n)).count()
}

/// Upper bound on [`select_parallel`] workers: the machine's available
/// parallelism, or 1 when it cannot be determined.
pub fn max_workers() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// [`select`] split over `workers` threads. `0` is treated as `1`, and
/// requests above [`max_workers`] are capped to it.
///
/// Each worker scans one contiguous chunk; chunks are concatenated in order,
/// so the output is identical to the sequential scan.
pub fn select_parallel<'a>(
    filter: &dyn NodeFilter,
    nodes: &'a [SelectedNode],
    workers: usize,
) -> Vec<&'a SelectedNode> {
    select_with_limit(filter, nodes, workers, max_workers())
}

fn select_with_limit<'a>(
    filter: &dyn NodeFilter,
    nodes: &'a [SelectedNode],
    workers: usize,
    limit: usize,
) -> Vec<&'a SelectedNode> {
    let workers = workers.clamp(1, limit.max(1));
    if workers == 1 || nodes.len() < 2 {
        return select(filter, nodes);
    }

    let chunk_size = nodes.len().div_ceil(workers);
    tracing::debug!(
        nodes = nodes.len(),
        workers,
        chunk_size,
        "parallel selection pass"
    );

    thread::scope(|scope| {
        let handles: Vec<_> = nodes
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || select(filter, chunk)))
            .collect();

        let mut selected = Vec::with_capacity(nodes.len());
        for handle in handles {
            // A panicking predicate is re-raised on the caller's thread.
            selected.extend(handle.join().unwrap_or_else(|p| panic::resume_unwind(p)));
        }
        selected
    })
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{ExcludeAll, NodeFilterFunc, NodeFilters};
    use crate::location::{self, CountrySet};
    use crate::types::NodeId;

    fn nodes(n: usize) -> Vec<SelectedNode> {
        let countries = [
            location::GERMANY,
            location::UNITED_STATES,
            location::CountryCode::NONE,
        ];
        (0..n)
            .map(|i| {
                SelectedNode::new(NodeId::generate())
                    .with_last_net(format!("10.0.{}.0", i % 7))
                    .with_country(countries[i % countries.len()])
            })
            .collect()
    }

    #[test]
    fn select_keeps_order() {
        let nodes = nodes(30);
        let filter = NodeFilters::new().with_country_filter(CountrySet::new([location::GERMANY]));
        let selected = select(&filter, &nodes);
        assert_eq!(selected.len(), 10);
        let expected: Vec<&SelectedNode> = nodes.iter().step_by(3).collect();
        assert_eq!(selected, expected);
        assert_eq!(count_matching(&filter, &nodes), 10);
    }

    #[test]
    fn empty_filter_selects_all() {
        let nodes = nodes(5);
        assert_eq!(select(&NodeFilters::new(), &nodes).len(), 5);
        assert!(select(&ExcludeAll, &nodes).is_empty());
    }

    #[test]
    fn parallel_matches_sequential() {
        let nodes = nodes(1000);
        let filter = NodeFilters::new()
            .with_excluded_networks(&nodes[..2])
            .with_filter(NodeFilterFunc(|n: &SelectedNode| n.id.as_bytes()[0] % 2 == 0));
        let sequential = select(&filter, &nodes);
        for workers in [0, 1, 2, 3, 8, 2000] {
            assert_eq!(select_parallel(&filter, &nodes, workers), sequential, "workers = {workers}");
        }
    }

    #[test]
    fn huge_worker_counts_are_capped() {
        let nodes = nodes(200);
        let filter = NodeFilters::new().with_country_filter(CountrySet::new([location::GERMANY]));
        let sequential = select(&filter, &nodes);
        assert_eq!(select_parallel(&filter, &nodes, usize::MAX), sequential);
        assert_eq!(select_parallel(&filter, &nodes, 100_000), sequential);
        // One thread per node would be 200 threads; the limit keeps it at 4.
        assert_eq!(select_with_limit(&filter, &nodes, 100_000, 4), sequential);
        assert_eq!(select_with_limit(&filter, &nodes, 8, 0), sequential);
    }

    #[test]
    fn max_workers_is_positive() {
        assert!(max_workers() >= 1);
    }

    #[test]
    fn parallel_on_empty_input() {
        assert!(select_parallel(&NodeFilters::new(), &[], 4).is_empty());
    }
}
