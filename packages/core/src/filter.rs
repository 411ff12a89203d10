//! The filter capability and its AND-composite.
//!
//! A [`NodeFilter`] answers two independent questions about itself: does a
//! node match, and what value (if any) is annotated under a key. Filters are
//! built once from policy and shared read-only across selection passes and
//! threads, so every implementor is `Send + Sync` and evaluation takes `&self`.
//!
//! [`NodeFilters`] is an ordered list of filters that matches when all of its
//! elements match. It is itself a filter, so composites nest to any depth.
//! Builder methods never touch the receiver; they return a new composite that
//! shares the existing elements.

use std::fmt;
use std::sync::Arc;

use crate::annotation::Annotation;
use crate::exclusion::{ExcludedIds, ExcludedNodeNetworks};
use crate::geofence::CountryFilter;
use crate::location::CountrySet;
use crate::types::{NodeId, SelectedNode};

/// Decides whether a node is eligible, and carries optional key/value
/// annotations.
///
/// The two methods are orthogonal: annotations never influence matching.
/// `Display` renders a compact, human-readable form of the filter.
pub trait NodeFilter: fmt::Display + Send + Sync {
    /// Whether `node` passes this filter. Must be pure.
    fn match_node(&self, node: &SelectedNode) -> bool;

    /// The value annotated under `key`, if any.
    fn annotation(&self, _key: &str) -> Option<&str> {
        None
    }
}

/// An ordered AND-composite of filters.
///
/// An empty composite matches every node.
#[derive(Clone, Default)]
pub struct NodeFilters {
    filters: Vec<Arc<dyn NodeFilter>>,
}

impl NodeFilters {
    /// The empty composite.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Elements in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn NodeFilter>> {
        self.filters.iter()
    }

    /// A new composite with `filter` appended.
    pub fn with_filter(&self, filter: impl NodeFilter + 'static) -> Self {
        self.with_shared(Arc::new(filter))
    }

    /// A new composite with an already shared filter appended.
    pub fn with_shared(&self, filter: Arc<dyn NodeFilter>) -> Self {
        let mut filters = Vec::with_capacity(self.filters.len() + 1);
        filters.extend(self.filters.iter().cloned());
        filters.push(filter);
        Self { filters }
    }

    /// A new composite that additionally excludes the given node ids.
    pub fn with_excluded_ids(&self, ids: impl IntoIterator<Item = NodeId>) -> Self {
        self.with_filter(ExcludedIds::new(ids))
    }

    /// A new composite that additionally excludes every node sharing a
    /// network with one of `nodes`.
    pub fn with_excluded_networks(&self, nodes: &[SelectedNode]) -> Self {
        self.with_filter(ExcludedNodeNetworks::new(nodes))
    }

    /// A new composite that additionally requires the node's country to be
    /// known and in `countries`.
    pub fn with_country_filter(&self, countries: CountrySet) -> Self {
        self.with_filter(CountryFilter::new(countries))
    }

    /// A new composite carrying an annotation marker.
    pub fn with_annotation(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_filter(Annotation::new(key, value))
    }

    /// A new composite marking whether callers should also enforce subnet
    /// diversity among the selected nodes.
    pub fn with_auto_exclude_subnets(&self, enabled: bool) -> Self {
        self.with_filter(Annotation::auto_exclude_subnets(enabled))
    }
}

impl NodeFilter for NodeFilters {
    fn match_node(&self, node: &SelectedNode) -> bool {
        self.filters.iter().all(|f| f.match_node(node))
    }

    // Depth-first, first answer wins.
    fn annotation(&self, key: &str) -> Option<&str> {
        self.filters.iter().find_map(|f| f.annotation(key))
    }
}

impl FromIterator<Arc<dyn NodeFilter>> for NodeFilters {
    fn from_iter<I: IntoIterator<Item = Arc<dyn NodeFilter>>>(iter: I) -> Self {
        Self {
            filters: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for NodeFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("all(")?;
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{filter}")?;
        }
        f.write_str(")")
    }
}

impl fmt::Debug for NodeFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeFilters({self})")
    }
}

/// A filter backed by an arbitrary predicate.
pub struct NodeFilterFunc<F>(pub F);

impl<F> NodeFilter for NodeFilterFunc<F>
where
    F: Fn(&SelectedNode) -> bool + Send + Sync,
{
    fn match_node(&self, node: &SelectedNode) -> bool {
        (self.0)(node)
    }
}

impl<F> fmt::Display for NodeFilterFunc<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("func")
    }
}

/// Matches no node at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExcludeAll;

impl NodeFilter for ExcludeAll {
    fn match_node(&self, _node: &SelectedNode) -> bool {
        false
    }
}

impl fmt::Display for ExcludeAll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("exclude_all")
    }
}

// --- tests -------------------------------------------------------------------
