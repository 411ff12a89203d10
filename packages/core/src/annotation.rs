//! Key/value annotations on filter trees.
//!
//! Annotations let policy tooling label a filter (or a sub-tree) and later ask
//! which rule a tree implements, e.g. "this placement used the EU geofence".
//! They never change which nodes match.
//!
//! Lookup walks the tree depth-first in element order and the first answer
//! wins, so an annotation placed earlier in a composite shadows the same key
//! further down.

use std::fmt;
use std::sync::Arc;

use crate::filter::NodeFilter;
use crate::types::SelectedNode;

/// Key naming the placement a filter tree was built for.
pub const ANNOTATION_LOCATION: &str = "location";

/// Key controlling whether subnet diversity is enforced on top of the filter.
pub const ANNOTATION_AUTO_EXCLUDE_SUBNET: &str = "autoExcludeSubnet";

pub const AUTO_EXCLUDE_SUBNET_ON: &str = "on";
pub const AUTO_EXCLUDE_SUBNET_OFF: &str = "off";

/// A leaf that only carries a key/value pair. Always matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub key: String,
    pub value: String,
}

impl Annotation {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The [`ANNOTATION_AUTO_EXCLUDE_SUBNET`] marker.
    pub fn auto_exclude_subnets(enabled: bool) -> Self {
        let value = if enabled {
            AUTO_EXCLUDE_SUBNET_ON
        } else {
            AUTO_EXCLUDE_SUBNET_OFF
        };
        Self::new(ANNOTATION_AUTO_EXCLUDE_SUBNET, value)
    }
}

impl NodeFilter for Annotation {
    fn match_node(&self, _node: &SelectedNode) -> bool {
        true
    }

    fn annotation(&self, key: &str) -> Option<&str> {
        (key == self.key).then_some(self.value.as_str())
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "annotation({}={:?})", self.key, self.value)
    }
}

/// Attaches a key/value pair to another filter.
///
/// Matching is delegated to the inner filter unchanged; lookups for any other
/// key are forwarded to it.
#[derive(Clone)]
pub struct Annotated {
    key: String,
    value: String,
    filter: Arc<dyn NodeFilter>,
}

impl Annotated {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn inner(&self) -> &Arc<dyn NodeFilter> {
        &self.filter
    }
}

/// Wrap `filter` so that it answers `value` for `key`.
pub fn with_annotation(
    filter: impl NodeFilter + 'static,
    key: impl Into<String>,
    value: impl Into<String>,
) -> Annotated {
    with_annotation_shared(Arc::new(filter), key, value)
}

/// Like [`with_annotation`], for a filter that is already shared.
pub fn with_annotation_shared(
    filter: Arc<dyn NodeFilter>,
    key: impl Into<String>,
    value: impl Into<String>,
) -> Annotated {
    Annotated {
        key: key.into(),
        value: value.into(),
        filter,
    }
}

impl NodeFilter for Annotated {
    fn match_node(&self, node: &SelectedNode) -> bool {
        self.filter.match_node(node)
    }

    fn annotation(&self, key: &str) -> Option<&str> {
        if key == self.key {
            return Some(self.value.as_str());
        }
        self.filter.annotation(key)
    }
}

impl fmt::Display for Annotated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "annotated({}={:?}, {})", self.key, self.value, self.filter)
    }
}

impl fmt::Debug for Annotated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Annotated({self})")
    }
}

/// Whether callers should enforce subnet diversity for nodes selected by
/// `filter`. On unless the tree says `autoExcludeSubnet = off`.
pub fn auto_exclude_subnets(filter: &dyn NodeFilter) -> bool {
    filter.annotation(ANNOTATION_AUTO_EXCLUDE_SUBNET) != Some(AUTO_EXCLUDE_SUBNET_OFF)
}

// --- tests -------------------------------------------------------------------
