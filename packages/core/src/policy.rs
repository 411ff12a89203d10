//! Placement policy: numbered placements mapped to filter trees.
//!
//! Policies are loaded from JSON once per configuration load and turned into
//! [`NodeFilters`]. All validation happens here, at construction time; the
//! resulting filters cannot fail during evaluation.
//!
//! ```json
//! {
//!   "placements": [
//!     { "id": 10, "name": "eu", "filter": { "country": ["EU"] } },
//!     { "id": 11, "filter": { "all": [
//!         { "country": ["DE", "AT"] },
//!         { "annotation": { "key": "autoExcludeSubnet", "value": "off" } }
//!     ] } }
//!   ]
//! }
//! ```
//!
//! Placement `0` is the default placement. When a policy does not define it,
//! it selects every node. Any other placement the policy does not define
//! selects nothing.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::annotation::{with_annotation_shared, Annotation, ANNOTATION_LOCATION};
use crate::exclusion::{ExcludedIds, ExcludedNodeNetworks};
use crate::filter::{ExcludeAll, NodeFilter, NodeFilters};
use crate::geofence::CountryFilter;
use crate::location::{CountryCode, CountrySet};
use crate::types::{NodeId, NodeIdError};

/// The placement used when an upload does not ask for one.
pub const DEFAULT_PLACEMENT: u16 = 0;

/// Errors returned while loading a placement policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid country {0:?}; expected a two-letter code or a region (EU, EEA)")]
    InvalidCountry(String),

    #[error("invalid node id at index {index}: {source}")]
    InvalidNodeId {
        index: usize,
        #[source]
        source: NodeIdError,
    },

    #[error("annotation key must not be empty")]
    EmptyAnnotationKey,

    #[error("placement {0} is defined more than once")]
    DuplicatePlacement(u16),

    #[error("placement {id}: {source}")]
    Placement {
        id: u16,
        #[source]
        source: Box<PolicyError>,
    },
}

/// Declarative form of a filter tree, as written in policy files.
///
/// Serialises externally tagged, e.g. `{"country": ["DE"]}` or
/// `"exclude_all"`. Unknown tags and fields are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum FilterSpec {
    /// Two-letter codes and region names; an empty list matches nothing.
    Country(Vec<String>),
    /// Base58 node ids.
    ExcludeIds(Vec<String>),
    /// Network keys such as `"192.168.1.0"`.
    ExcludeNetworks(Vec<String>),
    All(Vec<FilterSpec>),
    Annotated {
        key: String,
        value: String,
        filter: Box<FilterSpec>,
    },
    Annotation {
        key: String,
        value: String,
    },
    ExcludeAll,
}

impl Default for FilterSpec {
    fn default() -> Self {
        FilterSpec::All(Vec::new())
    }
}

impl FilterSpec {
    /// Build the filter this spec describes.
    pub fn build(&self) -> Result<Arc<dyn NodeFilter>, PolicyError> {
        let filter: Arc<dyn NodeFilter> = match self {
            FilterSpec::Country(tokens) => Arc::new(CountryFilter::new(parse_countries(tokens)?)),
            FilterSpec::ExcludeIds(ids) => {
                let ids = ids
                    .iter()
                    .enumerate()
                    .map(|(index, raw)| {
                        raw.parse::<NodeId>()
                            .map_err(|source| PolicyError::InvalidNodeId { index, source })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Arc::new(ExcludedIds::new(ids))
            }
            FilterSpec::ExcludeNetworks(keys) => {
                Arc::new(ExcludedNodeNetworks::from_keys(keys.iter().cloned()))
            }
            FilterSpec::All(specs) => Arc::new(
                specs
                    .iter()
                    .map(FilterSpec::build)
                    .collect::<Result<NodeFilters, _>>()?,
            ),
            FilterSpec::Annotated { key, value, filter } => {
                require_key(key)?;
                Arc::new(with_annotation_shared(filter.build()?, key, value))
            }
            FilterSpec::Annotation { key, value } => {
                require_key(key)?;
                Arc::new(Annotation::new(key, value))
            }
            FilterSpec::ExcludeAll => Arc::new(ExcludeAll),
        };
        Ok(filter)
    }
}

fn require_key(key: &str) -> Result<(), PolicyError> {
    if key.is_empty() {
        return Err(PolicyError::EmptyAnnotationKey);
    }
    Ok(())
}

// Region names take precedence over country codes ("EU" is not a country).
fn parse_countries(tokens: &[String]) -> Result<CountrySet, PolicyError> {
    let mut set = CountrySet::default();
    for token in tokens {
        let token = token.trim();
        let members = match CountrySet::region(token) {
            Some(region) => region,
            None => match token.parse::<CountryCode>() {
                Ok(code) if !code.is_none() => CountrySet::new([code]),
                _ => return Err(PolicyError::InvalidCountry(token.to_string())),
            },
        };
        set = set.union(&members);
    }
    Ok(set)
}

/// On-disk policy document.
///
/// Unknown fields are errors: a misspelled `filter` must not turn into the
/// match-everything default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    #[serde(default)]
    pub placements: Vec<PlacementConfig>,
}

/// One placement entry in a [`PolicyConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlacementConfig {
    pub id: u16,

    /// Human-readable name; exposed through the `location` annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Missing means "every node".
    #[serde(default)]
    pub filter: FilterSpec,
}

/// A built placement.
#[derive(Debug, Clone)]
pub struct Placement {
    pub id: u16,
    pub name: Option<String>,
    pub filter: NodeFilters,
}

/// The set of placements a satellite knows about.
#[derive(Debug, Clone, Default)]
pub struct PlacementRules {
    placements: HashMap<u16, Placement>,
}

impl PlacementRules {
    /// Parse and build a JSON policy document.
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let config: PolicyConfig = serde_json::from_str(json)?;
        Self::build(&config)
    }

    /// Build every placement in `config`, failing on the first invalid one.
    pub fn build(config: &PolicyConfig) -> Result<Self, PolicyError> {
        let mut placements = HashMap::with_capacity(config.placements.len());
        for entry in &config.placements {
            if placements.contains_key(&entry.id) {
                return Err(PolicyError::DuplicatePlacement(entry.id));
            }
            let built = entry.filter.build().map_err(|e| PolicyError::Placement {
                id: entry.id,
                source: Box::new(e),
            })?;
            let filter = match &entry.name {
                Some(name) => NodeFilters::new().with_filter(with_annotation_shared(
                    built,
                    ANNOTATION_LOCATION,
                    name.as_str(),
                )),
                None => NodeFilters::new().with_shared(built),
            };
            tracing::debug!(placement = entry.id, filter = %filter, "built placement");
            placements.insert(
                entry.id,
                Placement {
                    id: entry.id,
                    name: entry.name.clone(),
                    filter,
                },
            );
        }
        tracing::debug!(placements = placements.len(), "loaded placement rules");
        Ok(Self { placements })
    }

    pub fn get(&self, id: u16) -> Option<&Placement> {
        self.placements.get(&id)
    }

    /// The filter for placement `id`.
    ///
    /// Undefined placements select nothing, except [`DEFAULT_PLACEMENT`],
    /// which selects everything.
    pub fn filter(&self, id: u16) -> NodeFilters {
        match self.placements.get(&id) {
            Some(placement) => placement.filter.clone(),
            None if id == DEFAULT_PLACEMENT => NodeFilters::new(),
            None => {
                tracing::warn!(placement = id, "unknown placement; excluding all nodes");
                NodeFilters::new().with_filter(ExcludeAll)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Placements ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &Placement> {
        let mut placements: Vec<&Placement> = self.placements.values().collect();
        placements.sort_by_key(|p| p.id);
        placements.into_iter()
    }
}

// --- tests -------------------------------------------------------------------
