//! Node selection filters for storage placement.
//!
//! This crate decides, for each storage node known to the satellite, whether
//! it is eligible for a placement: outside the subnets already used by a
//! segment, not explicitly excluded, inside a geofenced region, and so on.
//! Filters compose into trees, carry key/value annotations that policy tooling
//! can query, and are cheap enough to evaluate against every node on every
//! upload.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | Node records: [`SelectedNode`], [`NodeId`] |
//! | [`location`] | [`CountryCode`], [`CountrySet`], EU/EEA regions |
//! | [`filter`] | The [`NodeFilter`] capability and the [`NodeFilters`] AND-composite |
//! | [`exclusion`] | [`ExcludedIds`] and [`ExcludedNodeNetworks`] |
//! | [`geofence`] | [`CountryFilter`] |
//! | [`annotation`] | [`Annotated`], [`Annotation`], [`with_annotation`] |
//! | [`selection`] | Scanning node snapshots, sequentially or across threads |
//! | [`policy`] | JSON placement policies: [`PlacementRules`] |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use nodeselection::{with_annotation, location, CountrySet, NodeFilter, NodeFilters};
//!
//! let eu = with_annotation(
//!     NodeFilters::new()
//!         .with_excluded_networks(&already_selected)
//!         .with_country_filter(CountrySet::new(location::EU_COUNTRIES)),
//!     "location",
//!     "eu",
//! );
//!
//! let candidates = nodeselection::select(&eu, &nodes);
//! assert_eq!(eu.annotation("location"), Some("eu"));
//! ```

pub mod annotation;
pub mod exclusion;
pub mod filter;
pub mod geofence;
pub mod location;
pub mod policy;
pub mod selection;
pub mod types;

pub use annotation::{auto_exclude_subnets, with_annotation, Annotated, Annotation};
pub use exclusion::{ExcludedIds, ExcludedNodeNetworks};
pub use filter::{ExcludeAll, NodeFilter, NodeFilterFunc, NodeFilters};
pub use geofence::CountryFilter;
pub use location::{CountryCode, CountryCodeError, CountrySet};
pub use policy::{FilterSpec, Placement, PlacementRules, PolicyConfig, PolicyError};
pub use selection::{count_matching, max_workers, select, select_parallel};
pub use types::{NodeId, NodeIdError, SelectedNode};
