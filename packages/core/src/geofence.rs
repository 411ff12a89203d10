//! Geofencing: restrict eligible nodes to a set of countries.

use std::fmt;

use crate::filter::NodeFilter;
use crate::location::CountrySet;
use crate::types::SelectedNode;

/// Matches nodes whose country is known and in the set.
///
/// A node that was never geolocated ([`CountryCode::NONE`]) matches no
/// geofence, whatever the set contains. An empty set matches nothing.
///
/// [`CountryCode::NONE`]: crate::location::CountryCode::NONE
#[derive(Debug, Clone, Default)]
pub struct CountryFilter {
    countries: CountrySet,
}

impl CountryFilter {
    pub fn new(countries: CountrySet) -> Self {
        Self { countries }
    }

    pub fn countries(&self) -> &CountrySet {
        &self.countries
    }
}

impl NodeFilter for CountryFilter {
    fn match_node(&self, node: &SelectedNode) -> bool {
        !node.country_code.is_none() && self.countries.contains(node.country_code)
    }
}

impl fmt::Display for CountryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("country(")?;
        for (i, code) in self.countries.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{code}")?;
        }
        f.write_str(")")
    }
}

// --- tests -------------------------------------------------------------------
