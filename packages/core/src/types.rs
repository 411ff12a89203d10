//! Node records as seen by the selection engine.
//!
//! [`SelectedNode`] is the read-only input to every filter: an identity, the
//! network key used for subnet diversity, the dial address, and the country
//! the node was geolocated to. Records come from the node directory; the
//! engine never mutates them.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{de, Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::location::CountryCode;

/// Errors returned when parsing a [`NodeId`] from its string form.
#[derive(Debug, Error, PartialEq)]
pub enum NodeIdError {
    #[error("node id is not valid base58: {0:?}")]
    InvalidEncoding(String),

    #[error("node id must decode to {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

const NODE_ID_LEN: usize = 32;

/// A 32-byte storage node identifier.
///
/// Serialises as a base58 string (e.g. `"US517G5965aydkZ46HS38QLi7UQiSojurfbQfKCELFx"`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId([u8; NODE_ID_LEN]);

impl NodeId {
    /// Length of a node id in bytes.
    pub const LEN: usize = NODE_ID_LEN;

    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    /// Generate a random id using the thread-local RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; Self::LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl FromStr for NodeId {
    type Err = NodeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = bs58::decode(s)
            .into_vec()
            .map_err(|_| NodeIdError::InvalidEncoding(s.to_string()))?;
        let bytes: [u8; Self::LEN] =
            raw.as_slice()
                .try_into()
                .map_err(|_| NodeIdError::InvalidLength {
                    expected: Self::LEN,
                    actual: raw.len(),
                })?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for NodeId {
    type Error = NodeIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.to_string()
    }
}

/// A candidate storage node, as handed to the filters.
///
/// ```json
/// {
///   "id": "US517G5965aydkZ46HS38QLi7UQiSojurfbQfKCELFx",
///   "last_net": "192.168.1.0",
///   "last_ip_port": "192.168.1.7:28967",
///   "country_code": "DE"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedNode {
    pub id: NodeId,

    /// Network key derived from the node's IP (typically the /24 subnet).
    /// Nodes sharing a key are treated as being on the same network.
    #[serde(default)]
    pub last_net: String,

    /// `ip:port` the node was last reached on. Not consulted by filters.
    #[serde(default)]
    pub last_ip_port: String,

    /// Geolocated country; [`CountryCode::NONE`] when unknown. Missing,
    /// `null` and `""` all mean unknown.
    #[serde(default, deserialize_with = "country_or_none")]
    pub country_code: CountryCode,
}

fn country_or_none<'de, D>(deserializer: D) -> Result<CountryCode, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(code) => code.parse::<CountryCode>().map_err(de::Error::custom),
        None => Ok(CountryCode::NONE),
    }
}

impl SelectedNode {
    /// A record with only the id set.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn with_last_net(mut self, last_net: impl Into<String>) -> Self {
        self.last_net = last_net.into();
        self
    }

    pub fn with_last_ip_port(mut self, last_ip_port: impl Into<String>) -> Self {
        self.last_ip_port = last_ip_port.into();
        self
    }

    pub fn with_country(mut self, country_code: CountryCode) -> Self {
        self.country_code = country_code;
        self
    }
}

// --- tests -------------------------------------------------------------------
