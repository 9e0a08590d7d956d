use std::{collections::BTreeMap, fmt, net::IpAddr, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use url::Url;

use crate::error::{Error, Result};

/// Port the BRS peer API listens on when an address doesn't carry one.
pub const DEFAULT_P2P_PORT: u16 = 8123;

/// Country code recorded when geolocation yields nothing.
pub const UNKNOWN_COUNTRY: &str = "??";

/// Version recorded when a node doesn't report one.
pub const UNKNOWN_VERSION: &str = "Unknown";

// ===== struct peers::NodeAddress =============================================
///
/// Canonical identity of a node. Peers announce themselves in a handful of
/// shapes (`host`, `host:port`, `http://host`, `[::1]:8123`), all of which are
/// folded into host + explicit port here so that the same node reached
/// through different announcements is only scanned and drawn once.
///
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct NodeAddress {
    host: String,
    port: u16,
    secure: bool,
}

impl NodeAddress {
    pub fn parse(input: &str, default_port: u16) -> Result<NodeAddress> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid(input, "empty address"));
        }
        let with_scheme = if trimmed.contains("://") {
            trimmed.to_owned()
        } else {
            format!("http://{trimmed}")
        };

        let url = Url::parse(&with_scheme).map_err(|err| invalid(input, err.to_string()))?;
        let secure = match url.scheme() {
            "http" => false,
            "https" => true,
            other => return Err(invalid(input, format!("unsupported scheme {other:?}"))),
        };
        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_owned(),
            _ => return Err(invalid(input, "missing host")),
        };
        // `Url` hides ports equal to the scheme default, so `host:80` has to be
        // told apart from a bare `host` by looking at the authority itself
        let port = match url.port() {
            Some(port) => port,
            None if authority_has_port(&with_scheme) => {
                url.port_or_known_default().unwrap_or(default_port)
            }
            None => default_port,
        };

        Ok(NodeAddress { host, port, secure })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The host as an IP address, if it is a literal rather than a name.
    pub fn ip_literal(&self) -> Option<IpAddr> {
        self.host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse()
            .ok()
    }

    /// Base URL of the node's HTTP API.
    pub fn base_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.secure {
            write!(f, "https://")?;
        }
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for NodeAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        NodeAddress::parse(s, DEFAULT_P2P_PORT)
    }
}

fn invalid(address: &str, reason: impl Into<String>) -> Error {
    Error::InvalidAddress {
        address: address.to_owned(),
        reason: reason.into(),
    }
}

fn authority_has_port(url: &str) -> bool {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    match host_port.strip_prefix('[') {
        Some(bracketed) => bracketed
            .split_once(']')
            .is_some_and(|(_, tail)| tail.starts_with(':')),
        None => host_port.contains(':'),
    }
}

/// Approximate position of a node, in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// A node that answered the peer API during a scan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub address: NodeAddress,
    pub ip: Option<IpAddr>,
    pub country_code: String,
    pub location: Option<Location>,
    pub version: String,
    pub peers: Vec<NodeAddress>,
}

/// Outcome of probing one address.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Probe {
    Reachable(Node),
    Unreachable,
}

// ===== struct peers::ScanReport ==============================================
///
/// Everything one crawl learned, keyed by canonical address. Ordered so that
/// maps rendered from the same report are identical.
///
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub nodes: BTreeMap<NodeAddress, Probe>,
}

impl ScanReport {
    pub fn insert(&mut self, address: NodeAddress, probe: Probe) {
        self.nodes.insert(address, probe);
    }

    pub fn node(&self, address: &NodeAddress) -> Option<&Node> {
        match self.nodes.get(address) {
            Some(Probe::Reachable(node)) => Some(node),
            _ => None,
        }
    }

    pub fn reachable(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter_map(|probe| match probe {
            Probe::Reachable(node) => Some(node),
            Probe::Unreachable => None,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
