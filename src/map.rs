use std::collections::HashMap;

use tracing::debug;

use crate::{
    config::MapConfig,
    links::{self, Link},
    peers::{Location, Node, NodeAddress, ScanReport},
    version,
};

// ===== struct map::Color =====================================================
///
/// A node's color. Derived from a hash of its address so the same node keeps
/// its color across runs.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub fn for_address(address: &NodeAddress) -> Color {
        let hash = blake2s_simd::Params::new()
            .hash_length(3)
            .hash(address.to_string().as_bytes());
        let bytes = hash.as_bytes();
        Color {
            red: bytes[0],
            green: bytes[1],
            blue: bytes[2],
        }
    }

    /// KML writes colors as `aabbggrr`; map colors are always opaque.
    pub fn to_kml(self) -> String {
        format!("ff{:02x}{:02x}{:02x}", self.blue, self.green, self.red)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeStyle {
    pub id: String,
    pub color: Color,
}

/// One placed node.
#[derive(Clone, Debug, PartialEq)]
pub struct Placemark {
    pub address: NodeAddress,
    pub style_id: String,
    pub location: Location,
    pub version: String,
    pub peer_count: usize,
}

/// One drawn link, styled after its first endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkPath {
    pub link: Link,
    pub style_id: String,
    pub from: Location,
    pub to: Location,
}

// ===== struct map::MapDocument ===============================================
///
/// The map as it will be written: a style and placemark per located node and
/// a path per link between two located nodes. Building it is pure; writing it
/// is left to `kml` and `kmz`.
///
#[derive(Clone, Debug, PartialEq)]
pub struct MapDocument {
    pub name: String,
    pub icon_href: String,
    pub line_width: u32,
    pub details_altitude: f64,
    pub styles: Vec<NodeStyle>,
    pub placemarks: Vec<Placemark>,
    pub links: Vec<LinkPath>,
}

impl MapDocument {
    pub fn build(report: &ScanReport, config: &MapConfig) -> MapDocument {
        let placed: Vec<&Node> = report
            .reachable()
            .filter(|node| node.location.is_some())
            .filter(|node| match &config.min_peer_version {
                Some(minimum) if !version::is_at_least(&node.version, minimum) => {
                    debug!(
                        address = %node.address,
                        version = %node.version,
                        "below minimum version"
                    );
                    false
                }
                _ => true,
            })
            .collect();

        let mut styles = Vec::with_capacity(placed.len());
        let mut placemarks = Vec::with_capacity(placed.len());
        let mut by_address: HashMap<&NodeAddress, (String, Location)> = HashMap::new();
        for (index, node) in placed.iter().enumerate() {
            let Some(location) = node.location else {
                continue;
            };
            let style_id = format!("nodeStyle{index}");
            styles.push(NodeStyle {
                id: style_id.clone(),
                color: Color::for_address(&node.address),
            });
            placemarks.push(Placemark {
                address: node.address.clone(),
                style_id: style_id.clone(),
                location,
                version: node.version.clone(),
                peer_count: node.peers.len(),
            });
            by_address.insert(&node.address, (style_id, location));
        }

        let links = links::collect(placed.iter().copied())
            .into_iter()
            .filter_map(|link| {
                let (style_id, from) = by_address.get(link.first())?.clone();
                let (_, to) = by_address.get(link.second())?.clone();
                Some(LinkPath {
                    link,
                    style_id,
                    from,
                    to,
                })
            })
            .collect();

        MapDocument {
            name: config.name.clone(),
            icon_href: config.pin_icon_url.clone(),
            line_width: config.line_width,
            details_altitude: config.details_altitude,
            styles,
            placemarks,
            links,
        }
    }
}
