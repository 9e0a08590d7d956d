//! Maps a BRS style peer-to-peer network: crawls the peer graph from a few
//! bootstrap nodes, geolocates every node that answers, and writes the nodes
//! and the links between them as a KML/KMZ map.

pub mod config;
pub mod crawler;
pub mod error;
pub mod kml;
pub mod kmz;
pub mod links;
pub mod logging;
pub mod map;
pub mod networking;
pub mod output;
pub mod peers;
pub mod snapshot;
pub mod version;

pub use crate::error::{Error, Result};
