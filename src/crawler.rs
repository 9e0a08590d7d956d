// ===== crawler.rs ============================================================
//
// Breadth-first walk of the peer graph. Each round probes every address
// discovered by the previous one; probes within a round run concurrently on
// the current task, and their results are merged only once the round is
// complete, so no state is shared between probes.
//
use std::collections::HashSet;

use futures::{stream, StreamExt};
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::Result,
    networking::{self, GeoClient, GeoInfo, P2pClient},
    peers::{Node, NodeAddress, Probe, ScanReport, UNKNOWN_VERSION},
};

pub struct Crawler {
    p2p: P2pClient,
    geo: GeoClient,
    default_port: u16,
    concurrency: usize,
    max_nodes: Option<usize>,
}

impl Crawler {
    pub fn new(p2p: P2pClient, geo: GeoClient) -> Crawler {
        Crawler {
            p2p,
            geo,
            default_port: crate::peers::DEFAULT_P2P_PORT,
            concurrency: 20,
            max_nodes: None,
        }
    }

    /// Builds a crawler with the HTTP settings, limits and geo API of `config`.
    pub fn from_config(config: &Config) -> Result<Crawler> {
        let http = networking::http_client(&config.user_agent(), config.request_timeout())?;
        let crawler = Crawler::new(
            P2pClient::new(http.clone()),
            GeoClient::new(http, config.geo_api_url.clone()),
        )
        .with_default_port(config.default_port)
        .with_concurrency(config.concurrency)
        .with_max_nodes(config.max_nodes);
        Ok(crawler)
    }

    pub fn with_default_port(mut self, port: u16) -> Crawler {
        self.default_port = port;
        self
    }

    /// Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Crawler {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: Option<usize>) -> Crawler {
        self.max_nodes = max_nodes;
        self
    }

    /// Parses and shuffles bootstrap addresses, dropping unparsable ones.
    pub fn bootstrap_addresses(&self, announced: &[String]) -> Vec<NodeAddress> {
        let mut addresses: Vec<NodeAddress> = announced
            .iter()
            .filter_map(|raw| match NodeAddress::parse(raw, self.default_port) {
                Ok(address) => Some(address),
                Err(err) => {
                    warn!(address = %raw, error = %err, "skipping bootstrap peer");
                    None
                }
            })
            .collect();
        addresses.shuffle(&mut rand::thread_rng());
        addresses
    }

    /// Probes `bootstrap` and everything transitively reachable from it.
    pub async fn crawl(&self, bootstrap: Vec<NodeAddress>) -> ScanReport {
        let mut report = ScanReport::default();
        let mut seen: HashSet<NodeAddress> = HashSet::new();
        let mut frontier: Vec<NodeAddress> = Vec::new();
        for address in bootstrap {
            if self.has_room(&seen) && seen.insert(address.clone()) {
                frontier.push(address);
            }
        }

        let mut round = 0;
        while !frontier.is_empty() {
            round += 1;
            info!(round, nodes = frontier.len(), "scanning");

            let probes: Vec<(NodeAddress, Probe)> = stream::iter(std::mem::take(&mut frontier))
                .map(|address| self.probe(address))
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

            for (address, probe) in probes {
                if let Probe::Reachable(node) = &probe {
                    for peer in &node.peers {
                        if self.has_room(&seen) && seen.insert(peer.clone()) {
                            frontier.push(peer.clone());
                        }
                    }
                }
                report.insert(address, probe);
            }
        }

        info!(
            nodes = report.len(),
            reachable = report.reachable().count(),
            "scan complete"
        );
        report
    }

    fn has_room(&self, seen: &HashSet<NodeAddress>) -> bool {
        self.max_nodes.map_or(true, |max| seen.len() < max)
    }

    async fn probe(&self, address: NodeAddress) -> (NodeAddress, Probe) {
        let announced = match self.p2p.get_peers(&address).await {
            Ok(peers) => peers,
            Err(err) => {
                debug!(%address, error = %err, "can't connect to peer");
                return (address, Probe::Unreachable);
            }
        };
        let version = match self.p2p.get_version(&address).await {
            Ok(Some(version)) => version,
            Ok(None) => UNKNOWN_VERSION.to_owned(),
            Err(err) => {
                debug!(%address, error = %err, "getInfo failed");
                UNKNOWN_VERSION.to_owned()
            }
        };

        let peers = self.canonical_peers(&address, announced);

        let ip = match networking::resolve_ip(&address).await {
            Ok(ip) => Some(ip),
            Err(err) => {
                debug!(%address, error = %err, "can't resolve host");
                None
            }
        };
        let geo = match ip {
            Some(ip) => self.geo.lookup(ip).await,
            None => GeoInfo::unknown(),
        };

        info!(%address, %version, peers = peers.len(), "scanned peer");
        let node = Node {
            address: address.clone(),
            ip,
            country_code: geo.country_code,
            location: geo.location,
            version,
            peers,
        };
        (address, Probe::Reachable(node))
    }

    /// Canonicalises an announced peer list, dropping duplicates, unparsable
    /// entries and the node itself.
    fn canonical_peers(&self, node: &NodeAddress, announced: Vec<String>) -> Vec<NodeAddress> {
        let mut peers: Vec<NodeAddress> = Vec::with_capacity(announced.len());
        for raw in announced {
            match NodeAddress::parse(&raw, self.default_port) {
                Ok(peer) if &peer == node || peers.contains(&peer) => {}
                Ok(peer) => peers.push(peer),
                Err(err) => debug!(%node, peer = %raw, error = %err, "skipping announced peer"),
            }
        }
        peers
    }
}
