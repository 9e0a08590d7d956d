use std::collections::{BTreeSet, HashSet};

use crate::peers::{Node, NodeAddress};

// ===== struct links::Link ====================================================
///
/// An observed peer connection between two nodes. Links have no direction:
/// the endpoints are stored in order, so `A` announcing `B` and `B`
/// announcing `A` produce the same link.
///
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Link {
    first: NodeAddress,
    second: NodeAddress,
}

impl Link {
    pub fn new(a: NodeAddress, b: NodeAddress) -> Link {
        if a <= b {
            Link { first: a, second: b }
        } else {
            Link { first: b, second: a }
        }
    }

    pub fn first(&self) -> &NodeAddress {
        &self.first
    }

    pub fn second(&self) -> &NodeAddress {
        &self.second
    }
}

/// Collects the links between `nodes`. Announced peers outside the set, and
/// nodes announcing themselves, produce nothing.
pub fn collect<'a>(nodes: impl IntoIterator<Item = &'a Node> + Clone) -> BTreeSet<Link> {
    let members: HashSet<&NodeAddress> = nodes.clone().into_iter().map(|n| &n.address).collect();

    let mut links = BTreeSet::new();
    for node in nodes {
        for peer in &node.peers {
            if peer != &node.address && members.contains(peer) {
                links.insert(Link::new(node.address.clone(), peer.clone()));
            }
        }
    }
    links
}
