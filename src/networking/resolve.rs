use std::net::{IpAddr, SocketAddr};

use crate::{
    error::{Error, Result},
    peers::NodeAddress,
};

/// Resolves the address a node's API is reached at to one IP, preferring
/// IPv4 when a name has records of both families. IP literals are returned
/// as they are.
pub async fn resolve_ip(address: &NodeAddress) -> Result<IpAddr> {
    if let Some(ip) = address.ip_literal() {
        return Ok(ip);
    }

    let host = address.host();
    let resolved: Vec<SocketAddr> = tokio::net::lookup_host((host, address.port()))
        .await
        .map_err(|source| Error::Resolve {
            host: host.to_owned(),
            source,
        })?
        .collect();

    resolved
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| resolved.first())
        .map(SocketAddr::ip)
        .ok_or_else(|| Error::NoAddress(host.to_owned()))
}
