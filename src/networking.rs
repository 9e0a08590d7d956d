mod geo;
mod p2p;
mod resolve;

pub use crate::networking::{
    geo::{GeoClient, GeoInfo},
    p2p::P2pClient,
    resolve::resolve_ip,
};

use std::time::Duration;

use crate::error::{Error, Result};

/// Builds the HTTP client shared by every request of a scan. TLS
/// certificates are not verified.
pub fn http_client(user_agent: &str, timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .danger_accept_invalid_certs(true)
        .build()
        .map_err(Error::HttpClient)
}
