// ===== networking::p2p.rs ===================================================
//
// Client for the BRS peer API. Every call is a `POST` to `/burst` on the
// node with a small JSON body naming the request type; the node answers
// with a JSON object.
//
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    peers::NodeAddress,
};

const API_PATH: &str = "/burst";
const API_PROTOCOL: &str = "B1";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest<'a> {
    request_type: &'a str,
    protocol: &'a str,
}

#[derive(Deserialize)]
struct PeersResponse {
    peers: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct InfoResponse {
    version: Option<String>,
    application: Option<ApplicationInfo>,
}

#[derive(Deserialize)]
struct ApplicationInfo {
    version: Option<String>,
}

#[derive(Clone, Debug)]
pub struct P2pClient {
    http: reqwest::Client,
}

impl P2pClient {
    pub fn new(http: reqwest::Client) -> P2pClient {
        P2pClient { http }
    }

    /// Addresses the node announces as its peers, exactly as announced.
    ///
    /// A reply without a peer list is treated as an empty one.
    pub async fn get_peers(&self, node: &NodeAddress) -> Result<Vec<String>> {
        let response: PeersResponse = self.request(node, "getPeers").await?;
        match response.peers {
            Some(peers) => Ok(peers),
            None => {
                warn!(%node, "getPeers reply has no peer list");
                Ok(Vec::new())
            }
        }
    }

    /// Software version the node reports, `None` if the reply carries none.
    pub async fn get_version(&self, node: &NodeAddress) -> Result<Option<String>> {
        let response: InfoResponse = self.request(node, "getInfo").await?;
        let version = response
            .version
            .or_else(|| response.application.and_then(|app| app.version));
        if version.is_none() {
            warn!(%node, "getInfo reply has no version");
        }
        Ok(version)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        node: &NodeAddress,
        request_type: &str,
    ) -> Result<T> {
        let url = format!("{}{API_PATH}", node.base_url());
        debug!(%url, request_type, "p2p request");

        let body = ApiRequest {
            request_type,
            protocol: API_PROTOCOL,
        };
        let response = match self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
        {
            Ok(response) => response,
            Err(source) => return Err(Error::Http { url, source }),
        };
        match response.json::<T>().await {
            Ok(reply) => Ok(reply),
            Err(source) => Err(Error::Http { url, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::networking::http_client;

    fn test_client() -> P2pClient {
        P2pClient::new(http_client("BRS/3.8.4", Duration::from_secs(2)).unwrap())
    }

    fn node_of(server: &MockServer) -> NodeAddress {
        server.address().to_string().parse().unwrap()
    }

    async fn respond_to(server: &MockServer, request_type: &str, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(API_PATH))
            .and(body_partial_json(
                json!({ "requestType": request_type, "protocol": API_PROTOCOL }),
            ))
            .respond_with(response)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn get_peers_returns_announced_addresses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(API_PATH))
            .and(header("user-agent", "BRS/3.8.4"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(json!({ "requestType": "getPeers" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "peers": ["node.example.org", "203.0.113.7:8125"],
                "requestProcessingTime": 0
            })))
            .mount(&server)
            .await;

        let peers = test_client().get_peers(&node_of(&server)).await.unwrap();
        assert_eq!(peers, vec!["node.example.org", "203.0.113.7:8125"]);
    }

    #[tokio::test]
    async fn get_peers_without_list_is_empty() {
        let server = MockServer::start().await;
        respond_to(
            &server,
            "getPeers",
            ResponseTemplate::new(200).set_body_json(json!({ "errorCode": 1 })),
        )
        .await;

        let peers = test_client().get_peers(&node_of(&server)).await.unwrap();
        assert!(peers.is_empty());
    }

    #[tokio::test]
    async fn get_peers_fails_on_server_error() {
        let server = MockServer::start().await;
        respond_to(&server, "getPeers", ResponseTemplate::new(503)).await;

        let err = test_client()
            .get_peers(&node_of(&server))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http { .. }));
    }

    #[tokio::test]
    async fn get_peers_fails_on_malformed_json() {
        let server = MockServer::start().await;
        respond_to(
            &server,
            "getPeers",
            ResponseTemplate::new(200).set_body_string("<html>not json</html>"),
        )
        .await;

        let err = test_client()
            .get_peers(&node_of(&server))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http { .. }));
    }

    #[tokio::test]
    async fn get_version_reads_top_level_or_application() {
        let server = MockServer::start().await;
        respond_to(
            &server,
            "getInfo",
            ResponseTemplate::new(200).set_body_json(json!({ "version": "v3.8.4" })),
        )
        .await;
        let version = test_client().get_version(&node_of(&server)).await.unwrap();
        assert_eq!(version.as_deref(), Some("v3.8.4"));

        let nested = MockServer::start().await;
        respond_to(
            &nested,
            "getInfo",
            ResponseTemplate::new(200)
                .set_body_json(json!({ "application": { "name": "BRS", "version": "3.7.2" } })),
        )
        .await;
        let version = test_client().get_version(&node_of(&nested)).await.unwrap();
        assert_eq!(version.as_deref(), Some("3.7.2"));

        let missing = MockServer::start().await;
        respond_to(
            &missing,
            "getInfo",
            ResponseTemplate::new(200).set_body_json(json!({})),
        )
        .await;
        let version = test_client().get_version(&node_of(&missing)).await.unwrap();
        assert_eq!(version, None);
    }
}
