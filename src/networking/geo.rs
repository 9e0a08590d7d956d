use std::net::IpAddr;

use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    error::{Error, Result},
    peers::{Location, UNKNOWN_COUNTRY},
};

/// What an IP geolocation lookup tells us about a node.
#[derive(Clone, Debug, PartialEq)]
pub struct GeoInfo {
    pub country_code: String,
    pub location: Option<Location>,
}

impl GeoInfo {
    pub fn unknown() -> GeoInfo {
        GeoInfo {
            country_code: UNKNOWN_COUNTRY.to_owned(),
            location: None,
        }
    }
}

/// Reply of an ipwho.is style API. `success` is only present on some
/// deployments and is `false` for private or malformed addresses.
#[derive(Deserialize)]
struct LookupResponse {
    success: Option<bool>,
    message: Option<String>,
    country_code: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct GeoClient {
    http: reqwest::Client,
    base_url: String,
}

impl GeoClient {
    /// `base_url` is the API prefix the IP address is appended to.
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> GeoClient {
        GeoClient {
            http,
            base_url: base_url.into(),
        }
    }

    /// Looks `ip` up, falling back to [`GeoInfo::unknown`] on any failure.
    pub async fn lookup(&self, ip: IpAddr) -> GeoInfo {
        match self.try_lookup(ip).await {
            Ok(geo) => {
                info!(%ip, country = %geo.country_code, location = ?geo.location, "geo lookup");
                geo
            }
            Err(err) => {
                warn!(%ip, error = %err, "geo lookup failed");
                GeoInfo::unknown()
            }
        }
    }

    pub async fn try_lookup(&self, ip: IpAddr) -> Result<GeoInfo> {
        let url = format!("{}{ip}", self.base_url);
        let response = match self
            .http
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
        {
            Ok(response) => response,
            Err(source) => return Err(Error::Http { url, source }),
        };
        let reply: LookupResponse = match response.json().await {
            Ok(reply) => reply,
            Err(source) => return Err(Error::Http { url, source }),
        };

        if reply.success == Some(false) {
            return Err(Error::GeoLookup {
                ip: ip.to_string(),
                message: reply.message.unwrap_or_else(|| "lookup unsuccessful".to_owned()),
            });
        }

        let country_code = reply
            .country_code
            .filter(|code| !code.is_empty())
            .unwrap_or_else(|| UNKNOWN_COUNTRY.to_owned());
        let location = match (reply.latitude, reply.longitude) {
            (Some(latitude), Some(longitude)) => Some(Location {
                latitude,
                longitude,
            }),
            _ => None,
        };
        Ok(GeoInfo {
            country_code,
            location,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::networking::http_client;

    fn test_client(server: &MockServer) -> GeoClient {
        let http = http_client("netmap-test", Duration::from_secs(2)).unwrap();
        GeoClient::new(http, format!("{}/", server.uri()))
    }

    #[tokio::test]
    async fn lookup_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/198.51.100.20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ip": "198.51.100.20",
                "success": true,
                "country_code": "DE",
                "latitude": 50.1109,
                "longitude": 8.6821
            })))
            .mount(&server)
            .await;

        let geo = test_client(&server)
            .lookup("198.51.100.20".parse().unwrap())
            .await;
        assert_eq!(geo.country_code, "DE");
        assert_eq!(
            geo.location,
            Some(Location {
                latitude: 50.1109,
                longitude: 8.6821
            })
        );
    }

    #[tokio::test]
    async fn lookup_reported_failure_is_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ip": "10.0.0.1",
                "success": false,
                "message": "Reserved range"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .try_lookup("10.0.0.1".parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::GeoLookup { .. }));
        assert_eq!(
            client.lookup("10.0.0.1".parse().unwrap()).await,
            GeoInfo::unknown()
        );
    }

    #[tokio::test]
    async fn lookup_http_error_is_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let geo = test_client(&server)
            .lookup("198.51.100.20".parse().unwrap())
            .await;
        assert_eq!(geo, GeoInfo::unknown());
    }

    #[tokio::test]
    async fn lookup_without_coordinates_keeps_country() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "country_code": null })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/2001:db8::1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "country_code": "NL" })),
            )
            .with_priority(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let geo = client.lookup("2001:db8::1".parse().unwrap()).await;
        assert_eq!(geo.country_code, "NL");
        assert_eq!(geo.location, None);

        let geo = client.lookup("198.51.100.20".parse().unwrap()).await;
        assert_eq!(geo, GeoInfo::unknown());
    }
}
