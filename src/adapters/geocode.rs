use crate::utils::error::{AgentError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
    status: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Coordinates,
}

/// Google Geocoding API client.
#[derive(Debug, Clone)]
pub struct GeocodeClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl GeocodeClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    pub async fn geocode(&self, address: &str) -> Result<Coordinates> {
        tracing::debug!("Geocoding address: {}", address);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await?;

        let data: GeocodeResponse = response.json().await?;

        if data.status != "OK" {
            return Err(AgentError::GeocodeError {
                status: data.status,
            });
        }

        data.results
            .into_iter()
            .next()
            .map(|result| result.geometry.location)
            .ok_or(AgentError::GeocodeError {
                status: "ZERO_RESULTS".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_geocode_returns_first_location() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/maps/api/geocode/json")
                .query_param("address", "208 Anza St, San Francisco, CA")
                .query_param("key", "maps-key");
            then.status(200).json_body(json!({
                "status": "OK",
                "results": [
                    {"geometry": {"location": {"lat": 37.7799, "lng": -122.4537}}},
                    {"geometry": {"location": {"lat": 0.0, "lng": 0.0}}}
                ]
            }));
        });

        let client = GeocodeClient::new(server.url("/maps/api/geocode/json"), "maps-key");
        let coords = client.geocode("208 Anza St, San Francisco, CA").await.unwrap();

        api_mock.assert();
        assert_eq!(coords, Coordinates { lat: 37.7799, lng: -122.4537 });
    }

    #[tokio::test]
    async fn test_non_ok_status_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/geocode");
            then.status(200)
                .json_body(json!({"status": "REQUEST_DENIED", "results": []}));
        });

        let client = GeocodeClient::new(server.url("/geocode"), "bad-key");
        let err = client.geocode("nowhere").await.unwrap_err();

        match err {
            AgentError::GeocodeError { status } => assert_eq!(status, "REQUEST_DENIED"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ok_without_results_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/geocode");
            then.status(200).json_body(json!({"status": "OK", "results": []}));
        });

        let client = GeocodeClient::new(server.url("/geocode"), "key");
        assert!(matches!(
            client.geocode("somewhere").await,
            Err(AgentError::GeocodeError { .. })
        ));
    }
}
