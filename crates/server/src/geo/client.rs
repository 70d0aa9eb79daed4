//! Geocoding provider client.
//!
//! The cache only needs "coordinates or failure", so every way a lookup can
//! go wrong is a [`GeocodeError`] variant. The variants exist for logs.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use star_burger_core::{Coordinates, CoordinatesError};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::GeocoderConfig;

/// Errors that can occur when geocoding an address.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Transport failure or timeout.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status.
    #[error("provider returned status {0}")]
    Status(u16),

    /// Response body is not the expected JSON document.
    #[error("parse error: {0}")]
    Parse(String),

    /// Provider found nothing for the address.
    #[error("no results for address")]
    NotFound,

    /// The returned position is not a valid "lon lat" pair.
    #[error("invalid position: {0}")]
    InvalidPosition(#[from] CoordinatesError),

    /// The configured endpoint is not a valid URL.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

/// Resolves a free-text address to coordinates.
///
/// Implementations are stateless with respect to caching: one call is at most
/// one upstream request.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve `address` to the first matching candidate's coordinates.
    ///
    /// Callers must not pass empty or whitespace-only addresses.
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError>;
}

#[async_trait]
impl<G: Geocoder + ?Sized> Geocoder for Arc<G> {
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        (**self).geocode(address).await
    }
}

// =============================================================================
// Yandex Geocoder
// =============================================================================

/// Yandex HTTP Geocoder client.
#[derive(Clone)]
pub struct YandexGeocoder {
    inner: Arc<YandexGeocoderInner>,
}

struct YandexGeocoderInner {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
}

impl YandexGeocoder {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let base_url = Url::parse(&config.base_url)?;
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            inner: Arc::new(YandexGeocoderInner {
                client,
                base_url,
                api_key: config.api_key.clone(),
            }),
        })
    }

    fn request_url(&self, address: &str) -> Url {
        let mut url = self.inner.base_url.clone();
        url.query_pairs_mut()
            .append_pair("geocode", address)
            .append_pair("apikey", self.inner.api_key.expose_secret())
            .append_pair("format", "json");
        url
    }
}

#[async_trait]
impl Geocoder for YandexGeocoder {
    #[instrument(skip(self))]
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        let response = self
            .inner
            .client
            .get(self.request_url(address))
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        // The request URL carries the API key, so it never reaches error messages
        let body = response.text().await.map_err(reqwest::Error::without_url)?;
        let coordinates = parse_first_position(&body)?;
        tracing::debug!(%coordinates, "Geocoded address");
        Ok(coordinates)
    }
}

// =============================================================================
// Response
// =============================================================================

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    response: ResponseBody,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    #[serde(rename = "GeoObjectCollection")]
    collection: GeoObjectCollection,
}

#[derive(Debug, Deserialize)]
struct GeoObjectCollection {
    #[serde(rename = "featureMember", default)]
    members: Vec<FeatureMember>,
}

#[derive(Debug, Deserialize)]
struct FeatureMember {
    #[serde(rename = "GeoObject")]
    geo_object: GeoObject,
}

#[derive(Debug, Deserialize)]
struct GeoObject {
    #[serde(rename = "Point")]
    point: Point,
}

#[derive(Debug, Deserialize)]
struct Point {
    pos: String,
}

/// Extract the first candidate's `Point.pos` from a provider response body.
fn parse_first_position(body: &str) -> Result<Coordinates, GeocodeError> {
    let parsed: GeocodeResponse =
        serde_json::from_str(body).map_err(|e| GeocodeError::Parse(e.to_string()))?;

    let first = parsed
        .response
        .collection
        .members
        .into_iter()
        .next()
        .ok_or(GeocodeError::NotFound)?;

    Ok(first.geo_object.point.pos.parse()?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use mockito::Matcher;

    use super::*;

    const TVERSKAYA: &str = r#"{
        "response": {
            "GeoObjectCollection": {
                "metaDataProperty": {"GeocoderResponseMetaData": {"found": "2"}},
                "featureMember": [
                    {"GeoObject": {"name": "Тверская улица, 1", "Point": {"pos": "37.611347 55.757998"}}},
                    {"GeoObject": {"name": "Тверская улица, 1с2", "Point": {"pos": "37.612000 55.758100"}}}
                ]
            }
        }
    }"#;

    fn geocoder_for(server: &mockito::Server) -> YandexGeocoder {
        let config = GeocoderConfig {
            api_key: SecretString::from("test-key"),
            base_url: format!("{}/1.x", server.url()),
            timeout: Duration::from_secs(5),
        };
        YandexGeocoder::new(&config).unwrap()
    }

    #[test]
    fn test_parse_takes_first_candidate() {
        let coords = parse_first_position(TVERSKAYA).unwrap();
        assert!((coords.lon - 37.611_347).abs() < 1e-9);
        assert!((coords.lat - 55.757_998).abs() < 1e-9);
    }

    #[test]
    fn test_parse_empty_result_set() {
        let body = r#"{"response": {"GeoObjectCollection": {"featureMember": []}}}"#;
        assert!(matches!(
            parse_first_position(body),
            Err(GeocodeError::NotFound)
        ));
    }

    #[test]
    fn test_parse_malformed_body() {
        assert!(matches!(
            parse_first_position("<html>busy</html>"),
            Err(GeocodeError::Parse(_))
        ));
        assert!(matches!(
            parse_first_position(r#"{"response": {}}"#),
            Err(GeocodeError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_invalid_position() {
        let body = r#"{"response": {"GeoObjectCollection": {"featureMember": [
            {"GeoObject": {"Point": {"pos": "37.6"}}}
        ]}}}"#;
        assert!(matches!(
            parse_first_position(body),
            Err(GeocodeError::InvalidPosition(_))
        ));
    }

    #[test]
    fn test_new_rejects_invalid_base_url() {
        let config = GeocoderConfig {
            api_key: SecretString::from("test-key"),
            base_url: "not a url".to_string(),
            timeout: Duration::from_secs(5),
        };
        assert!(matches!(
            YandexGeocoder::new(&config),
            Err(GeocodeError::InvalidBaseUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_geocode_sends_expected_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/1.x")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("geocode".into(), "Москва, Тверская 1".into()),
                Matcher::UrlEncoded("apikey".into(), "test-key".into()),
                Matcher::UrlEncoded("format".into(), "json".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(TVERSKAYA)
            .create_async()
            .await;

        let coords = geocoder_for(&server)
            .geocode("Москва, Тверская 1")
            .await
            .unwrap();

        mock.assert_async().await;
        assert!((coords.lat - 55.757_998).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_geocode_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/1.x")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error": "Invalid api key"}"#)
            .create_async()
            .await;

        let result = geocoder_for(&server).geocode("Москва").await;
        assert!(matches!(result, Err(GeocodeError::Status(403))));
    }

    #[tokio::test]
    async fn test_geocode_nothing_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/1.x")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"response": {"GeoObjectCollection": {"featureMember": []}}}"#)
            .create_async()
            .await;

        let result = geocoder_for(&server).geocode("ыыыыы").await;
        assert!(matches!(result, Err(GeocodeError::NotFound)));
    }

    #[tokio::test]
    async fn test_geocode_connection_refused() {
        let config = GeocoderConfig {
            api_key: SecretString::from("test-key"),
            base_url: "http://127.0.0.1:9/1.x".to_string(),
            timeout: Duration::from_secs(1),
        };
        let geocoder = YandexGeocoder::new(&config).unwrap();

        let result = geocoder.geocode("Москва").await;
        assert!(matches!(result, Err(GeocodeError::Http(_))));
        assert!(!result.unwrap_err().to_string().contains("test-key"));
    }

    #[tokio::test]
    async fn test_geocode_times_out_on_silent_provider() {
        // Accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = GeocoderConfig {
            api_key: SecretString::from("test-key"),
            base_url: format!("http://{addr}/1.x"),
            timeout: Duration::from_millis(300),
        };
        let geocoder = YandexGeocoder::new(&config).unwrap();

        let started = std::time::Instant::now();
        let result = geocoder.geocode("Москва, Тверская 1").await;

        assert!(matches!(&result, Err(GeocodeError::Http(e)) if e.is_timeout()));
        assert!(started.elapsed() < Duration::from_secs(5));
        server.abort();
    }
}
