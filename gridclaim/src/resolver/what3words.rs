//! what3words address resolver.
//!
//! Resolves coordinates through the what3words v3 REST API.
//!
//! # Endpoints
//!
//! - `GET {base}/convert-to-3wa?coordinates={lat},{lng}&language={lang}&key={key}`
//! - `GET {base}/convert-to-coordinates?words={words}&key={key}`
//!
//! Both return a JSON object with `words` and `coordinates` (the centre of
//! the 3 m square). Failures return `{"error": {"code", "message"}}` with a
//! 4xx status.
//!
//! # Authentication
//!
//! Requires an API key (`[resolver] api_key` in config.ini).

use serde::Deserialize;
use tracing::{debug, warn};

use super::http::{AsyncHttpClient, HttpResponse};
use super::types::{BoxFuture, CellAddressResolver, CellId, ResolutionError};
use crate::coord::Coordinate;

/// Production API base URL.
pub const WHAT3WORDS_BASE_URL: &str = "https://api.what3words.com/v3";

/// Configuration for the what3words resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct What3WordsConfig {
    /// API key.
    pub api_key: String,
    /// Address language (ISO 639-1).
    pub language: String,
    /// API base URL (overridable for testing).
    pub base_url: String,
}

impl What3WordsConfig {
    /// Create a config for the production API in English.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            language: "en".to_string(),
            base_url: WHAT3WORDS_BASE_URL.to_string(),
        }
    }

    /// Set the address language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct AddressResponse {
    words: String,
    coordinates: LatLng,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Resolver backed by the what3words API.
pub struct What3WordsResolver<C: AsyncHttpClient> {
    http_client: C,
    config: What3WordsConfig,
}

impl<C: AsyncHttpClient> What3WordsResolver<C> {
    /// Creates a new what3words resolver.
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client for making requests
    /// * `config` - API key, language and base URL
    pub fn new(http_client: C, config: What3WordsConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    fn build_url(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String, ResolutionError> {
        let base = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut all: Vec<(&str, &str)> = params.to_vec();
        all.push(("format", "json"));
        all.push(("key", &self.config.api_key));
        reqwest::Url::parse_with_params(&base, &all)
            .map(|url| url.to_string())
            .map_err(|e| ResolutionError::Http(format!("Invalid URL {}: {}", base, e)))
    }

    /// Build the convert-to-3wa URL for a coordinate.
    fn to_words_url(&self, coordinate: &Coordinate) -> Result<String, ResolutionError> {
        let coordinates = format!("{},{}", coordinate.latitude, coordinate.longitude);
        self.build_url(
            "convert-to-3wa",
            &[
                ("coordinates", &coordinates),
                ("language", &self.config.language),
            ],
        )
    }

    /// Build the convert-to-coordinates URL for an address.
    fn to_coordinates_url(&self, cell_id: &CellId) -> Result<String, ResolutionError> {
        self.build_url("convert-to-coordinates", &[("words", cell_id.as_str())])
    }

    async fn fetch(&self, url: &str) -> Result<AddressResponse, ResolutionError> {
        let response = self.http_client.get(url).await?;
        decode_response(&response)
    }

    async fn to_words(&self, coordinate: Coordinate) -> Result<CellId, ResolutionError> {
        let url = self.to_words_url(&coordinate)?;
        let address = self.fetch(&url).await?;
        if address.words.is_empty() {
            return Err(ResolutionError::OutOfCoverage(coordinate));
        }
        debug!(%coordinate, words = %address.words, "what3words resolved coordinate");
        Ok(CellId::new(address.words))
    }

    async fn to_coordinates(&self, cell_id: &CellId) -> Result<Coordinate, ResolutionError> {
        let url = self.to_coordinates_url(cell_id)?;
        let address = self.fetch(&url).await?;
        Coordinate::new(address.coordinates.lat, address.coordinates.lng)
            .map_err(|e| ResolutionError::Decode(e.to_string()))
    }
}

/// Decode an API response, mapping error bodies to [`ResolutionError`].
fn decode_response(response: &HttpResponse) -> Result<AddressResponse, ResolutionError> {
    if !response.is_success() {
        return Err(match serde_json::from_slice::<ErrorResponse>(&response.body) {
            Ok(body) => {
                warn!(code = %body.error.code, "what3words request failed: {}", body.error.message);
                match body.error.code.as_str() {
                    "BadCoordinates" => ResolutionError::InvalidCoordinate(body.error.message),
                    "BadWords" => ResolutionError::UnknownCell(body.error.message),
                    _ => ResolutionError::Service {
                        code: body.error.code,
                        message: body.error.message,
                    },
                }
            }
            Err(_) => ResolutionError::Http(format!("HTTP {}", response.status)),
        });
    }

    serde_json::from_slice(&response.body).map_err(|e| ResolutionError::Decode(e.to_string()))
}

impl<C: AsyncHttpClient> CellAddressResolver for What3WordsResolver<C> {
    fn resolve_to_cell(&self, coordinate: Coordinate) -> BoxFuture<'_, Result<CellId, ResolutionError>> {
        Box::pin(self.to_words(coordinate))
    }

    fn resolve_to_coordinate<'a>(
        &'a self,
        cell_id: &'a CellId,
    ) -> BoxFuture<'a, Result<Coordinate, ResolutionError>> {
        Box::pin(self.to_coordinates(cell_id))
    }

    fn name(&self) -> &str {
        "what3words"
    }
}
