//! HTTP client for the Mapbox Map Matching API.
//!
//! One request per [`MapMatcher::match_trace`] call, no retries. The client
//! owns its own tokio runtime and blocks on the request, so callers stay
//! synchronous. Do not call it from inside another tokio runtime.
//!
//! The access token travels in the query string, so request URLs are stripped
//! from every error before it is logged or returned.

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::runtime::Runtime;

use crate::map_matching::{MapMatcher, MatchRequest, MatchResponse};

/// Environment variable holding the Mapbox access token.
pub const ACCESS_TOKEN_ENV: &str = "MAPBOX_ACCESS_TOKEN";

/// Connection settings for the matching service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapboxConfig {
    /// API root, without a trailing slash.
    /// Default: "https://api.mapbox.com"
    pub base_url: String,

    /// Routing profile the trace is snapped against.
    /// Default: "driving"
    pub profile: String,

    pub access_token: String,

    /// Whole-request timeout in seconds.
    /// Default: 30
    pub timeout_secs: u64,
}

impl Default for MapboxConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mapbox.com".to_string(),
            profile: "driving".to_string(),
            access_token: String::new(),
            timeout_secs: 30,
        }
    }
}

impl MapboxConfig {
    /// Default settings with the token from `MAPBOX_ACCESS_TOKEN`.
    ///
    /// Returns `None` if the variable is unset or empty.
    pub fn from_env() -> Option<Self> {
        let access_token = std::env::var(ACCESS_TOKEN_ENV).ok()?;
        if access_token.trim().is_empty() {
            return None;
        }
        Some(Self {
            access_token,
            ..Self::default()
        })
    }

    /// Full request URL for a match request.
    pub fn match_url(&self, request: &MatchRequest) -> String {
        format!(
            "{}/matching/v5/mapbox/{}/{}?geometries=geojson&overview=full&timestamps={}&radiuses={}&access_token={}",
            self.base_url.trim_end_matches('/'),
            self.profile,
            request.coordinates,
            request.timestamps,
            request.radiuses,
            self.access_token
        )
    }
}

/// Blocking [`MapMatcher`] backed by the Mapbox Map Matching API.
pub struct MapboxMatcher {
    client: Client,
    runtime: Runtime,
    config: MapboxConfig,
}

impl MapboxMatcher {
    pub fn new(config: MapboxConfig) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        let runtime =
            Runtime::new().map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        Ok(Self {
            client,
            runtime,
            config,
        })
    }

    pub fn config(&self) -> &MapboxConfig {
        &self.config
    }

    async fn fetch(&self, request: &MatchRequest) -> Result<MatchResponse, String> {
        let url = self.config.match_url(request);
        let start = Instant::now();

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read response: {}", e.without_url()))?;

        debug!(
            "[MapboxMatcher] HTTP {} for {} coordinates in {:?}",
            status,
            request.coordinate_count(),
            start.elapsed()
        );

        // Error statuses still carry a `code`/`message` body worth surfacing
        match serde_json::from_str::<MatchResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(e) if status.is_success() => Err(format!("Malformed response: {}", e)),
            Err(_) => Err(format!("HTTP {}", status)),
        }
    }
}

impl MapMatcher for MapboxMatcher {
    fn match_trace(&self, request: &MatchRequest) -> Result<MatchResponse, String> {
        info!(
            "[MapboxMatcher] Matching {} coordinates against '{}'",
            request.coordinate_count(),
            self.config.profile
        );

        let result = self.runtime.block_on(self.fetch(request));
        if let Err(e) = &result {
            warn!("[MapboxMatcher] {}", e);
        }
        result
    }
}
