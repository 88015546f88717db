//! Navitia client for the Île-de-France Mobilités PRIM marketplace.
//!
//! Only the calls `metro departures` needs: places around a position, free-text
//! place search and the next departures from a stop area.

pub mod mode;
pub mod model;

use crate::error::TransitError;
use crate::model::Coordinates;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub use mode::TransportMode;
pub use model::{DeparturesResponse, PlaceTarget, PlacesNearbyResponse, PlacesResponse, StopArea};

pub const DEFAULT_API_URL: &str = "https://prim.iledefrance-mobilites.fr/marketplace/v2/navitia";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const ERROR_BODY_LIMIT: usize = 200;

/// Radius searched around a captured position.
pub const NEARBY_RADIUS_M: u32 = 500;
/// Departures requested per stop area when listing everything around a position.
pub const NEARBY_DEPARTURES: u32 = 40;
/// Departures requested for a single named station.
pub const STATION_DEPARTURES: u32 = 60;

pub struct TransitClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

impl TransitClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, TransitError> {
        let base = Url::parse(base_url).map_err(|e| TransitError::BadUrl {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(TransitError::BadUrl {
                url: base_url.to_string(),
                message: "not a base URL".into(),
            });
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("metro-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base,
            token: token.into(),
        })
    }

    /// Stop points within `radius_m` of `coords`, nearest first.
    pub async fn places_nearby(
        &self,
        coords: Coordinates,
        radius_m: u32,
        mode: TransportMode,
    ) -> Result<PlacesNearbyResponse, TransitError> {
        let position = format!("{:.6};{:.6}", coords.lon, coords.lat);
        let mut url = self.url(&["coords", &position, "places_nearby"]);
        url.query_pairs_mut()
            .append_pair("distance", &radius_m.to_string())
            .append_pair("type[]", "stop_point")
            .append_pair("count", "30")
            .append_pair("depth", "2");
        if let Some(filter) = mode.filter() {
            url.query_pairs_mut().append_pair("filter", filter);
        }
        self.get(url).await
    }

    /// Free-text search over stop areas and addresses.
    pub async fn places(&self, query: &str) -> Result<PlacesResponse, TransitError> {
        let mut url = self.url(&["places"]);
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("type[]", "stop_area")
            .append_pair("type[]", "address")
            .append_pair("count", "10");
        self.get(url).await
    }

    /// Next realtime departures from a stop area.
    pub async fn departures(
        &self,
        stop_area_id: &str,
        count: u32,
        mode: TransportMode,
    ) -> Result<DeparturesResponse, TransitError> {
        let mut url = self.url(&["stop_areas", stop_area_id, "departures"]);
        url.query_pairs_mut()
            .append_pair("count", &count.to_string())
            .append_pair("data_freshness", "realtime")
            .append_pair("depth", "2");
        if let Some(filter) = mode.filter() {
            url.query_pairs_mut().append_pair("filter", filter);
        }
        self.get(url).await
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, TransitError> {
        tracing::debug!(%url, "transit API request");
        let resp = self
            .http
            .get(url)
            .header("apikey", &self.token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        let body = resp.bytes().await?;
        match status {
            StatusCode::OK => Ok(serde_json::from_slice(&body)?),
            StatusCode::NOT_FOUND => Err(TransitError::NotFound),
            _ => Err(TransitError::Status {
                status: status.as_u16(),
                body: truncate(&String::from_utf8_lossy(&body), ERROR_BODY_LIMIT),
            }),
        }
    }
}

fn truncate(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
