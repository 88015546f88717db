use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::OffsetDateTime;

/// A WGS84 position captured from the browser or read back from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Latitude within [-90, 90] and longitude within [-180, 180], both finite.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lon)
    }
}

/// Parameters for a single capture session.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOptions {
    pub timeout: Duration,
    /// Fixed port to listen on. `None` or `Some(0)` lets the OS pick one.
    pub port: Option<u16>,
    pub open_browser: bool,
    /// How long to let the in-flight response drain after a successful capture.
    pub shutdown_grace: Duration,
}

pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CAPTURE_TIMEOUT,
            port: None,
            open_browser: true,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

/// Progress events emitted by a capture session and consumed by the CLI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// The listener is bound. `lan_url` is only set when the LAN address differs from loopback.
    Listening {
        port: u16,
        local_url: String,
        lan_url: Option<String>,
    },
    /// Whether the platform browser opener could be spawned.
    BrowserLaunch { opened: bool },
}

/// The single persisted location entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CachedLocation {
    pub lat: f64,
    pub lon: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub cached_at: OffsetDateTime,
}

impl CachedLocation {
    pub fn new(coords: Coordinates, cached_at: OffsetDateTime) -> Self {
        Self {
            lat: coords.lat,
            lon: coords.lon,
            cached_at,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lon)
    }

    /// Age of the entry relative to `now`. Entries stamped in the future count as fresh.
    pub fn age(&self, now: OffsetDateTime) -> Duration {
        let elapsed = now - self.cached_at;
        Duration::try_from(elapsed).unwrap_or(Duration::ZERO)
    }
}
