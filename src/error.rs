use std::time::Duration;
use thiserror::Error;

fn human(d: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*d)
}

/// Terminal failures of a capture session.
#[derive(Error, Debug)]
pub enum LocateError {
    #[error("could not start the local location service on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid location data received: {message}")]
    Decode { message: String },

    #[error(
        "timed out after {} (did you allow browser location access?)",
        human(.0)
    )]
    Timeout(Duration),

    #[error("local location service stopped unexpectedly: {0}")]
    Serve(#[source] std::io::Error),
}

/// Failures reading or writing the location cache. `Missing` and `Expired` are
/// expected outcomes; callers fall through to a live capture on either.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("no cached location")]
    Missing,

    #[error("cached location expired ({} old, ttl {})", human(.age), human(.ttl))]
    Expired { age: Duration, ttl: Duration },

    #[error("could not determine home directory for the location cache")]
    NoHome,

    #[error("location cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("location cache is corrupt: {0}")]
    Decode(#[from] serde_json::Error),
}

impl CacheError {
    /// True for the outcomes that simply mean "go capture a fresh location".
    pub fn is_stale(&self) -> bool {
        matches!(self, CacheError::Missing | CacheError::Expired { .. })
    }
}

/// The platform browser opener could not be started. Never fails a capture.
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("opening a browser is unsupported on this platform")]
    Unsupported,

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Failures talking to the Navitia transit API.
#[derive(Error, Debug)]
pub enum TransitError {
    #[error("invalid transit API URL {url}: {message}")]
    BadUrl { url: String, message: String },

    #[error("transit API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("not found (the API returned no results)")]
    NotFound,

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected transit API response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A `--mode` value that names no known transport mode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown mode {0:?} (valid: metro, rer, train, tram, bus, all)")]
pub struct UnknownMode(pub String);
