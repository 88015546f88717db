pub mod config;
pub mod display;
pub mod error;
pub mod locate;
pub mod logging;
pub mod model;
pub mod storage;
pub mod transit;

pub use error::{CacheError, LaunchError, LocateError, TransitError};
pub use locate::LocationCapture;
pub use model::{CachedLocation, CaptureEvent, CaptureOptions, Coordinates};
pub use transit::{TransitClient, TransportMode};
