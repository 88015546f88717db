//! Location cache persistence.
//!
//! A single JSON document at a fixed path holds the most recent location. Writes
//! replace it wholesale; freshness is only checked when reading.

use crate::error::CacheError;
use crate::model::{CachedLocation, Coordinates};
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::OffsetDateTime;

const CACHE_FILE_NAME: &str = ".metro_location_cache.json";

/// Default cache location: `~/.metro_location_cache.json`.
pub fn cache_path() -> Result<PathBuf, CacheError> {
    dirs::home_dir()
        .map(|home| home.join(CACHE_FILE_NAME))
        .ok_or(CacheError::NoHome)
}

/// Persist `coords` stamped with the current time to the default cache path.
pub fn save_location(coords: Coordinates) -> Result<PathBuf, CacheError> {
    let path = cache_path()?;
    save_location_at(&path, coords, OffsetDateTime::now_utc())?;
    Ok(path)
}

/// Load the cached location from the default path if it is younger than `ttl`.
pub fn load_location(ttl: Duration) -> Result<Coordinates, CacheError> {
    let path = cache_path()?;
    load_location_at(&path, ttl, OffsetDateTime::now_utc())
}

/// Remove the cache file. Returns whether a file was actually removed.
pub fn clear_location() -> Result<bool, CacheError> {
    let path = cache_path()?;
    clear_location_at(&path)
}

pub fn save_location_at(
    path: &Path,
    coords: Coordinates,
    now: OffsetDateTime,
) -> Result<(), CacheError> {
    let entry = CachedLocation::new(coords, now);
    let data = serde_json::to_vec(&entry)?;
    std::fs::write(path, data)?;
    tracing::debug!(path = %path.display(), %coords, "saved location cache");
    Ok(())
}

pub fn load_location_at(
    path: &Path,
    ttl: Duration,
    now: OffsetDateTime,
) -> Result<Coordinates, CacheError> {
    let entry = read_entry(path)?.ok_or(CacheError::Missing)?;
    let age = entry.age(now);
    if age > ttl {
        return Err(CacheError::Expired {
            age: Duration::from_secs(age.as_secs()),
            ttl,
        });
    }
    Ok(entry.coordinates())
}

/// Read the raw cache entry without any freshness check. `None` if absent.
pub fn read_entry(path: &Path) -> Result<Option<CachedLocation>, CacheError> {
    let data = match std::fs::read(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&data)?))
}

pub fn clear_location_at(path: &Path) -> Result<bool, CacheError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE_MINUTES: Duration = Duration::from_secs(300);

    fn cache_file(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join(CACHE_FILE_NAME)
    }

    #[test]
    fn save_then_load_within_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_file(&dir);
        let now = OffsetDateTime::now_utc();

        save_location_at(&path, Coordinates::new(48.8566, 2.3522), now).unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["lat"], 48.8566);
        assert_eq!(raw["lon"], 2.3522);
        assert!(raw["cached_at"].is_string());

        let loaded = load_location_at(&path, FIVE_MINUTES, now).unwrap();
        assert_eq!(loaded, Coordinates::new(48.8566, 2.3522));
    }

    #[test]
    fn old_entry_is_expired() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_file(&dir);
        let now = OffsetDateTime::now_utc();

        save_location_at(&path, Coordinates::new(48.0, 2.0), now - time::Duration::minutes(10))
            .unwrap();

        let err = load_location_at(&path, FIVE_MINUTES, now).unwrap_err();
        assert!(matches!(err, CacheError::Expired { .. }), "got {err:?}");
        assert!(err.is_stale());
    }

    #[test]
    fn absent_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_location_at(&cache_file(&dir), FIVE_MINUTES, OffsetDateTime::now_utc())
            .unwrap_err();
        assert!(matches!(err, CacheError::Missing));
    }

    #[test]
    fn corrupt_file_surfaces_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_file(&dir);
        std::fs::write(&path, b"{not json").unwrap();

        let err = load_location_at(&path, FIVE_MINUTES, OffsetDateTime::now_utc()).unwrap_err();
        assert!(matches!(err, CacheError::Decode(_)));
        assert!(!err.is_stale());
    }

    #[test]
    fn new_save_replaces_previous_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_file(&dir);
        let now = OffsetDateTime::now_utc();

        save_location_at(&path, Coordinates::new(1.0, 1.0), now).unwrap();
        save_location_at(&path, Coordinates::new(2.0, 3.0), now).unwrap();

        let entry = read_entry(&path).unwrap().unwrap();
        assert_eq!(entry.coordinates(), Coordinates::new(2.0, 3.0));
    }

    #[test]
    fn clear_reports_whether_anything_was_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_file(&dir);
        assert!(!clear_location_at(&path).unwrap());

        save_location_at(&path, Coordinates::new(1.0, 1.0), OffsetDateTime::now_utc()).unwrap();
        assert!(clear_location_at(&path).unwrap());
        assert!(!path.exists());
    }
}
