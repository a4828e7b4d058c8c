use crate::settings::SettingsStore;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;

/// Age at which a cached collection stops being served.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(3600);

/// The two independently-cached collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Users,
    Groups,
}

impl Collection {
    const ALL: [Collection; 2] = [Collection::Users, Collection::Groups];

    fn file_name(self) -> &'static str {
        match self {
            Collection::Users => "users.json",
            Collection::Groups => "groups.json",
        }
    }

    fn stamp_key(self) -> &'static str {
        match self {
            Collection::Users => "cache.users.fetched_at",
            Collection::Groups => "cache.groups.fetched_at",
        }
    }
}

/// Durable, best-effort persistence of the last-known collections.
///
/// Snapshots live one file per collection under the cache directory; the
/// freshness clocks live in settings storage, separate from file content.
/// Caching is an optimization only; no method here surfaces a failure.
pub struct CacheStore {
    dir: PathBuf,
    settings: Arc<SettingsStore>,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>, settings: Arc<SettingsStore>) -> Self {
        Self {
            dir: dir.into(),
            settings,
        }
    }

    /// The platform cache directory for this crate, when one exists.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("ocsadmin"))
    }

    /// Persists a snapshot atomically, then stamps the collection's
    /// freshness clock. Failures are logged and swallowed.
    pub fn write<T: Serialize>(&self, collection: Collection, snapshot: &T) {
        let path = self.dir.join(collection.file_name());
        let bytes = match serde_json::to_vec(snapshot) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("failed to serialize {collection:?} snapshot: {e}");
                return;
            }
        };
        if let Err(e) = fs::create_dir_all(&self.dir) {
            warn!("failed to create cache dir {}: {e}", self.dir.display());
            return;
        }
        let tmp = path.with_extension("json.tmp");
        let written = fs::write(&tmp, &bytes).and_then(|()| fs::rename(&tmp, &path));
        match written {
            Ok(()) => {
                self.settings
                    .set_stamp(collection.stamp_key(), now_epoch_seconds());
                debug!("cached {collection:?} snapshot ({} bytes)", bytes.len());
            }
            Err(e) => warn!("failed to cache {collection:?} snapshot: {e}"),
        }
    }

    /// Returns the last-written snapshot while its freshness clock is
    /// inside the window; `None` when the clock is absent or stale, or the
    /// file is missing or undecodable. Staleness is determined purely by
    /// the clock, never by file content.
    pub fn read<T: DeserializeOwned>(&self, collection: Collection) -> Option<T> {
        let stamp = self.settings.stamp(collection.stamp_key())?;
        let age = now_epoch_seconds() - stamp;
        if age >= FRESHNESS_WINDOW.as_secs_f64() {
            debug!("{collection:?} cache is stale ({age:.0}s old)");
            return None;
        }
        let path = self.dir.join(collection.file_name());
        let bytes = fs::read(&path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("discarding undecodable {collection:?} cache: {e}");
                None
            }
        }
    }

    /// Removes one collection's snapshot and freshness clock. Idempotent.
    pub fn purge(&self, collection: Collection) {
        let path = self.dir.join(collection.file_name());
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to remove {}: {e}", path.display());
            }
        }
        self.settings.clear_stamp(collection.stamp_key());
    }

    /// Removes every collection's snapshot and clock; used on credential
    /// clear and explicit cache clear.
    pub fn purge_all(&self) {
        for collection in Collection::ALL {
            self.purge(collection);
        }
    }
}

fn now_epoch_seconds() -> f64 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() as f64 / 1e9
}
