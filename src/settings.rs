use log::warn;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SERVER_URL: &str = "server.url";
const USERNAME: &str = "server.username";
const ALLOW_SELF_SIGNED: &str = "server.allow_self_signed";
const LOCK_ENABLED: &str = "lock.enabled";

/// Plain key/value persistence for non-secret settings and the cache
/// freshness clocks.
///
/// Best-effort: an unreadable file starts empty, a failed persist is logged
/// and swallowed. Secrets never go through here.
pub struct SettingsStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, Value>>,
}

impl SettingsStore {
    /// Opens the settings file, starting from an empty map when it is
    /// missing or unreadable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    warn!("settings file {} is not valid JSON: {e}", path.display());
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn server_url(&self) -> Option<String> {
        self.get_str(SERVER_URL)
    }

    pub fn set_server_url(&self, url: &str) {
        self.set(SERVER_URL, Value::from(url));
    }

    pub fn username(&self) -> Option<String> {
        self.get_str(USERNAME)
    }

    pub fn set_username(&self, username: &str) {
        self.set(USERNAME, Value::from(username));
    }

    pub fn allow_self_signed(&self) -> bool {
        self.get_bool(ALLOW_SELF_SIGNED).unwrap_or(false)
    }

    pub fn set_allow_self_signed(&self, allow: bool) {
        self.set(ALLOW_SELF_SIGNED, Value::from(allow));
    }

    pub fn lock_enabled(&self) -> bool {
        self.get_bool(LOCK_ENABLED).unwrap_or(false)
    }

    pub fn set_lock_enabled(&self, enabled: bool) {
        self.set(LOCK_ENABLED, Value::from(enabled));
    }

    /// Freshness clock for a cache collection, epoch seconds.
    pub(crate) fn stamp(&self, key: &str) -> Option<f64> {
        let values = self.values.lock().expect("settings lock");
        values.get(key).and_then(Value::as_f64)
    }

    pub(crate) fn set_stamp(&self, key: &str, epoch_seconds: f64) {
        self.set(key, Value::from(epoch_seconds));
    }

    pub(crate) fn clear_stamp(&self, key: &str) {
        self.remove(key);
    }

    pub fn clear_server_profile(&self) {
        self.remove(SERVER_URL);
        self.remove(USERNAME);
        self.remove(ALLOW_SELF_SIGNED);
    }

    fn get_str(&self, key: &str) -> Option<String> {
        let values = self.values.lock().expect("settings lock");
        values.get(key).and_then(Value::as_str).map(str::to_string)
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        let values = self.values.lock().expect("settings lock");
        values.get(key).and_then(Value::as_bool)
    }

    fn set(&self, key: &str, value: Value) {
        let mut values = self.values.lock().expect("settings lock");
        values.insert(key.to_string(), value);
        self.persist(&values);
    }

    fn remove(&self, key: &str) {
        let mut values = self.values.lock().expect("settings lock");
        if values.remove(key).is_some() {
            self.persist(&values);
        }
    }

    fn persist(&self, values: &BTreeMap<String, Value>) {
        if let Err(e) = write_atomically(&self.path, values) {
            warn!("failed to persist settings to {}: {e}", self.path.display());
        }
    }
}

/// Writes the serialized map to a sibling temp file, then renames it into
/// place so a reader never observes a partial write.
fn write_atomically(path: &Path, values: &BTreeMap<String, Value>) -> std::io::Result<()> {
    let bytes = serde_json::to_vec_pretty(values)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}
