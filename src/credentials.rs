use crate::error::Error;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Key under which the active profile's password is stored.
pub const PASSWORD_KEY: &str = "server.password";

/// Narrow interface over the platform's secure key/value storage.
///
/// Implementations wrap hardware-backed stores (keychain, keystore); this
/// crate never sees how the secret is protected. Save/delete failures are
/// non-fatal for callers, which log and continue.
pub trait CredentialStore: Send + Sync {
    fn save(&self, key: &str, secret: &str) -> Result<(), Error>;
    fn load(&self, key: &str) -> Option<String>;
    fn delete(&self, key: &str) -> Result<(), Error>;
    fn clear_all(&self) -> Result<(), Error>;
}

/// In-memory store for tests and embedding contexts without a platform
/// keychain.
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn save(&self, key: &str, secret: &str) -> Result<(), Error> {
        let mut entries = self.entries.lock().expect("credential lock");
        entries.insert(key.to_string(), secret.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().expect("credential lock");
        entries.get(key).cloned()
    }

    fn delete(&self, key: &str) -> Result<(), Error> {
        let mut entries = self.entries.lock().expect("credential lock");
        entries.remove(key);
        Ok(())
    }

    fn clear_all(&self) -> Result<(), Error> {
        let mut entries = self.entries.lock().expect("credential lock");
        entries.clear();
        Ok(())
    }
}
