use crate::cache::CacheStore;
use crate::credentials::{CredentialStore, PASSWORD_KEY};
use crate::error::Error;
use crate::lock::{LocalAuthenticator, LockState, SessionLock};
use crate::provisioning::ProvisioningClient;
use crate::service::DirectoryService;
use crate::session::SessionContext;
use crate::settings::SettingsStore;
use log::warn;
use std::path::PathBuf;
use std::sync::Arc;

/// One signed-in server profile, with the orchestrator and credential
/// store gated behind the session lock.
///
/// This is the presentation boundary: while the lock is engaged, neither
/// [`directory`](AppSession::directory) nor
/// [`credentials`](AppSession::credentials) hand anything out.
pub struct AppSession {
    settings: Arc<SettingsStore>,
    credentials: Arc<dyn CredentialStore>,
    lock: SessionLock,
    directory: DirectoryService,
}

impl AppSession {
    /// Signs in to a server: persists the profile, stores the password in
    /// the secure store, and builds the session.
    pub fn sign_in(
        settings: Arc<SettingsStore>,
        credentials: Arc<dyn CredentialStore>,
        authenticator: Box<dyn LocalAuthenticator>,
        cache_dir: PathBuf,
        base_url: &str,
        username: &str,
        password: &str,
        allow_self_signed: bool,
    ) -> Result<Self, Error> {
        let context = SessionContext::new(base_url, username, password, allow_self_signed)?;
        settings.set_server_url(base_url);
        settings.set_username(username);
        settings.set_allow_self_signed(allow_self_signed);
        if let Err(e) = credentials.save(PASSWORD_KEY, password) {
            warn!("failed to store password in the secure store: {e}");
        }
        Self::build(settings, credentials, authenticator, cache_dir, context)
    }

    /// Restores the previously signed-in profile from settings and the
    /// secure store.
    pub fn restore(
        settings: Arc<SettingsStore>,
        credentials: Arc<dyn CredentialStore>,
        authenticator: Box<dyn LocalAuthenticator>,
        cache_dir: PathBuf,
    ) -> Result<Self, Error> {
        let base_url = settings.server_url().ok_or(Error::NotConfigured)?;
        let username = settings.username().ok_or(Error::NotConfigured)?;
        let password = credentials.load(PASSWORD_KEY).ok_or(Error::NotConfigured)?;
        let context = SessionContext::new(
            &base_url,
            username,
            password,
            settings.allow_self_signed(),
        )?;
        Self::build(settings, credentials, authenticator, cache_dir, context)
    }

    fn build(
        settings: Arc<SettingsStore>,
        credentials: Arc<dyn CredentialStore>,
        authenticator: Box<dyn LocalAuthenticator>,
        cache_dir: PathBuf,
        context: SessionContext,
    ) -> Result<Self, Error> {
        let client = ProvisioningClient::builder(context).build()?;
        let cache = CacheStore::new(cache_dir, Arc::clone(&settings));
        let directory = DirectoryService::new(client, cache);
        let lock = SessionLock::new(settings.lock_enabled(), authenticator);
        Ok(Self {
            settings,
            credentials,
            lock,
            directory,
        })
    }

    /// The orchestrator, unless the session is locked.
    pub fn directory(&self) -> Result<&DirectoryService, Error> {
        if self.lock.is_locked() {
            return Err(Error::SessionLocked);
        }
        Ok(&self.directory)
    }

    /// The secure credential store, unless the session is locked.
    pub fn credentials(&self) -> Result<&dyn CredentialStore, Error> {
        if self.lock.is_locked() {
            return Err(Error::SessionLocked);
        }
        Ok(self.credentials.as_ref())
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn lock_state(&self) -> LockState {
        self.lock.state()
    }

    /// Runs the local-authentication challenge; see [`SessionLock::unlock`].
    pub async fn unlock(&self, reason: &str) -> Result<bool, Error> {
        self.lock.unlock(reason).await
    }

    /// Application lifecycle hook: moving to the background re-locks when
    /// the lock feature is enabled.
    pub fn on_background(&self) {
        self.lock.on_background();
    }

    /// Clears the stored credentials, the server profile, and the whole
    /// cache. Local-only; the server is not contacted.
    pub fn sign_out(self) {
        if let Err(e) = self.credentials.clear_all() {
            warn!("failed to clear the secure store: {e}");
        }
        self.directory.cache().purge_all();
        self.settings.clear_server_profile();
    }
}
