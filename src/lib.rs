#![forbid(unsafe_code)]

mod app;
mod cache;
mod credentials;
mod error;
mod lock;
mod models;
mod provisioning;
mod service;
mod session;
mod settings;
mod views;

pub use app::AppSession;

pub use cache::{CacheStore, Collection, FRESHNESS_WINDOW};

pub use credentials::{CredentialStore, MemoryCredentialStore, PASSWORD_KEY};

pub use error::Error;

pub use lock::{ChallengeOutcome, LocalAuthenticator, LockState, SessionLock};

pub use models::{DirectoryGroup, DirectoryUser, QuotaRecord, ServerStatus};

pub use provisioning::{ProvisioningClient, ProvisioningClientBuilder};

pub use service::{DirectoryService, DirectoryStatus, SyncPhase};

pub use session::SessionContext;

pub use settings::SettingsStore;

pub use views::{
    filtered_groups, filtered_users, group_member_count, group_members, matches_search,
    sort_users, EnabledFilter, UserOrder,
};
