use crate::cache::{CacheStore, Collection};
use crate::error::Error;
use crate::models::{DirectoryGroup, DirectoryUser};
use crate::provisioning::ProvisioningClient;
use crate::views::{self, EnabledFilter, UserOrder};
use log::warn;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// How long a mutation acknowledgment stays visible.
const NOTICE_TTL: Duration = Duration::from_secs(4);

/// Where one synchronization cycle currently stands.
///
/// `PartialSuccess` (some users skipped, or one of the two collections
/// failed) is displayable, with a non-blocking message attached; it is
/// not a fatal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    Loading,
    Success,
    PartialSuccess,
    Failed,
}

/// Snapshot of the orchestrator's reporting surface.
#[derive(Debug, Clone)]
pub struct DirectoryStatus {
    pub phase: SyncPhase,
    /// Last surfaced error, cleared on the next attempted operation.
    pub error: Option<String>,
    /// Transient mutation acknowledgment, auto-dismissed.
    pub notice: Option<String>,
}

#[derive(Default)]
struct DirectoryState {
    users: BTreeMap<String, DirectoryUser>,
    groups: Vec<DirectoryGroup>,
    phase: SyncPhase,
    error: Option<String>,
    notice: Option<String>,
    notice_seq: u64,
    /// Generation of the load whose results are currently applied, per
    /// collection; stale syncs are discarded against these.
    users_generation: u64,
    groups_generation: u64,
}

/// The single coordination point the presentation layer talks to.
///
/// Owns the in-memory collections and serializes every state write through
/// itself; the two per-collection synchronizations inside [`load_all`] are
/// the only concurrent work, and mutations are serialized behind one gate.
///
/// [`load_all`]: DirectoryService::load_all
pub struct DirectoryService {
    client: ProvisioningClient,
    cache: CacheStore,
    state: Arc<Mutex<DirectoryState>>,
    mutation_gate: tokio::sync::Mutex<()>,
    load_counter: AtomicU64,
}

impl DirectoryService {
    pub fn new(client: ProvisioningClient, cache: CacheStore) -> Self {
        Self {
            client,
            cache,
            state: Arc::new(Mutex::new(DirectoryState::default())),
            mutation_gate: tokio::sync::Mutex::new(()),
            load_counter: AtomicU64::new(0),
        }
    }

    pub fn client(&self) -> &ProvisioningClient {
        &self.client
    }

    /// Loads both collections.
    ///
    /// Unless `force_refresh` is set, in-memory state is first populated
    /// from the cache so presentation has something to show immediately.
    /// The two network synchronizations then run concurrently; their
    /// failures are independent, and the loading phase spans until both
    /// complete. Each cycle carries a monotonic generation, and results older
    /// than the currently-applied ones are discarded.
    pub async fn load_all(&self, force_refresh: bool) {
        let generation = self.load_counter.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.lock_state();
            state.error = None;
            state.phase = SyncPhase::Loading;
        }

        if !force_refresh {
            self.populate_from_cache();
        }

        let (users_outcome, groups_outcome) =
            tokio::join!(self.sync_users(generation), self.sync_groups(generation));

        // A newer load owns the reporting surface once it has started.
        if self.load_counter.load(Ordering::SeqCst) != generation {
            return;
        }
        let mut state = self.lock_state();
        state.phase = cycle_phase(&users_outcome, &groups_outcome);
        // First error wins: a group-sync failure never overwrites one the
        // user-sync already produced. Skipped users degrade to a
        // non-blocking message of their own.
        state.error = users_outcome
            .as_ref()
            .err()
            .or(groups_outcome.as_ref().err())
            .map(Error::surface_message)
            .or(match users_outcome {
                Ok(skipped) if skipped > 0 => {
                    Some(format!("{skipped} user(s) could not be loaded"))
                }
                _ => None,
            });
    }

    fn populate_from_cache(&self) {
        let cached_users: Option<Vec<DirectoryUser>> = self.cache.read(Collection::Users);
        let cached_groups: Option<Vec<DirectoryGroup>> = self.cache.read(Collection::Groups);
        let mut state = self.lock_state();
        if state.users.is_empty() {
            if let Some(users) = cached_users {
                state.users = users
                    .into_iter()
                    .map(|u| (u.user_id.clone(), u))
                    .collect();
            }
        }
        if state.groups.is_empty() {
            if let Some(groups) = cached_groups {
                state.groups = groups;
            }
        }
    }

    /// Fetches the id list, then every detail sequentially in list order.
    ///
    /// A per-user failure is logged and that user skipped, so one unreachable
    /// account never prevents the rest of the directory from loading.
    /// Returns the number of users skipped.
    async fn sync_users(&self, generation: u64) -> Result<usize, Error> {
        let ids = self.client.get_user_list().await?;
        let mut users = BTreeMap::new();
        let mut skipped = 0usize;
        for id in &ids {
            match self.client.get_user(id).await {
                Ok(user) => {
                    users.insert(user.user_id.clone(), user);
                }
                Err(err) => {
                    warn!("skipping user {id}: {}", err.surface_message());
                    skipped += 1;
                }
            }
        }

        let snapshot: Vec<DirectoryUser> = users.values().cloned().collect();
        let applied = {
            let mut state = self.lock_state();
            if generation >= state.users_generation {
                state.users_generation = generation;
                state.users = users;
                true
            } else {
                false
            }
        };
        if applied {
            self.cache.write(Collection::Users, &snapshot);
        }
        Ok(skipped)
    }

    async fn sync_groups(&self, generation: u64) -> Result<(), Error> {
        let names = self.client.get_group_list().await?;
        let mut groups: Vec<DirectoryGroup> = names
            .into_iter()
            .map(|name| DirectoryGroup { name })
            .collect();
        groups.sort();

        let applied = {
            let mut state = self.lock_state();
            if generation >= state.groups_generation {
                state.groups_generation = generation;
                state.groups = groups.clone();
                true
            } else {
                false
            }
        };
        if applied {
            self.cache.write(Collection::Groups, &groups);
        }
        Ok(())
    }

    /// Flips the user's enabled state, deciding from the *current*
    /// in-memory value, never presentation-stale state. On success the
    /// affected user is re-fetched and replaced in place; on failure prior
    /// state is left untouched.
    pub async fn toggle_enabled(&self, user_id: &str) -> Result<(), Error> {
        let _gate = self.mutation_gate.lock().await;
        self.begin_operation();

        let enabled = {
            let state = self.lock_state();
            state.users.get(user_id).map(|u| u.enabled)
        };
        let Some(enabled) = enabled else {
            let err = Error::UnknownUser(user_id.to_string());
            self.surface_error(&err);
            return Err(err);
        };

        let outcome = if enabled {
            self.client.disable_user(user_id).await
        } else {
            self.client.enable_user(user_id).await
        };
        if let Err(err) = outcome {
            self.surface_error(&err);
            return Err(err);
        }

        self.refresh_user(user_id).await?;
        let verb = if enabled { "disabled" } else { "enabled" };
        self.publish_notice(format!("{user_id} {verb}"));
        Ok(())
    }

    /// Adds the user to a group remotely, then re-fetches the single
    /// affected user. The groups list is never patched speculatively; the
    /// post-mutation re-fetch is the single source of truth.
    pub async fn add_to_group(&self, user_id: &str, group: &str) -> Result<(), Error> {
        let _gate = self.mutation_gate.lock().await;
        self.begin_operation();
        if let Err(err) = self.client.add_to_group(user_id, group).await {
            self.surface_error(&err);
            return Err(err);
        }
        self.refresh_user(user_id).await?;
        self.publish_notice(format!("{user_id} added to {group}"));
        Ok(())
    }

    /// Counterpart of [`add_to_group`](DirectoryService::add_to_group).
    pub async fn remove_from_group(&self, user_id: &str, group: &str) -> Result<(), Error> {
        let _gate = self.mutation_gate.lock().await;
        self.begin_operation();
        if let Err(err) = self.client.remove_from_group(user_id, group).await {
            self.surface_error(&err);
            return Err(err);
        }
        self.refresh_user(user_id).await?;
        self.publish_notice(format!("{user_id} removed from {group}"));
        Ok(())
    }

    async fn refresh_user(&self, user_id: &str) -> Result<(), Error> {
        match self.client.get_user(user_id).await {
            Ok(user) => {
                let mut state = self.lock_state();
                state.users.insert(user.user_id.clone(), user);
                Ok(())
            }
            Err(err) => {
                self.surface_error(&err);
                Err(err)
            }
        }
    }

    /// Explicit, user-initiated cache clear.
    pub fn clear_cache(&self) {
        self.cache.purge_all();
    }

    pub(crate) fn cache(&self) -> &CacheStore {
        &self.cache
    }

    // -- reporting surface --------------------------------------------------

    pub fn status(&self) -> DirectoryStatus {
        let state = self.lock_state();
        DirectoryStatus {
            phase: state.phase,
            error: state.error.clone(),
            notice: state.notice.clone(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.lock_state().phase == SyncPhase::Loading
    }

    fn begin_operation(&self) {
        self.lock_state().error = None;
    }

    fn surface_error(&self, err: &Error) {
        self.lock_state().error = Some(err.surface_message());
    }

    fn publish_notice(&self, text: String) {
        let seq = {
            let mut state = self.lock_state();
            state.notice_seq += 1;
            state.notice = Some(text);
            state.notice_seq
        };
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            tokio::time::sleep(NOTICE_TTL).await;
            let mut state = state.lock().expect("state mutex poisoned");
            if state.notice_seq == seq {
                state.notice = None;
            }
        });
    }

    // -- derived views ------------------------------------------------------

    /// All users, ordered by identifier.
    pub fn users(&self) -> Vec<DirectoryUser> {
        self.lock_state().users.values().cloned().collect()
    }

    pub fn user(&self, user_id: &str) -> Option<DirectoryUser> {
        self.lock_state().users.get(user_id).cloned()
    }

    pub fn filtered_users(
        &self,
        filter: EnabledFilter,
        search: &str,
        order: UserOrder,
    ) -> Vec<DirectoryUser> {
        let snapshot = self.users();
        views::filtered_users(&snapshot, filter, search, order)
    }

    /// All groups, ordered by name.
    pub fn groups(&self) -> Vec<DirectoryGroup> {
        self.lock_state().groups.clone()
    }

    pub fn filtered_groups(&self, search: &str) -> Vec<DirectoryGroup> {
        let snapshot = self.lock_state().groups.clone();
        views::filtered_groups(&snapshot, search)
    }

    pub fn group_member_count(&self, group: &str) -> usize {
        let snapshot = self.users();
        views::group_member_count(&snapshot, group)
    }

    pub fn group_members(&self, group: &str) -> Vec<DirectoryUser> {
        let snapshot = self.users();
        views::group_members(&snapshot, group)
    }

    fn lock_state(&self) -> MutexGuard<'_, DirectoryState> {
        self.state.lock().expect("state mutex poisoned")
    }
}

fn cycle_phase(users: &Result<usize, Error>, groups: &Result<(), Error>) -> SyncPhase {
    match (users, groups) {
        (Ok(0), Ok(())) => SyncPhase::Success,
        (Err(_), Err(_)) => SyncPhase::Failed,
        _ => SyncPhase::PartialSuccess,
    }
}
