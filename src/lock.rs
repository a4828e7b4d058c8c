use crate::error::Error;
use async_trait::async_trait;
use log::debug;
use std::sync::Mutex;

/// Whether the session is currently gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Locked,
    Unlocked,
}

/// Result of one local-authentication challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeOutcome {
    Success,
    /// The operator dismissed the prompt; treated as a silent no-op.
    Cancelled,
    Failed(String),
}

/// The device's local authentication challenge (biometric, with passcode
/// fallback). Availability and modality are the platform's concern.
#[async_trait]
pub trait LocalAuthenticator: Send + Sync {
    fn is_available(&self) -> bool;
    async fn challenge(&self, reason: &str) -> ChallengeOutcome;
}

/// Gates access to the orchestrator and credential store behind a local
/// authentication challenge.
///
/// Cold start is `Unlocked` when the feature is disabled, `Locked`
/// otherwise. Background transitions re-lock only while the feature is
/// enabled. The state machine itself enforces nothing; the boundary
/// ([`crate::AppSession`]) consults it before handing anything out.
pub struct SessionLock {
    enabled: bool,
    state: Mutex<LockState>,
    authenticator: Box<dyn LocalAuthenticator>,
}

impl SessionLock {
    pub fn new(enabled: bool, authenticator: Box<dyn LocalAuthenticator>) -> Self {
        let initial = if enabled {
            LockState::Locked
        } else {
            LockState::Unlocked
        };
        Self {
            enabled,
            state: Mutex::new(initial),
            authenticator,
        }
    }

    pub fn state(&self) -> LockState {
        *self.state.lock().expect("lock state")
    }

    pub fn is_locked(&self) -> bool {
        self.state() == LockState::Locked
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn authenticator_available(&self) -> bool {
        self.authenticator.is_available()
    }

    /// Runs the local-authentication challenge.
    ///
    /// `Ok(true)` means the session is unlocked (including when it already
    /// was). `Ok(false)` is an operator cancellation, a silent no-op. Any
    /// other failure stays locked and surfaces its message.
    pub async fn unlock(&self, reason: &str) -> Result<bool, Error> {
        if !self.is_locked() {
            return Ok(true);
        }
        match self.authenticator.challenge(reason).await {
            ChallengeOutcome::Success => {
                *self.state.lock().expect("lock state") = LockState::Unlocked;
                debug!("session unlocked");
                Ok(true)
            }
            ChallengeOutcome::Cancelled => Ok(false),
            ChallengeOutcome::Failed(message) => Err(Error::LocalAuth(message)),
        }
    }

    /// Application moved to the background; re-locks iff the feature is
    /// enabled.
    pub fn on_background(&self) {
        if self.enabled {
            *self.state.lock().expect("lock state") = LockState::Locked;
            debug!("session locked on background transition");
        }
    }
}
