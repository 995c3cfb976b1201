//! Session state coordinator.
//!
//! ARCHITECTURE
//! ============
//! [`SessionCoordinator`] owns three published channels (logged-in flag,
//! cached profile, initialized flag), an in-memory token cache, and the
//! session record in the durable store. It is constructed once at startup
//! with its store, backend client, clock and execution context injected, and
//! cloned freely into the components that need it.
//!
//! LIFECYCLE
//! =========
//! - `initialize`: non-interactive contexts publish "initialized, logged out"
//!   without touching storage; interactive contexts defer one tick, restore
//!   the persisted session, then publish "initialized".
//! - `login` / `logout`: always publish, persist only when interactive.
//! - profile writes: applied only if the session was not ended or replaced
//!   and no newer profile write started while the request was in flight
//!   (generation counters).

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::auth::{AUTH_DATA_KEY, AuthState, SESSION_KEYS, SessionRecord, TOKEN_KEY, USER_KEY};
use super::channel::Channel;
use crate::config::ClientConfig;
use crate::context::{Clock, ExecutionContext, SystemClock};
use crate::net::api::AuthApi;
use crate::net::error::ApiError;
use crate::net::types::{ApiUser, ProfilePatch, UserProfile};
use crate::util::storage::{DurableStore, StoreError};

#[derive(Debug, thiserror::Error)]
enum RestoreError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("malformed session data: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Outcome of a profile write (update or refresh).
#[derive(Clone, Debug, PartialEq)]
pub enum ProfileUpdate {
    /// Server profile merged, persisted and published.
    Applied(UserProfile),
    /// A logout, login or newer profile write superseded this response.
    Stale,
    /// No token available; nothing was sent.
    NoToken,
}

#[derive(Debug, Default)]
struct Credentials {
    token: Option<String>,
    refresh: Option<String>,
}

struct Inner {
    store: Arc<dyn DurableStore>,
    api: Arc<dyn AuthApi>,
    clock: Arc<dyn Clock>,
    context: ExecutionContext,
    config: ClientConfig,
    logged_in: Channel<bool>,
    profile: Channel<Option<UserProfile>>,
    initialized: Channel<bool>,
    credentials: Mutex<Credentials>,
    /// Bumped by every login and logout.
    session_generation: AtomicU64,
    /// Bumped by every profile update or refresh.
    profile_generation: AtomicU64,
}

/// Shared handle to the session state; clones refer to the same session.
#[derive(Clone)]
pub struct SessionCoordinator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("context", &self.inner.context)
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

pub struct SessionCoordinatorBuilder {
    store: Arc<dyn DurableStore>,
    api: Arc<dyn AuthApi>,
    clock: Arc<dyn Clock>,
    context: ExecutionContext,
    config: ClientConfig,
}

impl SessionCoordinatorBuilder {
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn context(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn build(self) -> SessionCoordinator {
        SessionCoordinator {
            inner: Arc::new(Inner {
                store: self.store,
                api: self.api,
                clock: self.clock,
                context: self.context,
                config: self.config,
                logged_in: Channel::new(false),
                profile: Channel::new(None),
                initialized: Channel::new(false),
                credentials: Mutex::new(Credentials::default()),
                session_generation: AtomicU64::new(0),
                profile_generation: AtomicU64::new(0),
            }),
        }
    }
}

impl SessionCoordinator {
    /// Start building a coordinator with the detected context, system clock
    /// and default config.
    #[must_use]
    pub fn builder(store: Arc<dyn DurableStore>, api: Arc<dyn AuthApi>) -> SessionCoordinatorBuilder {
        SessionCoordinatorBuilder {
            store,
            api,
            clock: Arc::new(SystemClock),
            context: ExecutionContext::detect(),
            config: ClientConfig::default(),
        }
    }

    // =========================================================================
    // CHANNELS & ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn logged_in(&self) -> &Channel<bool> {
        &self.inner.logged_in
    }

    #[must_use]
    pub fn profile(&self) -> &Channel<Option<UserProfile>> {
        &self.inner.profile
    }

    #[must_use]
    pub fn initialized(&self) -> &Channel<bool> {
        &self.inner.initialized
    }

    #[must_use]
    pub fn context(&self) -> ExecutionContext {
        self.inner.context
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.logged_in.get()
    }

    /// Last published profile.
    #[must_use]
    pub fn current_user(&self) -> Option<UserProfile> {
        self.inner.profile.get()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.get()
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        AuthState {
            logged_in: self.is_authenticated(),
            user: self.current_user(),
            initialized: self.is_initialized(),
        }
    }

    /// Resolve once the first restore has finished.
    pub async fn wait_initialized(&self) {
        self.inner.initialized.wait_for(|ready| *ready).await;
    }

    /// Current bearer token: memory cache first, then the unified record,
    /// then the legacy token key.
    #[must_use]
    pub fn auth_token(&self) -> Option<String> {
        if let Some(token) = self.credentials().token.clone() {
            return Some(token);
        }
        if !self.inner.context.is_interactive() {
            return None;
        }
        match self.stored_token() {
            Ok(Some(token)) => {
                self.credentials().token = Some(token.clone());
                Some(token)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::error!(error = %e, "failed to read stored auth token");
                None
            }
        }
    }

    /// Whether any non-empty token is available (route guards).
    #[must_use]
    pub fn has_valid_token(&self) -> bool {
        self.auth_token().is_some_and(|token| !token.is_empty())
    }

    /// Refresh credential saved with the session, if the backend issued one.
    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        if let Some(refresh) = self.credentials().refresh.clone() {
            return Some(refresh);
        }
        if !self.inner.context.is_interactive() {
            return None;
        }
        self.read_record().ok().flatten().and_then(|record| record.refresh)
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Run the startup restore and publish `initialized = true`.
    pub async fn initialize(&self) {
        if !self.inner.context.is_interactive() {
            tracing::debug!("non-interactive context; marking session initialized without restore");
            self.inner.initialized.publish(true);
            return;
        }
        defer(self.inner.config.startup_delay).await;
        self.check_auth_state();
        self.inner.initialized.publish(true);
    }

    /// Restore the session from the durable store and publish the result.
    ///
    /// Invalid or expired records are removed; a legacy token/user pair is
    /// migrated into a unified record. Malformed data clears every session
    /// key and publishes logged-out.
    pub fn check_auth_state(&self) {
        if !self.inner.context.is_interactive() {
            tracing::debug!("non-interactive context; skipping session restore");
            return;
        }
        match self.restore() {
            Ok(Some(record)) => {
                tracing::debug!(username = ?record.user.username, "session restored");
                {
                    let mut credentials = self.credentials();
                    credentials.token = Some(record.token);
                    credentials.refresh = record.refresh;
                }
                self.publish(true, Some(record.user));
            }
            Ok(None) => {
                tracing::debug!("no stored session");
                self.end_session();
            }
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable session data");
                self.clear_store();
                self.end_session();
            }
        }
    }

    /// Re-run the restore on demand.
    pub fn refresh_auth_state(&self) {
        self.check_auth_state();
    }

    /// Record a successful login and publish it.
    pub fn login(&self, token: impl Into<String>, profile: UserProfile) {
        self.login_with_refresh(token, profile, None);
    }

    /// Like [`SessionCoordinator::login`], also keeping the refresh credential
    /// for backend logout.
    pub fn login_with_refresh(&self, token: impl Into<String>, profile: UserProfile, refresh: Option<String>) {
        let token = token.into();
        self.inner.session_generation.fetch_add(1, Ordering::SeqCst);
        let record = SessionRecord { token, user: profile, timestamp: self.inner.clock.now_millis(), refresh };
        self.persist(&record);
        tracing::debug!(username = ?record.user.username, "user logged in");
        self.publish(true, Some(record.user));
    }

    /// Drop the session from memory and storage and publish logged-out.
    pub fn logout(&self) {
        self.clear_store();
        self.end_session();
        tracing::info!("user logged out");
    }

    /// Publish logged-out without touching the durable store.
    pub fn clear_auth_state(&self) {
        self.end_session();
    }

    /// Every logged-out transition: supersede in-flight profile writes, drop
    /// the cached credentials, publish.
    fn end_session(&self) {
        self.inner.session_generation.fetch_add(1, Ordering::SeqCst);
        *self.credentials() = Credentials::default();
        self.publish(false, None);
    }

    // =========================================================================
    // PROFILE
    // =========================================================================

    /// Send a partial profile update and apply the server's result.
    ///
    /// # Errors
    ///
    /// Returns the backend or network error; local state is left untouched.
    pub async fn update_user_profile(&self, patch: &ProfilePatch) -> Result<ProfileUpdate, ApiError> {
        let Some(token) = self.auth_token() else {
            tracing::warn!("no access token; skipping profile update");
            return Ok(ProfileUpdate::NoToken);
        };
        let generations = self.begin_profile_write();
        let updated = self.inner.api.update_profile(&token, patch).await?;
        Ok(self.apply_profile(generations, token, updated))
    }

    /// Re-fetch the profile from the server and merge it into the cache.
    ///
    /// # Errors
    ///
    /// Returns the backend or network error; local state is left untouched.
    pub async fn refresh_profile(&self) -> Result<ProfileUpdate, ApiError> {
        let Some(token) = self.auth_token() else {
            tracing::warn!("no access token; skipping profile refresh");
            return Ok(ProfileUpdate::NoToken);
        };
        let generations = self.begin_profile_write();
        let fetched = self.inner.api.fetch_profile(&token).await?;
        Ok(self.apply_profile(generations, token, fetched))
    }

    fn begin_profile_write(&self) -> (u64, u64) {
        let session = self.inner.session_generation.load(Ordering::SeqCst);
        let profile = self.inner.profile_generation.fetch_add(1, Ordering::SeqCst) + 1;
        (session, profile)
    }

    fn apply_profile(&self, (session, profile): (u64, u64), token: String, server: ApiUser) -> ProfileUpdate {
        if session != self.inner.session_generation.load(Ordering::SeqCst)
            || profile != self.inner.profile_generation.load(Ordering::SeqCst)
        {
            tracing::debug!(session, profile, "discarding superseded profile response");
            return ProfileUpdate::Stale;
        }
        let mut merged = self.current_user().unwrap_or_default();
        merged.merge(server.into());
        let refresh = self.credentials().refresh.clone();
        let record = SessionRecord { token, user: merged, timestamp: self.inner.clock.now_millis(), refresh };
        self.persist(&record);
        tracing::debug!(username = ?record.user.username, "profile updated");
        self.inner.profile.publish(Some(record.user.clone()));
        ProfileUpdate::Applied(record.user)
    }

    // =========================================================================
    // STORAGE
    // =========================================================================

    fn credentials(&self) -> MutexGuard<'_, Credentials> {
        self.inner.credentials.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, logged_in: bool, user: Option<UserProfile>) {
        self.inner.logged_in.publish(logged_in);
        self.inner.profile.publish(user);
    }

    fn read_record(&self) -> Result<Option<SessionRecord>, RestoreError> {
        match self.inner.store.get_item(AUTH_DATA_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn stored_token(&self) -> Result<Option<String>, RestoreError> {
        let token = match self.read_record()? {
            Some(record) => Some(record.token),
            None => self.inner.store.get_item(TOKEN_KEY)?,
        };
        Ok(token.filter(|t| !t.is_empty()))
    }

    fn restore(&self) -> Result<Option<SessionRecord>, RestoreError> {
        if let Some(record) = self.read_record()? {
            let now = self.inner.clock.now_millis();
            match record.validate(now, self.inner.config.session_max_age_millis()) {
                Ok(()) => return Ok(Some(record)),
                Err(reason) => {
                    tracing::info!(?reason, "stored session rejected; clearing");
                    self.clear_store();
                }
            }
        }

        let token = self.inner.store.get_item(TOKEN_KEY)?.filter(|t| !t.is_empty());
        let user = self.inner.store.get_item(USER_KEY)?;
        let (Some(token), Some(user)) = (token, user) else {
            return Ok(None);
        };
        let user: UserProfile = serde_json::from_str(&user)?;
        let record = SessionRecord::new(token, user, self.inner.clock.now_millis());
        match self.write_record(&record) {
            Ok(()) => tracing::info!("migrated legacy session storage"),
            Err(e) => tracing::error!(error = %e, "failed to persist migrated session"),
        }
        Ok(Some(record))
    }

    /// Unified record first; the legacy keys follow for older readers.
    fn write_record(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let store = &self.inner.store;
        store.set_item(AUTH_DATA_KEY, &serde_json::to_string(record)?)?;
        let legacy = serde_json::to_string(&record.user)
            .map_err(StoreError::from)
            .and_then(|user| {
                store.set_item(TOKEN_KEY, &record.token)?;
                store.set_item(USER_KEY, &user)
            });
        if let Err(e) = legacy {
            tracing::warn!(error = %e, "failed to write legacy session keys");
        }
        Ok(())
    }

    fn persist(&self, record: &SessionRecord) {
        {
            let mut credentials = self.credentials();
            credentials.token = Some(record.token.clone());
            credentials.refresh.clone_from(&record.refresh);
        }
        if !self.inner.context.is_interactive() {
            tracing::debug!("non-interactive context; session kept in memory only");
            return;
        }
        if let Err(e) = self.write_record(record) {
            tracing::error!(error = %e, "failed to persist session");
        }
    }

    fn clear_store(&self) {
        if !self.inner.context.is_interactive() {
            return;
        }
        for key in SESSION_KEYS {
            if let Err(e) = self.inner.store.remove_item(key) {
                tracing::error!(error = %e, key, "failed to clear session key");
            }
        }
    }
}

async fn defer(delay: Duration) {
    #[cfg(feature = "hydrate")]
    {
        gloo_timers::future::sleep(delay).await;
    }
    #[cfg(not(feature = "hydrate"))]
    {
        tokio::time::sleep(delay).await;
    }
}
