//! Persisted session record and published auth snapshot.
//!
//! SYSTEM CONTEXT
//! ==============
//! Used by the session coordinator when restoring or writing storage, and by
//! route guards and user-aware components that render from a snapshot.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use serde::{Deserialize, Serialize};

use crate::net::types::UserProfile;

/// Unified session record key.
pub const AUTH_DATA_KEY: &str = "authData";
/// Legacy token key, still written for older readers.
pub const TOKEN_KEY: &str = "authToken";
/// Legacy profile key, still written for older readers.
pub const USER_KEY: &str = "userData";

/// Every key the session layer owns in the durable store.
pub const SESSION_KEYS: [&str; 3] = [AUTH_DATA_KEY, TOKEN_KEY, USER_KEY];

/// Session record stored under [`AUTH_DATA_KEY`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub token: String,
    pub user: UserProfile,
    /// Creation time in epoch milliseconds.
    pub timestamp: i64,
    /// Refresh credential for backend logout; absent in older records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

/// Why a stored record was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordRejection {
    EmptyToken,
    Expired { age_ms: i64 },
}

impl SessionRecord {
    #[must_use]
    pub fn new(token: impl Into<String>, user: UserProfile, timestamp: i64) -> Self {
        Self { token: token.into(), user, timestamp, refresh: None }
    }

    /// Check the record at `now_ms` against `max_age_ms`.
    ///
    /// Records stamped in the future are accepted; only age beyond the
    /// maximum invalidates them.
    ///
    /// # Errors
    ///
    /// Returns the reason the record must be discarded.
    pub fn validate(&self, now_ms: i64, max_age_ms: i64) -> Result<(), RecordRejection> {
        if self.token.trim().is_empty() {
            return Err(RecordRejection::EmptyToken);
        }
        let age_ms = now_ms.saturating_sub(self.timestamp);
        if age_ms > max_age_ms {
            return Err(RecordRejection::Expired { age_ms });
        }
        Ok(())
    }
}

/// Point-in-time view of the three published channels.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthState {
    pub logged_in: bool,
    pub user: Option<UserProfile>,
    pub initialized: bool,
}

impl AuthState {
    /// Still waiting for the first restore.
    #[must_use]
    pub fn loading(&self) -> bool {
        !self.initialized
    }
}
