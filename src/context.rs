//! Execution context and wall clock.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session coordinator behaves differently during a server-rendered pass
//! (no durable storage, nothing to restore) than in an interactive client.
//! Both the context and the clock are injected so tests can pin them.

#[cfg(test)]
#[path = "context_test.rs"]
mod context_test;

use time::OffsetDateTime;

/// Where the coordinator is running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Browser or terminal client with access to durable storage.
    #[default]
    Interactive,
    /// Server-rendered pass; durable storage must not be touched.
    NonInteractive,
}

impl ExecutionContext {
    /// Detect the context from the build target.
    ///
    /// - `hydrate`: interactive when a `window` exists.
    /// - `ssr`: always non-interactive.
    /// - otherwise: interactive (native clients own their store).
    #[must_use]
    pub fn detect() -> Self {
        #[cfg(feature = "hydrate")]
        {
            if web_sys::window().is_some() { Self::Interactive } else { Self::NonInteractive }
        }
        #[cfg(all(feature = "ssr", not(feature = "hydrate")))]
        {
            Self::NonInteractive
        }
        #[cfg(not(any(feature = "ssr", feature = "hydrate")))]
        {
            Self::Interactive
        }
    }

    #[must_use]
    pub fn is_interactive(self) -> bool {
        self == Self::Interactive
    }
}

/// Source of epoch-millisecond timestamps for session records.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock backed by `time::OffsetDateTime`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        i64::try_from(nanos).unwrap_or(i64::MAX)
    }
}
