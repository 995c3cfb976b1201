//! Route guard decisions driven by published session state.
//!
//! SYSTEM CONTEXT
//! ==============
//! Routers call [`RouteGuard::evaluate`] before activating a route. Both
//! guards wait for the first restore so a reload never bounces a signed-in
//! user through the login page.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use super::session::SessionCoordinator;

pub const DASHBOARD_ROUTE: &str = "/dashboard";
pub const HOME_ROUTE: &str = "/home";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteGuard {
    /// Login/register pages; signed-in users go to the dashboard.
    Public,
    /// Pages that need a token; everyone else goes home.
    Protected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(&'static str),
}

impl RouteGuard {
    #[must_use]
    pub fn decide(self, logged_in: bool, has_token: bool) -> GuardDecision {
        match self {
            Self::Public if logged_in => GuardDecision::Redirect(DASHBOARD_ROUTE),
            Self::Protected if !has_token => GuardDecision::Redirect(HOME_ROUTE),
            Self::Public | Self::Protected => GuardDecision::Allow,
        }
    }

    /// Wait for initialization, then decide from the current state.
    pub async fn evaluate(self, session: &SessionCoordinator) -> GuardDecision {
        session.wait_initialized().await;
        let decision = self.decide(session.is_authenticated(), session.has_valid_token());
        tracing::debug!(guard = ?self, ?decision, "route guard evaluated");
        decision
    }
}
