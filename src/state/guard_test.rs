use super::*;
use crate::net::types::UserProfile;
use crate::test_support::{DAY_MS, harness};

// =============================================================
// decide
// =============================================================

#[test]
fn public_guard_redirects_signed_in_users() {
    assert_eq!(RouteGuard::Public.decide(true, true), GuardDecision::Redirect(DASHBOARD_ROUTE));
    assert_eq!(RouteGuard::Public.decide(false, false), GuardDecision::Allow);
}

#[test]
fn protected_guard_requires_token() {
    assert_eq!(RouteGuard::Protected.decide(false, false), GuardDecision::Redirect(HOME_ROUTE));
    assert_eq!(RouteGuard::Protected.decide(false, true), GuardDecision::Allow);
}

// =============================================================
// evaluate
// =============================================================

#[tokio::test]
async fn evaluate_waits_for_initialization() {
    let h = harness();
    h.session.login("tok1", UserProfile::with_username("ann"));

    let session = h.session.clone();
    let guard = tokio::spawn(async move { RouteGuard::Public.evaluate(&session).await });
    tokio::task::yield_now().await;
    assert!(!guard.is_finished());

    h.session.initialized().publish(true);
    assert_eq!(guard.await.unwrap(), GuardDecision::Redirect(DASHBOARD_ROUTE));
}

#[tokio::test]
async fn evaluate_after_initialize_without_session() {
    let h = harness();
    h.session.initialize().await;
    assert_eq!(RouteGuard::Public.evaluate(&h.session).await, GuardDecision::Allow);
    assert_eq!(RouteGuard::Protected.evaluate(&h.session).await, GuardDecision::Redirect(HOME_ROUTE));
}

#[tokio::test]
async fn protected_guard_redirects_once_session_expires() {
    let h = harness();
    h.session.login("tok1", UserProfile::with_username("ann"));
    h.session.initialized().publish(true);
    assert_eq!(RouteGuard::Protected.evaluate(&h.session).await, GuardDecision::Allow);

    h.clock.advance(8 * DAY_MS);
    h.session.check_auth_state();
    assert_eq!(RouteGuard::Protected.evaluate(&h.session).await, GuardDecision::Redirect(HOME_ROUTE));
}
