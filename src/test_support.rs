//! Shared fakes for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::config::ClientConfig;
use crate::context::{Clock, ExecutionContext};
use crate::net::api::AuthApi;
use crate::net::error::{ApiError, BackendError};
use crate::net::types::{
    ApiUser, AuthResponse, ForgotPasswordRequest, LoginRequest, LogoutRequest, MessageResponse,
    PasswordChangeRequest, ProfilePatch, RegisterRequest, ResetPasswordRequest,
};
use crate::state::session::SessionCoordinator;
use crate::util::storage::MemoryStore;

pub(crate) const NOW: i64 = 1_750_000_000_000;
pub(crate) const DAY_MS: i64 = 24 * 60 * 60 * 1000;

// =============================================================================
// CLOCK
// =============================================================================

#[derive(Debug)]
pub(crate) struct FixedClock(AtomicI64);

impl FixedClock {
    pub(crate) fn at(now: i64) -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(now)))
    }

    pub(crate) fn advance(&self, ms: i64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

// =============================================================================
// API
// =============================================================================

#[derive(Clone, Debug)]
pub(crate) struct Call {
    pub method: &'static str,
    pub token: Option<String>,
    pub body: Value,
}

enum FakeResponse {
    Json(Value),
    Status(u16, String),
    Network,
}

#[derive(Default)]
struct FakeState {
    responses: HashMap<&'static str, VecDeque<FakeResponse>>,
    gates: HashMap<&'static str, VecDeque<oneshot::Receiver<()>>>,
    calls: Vec<Call>,
}

/// Scripted [`AuthApi`]: responses are queued per method name and consumed
/// in call order. Unscripted calls fail with a network error.
#[derive(Default)]
pub(crate) struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, method: &'static str, response: FakeResponse) {
        self.state.lock().unwrap().responses.entry(method).or_default().push_back(response);
    }

    pub(crate) fn respond(&self, method: &'static str, body: Value) {
        self.push(method, FakeResponse::Json(body));
    }

    pub(crate) fn reject(&self, method: &'static str, status: u16, body: &str) {
        self.push(method, FakeResponse::Status(status, body.to_owned()));
    }

    pub(crate) fn fail_network(&self, method: &'static str) {
        self.push(method, FakeResponse::Network);
    }

    /// Hold the next `method` call until the returned sender fires (or drops).
    pub(crate) fn gate(&self, method: &'static str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state.lock().unwrap().gates.entry(method).or_default().push_back(rx);
        tx
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn call_count(&self, method: &str) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| c.method == method).count()
    }

    async fn handle<T: DeserializeOwned>(
        &self,
        method: &'static str,
        token: Option<&str>,
        body: Value,
    ) -> Result<T, ApiError> {
        let (response, gate) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call { method, token: token.map(str::to_owned), body });
            let response = state.responses.get_mut(method).and_then(VecDeque::pop_front);
            let gate = state.gates.get_mut(method).and_then(VecDeque::pop_front);
            (response, gate)
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        match response {
            Some(FakeResponse::Json(value)) => serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string())),
            Some(FakeResponse::Status(status, body)) => Err(ApiError::Status { status, error: BackendError::parse(&body) }),
            Some(FakeResponse::Network) | None => Err(ApiError::Network(format!("no scripted response for {method}"))),
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap()
}

#[async_trait]
impl AuthApi for FakeApi {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.handle("login", None, to_json(request)).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.handle("register", None, to_json(request)).await
    }

    async fn request_password_reset(&self, request: &ForgotPasswordRequest) -> Result<MessageResponse, ApiError> {
        self.handle("request_password_reset", None, to_json(request)).await
    }

    async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<AuthResponse, ApiError> {
        self.handle("reset_password", None, to_json(request)).await
    }

    async fn logout(&self, request: &LogoutRequest) -> Result<(), ApiError> {
        self.handle("logout", None, to_json(request)).await
    }

    async fn fetch_profile(&self, token: &str) -> Result<ApiUser, ApiError> {
        self.handle("fetch_profile", Some(token), Value::Null).await
    }

    async fn update_profile(&self, token: &str, patch: &ProfilePatch) -> Result<ApiUser, ApiError> {
        self.handle("update_profile", Some(token), to_json(patch)).await
    }

    async fn change_password(&self, token: &str, request: &PasswordChangeRequest) -> Result<ApiUser, ApiError> {
        self.handle("change_password", Some(token), to_json(request)).await
    }

    async fn delete_account(&self, token: &str) -> Result<(), ApiError> {
        self.handle("delete_account", Some(token), Value::Null).await
    }

    async fn export_user_data(&self, token: &str) -> Result<Value, ApiError> {
        self.handle("export_user_data", Some(token), Value::Null).await
    }
}

// =============================================================================
// COORDINATOR
// =============================================================================

pub(crate) struct Harness {
    pub store: Arc<MemoryStore>,
    pub api: Arc<FakeApi>,
    pub clock: Arc<FixedClock>,
    pub session: SessionCoordinator,
}

pub(crate) fn harness_in(context: ExecutionContext) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let api = FakeApi::new();
    let clock = FixedClock::at(NOW);
    let config = ClientConfig { startup_delay: std::time::Duration::ZERO, ..ClientConfig::default() };
    let session = SessionCoordinator::builder(store.clone(), api.clone())
        .config(config)
        .clock(clock.clone())
        .context(context)
        .build();
    Harness { store, api, clock, session }
}

pub(crate) fn harness() -> Harness {
    harness_in(ExecutionContext::Interactive)
}

/// Poll the runtime until `ready` holds, yielding between checks.
pub(crate) async fn settle<F: Fn() -> bool>(ready: F) {
    for _ in 0..100 {
        if ready() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
