//! Shared fixtures for unit tests: a scripted transport and a recording shell.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};

use crate::error::ApiError;
use crate::net::api::ApiClient;
use crate::net::interceptor::{LOGOUT_PATH, ME_PATH, REFRESH_PATH};
use crate::net::transport::{ApiRequest, ApiResponse, Method, Transport};
use crate::net::types::{Credential, Identity, Role};
use crate::shell::AppShell;
use crate::state::auth::AuthStore;
use crate::store::credentials::CredentialStore;
use crate::store::persist::MemoryStore;

pub const STALE_TOKEN: &str = "stale-token";
pub const FRESH_TOKEN: &str = "fresh-token";

// =========================================================================
// MockTransport
// =========================================================================

pub enum MockReply {
    Json(u16, Value),
    /// Answers after a delay; pair with paused time.
    Delayed(Duration, u16, Value),
    /// Never answers; exercises the request ceiling.
    Hang,
    Fail(String),
}

#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub already_retried: bool,
    pub body: Option<Value>,
}

type Handler = dyn Fn(&ApiRequest, Option<&str>) -> MockReply + Send + Sync;

/// Records every call, yields once so concurrent requests interleave, then
/// answers from `handler`.
pub struct MockTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new(handler: impl Fn(&ApiRequest, Option<&str>) -> MockReply + Send + Sync + 'static) -> Self {
        Self { handler: Box::new(handler), calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.calls().iter().filter(|c| c.path == path).count()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse, ApiError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method,
            path: request.path.clone(),
            bearer: bearer.map(ToOwned::to_owned),
            already_retried: request.already_retried,
            body: request.body.clone(),
        });
        tokio::task::yield_now().await;
        match (self.handler)(request, bearer) {
            MockReply::Json(status, body) => Ok(ApiResponse { status, body: body.to_string() }),
            MockReply::Delayed(delay, status, body) => {
                tokio::time::sleep(delay).await;
                Ok(ApiResponse { status, body: body.to_string() })
            }
            MockReply::Hang => futures::future::pending().await,
            MockReply::Fail(message) => Err(ApiError::Transport(message)),
        }
    }
}

/// Server that accepts only `FRESH_TOKEN` and answers refresh with `refresh_status`.
pub fn token_server(refresh_status: u16) -> MockTransport {
    MockTransport::new(move |request, bearer| match request.path.as_str() {
        REFRESH_PATH if refresh_status == 200 => MockReply::Json(200, json!({ "accessToken": FRESH_TOKEN })),
        REFRESH_PATH => MockReply::Json(refresh_status, json!({ "message": "refresh token expired" })),
        LOGOUT_PATH => MockReply::Json(200, json!({})),
        ME_PATH if bearer == Some(FRESH_TOKEN) => {
            MockReply::Json(200, json!({ "nickname": "Ada", "role": "MENTOR", "email": "ada@example.test" }))
        }
        _ if bearer == Some(FRESH_TOKEN) => MockReply::Json(200, json!({ "ok": true })),
        _ => MockReply::Json(401, json!({ "message": "unauthorized" })),
    })
}

// =========================================================================
// RecordingShell
// =========================================================================

#[derive(Default)]
pub struct RecordingShell {
    reloads: AtomicUsize,
    redirects: Mutex<Vec<String>>,
}

impl RecordingShell {
    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().unwrap().clone()
    }
}

impl AppShell for RecordingShell {
    fn reload(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }

    fn redirect(&self, to: &str) {
        self.redirects.lock().unwrap().push(to.to_owned());
    }
}

// =========================================================================
// Harness
// =========================================================================

pub struct Harness {
    pub api: ApiClient,
    pub transport: Arc<MockTransport>,
    pub shell: Arc<RecordingShell>,
    pub backing: Arc<MemoryStore>,
}

pub fn harness(transport: MockTransport) -> Harness {
    harness_with_timeout(transport, Duration::from_secs(5))
}

pub fn harness_with_timeout(transport: MockTransport, timeout: Duration) -> Harness {
    let backing = Arc::new(MemoryStore::new());
    let auth = AuthStore::new(CredentialStore::new(backing.clone()));
    let transport = Arc::new(transport);
    let shell = Arc::new(RecordingShell::default());
    let api = ApiClient::new(transport.clone(), auth, shell.clone(), timeout);
    Harness { api, transport, shell, backing }
}

pub fn mentor() -> Identity {
    Identity { display_name: "Ada".into(), role: Role::Mentor, email: None }
}

/// Store a logged-in session whose access token the server will reject.
pub fn seed_stale_session(harness: &Harness, role: Role) {
    let credential = Credential { access_token: STALE_TOKEN.into(), refresh_token: Some("refresh-1".into()) };
    let identity = Identity { display_name: "Ada".into(), role, email: None };
    harness.api.auth().login(&credential, &identity).unwrap();
}
