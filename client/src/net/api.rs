//! HTTP Client Core: every outbound call goes through [`ApiClient::send`].
//!
//! ARCHITECTURE
//! ============
//! `send` attaches the stored bearer credential, dispatches through the
//! [`Transport`] under a fixed timeout, and classifies the response with
//! [`decide`]. An authentication failure triggers at most one
//! refresh-and-replay per request.
//!
//! Only one refresh is ever outstanding. The in-flight refresh is a shared
//! future held in a mutex-guarded slot; requests that fail while it runs
//! await the same future instead of starting their own. A refresh rejected
//! with 401/403 escalates to logout: best-effort logout call, local state
//! cleared, full shell reload.
//!
//! ERROR HANDLING
//! ==============
//! `send` returns `Ok` for every HTTP status, including the terminal 401/403
//! of a replayed request. Errors are reserved for transport faults, timeouts,
//! and refresh failures.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::interceptor::{Action, LOGOUT_PATH, ME_PATH, REFRESH_PATH, ResponseContext, decide, login_path};
use super::transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
use super::types::{
    Credential, Identity, LOGIN_PATH, LoginResponse, MePayload, RefreshRequest, RefreshResponse, parse_me_payload,
};
use crate::config::ClientConfig;
use crate::error::{ApiError, RefreshFailure, is_auth_status};
use crate::shell::AppShell;
use crate::state::auth::AuthStore;
use crate::store::credentials::CredentialStore;

type RefreshOutcome = Result<Credential, RefreshFailure>;
type InFlightRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// CLIENT
// =============================================================================

/// Cheap-to-clone handle; clones share credentials and the refresh slot.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    auth: AuthStore,
    shell: Arc<dyn AppShell>,
    request_timeout: Duration,
    /// Pending-refresh slot: `Some` while a refresh call is outstanding.
    refresh: Mutex<Option<InFlightRefresh>>,
    /// Set while a logout call is outstanding.
    logging_out: AtomicBool,
}

impl ApiClient {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        auth: AuthStore,
        shell: Arc<dyn AppShell>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                auth,
                shell,
                request_timeout,
                refresh: Mutex::new(None),
                logging_out: AtomicBool::new(false),
            }),
        }
    }

    /// Build a client that talks to `config.base_url` over reqwest.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn connect(config: &ClientConfig, auth: AuthStore, shell: Arc<dyn AppShell>) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), auth, shell, config.request_timeout()))
    }

    #[must_use]
    pub fn auth(&self) -> &AuthStore {
        &self.inner.auth
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        self.inner.auth.credentials()
    }

    /// Whether a refresh call is currently outstanding.
    #[must_use]
    pub fn refresh_in_flight(&self) -> bool {
        lock(&self.inner.refresh).is_some()
    }

    /// Send one request through the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, timeout, or a failed refresh.
    /// HTTP error statuses are returned as `Ok` responses.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.inner.send(request).await
    }

    /// `GET path` and decode a 2xx JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Status`] for non-2xx responses, plus any `send` error.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path)).await?.error_for_status()?.json()
    }

    /// `POST path` with a JSON body and decode a 2xx JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Status`] for non-2xx responses, plus any `send` error.
    pub async fn post_json<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, ApiError> {
        self.send(ApiRequest::post(path, body)).await?.error_for_status()?.json()
    }

    /// Log in through `POST /auth/login/<method>` and store the new session.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidCredentials`] on 401. A bad password never
    /// triggers a refresh.
    pub async fn login(&self, method: &str, body: Value) -> Result<Identity, ApiError> {
        let response = self.send(ApiRequest::post(login_path(method), body)).await?;
        if response.status == 401 {
            tracing::info!(method, "login rejected");
            return Err(ApiError::InvalidCredentials);
        }
        let (credential, identity) = response.error_for_status()?.json::<LoginResponse>()?.into_parts();
        self.inner.auth.login(&credential, &identity)?;
        tracing::info!(method, role = %identity.role, "logged in");
        Ok(identity)
    }

    /// Email + password login.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::login`].
    pub async fn login_with_email(&self, email: &str, password: &str) -> Result<Identity, ApiError> {
        self.login("email", serde_json::json!({ "email": email, "password": password }))
            .await
    }

    /// Ask the server who the current credential belongs to.
    ///
    /// # Errors
    ///
    /// Returns an error for any non-2xx response or `send` failure.
    pub async fn who_am_i(&self) -> Result<MePayload, ApiError> {
        let body: Value = self.get_json(ME_PATH).await?;
        Ok(parse_me_payload(&body))
    }

    /// User-initiated logout: best-effort server call, local state cleared,
    /// shell sent to the login surface.
    ///
    /// # Errors
    ///
    /// Returns an error only if the persisted session cannot be cleared.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let token = self.credentials().access_token();
        self.inner.logout_endpoint_once(token.as_deref()).await;
        self.inner.auth.logout()?;
        self.inner.shell.redirect(LOGIN_PATH);
        Ok(())
    }
}

// =============================================================================
// PIPELINE
// =============================================================================

impl ClientInner {
    async fn send(self: &Arc<Self>, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let credentials = self.auth.credentials();
        let sent_with = credentials.access_token();
        let response = self.dispatch(&request, sent_with.as_deref()).await?;
        if response.is_success() {
            return Ok(response);
        }

        let in_flight = lock(&self.refresh).clone();
        let current = credentials.access_token();
        // A token this request carried but the store no longer holds was
        // cleared by a logout; there is nothing left to recover with.
        let has_session = current.is_some() || credentials.refresh_token().is_some();
        let action = decide(&ResponseContext {
            path: &request.path,
            status: response.status,
            already_retried: request.already_retried,
            credential_changed: current != sent_with,
            refresh_in_flight: in_flight.is_some(),
            has_session,
        });

        match action {
            Action::PassThrough => Ok(response),
            Action::Fail => {
                tracing::debug!(
                    request_id = %request.request_id,
                    status = response.status,
                    "authentication failure is terminal"
                );
                Ok(response)
            }
            Action::Retry => {
                request.already_retried = true;
                if let Some(refresh) = in_flight {
                    tracing::debug!(request_id = %request.request_id, "awaiting in-flight refresh");
                    refresh.await?;
                }
                self.replay(request).await
            }
            Action::RefreshThenRetry => {
                request.already_retried = true;
                self.refresh_credential().await?;
                self.replay(request).await
            }
        }
    }

    async fn replay(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let token = self.auth.credentials().access_token();
        let response = self.dispatch(&request, token.as_deref()).await?;
        if is_auth_status(response.status) {
            tracing::debug!(
                request_id = %request.request_id,
                status = response.status,
                "replayed request still unauthorized"
            );
        }
        Ok(response)
    }

    async fn dispatch(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse, ApiError> {
        tracing::debug!(
            request_id = %request.request_id,
            method = ?request.method,
            path = %request.path,
            authenticated = bearer.is_some(),
            retry = request.already_retried,
            "sending request"
        );
        let Ok(result) = tokio::time::timeout(self.request_timeout, self.transport.send(request, bearer)).await else {
            tracing::warn!(request_id = %request.request_id, path = %request.path, "request timed out");
            return Err(ApiError::Timeout { path: request.path.clone() });
        };
        result
    }

    // -------------------------------------------------------------------------
    // refresh
    // -------------------------------------------------------------------------

    /// Start a refresh, or join the one already in flight.
    async fn refresh_credential(self: &Arc<Self>) -> Result<Credential, ApiError> {
        let refresh = {
            let mut slot = lock(&self.refresh);
            if let Some(existing) = slot.as_ref() {
                tracing::debug!("joining in-flight refresh");
                existing.clone()
            } else {
                tracing::info!("starting credential refresh");
                let refresh = Arc::clone(self).run_refresh().boxed().shared();
                *slot = Some(refresh.clone());
                refresh
            }
        };
        Ok(refresh.await?)
    }

    /// The slot stays occupied until escalation finishes, so failures that
    /// overlap the logout join this outcome instead of refreshing again.
    async fn run_refresh(self: Arc<Self>) -> RefreshOutcome {
        let outcome = self.request_refresh().await;

        match &outcome {
            Ok(_) => tracing::info!("credential refreshed"),
            Err(failure) if failure.is_auth_rejection() => {
                tracing::warn!(status = ?failure.status, "refresh rejected; escalating to logout");
                self.escalate_logout().await;
            }
            Err(failure) => tracing::warn!(error = %failure, "refresh failed"),
        }
        lock(&self.refresh).take();
        outcome
    }

    async fn request_refresh(&self) -> RefreshOutcome {
        let credentials = self.auth.credentials();
        let refresh_token = credentials.refresh_token();
        let body = serde_json::to_value(RefreshRequest { refresh_token: refresh_token.as_deref() })
            .map_err(|e| transport_failure(&e))?;
        let mut request = ApiRequest::post(REFRESH_PATH, body);
        request.already_retried = true;

        let response = self.dispatch(&request, None).await.map_err(|e| transport_failure(&e))?;
        if !response.is_success() {
            return Err(RefreshFailure {
                status: Some(response.status),
                message: format!("refresh rejected with status {}", response.status),
            });
        }

        let payload: RefreshResponse = response.json().map_err(|e| transport_failure(&e))?;
        let credential = Credential {
            access_token: payload.access_token,
            refresh_token: payload.refresh_token.or(refresh_token),
        };
        credentials.set_credential(&credential).map_err(|e| transport_failure(&e))?;
        Ok(credential)
    }

    // -------------------------------------------------------------------------
    // logout
    // -------------------------------------------------------------------------

    /// Logout escalation. Local state is cleared before the logout call goes
    /// out. Only the escalation that owns the logout call reloads the shell.
    async fn escalate_logout(&self) {
        let token = self.auth.credentials().access_token();
        if let Err(e) = self.auth.logout() {
            tracing::warn!(error = %e, "failed to clear persisted session");
        }
        let owned = self.logout_endpoint_once(token.as_deref()).await;
        if owned {
            self.shell.reload();
        } else {
            tracing::debug!("logout already in progress; local state cleared only");
        }
    }

    /// Best-effort `POST /auth/logout`, attempted at most once at a time.
    /// Returns `false` if another logout already owns the call.
    async fn logout_endpoint_once(&self, bearer: Option<&str>) -> bool {
        if self.logging_out.swap(true, Ordering::SeqCst) {
            return false;
        }
        let mut request = ApiRequest::post(LOGOUT_PATH, serde_json::json!({}));
        request.already_retried = true;
        match self.dispatch(&request, bearer).await {
            Ok(response) if response.is_success() => tracing::debug!("logout acknowledged"),
            Ok(response) => tracing::debug!(status = response.status, "logout call failed; ignoring"),
            Err(e) => tracing::debug!(error = %e, "logout call failed; ignoring"),
        }
        self.logging_out.store(false, Ordering::SeqCst);
        true
    }
}

fn transport_failure(error: &dyn std::fmt::Display) -> RefreshFailure {
    RefreshFailure { status: None, message: error.to_string() }
}
