//! Session management with deduplicated token refresh.
//!
//! `SessionManager` is the single writer of [`SessionState`]. Every change is
//! published on a `watch` channel; the gateway, route guard and CLI only read
//! snapshots or subscribe.
//!
//! At most one refresh is in flight. Concurrent callers share its result
//! through a `Shared` future parked in `pending_refresh`. Every credential
//! replacement (login, signup, logout, expiry) bumps the session epoch, and a
//! refresh only commits if the epoch it started in is still current.

use crate::session_fsm::{SessionMachine, SessionMachineInput, SessionPhase};
use crate::state::{SessionState, SessionStatus};
use crate::token_codec::{self, IdentityClaims};
use crate::transport::{ApiRequest, ApiResponse, Transport};
use crate::wire::{
    endpoints, LoginRequest, LogoutRequest, RefreshRequest, RefreshResponse, SignupRequest,
    SignupResponse, TokenPairResponse,
};
use crate::{SessionError, SessionResult};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use token_storage::{CredentialPair, StoredTokens, TokenStore};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Result of a [`SessionManager::refresh`] call.
#[derive(Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new access token was issued and stored.
    Refreshed { access_token: String },
    /// There was no session to refresh, or it ended while the refresh ran.
    Unauthenticated,
}

impl std::fmt::Debug for RefreshOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshOutcome::Refreshed { .. } => f.write_str("Refreshed"),
            RefreshOutcome::Unauthenticated => f.write_str("Unauthenticated"),
        }
    }
}

/// Result of a successful signup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupOutcome {
    /// Server confirmation, e.g. "User created successfully".
    pub message: Option<String>,
    pub identity: IdentityClaims,
}

type SharedRefresh = Shared<BoxFuture<'static, SessionResult<RefreshOutcome>>>;

struct PendingRefresh {
    epoch: u64,
    future: SharedRefresh,
}

struct Inner {
    transport: Arc<dyn Transport>,
    store: TokenStore,
    fsm: Mutex<SessionMachine>,
    state_tx: watch::Sender<SessionState>,
    pending_refresh: Mutex<Option<PendingRefresh>>,
    epoch: AtomicU64,
    /// Held while checking the epoch and writing credentials, so a commit
    /// and a logout never interleave.
    commit: Mutex<()>,
    bootstrap_lock: tokio::sync::Mutex<()>,
    expiry_leeway_secs: i64,
}

/// Owns the credential lifecycle. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Create a session manager with no expiry leeway.
    pub fn new(transport: Arc<dyn Transport>, store: TokenStore) -> Self {
        Self::with_expiry_leeway(transport, store, 0)
    }

    /// Create a session manager that treats access tokens as expired
    /// `expiry_leeway_secs` before their `exp` claim.
    pub fn with_expiry_leeway(
        transport: Arc<dyn Transport>,
        store: TokenStore,
        expiry_leeway_secs: i64,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::initializing());
        Self {
            inner: Arc::new(Inner {
                transport,
                store,
                fsm: Mutex::new(SessionMachine::new()),
                state_tx,
                pending_refresh: Mutex::new(None),
                epoch: AtomicU64::new(0),
                commit: Mutex::new(()),
                bootstrap_lock: tokio::sync::Mutex::new(()),
                expiry_leeway_secs: expiry_leeway_secs.max(0),
            }),
        }
    }

    pub(crate) fn transport(&self) -> Arc<dyn Transport> {
        self.inner.transport.clone()
    }

    // ==========================================
    // Read-only accessors
    // ==========================================

    /// Current state.
    pub fn snapshot(&self) -> SessionState {
        self.inner.state_tx.borrow().clone()
    }

    /// Receive every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state_tx.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.state_tx.borrow().status()
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.state_tx.borrow().access_token.clone()
    }

    pub fn identity(&self) -> Option<IdentityClaims> {
        self.inner.state_tx.borrow().identity.clone()
    }

    /// Current lifecycle phase, including transient phases.
    pub fn phase(&self) -> SessionPhase {
        SessionPhase::from(self.inner.fsm.lock().state())
    }

    pub fn expiry_leeway_secs(&self) -> i64 {
        self.inner.expiry_leeway_secs
    }

    /// Transition the FSM, logging state changes.
    fn transition(&self, input: &SessionMachineInput) -> SessionResult<SessionPhase> {
        let mut fsm = self.inner.fsm.lock();
        let old_phase = SessionPhase::from(fsm.state());

        fsm.consume(input).map_err(|_| {
            SessionError::InvalidStateTransition(format!(
                "Cannot apply {:?} in phase {:?}",
                input, old_phase
            ))
        })?;

        let new_phase = SessionPhase::from(fsm.state());
        drop(fsm);

        if old_phase != new_phase {
            debug!(old_phase = ?old_phase, new_phase = ?new_phase, "Session phase transition");
        }
        Ok(new_phase)
    }

    fn publish(&self, update: impl FnOnce(&mut SessionState)) {
        self.inner.state_tx.send_modify(update);
    }

    fn current_epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    // ==========================================
    // Startup
    // ==========================================

    /// Restore the persisted session, if any.
    ///
    /// Adopts a stored access token that is still valid; otherwise renews it
    /// with the stored refresh token; otherwise starts signed out and drops
    /// whatever half of the pair was left behind. Never fails: storage
    /// errors are logged and treated as "no credentials". Always leaves
    /// `is_initializing` false. Later calls return the current status.
    pub async fn bootstrap(&self) -> SessionStatus {
        let _guard = self.inner.bootstrap_lock.lock().await;
        if !self.inner.state_tx.borrow().is_initializing {
            return self.status();
        }

        if self.phase() == SessionPhase::Initializing {
            self.restore().await;
        } else {
            debug!(phase = ?self.phase(), "Session already settled before bootstrap");
        }

        self.publish(|state| state.is_initializing = false);
        let status = self.status();
        info!(status = ?status, "Session bootstrap complete");
        status
    }

    async fn restore(&self) {
        let parts = match self.inner.store.load_parts() {
            Ok(parts) => parts,
            Err(e) => {
                warn!(error = %e, "Could not read stored credentials, starting signed out");
                if let Err(e) = self.inner.store.clear() {
                    warn!(error = %e, "Failed to reset unreadable credentials");
                }
                StoredTokens::default()
            }
        };

        if let Some(access_token) = parts.access_token.as_deref() {
            match token_codec::decode(access_token) {
                Ok(claims) if !self.is_expired(&claims) => {
                    if parts.refresh_token.is_none() {
                        warn!("Stored session has no refresh token, it will end when the access token expires");
                    }
                    self.adopt(access_token.to_string(), claims);
                    return;
                }
                Ok(claims) => {
                    debug!(user_id = %claims.subject, "Stored access token expired");
                }
                Err(e) => {
                    debug!(error = %e, "Stored access token unreadable, ignoring it");
                }
            }
        }

        if parts.refresh_token.is_some() {
            info!("Renewing stored session");
            match self.refresh().await {
                Ok(RefreshOutcome::Refreshed { .. }) => {}
                Ok(RefreshOutcome::Unauthenticated) => {
                    debug!("Session ended while restoring");
                }
                Err(e) => {
                    info!(error = %e, "Stored session could not be renewed");
                }
            }
            return;
        }

        if !parts.is_empty() {
            debug!("Clearing incomplete stored credentials");
            if let Err(e) = self.inner.store.clear() {
                warn!(error = %e, "Failed to clear incomplete stored credentials");
            }
        }
        if let Err(e) = self.transition(&SessionMachineInput::NoSession) {
            debug!(error = %e, "No-session transition skipped");
        }
        info!("No stored session");
    }

    fn adopt(&self, access_token: String, claims: IdentityClaims) {
        let _commit = self.inner.commit.lock();
        if let Err(e) = self.transition(&SessionMachineInput::SessionRestored) {
            warn!(error = %e, "Could not restore session");
            return;
        }
        info!(user_id = %claims.subject, "Restored stored session");
        self.publish(|state| {
            state.access_token = Some(access_token);
            state.identity = Some(claims);
        });
    }

    fn is_expired(&self, claims: &IdentityClaims) -> bool {
        token_codec::is_expired_with_leeway(
            claims,
            token_codec::now_epoch(),
            self.inner.expiry_leeway_secs,
        )
    }

    // ==========================================
    // Login / Signup
    // ==========================================

    /// Sign in with email and password.
    ///
    /// Only allowed while signed out. On failure the session is left as it was.
    pub async fn login(&self, identifier: &str, secret: &str) -> SessionResult<IdentityClaims> {
        self.transition(&SessionMachineInput::LoginAttempt)?;
        debug!(email = %identifier, "Attempting login");

        let result = async {
            let request = ApiRequest::post(
                endpoints::LOGIN,
                &LoginRequest {
                    email: identifier,
                    password: secret,
                },
            )?;
            let response = self.inner.transport.execute(&request, None).await?;
            if !response.is_success() {
                return Err(classify_login_failure(response));
            }
            let tokens: TokenPairResponse = response.json()?;
            self.start_session(CredentialPair::new(tokens.access, tokens.refresh))
        }
        .await;

        self.finish_sign_in(result)
    }

    /// Register a new account. The response carries a session, so no
    /// separate login is needed.
    pub async fn signup(
        &self,
        name: &str,
        identifier: &str,
        secret: &str,
    ) -> SessionResult<SignupOutcome> {
        self.transition(&SessionMachineInput::LoginAttempt)?;
        debug!(username = %name, email = %identifier, "Attempting signup");

        let result = async {
            let request = ApiRequest::post(
                endpoints::SIGNUP,
                &SignupRequest {
                    username: name,
                    email: identifier,
                    password: secret,
                },
            )?;
            let response = self.inner.transport.execute(&request, None).await?;
            if !response.is_success() {
                return Err(classify_signup_failure(response));
            }
            let body: SignupResponse = response.json()?;
            let identity = self.start_session(CredentialPair::new(body.access, body.refresh))?;
            Ok::<_, SessionError>(SignupOutcome {
                message: body.message,
                identity,
            })
        }
        .await;

        self.finish_sign_in(result)
    }

    /// Persist and publish a fresh credential pair. Runs while `LoggingIn`.
    fn start_session(&self, pair: CredentialPair) -> SessionResult<IdentityClaims> {
        let claims = token_codec::decode(&pair.access_token)?;

        let _commit = self.inner.commit.lock();
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.store.save(&pair)?;
        self.transition(&SessionMachineInput::LoginSuccess)?;
        self.publish(|state| {
            state.access_token = Some(pair.access_token);
            state.identity = Some(claims.clone());
        });

        info!(user_id = %claims.subject, "Signed in");
        Ok(claims)
    }

    fn finish_sign_in<T>(&self, result: SessionResult<T>) -> SessionResult<T> {
        if let Err(e) = &result {
            warn!(error = %e, "Sign-in failed");
            if self.phase() == SessionPhase::LoggingIn {
                let _ = self.transition(&SessionMachineInput::LoginFailed);
            }
        }
        result
    }

    // ==========================================
    // Refresh
    // ==========================================

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Joins the in-flight refresh if there is one. Resolves to
    /// [`RefreshOutcome::Unauthenticated`] without a network call when there
    /// is no session. Any failure ends the session and returns
    /// [`SessionError::SessionExpired`].
    pub async fn refresh(&self) -> SessionResult<RefreshOutcome> {
        match self.join_or_start_refresh() {
            Some(future) => future.await,
            None => {
                debug!(phase = ?self.phase(), "No session to refresh");
                Ok(RefreshOutcome::Unauthenticated)
            }
        }
    }

    fn join_or_start_refresh(&self) -> Option<SharedRefresh> {
        let mut slot = self.inner.pending_refresh.lock();
        let epoch = self.current_epoch();

        if let Some(pending) = slot.as_ref() {
            if pending.epoch == epoch {
                debug!("Joining in-flight refresh");
                return Some(pending.future.clone());
            }
        }

        // Unauthenticated, LoggingIn and LoggingOut cannot start a refresh.
        self.transition(&SessionMachineInput::RefreshStarted).ok()?;

        let weak = Arc::downgrade(&self.inner);
        let future = run_detached_refresh(weak, epoch).boxed().shared();
        *slot = Some(PendingRefresh {
            epoch,
            future: future.clone(),
        });
        Some(future)
    }

    async fn run_refresh(&self, epoch: u64) -> SessionResult<RefreshOutcome> {
        let exchanged = self.exchange_refresh_token().await;

        let outcome = {
            let _commit = self.inner.commit.lock();
            if self.current_epoch() != epoch {
                debug!(epoch, "Discarding refresh result from an ended session");
                Ok(RefreshOutcome::Unauthenticated)
            } else {
                match exchanged.and_then(|(token, claims)| {
                    self.inner.store.save_access_token(&token)?;
                    Ok((token, claims))
                }) {
                    Ok((access_token, claims)) => {
                        if let Err(e) = self.transition(&SessionMachineInput::RefreshSuccess) {
                            warn!(error = %e, "Refresh completed outside the refreshing phase");
                        }
                        info!(user_id = %claims.subject, "Session renewed");
                        let published = access_token.clone();
                        self.publish(|state| {
                            state.access_token = Some(published);
                            state.identity = Some(claims);
                        });
                        Ok(RefreshOutcome::Refreshed { access_token })
                    }
                    Err(e) => {
                        warn!(error = %e, "Session renewal failed, signing out");
                        let _ = self.clear_locked();
                        let _ = self.transition(&SessionMachineInput::RefreshFailed);
                        Err(SessionError::SessionExpired)
                    }
                }
            }
        };

        let mut slot = self.inner.pending_refresh.lock();
        if slot.as_ref().is_some_and(|pending| pending.epoch == epoch) {
            *slot = None;
        }
        outcome
    }

    async fn exchange_refresh_token(&self) -> SessionResult<(String, IdentityClaims)> {
        let refresh_token = self
            .inner
            .store
            .load_parts()?
            .refresh_token
            .ok_or(SessionError::SessionExpired)?;

        let request = ApiRequest::post(
            endpoints::TOKEN_REFRESH,
            &RefreshRequest {
                refresh: &refresh_token,
            },
        )?;
        let response = self.inner.transport.execute(&request, None).await?;
        if !response.is_success() {
            return Err(response.into_http_error());
        }

        let body: RefreshResponse = response.json()?;
        let claims = token_codec::decode(&body.access)?;
        Ok((body.access, claims))
    }

    /// Renew after the backend rejected `rejected_token`.
    ///
    /// If the current token already differs, another refresh finished while
    /// the rejected request was in flight; the current token is returned
    /// without a new refresh.
    pub async fn renew_after_rejection(&self, rejected_token: Option<&str>) -> SessionResult<String> {
        // A refresh commits its token before it clears the slot, so reading
        // both under the slot lock sees either the pending refresh or its result.
        let renewed = {
            let slot = self.inner.pending_refresh.lock();
            match self.access_token() {
                Some(current) if slot.is_none() && Some(current.as_str()) != rejected_token => {
                    Some(current)
                }
                _ => None,
            }
        };
        if let Some(current) = renewed {
            debug!("Token already renewed by another request");
            return Ok(current);
        }

        match self.refresh().await? {
            RefreshOutcome::Refreshed { access_token } => Ok(access_token),
            RefreshOutcome::Unauthenticated => Err(SessionError::SessionExpired),
        }
    }

    // ==========================================
    // Logout / Expiry
    // ==========================================

    /// Sign out. Local credentials are cleared whether or not the backend
    /// accepts the logout call; only a local storage failure is returned.
    pub async fn logout(&self) -> SessionResult<()> {
        let stored_refresh = self
            .inner
            .store
            .load_parts()
            .ok()
            .and_then(|parts| parts.refresh_token);
        let bearer = self.access_token();

        if let Err(e) = self.transition(&SessionMachineInput::LogoutRequested) {
            debug!(error = %e, "Logout requested outside an active session");
        }
        self.inner.pending_refresh.lock().take();
        let cleared = self.clear_session();

        if let Some(refresh) = stored_refresh {
            self.revoke_remote(&refresh, bearer.as_deref()).await;
        }

        if self.phase() == SessionPhase::LoggingOut {
            let _ = self.transition(&SessionMachineInput::LogoutComplete);
        }
        info!("Signed out");
        cleared
    }

    async fn revoke_remote(&self, refresh: &str, bearer: Option<&str>) {
        let request = match ApiRequest::post(endpoints::LOGOUT, &LogoutRequest { refresh }) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Could not build logout request");
                return;
            }
        };
        match self.inner.transport.execute(&request, bearer).await {
            Ok(response) if response.is_success() => debug!("Backend logout accepted"),
            Ok(response) => {
                warn!(status = response.status, "Backend logout rejected, signed out locally")
            }
            Err(e) => warn!(error = %e, "Backend logout failed, signed out locally"),
        }
    }

    /// End the session locally without contacting the backend.
    pub fn expire(&self) {
        self.inner.pending_refresh.lock().take();
        if let Err(e) = self.clear_session() {
            warn!(error = %e, "Failed to clear stored credentials on expiry");
        }
        let input = match self.phase() {
            SessionPhase::Authenticated => Some(SessionMachineInput::Expired),
            SessionPhase::Refreshing => Some(SessionMachineInput::RefreshFailed),
            _ => None,
        };
        if let Some(input) = input {
            let _ = self.transition(&input);
        }
        info!("Session expired");
    }

    fn clear_session(&self) -> SessionResult<()> {
        let _commit = self.inner.commit.lock();
        self.clear_locked()
    }

    /// Caller holds the commit lock.
    fn clear_locked(&self) -> SessionResult<()> {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        let stored = self.inner.store.clear();
        self.publish(|state| {
            state.access_token = None;
            state.identity = None;
        });
        stored.map_err(|e| {
            warn!(error = %e, "Failed to clear stored credentials");
            SessionError::from(e)
        })
    }
}

async fn run_detached_refresh(inner: Weak<Inner>, epoch: u64) -> SessionResult<RefreshOutcome> {
    match inner.upgrade() {
        Some(inner) => SessionManager { inner }.run_refresh(epoch).await,
        None => Ok(RefreshOutcome::Unauthenticated),
    }
}

fn classify_login_failure(response: ApiResponse) -> SessionError {
    match response.status {
        400 | 401 | 403 => SessionError::InvalidCredentials(response.error_message()),
        _ => response.into_http_error(),
    }
}

fn classify_signup_failure(response: ApiResponse) -> SessionError {
    match response.status {
        400 | 409 | 422 => {
            let body = response.error_body();
            SessionError::Validation {
                message: body
                    .summary()
                    .unwrap_or_else(|| "signup rejected".to_string()),
                fields: body.fields,
            }
        }
        _ => response.into_http_error(),
    }
}
