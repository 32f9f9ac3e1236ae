//! Authenticated HTTP gateway.
//!
//! Every backend call made on behalf of a signed-in user goes through
//! [`HttpGateway::send`]. It attaches the current access token, and on a 401
//! renews the session once and replays the request once. A replay that is
//! still rejected ends the session; nothing is retried a second time.

use crate::session::SessionManager;
use crate::transport::{ApiRequest, ApiResponse, Transport};
use crate::{SessionError, SessionResult};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct HttpGateway {
    session: SessionManager,
    transport: Arc<dyn Transport>,
}

impl HttpGateway {
    /// Create a gateway over the session manager's transport.
    pub fn new(session: SessionManager) -> Self {
        let transport = session.transport();
        Self { session, transport }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Send `request`, renewing the session and replaying once on a 401.
    ///
    /// Non-401 responses are returned unchanged, whatever their status.
    pub async fn send(&self, request: ApiRequest) -> SessionResult<ApiResponse> {
        let token = self.session.access_token();
        let response = self.transport.execute(&request, token.as_deref()).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        debug!(method = %request.method, path = %request.path, "Request rejected, renewing session");
        let renewed = self.session.renew_after_rejection(token.as_deref()).await?;

        let retried = self.transport.execute(&request, Some(&renewed)).await?;
        if retried.is_unauthorized() {
            warn!(method = %request.method, path = %request.path, "Request rejected after renewal, ending session");
            self.session.expire();
            return Err(SessionError::SessionExpired);
        }
        Ok(retried)
    }
}
