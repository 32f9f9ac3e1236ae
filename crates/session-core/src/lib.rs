//! Authentication and session core for the Quill blog client.
//!
//! This crate provides:
//! - Token decoding for identity and expiry ([`token_codec`])
//! - FSM-backed session management with startup restore, login, signup,
//!   logout and deduplicated refresh ([`SessionManager`])
//! - An HTTP gateway that attaches the bearer token and renews once on 401
//!   ([`HttpGateway`])
//! - Route guarding for protected views ([`RouteGuard`])

mod error;
mod gateway;
mod route_guard;
mod session;
mod session_fsm;
mod state;
pub mod token_codec;
mod transport;
mod wire;

#[cfg(test)]
mod tests;

pub use error::{SessionError, SessionResult};
pub use gateway::HttpGateway;
pub use route_guard::{decide, GuardDecision, Route, RouteGuard, LOGIN_PATH};
pub use session::{RefreshOutcome, SessionManager, SignupOutcome};
pub use session_fsm::session_machine;
pub use session_fsm::{SessionMachine, SessionMachineInput, SessionMachineState, SessionPhase};
pub use state::{SessionState, SessionStatus};
pub use token_codec::IdentityClaims;
pub use transport::{ApiRequest, ApiResponse, Method, ReqwestTransport, Transport};
pub use wire::{endpoints, ErrorBody};
