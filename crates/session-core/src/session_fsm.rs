//! Session lifecycle state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//!                    SessionRestored
//! Initializing ─────────────────────────────► Authenticated
//!   │    │ RefreshStarted                       │   ▲   │
//!   │    └──────────────► Refreshing ◄──────────┘   │   │ LogoutRequested
//!   │ NoSession             │   │   RefreshStarted  │   ▼
//!   │         RefreshFailed │   └── RefreshSuccess ─┘  LoggingOut
//!   ▼                       ▼                           │
//! Unauthenticated ◄─────────┴──── LogoutComplete ───────┘
//!   │        ▲   ▲
//!   │        │   └── Expired (from Authenticated)
//!   │        │ LoginFailed
//!   ▼        │
//! LoggingIn ─┴── LoginSuccess ──► Authenticated
//! ```
//!
//! Refreshing also accepts LogoutRequested, moving to LoggingOut.
//!
//! `LoggingIn`, `Refreshing` and `LoggingOut` are transient. Signup uses the
//! same inputs as login because registration grants a session directly.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Initializing)

    Initializing => {
        SessionRestored => Authenticated,
        NoSession => Unauthenticated,
        RefreshStarted => Refreshing
    },
    Unauthenticated => {
        LoginAttempt => LoggingIn
    },
    LoggingIn => {
        LoginSuccess => Authenticated,
        LoginFailed => Unauthenticated
    },
    Authenticated => {
        RefreshStarted => Refreshing,
        LogoutRequested => LoggingOut,
        Expired => Unauthenticated
    },
    Refreshing => {
        RefreshSuccess => Authenticated,
        RefreshFailed => Unauthenticated,
        LogoutRequested => LoggingOut
    },
    LoggingOut => {
        LogoutComplete => Unauthenticated
    }
}

pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Phase of the session lifecycle, for logging and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Initializing,
    Unauthenticated,
    LoggingIn,
    Authenticated,
    Refreshing,
    LoggingOut,
}

impl SessionPhase {
    /// Returns true while an operation is in progress.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionPhase::LoggingIn | SessionPhase::Refreshing | SessionPhase::LoggingOut
        )
    }
}

impl From<&SessionMachineState> for SessionPhase {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Initializing => SessionPhase::Initializing,
            SessionMachineState::Unauthenticated => SessionPhase::Unauthenticated,
            SessionMachineState::LoggingIn => SessionPhase::LoggingIn,
            SessionMachineState::Authenticated => SessionPhase::Authenticated,
            SessionMachineState::Refreshing => SessionPhase::Refreshing,
            SessionMachineState::LoggingOut => SessionPhase::LoggingOut,
        }
    }
}
