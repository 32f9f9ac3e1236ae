//! Scenario tests for the session core.
//!
//! - `harness.rs`     - MockTransport, FailingStorage, TestHarness, token minting
//! - `bootstrap.rs`   - Startup restore of persisted sessions
//! - `login.rs`       - Login and signup
//! - `refresh.rs`     - Refresh deduplication, fail-closed renewal, session epochs
//! - `gateway.rs`     - Bearer injection, 401 renewal and single replay
//! - `logout.rs`      - Local logout regardless of backend outcome
//! - `route_guard.rs` - Pending/Allow/Redirect decisions against live state

mod login;
mod logout;
mod refresh;
