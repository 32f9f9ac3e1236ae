//! Local logout regardless of backend outcome.

use super::harness::*;
use crate::{Method, SessionPhase, SessionStatus};
use serde_json::json;

#[tokio::test]
async fn logout_revokes_refresh_token_and_clears_everything() {
    let access = valid_token("A1");
    let harness = TestHarness::signed_in(&access, "R1").await;
    harness.transport.reply(Method::Post, LOGOUT, 205, json!({}));

    harness.session.logout().await.unwrap();

    let call = harness.transport.last_call_to(LOGOUT).unwrap();
    assert_eq!(call.body, Some(json!({ "refresh": "R1" })));
    assert_eq!(call.bearer, Some(access));
    assert_eq!(harness.session.status(), SessionStatus::Unauthenticated);
    assert_eq!(harness.session.phase(), SessionPhase::Unauthenticated);
    assert!(harness.storage.is_empty());
}

#[tokio::test]
async fn logout_clears_locally_when_backend_is_unreachable() {
    let harness = TestHarness::signed_in(&valid_token("A1"), "R1").await;
    harness.transport.fail(Method::Post, LOGOUT, "connection refused");

    harness.session.logout().await.unwrap();

    assert_eq!(harness.session.status(), SessionStatus::Unauthenticated);
    assert!(harness.storage.is_empty());
}

#[tokio::test]
async fn logout_clears_locally_when_backend_rejects() {
    let harness = TestHarness::signed_in(&valid_token("A1"), "R1").await;
    harness
        .transport
        .reply(Method::Post, LOGOUT, 500, json!({ "detail": "boom" }));

    harness.session.logout().await.unwrap();

    assert_eq!(harness.session.access_token(), None);
    assert!(harness.storage.is_empty());
}

#[tokio::test]
async fn logout_without_session_skips_backend() {
    let harness = TestHarness::new();
    harness.session.bootstrap().await;

    harness.session.logout().await.unwrap();

    assert!(harness.transport.calls().is_empty());
    assert_eq!(harness.session.status(), SessionStatus::Unauthenticated);
}

#[tokio::test]
async fn login_is_possible_again_after_logout() {
    let harness = TestHarness::signed_in(&valid_token("A1"), "R1").await;
    harness.transport.reply(Method::Post, LOGOUT, 205, json!({}));
    harness.session.logout().await.unwrap();

    harness.transport.reply(
        Method::Post,
        LOGIN,
        200,
        json!({ "access": valid_token("A3"), "refresh": "R3" }),
    );
    harness.session.login("a@b.com", "x").await.unwrap();

    assert_eq!(harness.session.status(), SessionStatus::Authenticated);
    assert_eq!(harness.stored_refresh().as_deref(), Some("R3"));
}

#[tokio::test]
async fn expire_clears_without_backend_call() {
    let harness = TestHarness::signed_in(&valid_token("A1"), "R1").await;

    harness.session.expire();

    assert!(harness.transport.calls().is_empty());
    assert_eq!(harness.session.status(), SessionStatus::Unauthenticated);
    assert_eq!(harness.session.phase(), SessionPhase::Unauthenticated);
    assert!(harness.storage.is_empty());
}
