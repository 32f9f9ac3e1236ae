//! Login and signup.

use super::harness::*;
use crate::{Method, SessionError, SessionPhase, SessionStatus};
use serde_json::json;

#[tokio::test]
async fn login_stores_pair_and_publishes_identity() {
    let harness = TestHarness::new();
    harness.session.bootstrap().await;
    let access = valid_token("A1");
    harness
        .transport
        .reply(Method::Post, LOGIN, 200, json!({ "access": access, "refresh": "R1" }));

    let identity = harness.session.login("a@b.com", "x").await.unwrap();

    assert_eq!(identity.subject, "42");
    assert_eq!(identity.email.as_deref(), Some("a@b.com"));
    assert_eq!(harness.session.status(), SessionStatus::Authenticated);
    assert_eq!(harness.session.identity(), Some(identity));
    assert_eq!(harness.stored_access(), Some(access));
    assert_eq!(harness.stored_refresh().as_deref(), Some("R1"));

    let call = harness.transport.last_call_to(LOGIN).unwrap();
    assert_eq!(call.body, Some(json!({ "email": "a@b.com", "password": "x" })));
    assert_eq!(call.bearer, None);
}

#[tokio::test]
async fn rejected_login_leaves_session_untouched() {
    let harness = TestHarness::new();
    harness.session.bootstrap().await;
    harness.transport.reply(
        Method::Post,
        LOGIN,
        401,
        json!({ "detail": "No active account found with the given credentials" }),
    );

    let err = harness.session.login("a@b.com", "wrong").await.unwrap_err();

    assert_eq!(
        err,
        SessionError::InvalidCredentials(
            "No active account found with the given credentials".to_string()
        )
    );
    assert_eq!(harness.session.status(), SessionStatus::Unauthenticated);
    assert_eq!(harness.session.phase(), SessionPhase::Unauthenticated);
    assert!(harness.storage.is_empty());
    // Auth endpoints never trigger a refresh.
    assert_eq!(harness.transport.calls_to(REFRESH), 0);
}

#[tokio::test]
async fn login_network_failure_is_reported() {
    let harness = TestHarness::new();
    harness.session.bootstrap().await;
    harness.transport.fail(Method::Post, LOGIN, "connection refused");

    let err = harness.session.login("a@b.com", "x").await.unwrap_err();

    assert!(matches!(err, SessionError::Network(_)));
    assert!(err.is_transient());
    assert_eq!(harness.session.phase(), SessionPhase::Unauthenticated);

    // A later attempt is still allowed.
    harness.transport.reply(
        Method::Post,
        LOGIN,
        200,
        json!({ "access": valid_token("A1"), "refresh": "R1" }),
    );
    assert!(harness.session.login("a@b.com", "x").await.is_ok());
}

#[tokio::test]
async fn login_with_undecodable_token_is_not_stored() {
    let harness = TestHarness::new();
    harness.session.bootstrap().await;
    harness
        .transport
        .reply(Method::Post, LOGIN, 200, json!({ "access": "A1", "refresh": "R1" }));

    let err = harness.session.login("a@b.com", "x").await.unwrap_err();

    assert!(matches!(err, SessionError::MalformedToken(_)));
    assert!(harness.storage.is_empty());
    assert_eq!(harness.session.status(), SessionStatus::Unauthenticated);
}

#[tokio::test]
async fn login_rejected_while_authenticated() {
    let harness = TestHarness::signed_in(&valid_token("A1"), "R1").await;

    let err = harness.session.login("a@b.com", "x").await.unwrap_err();

    assert!(matches!(err, SessionError::InvalidStateTransition(_)));
    assert_eq!(harness.transport.calls_to(LOGIN), 0);
    assert_eq!(harness.session.status(), SessionStatus::Authenticated);
}

#[tokio::test]
async fn login_rejected_before_bootstrap() {
    let harness = TestHarness::new();

    let err = harness.session.login("a@b.com", "x").await.unwrap_err();

    assert!(matches!(err, SessionError::InvalidStateTransition(_)));
}

#[tokio::test]
async fn signup_grants_a_session() {
    let harness = TestHarness::new();
    harness.session.bootstrap().await;
    let access = valid_token("A1");
    harness.transport.reply(
        Method::Post,
        SIGNUP,
        201,
        json!({ "message": "User created successfully", "access": access, "refresh": "R1" }),
    );

    let outcome = harness
        .session
        .signup("ada", "a@b.com", "correct horse")
        .await
        .unwrap();

    assert_eq!(outcome.message.as_deref(), Some("User created successfully"));
    assert_eq!(outcome.identity.display_name.as_deref(), Some("ada"));
    assert_eq!(harness.session.status(), SessionStatus::Authenticated);
    assert_eq!(harness.transport.calls_to(LOGIN), 0);
    assert_eq!(
        harness.transport.last_call_to(SIGNUP).unwrap().body,
        Some(json!({ "username": "ada", "email": "a@b.com", "password": "correct horse" }))
    );
}

#[tokio::test]
async fn signup_validation_errors_carry_fields() {
    let harness = TestHarness::new();
    harness.session.bootstrap().await;
    harness.transport.reply(
        Method::Post,
        SIGNUP,
        400,
        json!({ "email": ["user with this email already exists."] }),
    );

    let err = harness
        .session
        .signup("ada", "a@b.com", "x")
        .await
        .unwrap_err();

    match err {
        SessionError::Validation { message, fields } => {
            assert!(message.contains("already exists"));
            assert_eq!(fields["email"], vec!["user with this email already exists."]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(harness.session.phase(), SessionPhase::Unauthenticated);
    assert!(harness.storage.is_empty());
}
