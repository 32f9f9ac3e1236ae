//! Refresh deduplication, fail-closed renewal and session epochs.

use super::harness::*;
use crate::{Method, RefreshOutcome, SessionError, SessionPhase, SessionStatus};
use futures::future::join_all;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn refresh_while_unauthenticated_is_a_no_op() {
    let harness = TestHarness::new();
    harness.session.bootstrap().await;

    let outcome = harness.session.refresh().await.unwrap();

    assert_eq!(outcome, RefreshOutcome::Unauthenticated);
    assert!(harness.transport.calls().is_empty());
    assert_eq!(harness.session.phase(), SessionPhase::Unauthenticated);
}

#[tokio::test]
async fn refresh_rotates_access_token_only() {
    let harness = TestHarness::signed_in(&valid_token("A1"), "R1").await;
    let renewed = valid_token("A2");
    harness.refresh_issues(&renewed);

    let outcome = harness.session.refresh().await.unwrap();

    assert_eq!(
        outcome,
        RefreshOutcome::Refreshed {
            access_token: renewed.clone()
        }
    );
    assert_eq!(harness.session.phase(), SessionPhase::Authenticated);
    assert_eq!(harness.stored_access(), Some(renewed));
    assert_eq!(harness.stored_refresh().as_deref(), Some("R1"));
}

#[tokio::test]
async fn concurrent_refreshes_share_one_request() {
    let harness = TestHarness::signed_in(&valid_token("A1"), "R1").await;
    let renewed = valid_token("A2");
    harness.refresh_issues(&renewed);
    harness.transport.delay(REFRESH, Duration::from_millis(30));

    let outcomes = join_all((0..4).map(|_| harness.session.refresh())).await;

    assert_eq!(harness.transport.calls_to(REFRESH), 1);
    for outcome in outcomes {
        assert_eq!(
            outcome.unwrap(),
            RefreshOutcome::Refreshed {
                access_token: renewed.clone()
            }
        );
    }

    // The finished refresh is not reused.
    harness.session.refresh().await.unwrap();
    assert_eq!(harness.transport.calls_to(REFRESH), 2);
}

#[tokio::test]
async fn rejected_refresh_ends_the_session() {
    let harness = TestHarness::signed_in(&valid_token("A1"), "R1").await;
    harness.transport.reply(
        Method::Post,
        REFRESH,
        401,
        json!({ "detail": "Token is blacklisted", "code": "token_not_valid" }),
    );

    let err = harness.session.refresh().await.unwrap_err();

    assert_eq!(err, SessionError::SessionExpired);
    assert_eq!(harness.session.status(), SessionStatus::Unauthenticated);
    assert_eq!(harness.session.identity(), None);
    assert!(harness.storage.is_empty());
}

#[tokio::test]
async fn network_failure_during_refresh_fails_closed() {
    let harness = TestHarness::signed_in(&valid_token("A1"), "R1").await;
    harness.transport.fail(Method::Post, REFRESH, "timed out");

    let err = harness.session.refresh().await.unwrap_err();

    assert_eq!(err, SessionError::SessionExpired);
    assert!(harness.storage.is_empty());
    assert_eq!(harness.session.phase(), SessionPhase::Unauthenticated);
}

#[tokio::test]
async fn malformed_refreshed_token_fails_closed() {
    let harness = TestHarness::signed_in(&valid_token("A1"), "R1").await;
    harness.refresh_issues("garbage");

    assert_eq!(
        harness.session.refresh().await.unwrap_err(),
        SessionError::SessionExpired
    );
    assert!(harness.storage.is_empty());
}

#[tokio::test]
async fn every_waiter_sees_the_same_failure() {
    let harness = TestHarness::signed_in(&valid_token("A1"), "R1").await;
    harness
        .transport
        .reply(Method::Post, REFRESH, 401, json!({ "detail": "expired" }));
    harness.transport.delay(REFRESH, Duration::from_millis(20));

    let outcomes = join_all((0..3).map(|_| harness.session.refresh())).await;

    assert_eq!(harness.transport.calls_to(REFRESH), 1);
    assert!(outcomes
        .into_iter()
        .all(|outcome| outcome == Err(SessionError::SessionExpired)));
}

#[tokio::test]
async fn logout_during_refresh_discards_the_result() {
    let harness = TestHarness::signed_in(&valid_token("A1"), "R1").await;
    harness.refresh_issues(&valid_token("A2"));
    harness.transport.delay(REFRESH, Duration::from_millis(50));
    harness.transport.reply(Method::Post, LOGOUT, 205, json!({}));

    let session = harness.session.clone();
    let in_flight = tokio::spawn(async move { session.refresh().await });
    harness.transport.wait_for_calls(REFRESH, 1).await;

    harness.session.logout().await.unwrap();
    let outcome = in_flight.await.unwrap().unwrap();

    assert_eq!(outcome, RefreshOutcome::Unauthenticated);
    assert_eq!(harness.session.status(), SessionStatus::Unauthenticated);
    assert_eq!(harness.session.phase(), SessionPhase::Unauthenticated);
    assert_eq!(harness.stored_access(), None);
    assert_eq!(harness.stored_refresh(), None);
}

#[tokio::test]
async fn renewal_reuses_a_token_refreshed_meanwhile() {
    let first = valid_token("A1");
    let harness = TestHarness::signed_in(&first, "R1").await;
    let renewed = valid_token("A2");
    harness.refresh_issues(&renewed);
    harness.session.refresh().await.unwrap();

    let token = harness
        .session
        .renew_after_rejection(Some(&first))
        .await
        .unwrap();

    assert_eq!(token, renewed);
    assert_eq!(harness.transport.calls_to(REFRESH), 1);
}

#[tokio::test]
async fn renewal_without_session_is_expired() {
    let harness = TestHarness::new();
    harness.session.bootstrap().await;

    assert_eq!(
        harness.session.renew_after_rejection(None).await.unwrap_err(),
        SessionError::SessionExpired
    );
    assert_eq!(harness.transport.calls_to(REFRESH), 0);
}

#[tokio::test]
async fn subscribers_observe_renewed_token() {
    let harness = TestHarness::signed_in(&valid_token("A1"), "R1").await;
    let renewed = valid_token("A2");
    harness.refresh_issues(&renewed);
    let mut updates = harness.session.subscribe();
    updates.borrow_and_update();

    harness.session.refresh().await.unwrap();

    assert!(updates.has_changed().unwrap());
    assert_eq!(
        updates.borrow_and_update().access_token.as_deref(),
        Some(renewed.as_str())
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn renewals_racing_a_refresh_commit_share_it() {
    let first = valid_token("A1");
    let harness = TestHarness::signed_in(&first, "R1").await;
    let renewed = valid_token("A2");
    harness.refresh_issues(&renewed);
    harness.transport.delay(REFRESH, Duration::from_millis(20));

    let session = harness.session.clone();
    let in_flight = tokio::spawn(async move { session.refresh().await });
    harness.transport.wait_for_calls(REFRESH, 1).await;

    let renewals: Vec<_> = (0..32)
        .map(|i| {
            let session = harness.session.clone();
            let rejected = first.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(i % 30)).await;
                session.renew_after_rejection(Some(&rejected)).await
            })
        })
        .collect();

    for renewal in join_all(renewals).await {
        assert_eq!(renewal.unwrap().unwrap(), renewed);
    }
    in_flight.await.unwrap().unwrap();
    assert_eq!(harness.transport.calls_to(REFRESH), 1);
}
