//! End-to-end scenarios across the whole stack: credential store, token
//! lifecycle, interceptor pipeline, failover, and the page controller,
//! against the scripted transport.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;

use wayfarer::fetcher::{Phase, ToggleAction, ToggleOutcome, TourPage};
use wayfarer::transport::client::ApiClient;
use wayfarer::transport::failover::EndpointState;
use wayfarer::transport::store::CredentialStore;
use wayfarer::transport::test_utils::{make_test_token, MockTransport, RecordingNoticeSink};
use wayfarer::transport::token::credential_from_token;
use wayfarer::transport::Notice;

struct Harness {
    api: Arc<ApiClient>,
    transport: Arc<MockTransport>,
    store: Arc<CredentialStore>,
    notices: Arc<RecordingNoticeSink>,
}

fn harness(transport: MockTransport) -> Harness {
    let transport = Arc::new(transport);
    let store = Arc::new(CredentialStore::new());
    let notices = Arc::new(RecordingNoticeSink::default());
    let api = ApiClient::new(
        transport.clone(),
        store.clone(),
        Arc::new(EndpointState::new("http://primary", "http://fallback")),
        notices.clone(),
    );
    Harness {
        api,
        transport,
        store,
        notices,
    }
}

fn tour_body() -> serde_json::Value {
    json!({"id": 42, "title": "Glacier Trek", "summary": "ice", "price": 1200.0,
           "rating": 4.8, "favorite_count": 10, "favorited": false})
}

/// A token four minutes from expiry is refreshed before the request goes
/// out, and the request carries the refreshed token.
#[tokio::test]
async fn aging_token_is_refreshed_before_the_request() {
    let now = Utc::now().timestamp();
    let aging = make_test_token("u1", now + 240, now - 3_600);
    let fresh = make_test_token("u1", now + 7_200, now);

    let h = harness(
        MockTransport::new()
            .on_ok("POST /auth/refresh-token", 200, json!({ "token": &fresh }))
            .on_ok("GET /tours/42", 200, tour_body()),
    );
    h.store.set(credential_from_token(&aging, None).unwrap());

    h.api.get_json("/tours/42").await.unwrap();

    let calls = h.transport.calls();
    assert_eq!(calls[0].route(), "POST /auth/refresh-token");
    assert_eq!(calls[0].bearer.as_deref(), Some(aging.as_str()));
    assert_eq!(calls[1].route(), "GET /tours/42");
    assert_eq!(calls[1].bearer.as_deref(), Some(fresh.as_str()));
    assert_eq!(h.store.get().unwrap().token, fresh);
}

/// An oversized token never goes over the wire: the request proceeds
/// unauthenticated and the credential is purged.
#[tokio::test]
async fn oversized_token_is_purged_and_the_request_goes_out_bare() {
    let h = harness(MockTransport::new().on_ok("GET /tours/42", 200, tour_body()));
    let oversized = format!("h.{}.s", "p".repeat(4_496));
    h.store.set(wayfarer::types::Credential {
        token: oversized,
        expires_at: i64::MAX,
        issued_at: 0,
        principal: wayfarer::types::Principal {
            id: "u1".to_string(),
            role: wayfarer::types::Role::Traveler,
        },
    });

    h.api.get_json("/tours/42").await.unwrap();

    let calls = h.transport.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].bearer.is_none());
    assert!(h.store.get().is_none());
    assert!(matches!(h.notices.recorded()[0], Notice::Warning(_)));
}

/// A 401 anywhere purges the session and points the user back at where
/// they were.
#[tokio::test]
async fn rejected_credential_ends_the_session_with_a_return_target() {
    let now = Utc::now().timestamp();
    let token = make_test_token("u1", now + 3_600, now);
    let h = harness(MockTransport::new().on_ok("GET /bookings/mine", 401, json!(null)));
    h.store.set(credential_from_token(&token, None).unwrap());

    let err = h.api.get_json("/bookings/mine").await.unwrap_err();
    assert_eq!(err, wayfarer::types::ApiError::Unauthorized);
    assert!(h.store.get().is_none());
    assert_eq!(
        h.notices.recorded(),
        vec![Notice::SessionExpired {
            return_to: "/bookings/mine".to_string()
        }]
    );
}

/// The full journey: sign in, mount a detail page, toggle a favorite,
/// survive a network blip via failover, sign out.
#[tokio::test(start_paused = true)]
async fn login_mount_toggle_failover_logout() {
    let now = Utc::now().timestamp();
    let token = make_test_token("u9", now + 7_200, now);

    let h = harness(
        MockTransport::new()
            .on_ok(
                "POST /auth/login",
                200,
                json!({"token": token, "user": {"id": "u9", "role": "traveler"}}),
            )
            // The primary endpoint drops the first tour fetch; the fallback
            // answers it.
            .on_network_error("GET /tours/42")
            .on_ok("GET /tours/42", 200, tour_body())
            .on_ok(
                "GET /tours/42/related",
                200,
                json!([{"id": 43, "title": "Ridge Walk", "price": 300.0, "rating": 4.1}]),
            )
            .on_ok(
                "GET /tours/42/reviews?page=1&page_size=10",
                200,
                json!({"reviews": [], "total": 0}),
            )
            .on_ok("POST /tours/42/favorite", 200, json!({}))
            .healthy(true),
    );

    let cred = h.api.login("u9@example.com", "hunter2").await.unwrap();
    assert_eq!(cred.principal.id, "u9");

    let page = TourPage::new(h.api.clone(), 42);
    page.mount().await;
    // Give the primary entity's bounded retry room, in case the failover
    // path needed it; everything should already be settled.
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(page.tour().state().phase(true), Phase::Success);
    assert_eq!(page.related().state().phase(true), Phase::Success);
    assert_eq!(h.api.endpoints().active(), "http://fallback");
    assert_eq!(h.transport.probe_count(), 1);

    // Every authenticated call after login carried the bearer.
    assert!(h
        .transport
        .calls()
        .iter()
        .skip(1)
        .all(|req| req.bearer.as_deref() == Some(token.as_str())));

    let outcome = page.toggle(ToggleAction::Favorite).await;
    assert_eq!(outcome, ToggleOutcome::Confirmed);
    assert!(page.tour().snapshot().unwrap().favorited);

    h.api.logout();
    assert!(h.store.get().is_none());
}
